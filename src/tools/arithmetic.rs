//! 算术工具
//!
//! 从自然语言里抽出「两个数值操作数 + 一个运算关键词」的表达式并求值。
//! 抽取是确定性的（正则 + 关键词表），同样的查询永远得到同样的路由结果。

use async_trait::async_trait;
use regex::Regex;

use crate::artifact::Artifact;
use crate::error::ToolError;
use crate::tools::{format_number, Tool};

/// 支持的双目运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Op {
    fn symbol(&self) -> char {
        match self {
            Op::Add => '+',
            Op::Subtract => '-',
            Op::Multiply => '*',
            Op::Divide => '/',
        }
    }
}

/// 从查询中抽取 (左操作数, 运算, 右操作数)；抽不出返回 None
///
/// 两种形式：
/// - 符号式："6 / 2"、"3+4"
/// - 关键词式："divide 6 by 2"、"what is 6 divided by 2"、"subtract 3 from 10"
pub fn parse_expression(query: &str) -> Option<(f64, Op, f64)> {
    let symbolic = Regex::new(r"(-?\d+(?:\.\d+)?)\s*([+\-*/])\s*(-?\d+(?:\.\d+)?)").unwrap();
    if let Some(cap) = symbolic.captures(query) {
        let a: f64 = cap[1].parse().ok()?;
        let b: f64 = cap[3].parse().ok()?;
        let op = match &cap[2] {
            "+" => Op::Add,
            "-" => Op::Subtract,
            "*" => Op::Multiply,
            _ => Op::Divide,
        };
        return Some((a, op, b));
    }

    let lower = query.to_lowercase();
    let keyword = Regex::new(r"\b(divided?|division|add|plus|subtract|minus|multipl(?:y|ied)|times)\b")
        .unwrap();
    let op = match keyword.find(&lower)?.as_str() {
        "divide" | "divided" | "division" => Op::Divide,
        "add" | "plus" => Op::Add,
        "subtract" | "minus" => Op::Subtract,
        _ => Op::Multiply,
    };

    let number = Regex::new(r"-?\d+(?:\.\d+)?").unwrap();
    let nums: Vec<f64> = number
        .find_iter(&lower)
        .take(2)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if nums.len() < 2 {
        return None;
    }

    // "subtract 3 from 10" 语序与计算顺序相反
    if op == Op::Subtract && lower.contains(" from ") {
        Some((nums[1], op, nums[0]))
    } else {
        Some((nums[0], op, nums[1]))
    }
}

/// 算术工具
#[derive(Debug, Default)]
pub struct ArithmeticTool;

impl ArithmeticTool {
    fn eval(a: f64, op: Op, b: f64) -> Result<f64, ToolError> {
        Ok(match op {
            Op::Add => a + b,
            Op::Subtract => a - b,
            Op::Multiply => a * b,
            Op::Divide => {
                if b == 0.0 {
                    return Err(ToolError::DivisionByZero);
                }
                a / b
            }
        })
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a two-operand arithmetic expression, e.g. 'divide 6 by 2'"
    }

    fn can_handle(&self, query: &str, _artifact: Option<&Artifact>) -> bool {
        parse_expression(query).is_some()
    }

    async fn execute(
        &self,
        query: &str,
        _artifact: Option<&Artifact>,
    ) -> Result<String, ToolError> {
        let (a, op, b) = parse_expression(query).ok_or_else(|| {
            ToolError::ParseError(
                "expected two numbers and an operator, e.g. 'divide 6 by 2'".to_string(),
            )
        })?;
        let value = Self::eval(a, op, b)?;
        Ok(format!(
            "{} {} {} = {}",
            format_number(a),
            op.symbol(),
            format_number(b),
            format_number(value)
        ))
    }
}
