//! 表格分析工具
//!
//! 两种查询：整表统计摘要；单列聚合（mean/sum/min/max），列名与聚合
//! 关键词都从查询文本中定位。需要会话已绑定 CSV 表格。

use async_trait::async_trait;

use crate::artifact::{Artifact, ArtifactKind, Table};
use crate::error::ToolError;
use crate::tools::{format_number, Tool};

/// 支持的单列聚合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Mean,
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn label(&self) -> &'static str {
        match self {
            Aggregate::Mean => "Average",
            Aggregate::Sum => "Sum",
            Aggregate::Min => "Minimum",
            Aggregate::Max => "Maximum",
        }
    }
}

const AGGREGATE_KEYWORDS: &[(&str, Aggregate)] = &[
    ("average", Aggregate::Mean),
    ("mean", Aggregate::Mean),
    ("sum", Aggregate::Sum),
    ("total", Aggregate::Sum),
    ("min", Aggregate::Min),
    ("minimum", Aggregate::Min),
    ("lowest", Aggregate::Min),
    ("smallest", Aggregate::Min),
    ("max", Aggregate::Max),
    ("maximum", Aggregate::Max),
    ("highest", Aggregate::Max),
    ("largest", Aggregate::Max),
];

const SUMMARY_KEYWORDS: &[&str] = &["summarize", "summary", "describe", "overview"];

/// 查询文本是否含某个独立单词（避免 "min" 匹配进 "minutes"）
fn has_word(lower: &str, word: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|t| t == word)
}

/// 表格分析工具
#[derive(Debug, Default)]
pub struct TabularTool;

impl TabularTool {
    fn find_aggregate(lower: &str) -> Option<Aggregate> {
        AGGREGATE_KEYWORDS
            .iter()
            .find(|(kw, _)| has_word(lower, kw))
            .map(|(_, agg)| *agg)
    }

    /// 在查询里定位列名：先按表头逐个做整词匹配，匹配不到再取
    /// "column X" 里 column 后面的词报 UnknownColumn
    fn find_column(table: &Table, lower: &str) -> Result<usize, ToolError> {
        for (i, header) in table.headers().iter().enumerate() {
            if has_word(lower, &header.to_lowercase()) {
                return Ok(i);
            }
        }
        let named = lower
            .split(|c: char| !c.is_alphanumeric())
            .skip_while(|t| *t != "column")
            .nth(1)
            .filter(|t| !t.is_empty())
            .unwrap_or("(no column named)");
        Err(ToolError::UnknownColumn(named.to_string()))
    }

    fn aggregate(table: &Table, column: usize, agg: Aggregate) -> Result<String, ToolError> {
        let name = &table.headers()[column];
        let values = table.numeric_values(column);
        if values.is_empty() {
            return Err(ToolError::UnsupportedAggregate(format!(
                "column '{}' has no numeric values",
                name
            )));
        }
        let value = match agg {
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        };
        Ok(format!("{} of {}: {}", agg.label(), name, value))
    }

    /// 整表摘要：每个数值列给 count/mean/min/max，非数值列只报条数
    fn summarize(table: &Table) -> String {
        let mut out = format!(
            "Data summary: {} rows x {} columns\n",
            table.row_count(),
            table.column_count()
        );
        for (i, header) in table.headers().iter().enumerate() {
            let values = table.numeric_values(i);
            if values.is_empty() {
                out.push_str(&format!("{}: non-numeric ({} values)\n", header, table.row_count()));
            } else {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                out.push_str(&format!(
                    "{}: count={} mean={} min={} max={}\n",
                    header,
                    values.len(),
                    mean,
                    format_number(min),
                    format_number(max)
                ));
            }
        }
        out.trim_end().to_string()
    }
}

#[async_trait]
impl Tool for TabularTool {
    fn name(&self) -> &str {
        "analyze_csv"
    }

    fn description(&self) -> &str {
        "Analyze the loaded CSV: 'average of column X' or 'summarize data'"
    }

    fn can_handle(&self, _query: &str, artifact: Option<&Artifact>) -> bool {
        artifact.map(|a| a.is_table()).unwrap_or(false)
    }

    async fn execute(
        &self,
        query: &str,
        artifact: Option<&Artifact>,
    ) -> Result<String, ToolError> {
        let table = match artifact.map(|a| &a.kind) {
            Some(ArtifactKind::Table(t)) => t,
            _ => return Err(ToolError::NoArtifactBound),
        };

        let lower = query.to_lowercase();

        if SUMMARY_KEYWORDS.iter().any(|kw| has_word(&lower, kw)) {
            return Ok(Self::summarize(table));
        }

        if let Some(agg) = Self::find_aggregate(&lower) {
            let column = Self::find_column(table, &lower)?;
            return Self::aggregate(table, column, agg);
        }

        Err(ToolError::UnsupportedAggregate(
            "try 'average of column X' or 'summarize data'".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn salary_artifact() -> Artifact {
        Artifact {
            kind: ArtifactKind::Table(
                Table::parse_csv("name,salary\nalice,50000\nbob,60000\ncarol,75000\n").unwrap(),
            ),
            path: "salaries.csv".to_string(),
            loaded_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn average_of_salary_column() {
        let tool = TabularTool;
        let a = salary_artifact();
        let out = tool
            .execute("average of column salary", Some(&a))
            .await
            .unwrap();
        assert_eq!(out, "Average of salary: 61666.666666666664");
    }

    #[tokio::test]
    async fn sum_min_max_aggregates() {
        let tool = TabularTool;
        let a = salary_artifact();
        assert_eq!(
            tool.execute("sum of salary", Some(&a)).await.unwrap(),
            "Sum of salary: 185000"
        );
        assert_eq!(
            tool.execute("lowest salary", Some(&a)).await.unwrap(),
            "Minimum of salary: 50000"
        );
        assert_eq!(
            tool.execute("max salary", Some(&a)).await.unwrap(),
            "Maximum of salary: 75000"
        );
    }

    #[tokio::test]
    async fn summary_covers_all_columns() {
        let tool = TabularTool;
        let a = salary_artifact();
        let out = tool.execute("summarize the data", Some(&a)).await.unwrap();
        assert!(out.contains("3 rows x 2 columns"));
        assert!(out.contains("salary: count=3"));
        assert!(out.contains("name: non-numeric"));
    }

    #[tokio::test]
    async fn unknown_column_is_typed() {
        let tool = TabularTool;
        let a = salary_artifact();
        let err = tool
            .execute("average of column bonus", Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownColumn(name) if name == "bonus"));
    }

    #[tokio::test]
    async fn unrecognized_statistic_is_typed() {
        let tool = TabularTool;
        let a = salary_artifact();
        let err = tool
            .execute("median of column salary", Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedAggregate(_)));
    }

    #[tokio::test]
    async fn no_table_bound_is_typed() {
        let tool = TabularTool;
        let err = tool.execute("average of salary", None).await.unwrap_err();
        assert!(matches!(err, ToolError::NoArtifactBound));
    }

    #[tokio::test]
    async fn aggregate_over_text_column_is_rejected() {
        let tool = TabularTool;
        let a = salary_artifact();
        let err = tool
            .execute("average of column name", Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedAggregate(_)));
    }
}
