//! CSV 表格解析
//!
//! 上传时一次性解析为列名 + 行的矩形表，带引号字段按 RFC 4180 处理。
//! 空表、无列、行宽不齐都在上传阶段拒绝，后续聚合不再做结构校验。

use crate::error::IngestError;

/// 矩形表：列名 + 字符串标量行
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// 解析 CSV 文本。首行为列名；空文件、无列、行宽不一致返回 InvalidCsv。
    pub fn parse_csv(text: &str) -> Result<Self, IngestError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines
            .next()
            .ok_or_else(|| IngestError::InvalidCsv("empty file".to_string()))?;
        let headers = split_fields(header_line);
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::InvalidCsv("no columns".to_string()));
        }

        let mut rows = Vec::new();
        for (i, line) in lines.enumerate() {
            let fields = split_fields(line);
            if fields.len() != headers.len() {
                return Err(IngestError::InvalidCsv(format!(
                    "row {} has {} fields, expected {}",
                    i + 2,
                    fields.len(),
                    headers.len()
                )));
            }
            rows.push(fields);
        }
        if rows.is_empty() {
            return Err(IngestError::InvalidCsv("no data rows".to_string()));
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// 按列名找列下标（忽略大小写）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// 取某列中能解析为数值的值
    pub fn numeric_values(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row[column].trim().parse::<f64>().ok())
            .collect()
    }
}

/// 拆一行 CSV 字段：支持双引号包裹（内含逗号）与 "" 转义
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_csv() {
        let t = Table::parse_csv("name,salary\nalice,50000\nbob,60000\n").unwrap();
        assert_eq!(t.headers(), &["name", "salary"]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column_index("Salary"), Some(1));
        assert_eq!(t.numeric_values(1), vec![50000.0, 60000.0]);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let t = Table::parse_csv("city,note\n\"Springfield, IL\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.numeric_values(0), Vec::<f64>::new());
    }

    #[test]
    fn rejects_empty_and_ragged() {
        assert!(matches!(
            Table::parse_csv(""),
            Err(IngestError::InvalidCsv(_))
        ));
        assert!(matches!(
            Table::parse_csv("a,b\n"),
            Err(IngestError::InvalidCsv(_))
        ));
        assert!(matches!(
            Table::parse_csv("a,b\n1,2,3\n"),
            Err(IngestError::InvalidCsv(_))
        ));
    }
}
