//! 查询分类
//!
//! 先走确定性规则（算术模式优先，其次按绑定文件类型），规则判不出且配置了
//! LLM 兜底时再问模型。无论哪条路径，结果都落在固定的 ToolChoice 集合内，
//! 不存在开放字符串工具名。

use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactKind};
use crate::llm::{LlmClient, Message};
use crate::tools::arithmetic;

/// 路由目标：三个工具 + 显式的「无能力可用」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Arithmetic,
    Tabular,
    Image,
    None,
}

/// 查询分类器
pub struct QueryClassifier {
    /// 规则判不出时的 LLM 兜底；None 则纯规则
    llm: Option<Arc<dyn LlmClient>>,
}

impl QueryClassifier {
    /// 纯规则分类（默认）
    pub fn rule_based() -> Self {
        Self { llm: None }
    }

    /// 带 LLM 兜底的分类；模型输出仍被映射回固定集合
    pub fn with_llm_fallback(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// 分类一条查询。优先级固定：
    /// 1. 算术模式（两个数值操作数 + 运算关键词），无视绑定文件
    /// 2. 绑定了表格 -> Tabular
    /// 3. 绑定了图片 -> Image
    /// 4. LLM 兜底（若启用），否则 None
    pub async fn classify(&self, query: &str, artifact: Option<&Artifact>) -> ToolChoice {
        if let Some(choice) = Self::fast_match(query, artifact) {
            return choice;
        }

        if let Some(llm) = &self.llm {
            match Self::llm_classify(llm.as_ref(), query).await {
                Ok(choice) => return choice,
                Err(e) => {
                    tracing::warn!(error = %e, "llm classification failed, falling back to None");
                }
            }
        }

        ToolChoice::None
    }

    /// 快速规则匹配（不调用 LLM）
    fn fast_match(query: &str, artifact: Option<&Artifact>) -> Option<ToolChoice> {
        if arithmetic::parse_expression(query).is_some() {
            return Some(ToolChoice::Arithmetic);
        }
        match artifact.map(|a| &a.kind) {
            Some(ArtifactKind::Table(_)) => Some(ToolChoice::Tabular),
            Some(ArtifactKind::Image { .. }) => Some(ToolChoice::Image),
            None => None,
        }
    }

    /// 使用 LLM 分类；输出必须是集合内的标识符，未知值一律归 None
    async fn llm_classify(llm: &dyn LlmClient, query: &str) -> Result<ToolChoice, String> {
        let system_prompt = r#"You are a query classifier. Classify the user's query.

Output ONLY one of these identifiers (no explanation):
- arithmetic: a calculation over two numbers
- tabular: a question about an uploaded CSV table
- image: a request to read text from an uploaded image
- none: nothing above applies

Output format: just the identifier, nothing else."#;

        let messages = vec![
            Message::system(system_prompt),
            Message::user(format!("Query: {}", query)),
        ];

        let response = llm.complete(&messages).await?;

        Ok(match response.trim().to_lowercase().as_str() {
            "arithmetic" => ToolChoice::Arithmetic,
            "tabular" => ToolChoice::Tabular,
            "image" => ToolChoice::Image,
            _ => ToolChoice::None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Table;
    use crate::llm::MockLlmClient;
    use std::time::Instant;

    fn table_artifact() -> Artifact {
        Artifact {
            kind: ArtifactKind::Table(Table::parse_csv("salary\n50000\n").unwrap()),
            path: "t.csv".to_string(),
            loaded_at: Instant::now(),
        }
    }

    fn image_artifact() -> Artifact {
        Artifact {
            kind: ArtifactKind::Image {
                mime: "image/png".to_string(),
            },
            path: "i.png".to_string(),
            loaded_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn arithmetic_wins_over_bound_table() {
        let c = QueryClassifier::rule_based();
        let a = table_artifact();
        assert_eq!(
            c.classify("divide 6 by 2", Some(&a)).await,
            ToolChoice::Arithmetic
        );
    }

    #[tokio::test]
    async fn artifact_kind_drives_routing() {
        let c = QueryClassifier::rule_based();
        assert_eq!(
            c.classify("average of salary", Some(&table_artifact())).await,
            ToolChoice::Tabular
        );
        assert_eq!(
            c.classify("what does it say", Some(&image_artifact())).await,
            ToolChoice::Image
        );
        assert_eq!(c.classify("average of salary", None).await, ToolChoice::None);
    }

    #[tokio::test]
    async fn llm_fallback_maps_onto_closed_set() {
        let c = QueryClassifier::with_llm_fallback(Arc::new(MockLlmClient::with_reply(
            "arithmetic",
        )));
        assert_eq!(
            c.classify("six halved, please", None).await,
            ToolChoice::Arithmetic
        );

        // 集合外的输出一律归 None
        let c = QueryClassifier::with_llm_fallback(Arc::new(MockLlmClient::with_reply(
            "make_me_a_sandwich",
        )));
        assert_eq!(c.classify("anything", None).await, ToolChoice::None);
    }
}
