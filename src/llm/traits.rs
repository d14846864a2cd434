//! 模型客户端抽象
//!
//! 文本补全与图片文字提取各一个 trait，后端（OpenAI 兼容 / Mock）分别实现。
//! 路由核心只依赖这两个接口，模型调用对它而言是不透明能力。

use async_trait::async_trait;

use crate::error::ToolError;
use crate::llm::Message;

/// 文本补全客户端（分类兜底用）
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}

/// 视觉客户端：从图片字节中提取文字
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// 返回提取出的原文；凭证缺失 -> MissingCredential，其余失败 -> VisionCallFailed
    async fn extract_text(&self, image: &[u8], mime: &str) -> Result<String, ToolError>;
}
