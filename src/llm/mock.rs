//! Mock 客户端（用于测试，无需 API）

use async_trait::async_trait;

use crate::error::ToolError;
use crate::llm::{LlmClient, Message, VisionClient};

/// Mock 补全客户端：固定返回预设回复
#[derive(Debug)]
pub struct MockLlmClient {
    reply: String,
}

impl MockLlmClient {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::with_reply("none")
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        Ok(self.reply.clone())
    }
}

/// Mock 视觉客户端：固定返回预设文本
#[derive(Debug)]
pub struct MockVisionClient {
    text: String,
}

impl MockVisionClient {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// 模拟上游故障的客户端
    pub fn failing() -> FailingVisionClient {
        FailingVisionClient
    }
}

impl Default for MockVisionClient {
    fn default() -> Self {
        Self::with_text("extracted text")
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn extract_text(&self, _image: &[u8], _mime: &str) -> Result<String, ToolError> {
        Ok(self.text.clone())
    }
}

/// 总是失败的视觉客户端（测试基础设施错误路径）
#[derive(Debug)]
pub struct FailingVisionClient;

#[async_trait]
impl VisionClient for FailingVisionClient {
    async fn extract_text(&self, _image: &[u8], _mime: &str) -> Result<String, ToolError> {
        Err(ToolError::VisionCallFailed("upstream unreachable".to_string()))
    }
}
