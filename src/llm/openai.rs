//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! 同一个客户端承担文本补全与视觉提取：图片编码成 base64 data URL 作为
//! 多模态消息的 image_url 部分发送。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::prelude::*;

use crate::error::ToolError;
use crate::llm::{LlmClient, Message, VisionClient};

/// 提示词固定：只要图中原文，不要解释
const EXTRACT_PROMPT: &str =
    "Extract all the text from this image. Return only the extracted text, no explanations.";

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 构造时没有拿到 API Key：调用前直接报 MissingCredential，不发请求
    credential_missing: bool,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        let credential_missing = api_key.is_none();

        let mut config = OpenAIConfig::new()
            .with_api_key(api_key.unwrap_or_else(|| "sk-placeholder".to_string()));
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            credential_missing,
        }
    }

    fn to_openai_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                crate::llm::Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                crate::llm::Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                crate::llm::Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if self.credential_missing {
            return Err("OPENAI_API_KEY is not set".to_string());
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages))
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

#[async_trait]
impl VisionClient for OpenAiClient {
    async fn extract_text(&self, image: &[u8], mime: &str) -> Result<String, ToolError> {
        if self.credential_missing {
            return Err(ToolError::MissingCredential(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }

        let data_url = format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(image));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(vec![
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(EXTRACT_PROMPT)
                        .build()
                        .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?
                        .into(),
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(
                            ImageUrlArgs::default()
                                .url(data_url)
                                .build()
                                .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?,
                        )
                        .build()
                        .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?
                        .into(),
                ])
                .build()
                .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?
                .into()])
            .build()
            .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ToolError::VisionCallFailed(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}
