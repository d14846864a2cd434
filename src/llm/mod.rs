//! 模型客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use message::{Message, Role};
pub use mock::{MockLlmClient, MockVisionClient};
pub use openai::OpenAiClient;
pub use traits::{LlmClient, VisionClient};
