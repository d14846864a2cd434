//! 图片文字提取工具
//!
//! 字节在执行时才从存储读出（上传与执行之间文件可能被清扫，读不到按
//! 未绑定文件处理），然后原样交给视觉客户端。

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::ToolError;
use crate::llm::VisionClient;
use crate::storage::ArtifactStorage;
use crate::tools::Tool;

/// 图片文字提取工具
pub struct ImageTextTool {
    vision: Arc<dyn VisionClient>,
    storage: Arc<dyn ArtifactStorage>,
}

impl ImageTextTool {
    pub fn new(vision: Arc<dyn VisionClient>, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self { vision, storage }
    }
}

#[async_trait]
impl Tool for ImageTextTool {
    fn name(&self) -> &str {
        "extract_text"
    }

    fn description(&self) -> &str {
        "Extract all text from the loaded image"
    }

    fn can_handle(&self, _query: &str, artifact: Option<&Artifact>) -> bool {
        artifact.map(|a| a.is_image()).unwrap_or(false)
    }

    async fn execute(
        &self,
        _query: &str,
        artifact: Option<&Artifact>,
    ) -> Result<String, ToolError> {
        let (path, mime) = match artifact {
            Some(a) => match &a.kind {
                ArtifactKind::Image { mime } => (a.path.as_str(), mime.as_str()),
                _ => return Err(ToolError::NoArtifactBound),
            },
            None => return Err(ToolError::NoArtifactBound),
        };

        let bytes = self.storage.read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                // 文件刚被清扫走
                ToolError::NoArtifactBound
            } else {
                ToolError::VisionCallFailed(format!("could not read stored image: {}", e))
            }
        })?;

        self.vision.extract_text(&bytes, mime).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockVisionClient;
    use crate::storage::MemoryStorage;
    use std::time::Instant;

    fn image_artifact(path: &str) -> Artifact {
        Artifact {
            kind: ArtifactKind::Image {
                mime: "image/png".to_string(),
            },
            path: path.to_string(),
            loaded_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn extracts_text_from_stored_image() {
        let storage = Arc::new(MemoryStorage::new());
        let key = storage.store("x.png", &[1, 2, 3]).unwrap();
        let tool = ImageTextTool::new(
            Arc::new(MockVisionClient::with_text("RECEIPT TOTAL 42")),
            storage,
        );

        let out = tool
            .execute("extract the text", Some(&image_artifact(&key)))
            .await
            .unwrap();
        assert_eq!(out, "RECEIPT TOTAL 42");
    }

    #[tokio::test]
    async fn vanished_file_reads_as_unbound() {
        let storage = Arc::new(MemoryStorage::new());
        let tool = ImageTextTool::new(Arc::new(MockVisionClient::default()), storage);

        let err = tool
            .execute("extract the text", Some(&image_artifact("gone.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NoArtifactBound));
    }

    #[tokio::test]
    async fn no_image_bound_is_typed() {
        let storage = Arc::new(MemoryStorage::new());
        let tool = ImageTextTool::new(Arc::new(MockVisionClient::default()), storage);

        let err = tool.execute("extract the text", None).await.unwrap_err();
        assert!(matches!(err, ToolError::NoArtifactBound));
    }

    #[tokio::test]
    async fn upstream_failure_is_typed() {
        let storage = Arc::new(MemoryStorage::new());
        let key = storage.store("x.png", &[1]).unwrap();
        let tool = ImageTextTool::new(Arc::new(MockVisionClient::failing()), storage);

        let err = tool
            .execute("extract the text", Some(&image_artifact(&key)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::VisionCallFailed(_)));
    }
}
