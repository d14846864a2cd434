//! 查询路由器
//!
//! 一次请求的生命周期：RECEIVED -> ROUTED -> EXECUTED -> RECORDED -> RESPONDED。
//! 上传先于分类绑定（新文件对本轮可见）；工具失败一律转成带 "Error: " 前缀的
//! 回复文本并照常记一轮历史，不向传输层抛错。clear-csv / clear-session 走
//! RESET 短路径，不经过工具路由。

pub mod classify;

use std::sync::Arc;

use crate::artifact::{self, Upload};
use crate::error::ToolError;
use crate::llm::VisionClient;
use crate::session::{SessionRegistry, Turn};
use crate::storage::ArtifactStorage;
use crate::tools::{ArithmeticTool, ImageTextTool, TabularTool, Tool};

pub use classify::{QueryClassifier, ToolChoice};

/// 一次查询的结果：回复文本 + 错误标记 + 会话当前文件的存储 key
#[derive(Debug)]
pub struct RouterReply {
    pub response: String,
    pub is_error: bool,
    pub artifact_path: Option<String>,
}

/// 查询路由器
pub struct QueryRouter {
    registry: Arc<SessionRegistry>,
    storage: Arc<dyn ArtifactStorage>,
    classifier: QueryClassifier,
    arithmetic: ArithmeticTool,
    tabular: TabularTool,
    image: ImageTextTool,
    max_upload_bytes: usize,
}

impl QueryRouter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        storage: Arc<dyn ArtifactStorage>,
        vision: Arc<dyn VisionClient>,
        classifier: QueryClassifier,
        max_upload_bytes: usize,
    ) -> Self {
        let image = ImageTextTool::new(vision, storage.clone());
        Self {
            registry,
            storage,
            classifier,
            arithmetic: ArithmeticTool,
            tabular: TabularTool,
            image,
            max_upload_bytes,
        }
    }

    /// 处理一条查询（可携带新上传）。总是返回回复并恰好追加一轮历史。
    pub async fn handle_query(
        &self,
        session_id: &str,
        query: &str,
        upload: Option<Upload>,
    ) -> RouterReply {
        self.registry.get_or_create(session_id).await;

        // 上传先于路由：新绑定的文件要对本轮分类可见
        if let Some(up) = upload {
            match artifact::ingest(&up, self.storage.as_ref(), self.max_upload_bytes) {
                Ok(a) => {
                    tracing::info!(session_id, key = %a.path, "artifact bound");
                    if let Some(old) = self.registry.bind_artifact(session_id, a).await {
                        // 被替换文件的释放尽力而为
                        if let Err(e) = self.storage.delete(&old) {
                            tracing::warn!(session_id, key = %old, error = %e, "failed to delete replaced upload");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id, file = %up.filename, error = %e, "upload rejected");
                    return self.record(session_id, query, format!("Error: {}", e), true).await;
                }
            }
        }

        // 绑定状态做快照后立即放锁；外部模型调用不持注册表锁
        let artifact = self.registry.artifact(session_id).await;
        let choice = self.classifier.classify(query, artifact.as_deref()).await;
        tracing::info!(session_id, tool = ?choice, "query routed");

        let result = match choice {
            ToolChoice::Arithmetic => self.arithmetic.execute(query, artifact.as_deref()).await,
            ToolChoice::Tabular => self.tabular.execute(query, artifact.as_deref()).await,
            ToolChoice::Image => self.image.execute(query, artifact.as_deref()).await,
            ToolChoice::None => Err(ToolError::NoCapabilityAvailable),
        };

        let (response, is_error) = match result {
            Ok(text) => (text, false),
            Err(e) => (self.render_error(session_id, query, choice, &e), true),
        };

        self.record(session_id, query, response, is_error).await
    }

    /// 记录一轮并组装回复
    async fn record(
        &self,
        session_id: &str,
        query: &str,
        response: String,
        is_error: bool,
    ) -> RouterReply {
        self.registry
            .append_turn(session_id, query, &response, is_error)
            .await;
        RouterReply {
            response,
            is_error,
            artifact_path: self.registry.artifact_path(session_id).await,
        }
    }

    /// 工具失败转回复文本。基础设施错误细节只进日志，对外统一提示；
    /// 解析类错误用户可自行修正，原样展示。
    fn render_error(
        &self,
        session_id: &str,
        query: &str,
        choice: ToolChoice,
        err: &ToolError,
    ) -> String {
        if err.is_infrastructure() {
            tracing::error!(session_id, tool = ?choice, query, error = %err, "tool infrastructure failure");
            "Error: the vision service is currently unavailable".to_string()
        } else {
            format!("Error: {}", err)
        }
    }

    /// RESET 路径：解绑文件并删除底层内容，历史不动
    pub async fn clear_artifact(&self, session_id: &str) {
        if let Some(key) = self.registry.clear_artifact(session_id).await {
            if let Err(e) = self.storage.delete(&key) {
                tracing::warn!(session_id, key = %key, error = %e, "failed to delete cleared upload");
            }
            tracing::info!(session_id, key = %key, "artifact cleared");
        }
    }

    /// RESET 路径：清空整个会话（历史 + 文件），会话 ID 之后仍可复用
    pub async fn clear_session(&self, session_id: &str) {
        if let Some(key) = self.registry.clear_session(session_id).await {
            if let Err(e) = self.storage.delete(&key) {
                tracing::warn!(session_id, key = %key, error = %e, "failed to delete cleared upload");
            }
        }
        tracing::info!(session_id, "session cleared");
    }

    /// 会话历史快照（前端渲染用）
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.registry.history(session_id).await
    }
}
