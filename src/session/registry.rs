//! 会话注册表
//!
//! 全部会话挂在一把 RwLock<HashMap> 下，每个操作内部持锁完成（对同一会话的
//! 单次变更是原子的），锁从不跨外部模型调用持有。绑定/清除操作返回被替换
//! 文件的存储 key，由调用方决定何时删除底层文件。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::{Session, SessionId, Turn};
use crate::artifact::Artifact;

/// sweep 的结果：驱逐数量（可观测性）+ 待删除的文件 key（清扫器负责删）
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub evicted: usize,
    pub orphaned_files: Vec<String>,
}

/// 会话注册表
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 确保会话存在（不存在则建空会话），刷新活跃时间。从不失败。
    pub async fn get_or_create(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()))
            .touch();
    }

    /// 对指定会话执行一次原子变更；会话不存在时先创建
    async fn with_session<F, R>(&self, session_id: &str, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        session.touch();
        f(session)
    }

    /// 绑定新文件，返回被替换文件的存储 key（若有），其底层内容由调用方释放
    pub async fn bind_artifact(&self, session_id: &str, artifact: Artifact) -> Option<String> {
        self.with_session(session_id, |s| {
            s.artifact
                .replace(Arc::new(artifact))
                .map(|old| old.path.clone())
        })
        .await
    }

    /// 追加一轮问答
    pub async fn append_turn(&self, session_id: &str, query: &str, response: &str, is_error: bool) {
        self.with_session(session_id, |s| {
            s.history.push(Turn {
                query: query.to_string(),
                response: response.to_string(),
                is_error,
            });
        })
        .await
    }

    /// 仅解绑文件，历史不动；返回被解绑文件的存储 key
    pub async fn clear_artifact(&self, session_id: &str) -> Option<String> {
        self.with_session(session_id, |s| s.artifact.take().map(|a| a.path.clone()))
            .await
    }

    /// 清空整个会话（历史 + 文件）；会话 ID 之后仍可复用。
    /// 返回被解绑文件的存储 key。
    pub async fn clear_session(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(session_id)
            .and_then(|s| s.artifact.map(|a| a.path.clone()))
    }

    /// 当前绑定文件的快照（Arc 克隆，锁外使用）
    pub async fn artifact(&self, session_id: &str) -> Option<Arc<Artifact>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).and_then(|s| s.artifact.clone())
    }

    /// 当前绑定文件的存储 key
    pub async fn artifact_path(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .and_then(|s| s.artifact.as_ref().map(|a| a.path.clone()))
    }

    /// 历史快照
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// 活跃会话数
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 清理过期会话：last_active 早于 ttl 的一并移除。
    /// 幂等：已驱逐的会话再次 sweep 不计数。
    pub async fn sweep(&self, now: Instant, ttl: Duration) -> SweepOutcome {
        let mut sessions = self.sessions.write().await;

        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(now, ttl))
            .map(|(id, _)| id.clone())
            .collect();

        let mut outcome = SweepOutcome::default();
        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                outcome.evicted += 1;
                if let Some(artifact) = session.artifact {
                    outcome.orphaned_files.push(artifact.path.clone());
                }
            }
        }
        outcome
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
