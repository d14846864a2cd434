//! 会话管理
//!
//! 每个调用方（cookie 维度）一个会话：对话历史 + 当前绑定文件 + 活跃时间。
//! 所有状态只经 SessionRegistry 读写。

pub mod registry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::artifact::Artifact;

pub use registry::{SessionRegistry, SweepOutcome};

/// 会话 ID（调用方提供的不透明字符串）
pub type SessionId = String;

/// 一轮问答记录
#[derive(Debug, Clone)]
pub struct Turn {
    pub query: String,
    pub response: String,
    /// 该轮是否以错误结束（前端渲染用，无需再从文本推断）
    pub is_error: bool,
}

/// 单个会话
pub struct Session {
    pub id: SessionId,
    /// 历史只追加，仅 clear_session 清空
    pub history: Vec<Turn>,
    /// 至多一个绑定文件；重新上传即替换
    pub artifact: Option<Arc<Artifact>>,
    pub created_at: Instant,
    pub last_active: Instant,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            history: Vec::new(),
            artifact: None,
            created_at: now,
            last_active: now,
        }
    }

    /// 刷新活跃时间
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// 会话是否过期（按最后活跃时间算）
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > ttl
    }
}
