//! 过期清扫
//!
//! 后台定时任务：按 TTL 驱逐不活跃会话，并删除被驱逐文件的底层内容。
//! 单个文件删除失败不影响其余驱逐；对已驱逐会话重复清扫是空操作。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::SessionRegistry;
use crate::storage::ArtifactStorage;

/// 执行一轮清扫，返回驱逐的会话数
pub async fn sweep_once(
    registry: &SessionRegistry,
    storage: &dyn ArtifactStorage,
    ttl: Duration,
) -> usize {
    let outcome = registry.sweep(Instant::now(), ttl).await;
    for key in &outcome.orphaned_files {
        // 尽力而为：一个删不掉不挡后面的
        if let Err(e) = storage.delete(key) {
            tracing::warn!(key = %key, error = %e, "failed to delete evicted upload");
        }
    }
    if outcome.evicted > 0 {
        let active = registry.active_count().await;
        tracing::info!(
            evicted = outcome.evicted,
            active = active,
            "session sweep"
        );
    }
    outcome.evicted
}

/// 启动后台清扫循环；cancel 触发后退出
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    storage: Arc<dyn ArtifactStorage>,
    interval: Duration,
    ttl: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // 跳过启动后立即执行
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    sweep_once(registry.as_ref(), storage.as_ref(), ttl).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactKind, Table};
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn sweep_deletes_evicted_files_and_is_idempotent() {
        let registry = SessionRegistry::new();
        let storage = MemoryStorage::new();

        let key = storage.store("t.csv", b"a\n1\n").unwrap();
        registry
            .bind_artifact(
                "s1",
                Artifact {
                    kind: ArtifactKind::Table(Table::parse_csv("a\n1\n").unwrap()),
                    path: key,
                    loaded_at: Instant::now(),
                },
            )
            .await;

        // TTL 为零：所有会话立即过期
        assert_eq!(sweep_once(&registry, &storage, Duration::ZERO).await, 1);
        assert!(storage.is_empty());
        assert_eq!(registry.active_count().await, 0);

        assert_eq!(sweep_once(&registry, &storage, Duration::ZERO).await, 0);
    }

    #[tokio::test]
    async fn fresh_sessions_survive() {
        let registry = SessionRegistry::new();
        let storage = MemoryStorage::new();
        registry.get_or_create("s1").await;

        let evicted = sweep_once(&registry, &storage, Duration::from_secs(3600)).await;
        assert_eq!(evicted, 0);
        assert_eq!(registry.active_count().await, 1);
    }
}
