//! Retention sweep for terminal task records.

use super::TubeDownloader;
use crate::types::Event;
use tokio::time::MissedTickBehavior;

impl TubeDownloader {
    /// Spawn the periodic cleanup sweep
    ///
    /// Wakes on the configured interval, evicts terminal tasks older than
    /// the retention window, and exits on the shutdown signal. Missed ticks
    /// are skipped rather than bursted.
    pub(crate) fn start_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let retention = engine.config.retention.retention();
            let mut interval = tokio::time::interval(engine.config.retention.cleanup_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(
                retention_secs = retention.as_secs(),
                interval_secs = interval.period().as_secs(),
                "cleanup sweep started"
            );

            loop {
                tokio::select! {
                    _ = engine.shutdown_token.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = engine.store.evict_terminal_older_than(retention).await;
                        if !evicted.is_empty() {
                            tracing::info!(count = evicted.len(), "evicted expired tasks");
                        }
                        for id in evicted {
                            tracing::debug!(task_id = %id, "task evicted");
                            engine.emit_event(Event::TaskEvicted { id });
                        }
                    }
                }
            }
            tracing::debug!("cleanup sweep stopped");
        })
    }
}
