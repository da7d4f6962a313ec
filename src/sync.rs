use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::model::LogEntry;

/// What one sync pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub logs_pushed: bool,
    pub compacted: bool,
}

/// Per-tenant background task: mirrors the activity log to the data source
/// and compacts the journal once it has grown past `compact_threshold` appends.
pub async fn run_sync(engine: Arc<Engine>, interval: Duration, compact_threshold: u64) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_pushed = None;
    loop {
        ticker.tick().await;
        sync_once(&engine, compact_threshold, &mut last_pushed).await;
    }
}

/// `last_pushed` is the newest entry already sent; the log is only pushed
/// when that changes.
pub async fn sync_once(
    engine: &Engine,
    compact_threshold: u64,
    last_pushed: &mut Option<LogEntry>,
) -> SyncReport {
    let mut report = SyncReport::default();

    if engine.has_source() {
        let newest = engine.logs(None).await.into_iter().next();
        if newest != *last_pushed {
            match engine.push_logs().await {
                Ok(()) => {
                    *last_pushed = newest;
                    report.logs_pushed = true;
                }
                Err(e) => {
                    metrics::counter!(crate::observability::DATA_SOURCE_ERRORS_TOTAL, "operation" => "persist_logs")
                        .increment(1);
                    debug!("log push skipped: {e}");
                }
            }
        }
    }

    let appends = engine.appends_since_compact().await;
    if appends >= compact_threshold {
        match engine.compact().await {
            Ok(()) => {
                info!("compacted journal after {appends} appends");
                metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL, "status" => "ok")
                    .increment(1);
                report.compacted = true;
            }
            Err(e) => {
                warn!("journal compaction failed: {e}");
                metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL, "status" => "error")
                    .increment(1);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use std::path::PathBuf;

    fn test_journal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("classalloc_test_sync");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn compacts_past_threshold() {
        let path = test_journal_path("compact_threshold.journal");
        let engine = Engine::new(path.clone(), None).unwrap();
        engine.bootstrap().await.unwrap();
        let mut last = None;

        let report = sync_once(&engine, 1_000_000, &mut last).await;
        assert!(!report.compacted);

        let before = engine.appends_since_compact().await;
        assert!(before > 0);
        let report = sync_once(&engine, before, &mut last).await;
        assert!(report.compacted);
        assert!(!report.logs_pushed, "no data source configured");
        assert_eq!(engine.appends_since_compact().await, 0);

        // The compacted journal still restores the campus.
        let rooms = engine.rooms(None).await.len();
        drop(engine);
        let reopened = Engine::new(path, None).unwrap();
        assert_eq!(reopened.rooms(None).await.len(), rooms);
        assert_eq!(reopened.logs(None).await.len(), 8);
    }
}
