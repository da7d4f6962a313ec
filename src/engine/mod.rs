mod adjacency;
mod allocator;
mod campus;
mod conflict;
mod error;
mod ledger;
mod log;
mod mutations;
mod queries;
mod store;
mod validate;

pub use adjacency::{AdjacencyEdge, AdjacencyGraph, EdgeKind, capacity_similar};
pub use allocator::{Allocation, BookingIds, allocate, candidates, select_room};
pub use campus::Campus;
pub use conflict::{Conflict, detect_conflicts};
pub use error::{AllocationError, EngineError, ValidationError};
pub use ledger::BookingLedger;
pub use log::LogQueue;
pub use store::RoomStore;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};

use crate::journal::Journal;
use crate::model::*;
use crate::source::DataSource;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Vec<Event>, oneshot::Sender<io::Result<()>>);

/// Background task that owns the journal and batches appends for group commit.
/// Waits for one Append, drains whatever else is already queued, then does a
/// single fsync for the batch and answers every sender with the same result.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { events, response } => {
                let mut batch: Vec<PendingAppend> = vec![(events, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { events, response }) => {
                            batch.push((events, response));
                        }
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE)
                    .record(batch.len() as f64);
                let flush_start = std::time::Instant::now();
                let result = flush_batch(&mut journal, &batch);
                metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                respond_batch(batch, &result);

                if let Some(other) = deferred {
                    handle_non_append(&mut journal, other);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

fn flush_batch(journal: &mut Journal, batch: &[PendingAppend]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    'outer: for (events, _) in batch {
        for event in events {
            if let Err(e) = journal.append_buffered(event) {
                append_err = Some(e);
                break 'outer;
            }
        }
    }
    // Flush even after an append error so half-written bytes do not leak
    // into the next batch.
    let flush_err = journal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn respond_batch(batch: Vec<PendingAppend>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { events, response } => {
            let _ = response.send(journal.compact(&events));
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// One tenant's campus: the in-memory state, the local journal it is
/// mirrored to, and the optional remote data source.
pub struct Engine {
    pub(super) campus: RwLock<Campus>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    pub(super) source: Option<Arc<dyn DataSource>>,
}

impl Engine {
    /// Replay the journal and start its writer task. Must run inside a tokio
    /// runtime. Call [`Engine::bootstrap`] afterwards to sync with the data
    /// source and seed an empty campus.
    pub fn new(journal_path: PathBuf, source: Option<Arc<dyn DataSource>>) -> io::Result<Self> {
        let (journal, events) = Journal::recover(&journal_path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let campus = Campus::replay(&events);
        tracing::debug!(
            "replayed {} events from {}: {} rooms, {} bookings",
            events.len(),
            journal_path.display(),
            campus.rooms().len(),
            campus.ledger().len()
        );

        Ok(Self {
            campus: RwLock::new(campus),
            journal_tx,
            source,
        })
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Write events to the journal via the group-commit writer.
    async fn journal_append(&self, events: Vec<Event>) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    /// Journal, then apply. Nothing is applied if the journal write fails.
    pub(super) async fn commit(
        &self,
        campus: &mut Campus,
        events: Vec<Event>,
    ) -> Result<(), EngineError> {
        if events.is_empty() {
            return Ok(());
        }
        self.journal_append(events.clone()).await?;
        for event in &events {
            campus.apply(event);
        }
        Ok(())
    }
}

/// Build a log event and mirror it to the process log.
pub(super) fn log_event(kind: LogKind, message: impl Into<String>, now: Ms) -> Event {
    let message = message.into();
    match kind {
        LogKind::Warning | LogKind::Error => tracing::warn!(kind = kind.as_str(), "{message}"),
        _ => tracing::info!(kind = kind.as_str(), "{message}"),
    }
    Event::LogRecorded {
        entry: LogEntry {
            kind,
            message,
            timestamp: now,
        },
    }
}
