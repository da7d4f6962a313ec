use tokio::sync::oneshot;

use crate::model::*;
use crate::seed::sample_rooms;
use crate::source::{DataSource, SourceError};

use super::validate::{now_ms, validate_room};
use super::{Engine, EngineError, JournalCommand, log_event};

pub(super) fn seed_events(now: Ms) -> Vec<Event> {
    let mut events = Vec::new();
    for room in sample_rooms() {
        let message = format!("Added room {} to system", room.key());
        events.push(Event::RoomAdded { room });
        events.push(log_event(LogKind::Info, message, now));
    }
    events.push(log_event(LogKind::Info, "System initialized with sample data", now));
    events
}

async fn fetch_remote(
    source: &dyn DataSource,
) -> Result<(Vec<Room>, Vec<BookingRecord>), SourceError> {
    let rooms = source.fetch_rooms().await?;
    let bookings = source.fetch_bookings().await?;
    Ok((rooms, bookings))
}

impl Engine {
    /// Pull rooms and bookings from the data source, then seed the sample
    /// campus if there are still no rooms. An unreachable source is logged
    /// and the journal contents are kept.
    pub async fn bootstrap(&self) -> Result<(), EngineError> {
        if let Some(source) = &self.source {
            let fetched = fetch_remote(source.as_ref()).await;
            let now = now_ms();
            let mut campus = self.campus.write().await;
            let events = match fetched {
                Ok((mut rooms, bookings)) => {
                    rooms.retain(|room| match validate_room(room) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("ignoring remote room {}: {e}", room.key());
                            false
                        }
                    });
                    let message = format!(
                        "Loaded {} rooms and {} bookings from data source",
                        rooms.len(),
                        bookings.len()
                    );
                    vec![
                        Event::Loaded { rooms, bookings },
                        log_event(LogKind::Info, message, now),
                    ]
                }
                Err(e) => {
                    metrics::counter!(crate::observability::DATA_SOURCE_ERRORS_TOTAL, "operation" => "fetch")
                        .increment(1);
                    vec![log_event(LogKind::Warning, format!("{e}; using local cache"), now)]
                }
            };
            self.commit(&mut campus, events).await?;
        }

        let mut campus = self.campus.write().await;
        if campus.rooms().is_empty() {
            self.commit(&mut campus, seed_events(now_ms())).await?;
        }
        Ok(())
    }

    pub async fn add_room(&self, room: Room) -> Result<(), EngineError> {
        let rooms = {
            let mut campus = self.campus.write().await;
            campus.check_add_room(&room)?;
            let message = format!("Added room {} to system", room.key());
            let events = vec![
                Event::RoomAdded { room },
                log_event(LogKind::Info, message, now_ms()),
            ];
            self.commit(&mut campus, events).await?;
            campus.rooms().as_slice().to_vec()
        };
        self.push_rooms(&rooms).await;
        Ok(())
    }

    /// Remove a room that has no bookings.
    pub async fn remove_room(&self, key: &RoomKey) -> Result<(), EngineError> {
        let rooms = {
            let mut campus = self.campus.write().await;
            campus.check_remove_room(key)?;
            let events = vec![
                Event::RoomRemoved { key: key.clone() },
                log_event(LogKind::Info, format!("Removed room {key} from system"), now_ms()),
            ];
            self.commit(&mut campus, events).await?;
            campus.rooms().as_slice().to_vec()
        };
        self.push_rooms(&rooms).await;
        Ok(())
    }

    /// Validate, run the allocator and, on success, append the booking.
    /// Every attempt leaves an entry in the activity log.
    pub async fn allocate(&self, request: BookingRequest) -> Result<BookingRecord, EngineError> {
        let now = now_ms();
        let course = request.course_name.clone();
        let mut campus = self.campus.write().await;
        let mut events = vec![log_event(
            LogKind::Info,
            format!("Processing allocation for {course}"),
            now,
        )];

        let record = match campus.plan_booking(request, now) {
            Ok(record) => record,
            Err(e) => {
                let message = match &e {
                    EngineError::NoCandidate => format!("No suitable rooms for {course}"),
                    other => format!("Rejected allocation for {course}: {other}"),
                };
                events.push(log_event(LogKind::Error, message, now));
                if let Err(journal_err) = self.commit(&mut campus, events).await {
                    tracing::error!("failed to journal allocation failure: {journal_err}");
                }
                metrics::counter!(crate::observability::ALLOCATIONS_TOTAL, "outcome" => "rejected")
                    .increment(1);
                return Err(e);
            }
        };

        events.push(Event::BookingRecorded {
            record: record.clone(),
        });
        events.push(log_event(
            LogKind::Success,
            format!("Allocated {} for {course} (ID: {})", record.room, record.id),
            now,
        ));
        self.commit(&mut campus, events).await?;
        metrics::counter!(crate::observability::ALLOCATIONS_TOTAL, "outcome" => "allocated")
            .increment(1);

        let bookings = self
            .source
            .is_some()
            .then(|| campus.ledger().as_slice().to_vec());
        drop(campus);

        if let Some(bookings) = bookings {
            self.push_bookings(&bookings).await;
        }
        Ok(record)
    }

    /// Drop every room, booking and log entry and load the sample campus.
    pub async fn reset_to_sample_data(&self) -> Result<(), EngineError> {
        let rooms = {
            let mut campus = self.campus.write().await;
            let mut events = vec![Event::Cleared];
            events.extend(seed_events(now_ms()));
            self.commit(&mut campus, events).await?;
            campus.rooms().as_slice().to_vec()
        };
        self.push_rooms(&rooms).await;
        self.push_bookings(&[]).await;
        Ok(())
    }

    pub async fn record_log(&self, kind: LogKind, message: impl Into<String>) -> Result<(), EngineError> {
        let mut campus = self.campus.write().await;
        self.commit(&mut campus, vec![log_event(kind, message, now_ms())]).await
    }

    /// Send the activity log to the data source, oldest first.
    pub async fn push_logs(&self) -> Result<(), SourceError> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let mut logs = self.campus.read().await.log_entries(None);
        logs.reverse();
        source.persist_logs(&logs).await
    }

    async fn push_rooms(&self, rooms: &[Room]) {
        if let Some(source) = &self.source
            && let Err(e) = source.persist_rooms(rooms).await
        {
            self.source_failed("persist_rooms", e).await;
        }
    }

    async fn push_bookings(&self, bookings: &[BookingRecord]) {
        if let Some(source) = &self.source
            && let Err(e) = source.persist_bookings(bookings).await
        {
            self.source_failed("persist_bookings", e).await;
        }
    }

    async fn source_failed(&self, operation: &'static str, e: SourceError) {
        metrics::counter!(crate::observability::DATA_SOURCE_ERRORS_TOTAL, "operation" => operation)
            .increment(1);
        if let Err(journal_err) = self.record_log(LogKind::Warning, e.to_string()).await {
            tracing::error!("failed to journal data source warning: {journal_err}");
        }
    }

    /// Rewrite the journal as the minimal event list for the current campus.
    pub async fn compact(&self) -> Result<(), EngineError> {
        // Holding the read lock keeps writers out until the swap is done.
        let campus = self.campus.read().await;
        let events = campus.snapshot();
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .journal_tx
            .send(JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
