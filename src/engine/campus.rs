use chrono::NaiveDate;

use crate::limits::*;
use crate::model::*;

use super::adjacency::{self, AdjacencyGraph, EdgeKind};
use super::allocator::{self, BookingIds};
use super::conflict::detect_conflicts;
use super::ledger::BookingLedger;
use super::log::LogQueue;
use super::store::RoomStore;
use super::validate::validate_room;
use super::EngineError;

/// Everything one tenant knows: rooms, the adjacency graph derived from them,
/// the booking ledger, the activity log and the booking id source.
///
/// All methods are synchronous. Mutation happens only through [`Campus::apply`]
/// so that the journal and the in-memory state can never disagree.
#[derive(Default)]
pub struct Campus {
    rooms: RoomStore,
    adjacency: AdjacencyGraph,
    ledger: BookingLedger,
    logs: LogQueue,
    ids: BookingIds,
}

impl Campus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from journal events. Adjacency is derived once at the end.
    pub fn replay(events: &[Event]) -> Self {
        let mut campus = Self::new();
        for event in events {
            campus.apply_deferred(event);
        }
        campus.rebuild_adjacency();
        campus
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn logs(&self) -> &LogQueue {
        &self.logs
    }

    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.adjacency
    }

    pub fn apply(&mut self, event: &Event) {
        if self.apply_deferred(event) {
            self.rebuild_adjacency();
        }
    }

    /// Returns true when the room set changed.
    fn apply_deferred(&mut self, event: &Event) -> bool {
        match event {
            Event::RoomAdded { room } => match self.rooms.insert(room.clone()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!("skipping journaled room: {e}");
                    false
                }
            },
            Event::RoomRemoved { key } => self.rooms.remove(key).is_some(),
            Event::BookingRecorded { record } => {
                self.ledger.append(record.clone());
                false
            }
            Event::LogRecorded { entry } => {
                self.logs.push(entry.clone());
                false
            }
            Event::Loaded { rooms, bookings } => {
                self.rooms.clear();
                for room in rooms {
                    if let Err(e) = self.rooms.insert(room.clone()) {
                        tracing::warn!("skipping remote room: {e}");
                    }
                }
                self.ledger.clear();
                for record in bookings {
                    self.ledger.append(record.clone());
                }
                true
            }
            Event::Cleared => {
                self.rooms.clear();
                self.ledger.clear();
                self.logs.clear();
                true
            }
        }
    }

    fn rebuild_adjacency(&mut self) {
        self.adjacency = adjacency::build(self.rooms.as_slice());
    }

    // ── Pre-mutation checks ──────────────────────────────────

    pub fn check_add_room(&self, room: &Room) -> Result<(), EngineError> {
        validate_room(room)?;
        if self.rooms.len() >= MAX_ROOMS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if self.rooms.contains(&room.key()) {
            return Err(EngineError::DuplicateRoom(room.key()));
        }
        Ok(())
    }

    pub fn check_remove_room(&self, key: &RoomKey) -> Result<(), EngineError> {
        if !self.rooms.contains(key) {
            return Err(EngineError::RoomNotFound(key.clone()));
        }
        if self.ledger.count_for(key) > 0 {
            return Err(EngineError::HasBookings(key.clone()));
        }
        Ok(())
    }

    /// Run the allocator and build the record. The ledger is left untouched;
    /// the caller journals and applies `Event::BookingRecorded`.
    pub fn plan_booking(
        &mut self,
        request: BookingRequest,
        now: Ms,
    ) -> Result<BookingRecord, EngineError> {
        if self.ledger.len() >= MAX_BOOKINGS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many bookings"));
        }
        let (room, id) = {
            let allocation =
                allocator::allocate(&self.rooms, &self.ledger, &mut self.ids, &request)?;
            (allocation.room.key(), allocation.booking_id)
        };
        Ok(BookingRecord {
            id,
            room,
            request,
            created_at: now,
        })
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn room_infos(&self, building: Option<&str>) -> Vec<RoomInfo> {
        let rooms = self.rooms.as_slice();
        rooms
            .iter()
            .enumerate()
            .filter(|(_, room)| building.is_none_or(|b| room.building == b))
            .map(|(i, room)| RoomInfo {
                room: room.clone(),
                adjacent: self.adjacency.neighbors(i).map(|j| rooms[j].key()).collect(),
                bookings_count: self.ledger.count_for(&room.key()),
            })
            .collect()
    }

    pub fn edges(&self) -> Vec<(RoomKey, RoomKey, EdgeKind)> {
        let rooms = self.rooms.as_slice();
        self.adjacency
            .edges()
            .iter()
            .map(|e| (rooms[e.a].key(), rooms[e.b].key(), e.kind))
            .collect()
    }

    /// Bookings in ledger order, optionally narrowed to one room id (and
    /// building). Bookings whose room is not in the store are left out.
    pub fn schedule(&self, room_id: Option<&str>, building: Option<&str>) -> Vec<ScheduleEntry> {
        self.ledger
            .iter()
            .filter(|r| room_id.is_none_or(|id| r.room.room_id == id))
            .filter(|r| building.is_none_or(|b| r.room.building == b))
            .filter_map(|r| {
                self.rooms.get(&r.room).map(|room| ScheduleEntry {
                    room: room.clone(),
                    booking: r.clone(),
                })
            })
            .collect()
    }

    pub fn conflicts(&self) -> Vec<ConflictInfo> {
        detect_conflicts(self.ledger.as_slice())
            .into_iter()
            .map(|c| ConflictInfo {
                room: c.first.room.clone(),
                first: c.first.clone(),
                second: c.second.clone(),
            })
            .collect()
    }

    pub fn statistics(&self) -> Statistics {
        let total_rooms = self.rooms.len();
        let utilized_rooms = self
            .rooms
            .iter()
            .filter(|room| self.ledger.count_for(&room.key()) > 0)
            .count();
        let utilization_rate = if total_rooms > 0 {
            let pct = utilized_rooms as f64 / total_rooms as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        } else {
            0.0
        };
        Statistics {
            total_rooms,
            total_bookings: self.ledger.len(),
            utilized_rooms,
            utilization_rate,
            conflicts: detect_conflicts(self.ledger.as_slice()).len(),
        }
    }

    /// Breadth-first walk of the adjacency graph from `start` (inclusive),
    /// keeping the rooms free for `date` / `slot`. Unknown start: empty.
    pub fn alternatives(&self, start: &RoomKey, date: NaiveDate, slot: &TimeSlot) -> Vec<Room> {
        let Some(start_idx) = self.rooms.position(start) else {
            return Vec::new();
        };
        let rooms = self.rooms.as_slice();
        self.adjacency
            .breadth_first(start_idx)
            .into_iter()
            .map(|i| &rooms[i])
            .filter(|room| self.ledger.is_available(&room.key(), date, slot))
            .cloned()
            .collect()
    }

    pub fn log_entries(&self, kind: Option<LogKind>) -> Vec<LogEntry> {
        match kind {
            Some(kind) => self.logs.filter(kind).cloned().collect(),
            None => self.logs.iter().cloned().collect(),
        }
    }

    /// Minimal event list that recreates this campus. Used for compaction.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.rooms.len() + self.ledger.len() + self.logs.len());
        events.extend(self.rooms.iter().map(|room| Event::RoomAdded { room: room.clone() }));
        events.extend(
            self.ledger
                .iter()
                .map(|record| Event::BookingRecorded { record: record.clone() }),
        );
        // The queue is newest first; replay pushes to the front.
        events.extend(
            self.logs
                .iter()
                .rev()
                .map(|entry| Event::LogRecorded { entry: entry.clone() }),
        );
        events
    }
}
