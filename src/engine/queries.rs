use chrono::NaiveDate;

use crate::export;
use crate::model::*;

use super::{EdgeKind, Engine};

impl Engine {
    pub async fn rooms(&self, building: Option<&str>) -> Vec<RoomInfo> {
        self.campus.read().await.room_infos(building)
    }

    pub async fn adjacency_edges(&self) -> Vec<(RoomKey, RoomKey, EdgeKind)> {
        self.campus.read().await.edges()
    }

    pub async fn schedule(&self, room_id: Option<&str>, building: Option<&str>) -> Vec<ScheduleEntry> {
        self.campus.read().await.schedule(room_id, building)
    }

    pub async fn conflicts(&self) -> Vec<ConflictInfo> {
        self.campus.read().await.conflicts()
    }

    pub async fn statistics(&self) -> Statistics {
        self.campus.read().await.statistics()
    }

    pub async fn alternatives(&self, start: &RoomKey, date: NaiveDate, slot: &TimeSlot) -> Vec<Room> {
        self.campus.read().await.alternatives(start, date, slot)
    }

    /// Newest first.
    pub async fn logs(&self, kind: Option<LogKind>) -> Vec<LogEntry> {
        self.campus.read().await.log_entries(kind)
    }

    pub async fn export_rooms_csv(&self) -> Vec<u8> {
        export::rooms_csv(self.campus.read().await.rooms().as_slice())
    }

    pub async fn export_logs_text(&self) -> Vec<u8> {
        export::logs_text(&self.campus.read().await.log_entries(None))
    }
}
