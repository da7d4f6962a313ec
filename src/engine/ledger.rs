use chrono::NaiveDate;

use crate::model::*;

/// Append-only list of confirmed bookings, in confirmation order.
#[derive(Debug, Clone, Default)]
pub struct BookingLedger {
    records: Vec<BookingRecord>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[BookingRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookingRecord> {
        self.records.iter()
    }

    pub fn append(&mut self, record: BookingRecord) {
        self.records.push(record);
    }

    pub fn for_room<'a>(&'a self, key: &'a RoomKey) -> impl Iterator<Item = &'a BookingRecord> {
        self.records.iter().filter(move |r| r.room == *key)
    }

    pub fn count_for(&self, key: &RoomKey) -> usize {
        self.for_room(key).count()
    }

    /// No booking of `key` on `date` overlaps `slot`.
    pub fn is_available(&self, key: &RoomKey, date: NaiveDate, slot: &TimeSlot) -> bool {
        !self
            .for_room(key)
            .any(|r| r.request.date == date && r.request.slot.overlaps(slot))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
