use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

/// Unix milliseconds, used for creation and log timestamps.
pub type Ms = i64;

/// Wall-clock time of day with minute resolution, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    /// Accepts `HH:MM` and `HH:MM:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("bad time of day: {s:?} (expected HH:MM)");
        let mut parts = s.trim().split(':');
        let hour: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let minute: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        if let Some(sec) = parts.next()
            && sec.parse::<u8>().ok() != Some(0)
        {
            return Err(bad());
        }
        if parts.next().is_some() {
            return Err(bad());
        }
        Self::new(hour, minute).ok_or_else(bad)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeSlot {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// True when `end` is strictly after `start`.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Abutting slots (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Projector,
    Lab,
    Accessible,
    Whiteboard,
    Audio,
    Smartboard,
}

impl Facility {
    pub const ALL: [Facility; 6] = [
        Facility::Projector,
        Facility::Lab,
        Facility::Accessible,
        Facility::Whiteboard,
        Facility::Audio,
        Facility::Smartboard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Facility::Projector => "projector",
            Facility::Lab => "lab",
            Facility::Accessible => "accessible",
            Facility::Whiteboard => "whiteboard",
            Facility::Audio => "audio",
            Facility::Smartboard => "smartboard",
        }
    }
}

impl FromStr for Facility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Facility::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown facility: {s}"))
    }
}

/// Fixed set of facility flags a room offers or a request needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Facilities {
    pub projector: bool,
    pub lab: bool,
    pub accessible: bool,
    pub whiteboard: bool,
    pub audio: bool,
    pub smartboard: bool,
}

impl Facilities {
    pub fn has(&self, facility: Facility) -> bool {
        match facility {
            Facility::Projector => self.projector,
            Facility::Lab => self.lab,
            Facility::Accessible => self.accessible,
            Facility::Whiteboard => self.whiteboard,
            Facility::Audio => self.audio,
            Facility::Smartboard => self.smartboard,
        }
    }

    pub fn set(&mut self, facility: Facility, value: bool) {
        let flag = match facility {
            Facility::Projector => &mut self.projector,
            Facility::Lab => &mut self.lab,
            Facility::Accessible => &mut self.accessible,
            Facility::Whiteboard => &mut self.whiteboard,
            Facility::Audio => &mut self.audio,
            Facility::Smartboard => &mut self.smartboard,
        };
        *flag = value;
    }

    pub fn with(mut self, facility: Facility) -> Self {
        self.set(facility, true);
        self
    }

    pub fn present(&self) -> impl Iterator<Item = Facility> + '_ {
        Facility::ALL.into_iter().filter(|f| self.has(*f))
    }

    /// Every flag set in `required` is also set here. Unset flags in
    /// `required` impose nothing.
    pub fn satisfies(&self, required: &Facilities) -> bool {
        required.present().all(|f| self.has(f))
    }
}

impl fmt::Display for Facilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, facility) in self.present().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            f.write_str(facility.as_str())?;
        }
        Ok(())
    }
}

/// Room identity: `room_id` is only unique within its building.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub room_id: String,
    pub building: String,
}

impl RoomKey {
    pub fn new(room_id: impl Into<String>, building: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            building: building.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.building, self.room_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub building: String,
    pub capacity: u32,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub facilities: Facilities,
}

impl Room {
    pub fn new(
        room_id: impl Into<String>,
        building: impl Into<String>,
        capacity: u32,
        floor: Option<i32>,
        facilities: Facilities,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            building: building.into(),
            capacity,
            floor,
            facilities,
        }
    }

    pub fn key(&self) -> RoomKey {
        RoomKey::new(self.room_id.clone(), self.building.clone())
    }

    pub fn is(&self, key: &RoomKey) -> bool {
        self.room_id == key.room_id && self.building == key.building
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub course_name: String,
    #[serde(default)]
    pub instructor: Option<String>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub capacity: u32,
    /// Exact, case-sensitive building match when set.
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub facilities: Facilities,
}

/// A confirmed assignment. Never mutated once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub room: RoomKey,
    pub request: BookingRequest,
    pub created_at: Ms,
}

impl BookingRecord {
    pub fn date(&self) -> NaiveDate {
        self.request.date
    }

    pub fn slot(&self) -> TimeSlot {
        self.request.slot
    }

    /// Same room, same date, overlapping slots.
    pub fn conflicts_with(&self, other: &BookingRecord) -> bool {
        self.room == other.room
            && self.request.date == other.request.date
            && self.request.slot.overlaps(&other.request.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Success => "success",
            LogKind::Warning => "warning",
            LogKind::Error => "error",
        }
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(LogKind::Info),
            "success" => Ok(LogKind::Success),
            "warning" => Ok(LogKind::Warning),
            "error" => Ok(LogKind::Error),
            _ => Err(format!("unknown log kind: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
    pub timestamp: Ms,
}

/// Journal record format. Replaying these in order rebuilds a campus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomAdded { room: Room },
    RoomRemoved { key: RoomKey },
    BookingRecorded { record: BookingRecord },
    LogRecorded { entry: LogEntry },
    /// Replaces rooms and bookings with a remote snapshot; logs are kept.
    Loaded {
        rooms: Vec<Room>,
        bookings: Vec<BookingRecord>,
    },
    /// Drops rooms, bookings and logs.
    Cleared,
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room: Room,
    pub adjacent: Vec<RoomKey>,
    pub bookings_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub room: Room,
    pub booking: BookingRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub room: RoomKey,
    pub first: BookingRecord,
    pub second: BookingRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_rooms: usize,
    pub total_bookings: usize,
    pub utilized_rooms: usize,
    /// Percentage rounded to two decimals.
    pub utilization_rate: f64,
    pub conflicts: usize,
}
