use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::{BookingRecord, BookingRequest, Facilities, LogEntry, Ms, Room, RoomKey, TimeOfDay, TimeSlot};

/// The remote collaborator could not be reached or answered with garbage.
/// Never fatal: the engine keeps serving from its local cache.
#[derive(Debug)]
pub enum SourceError {
    Unavailable(String),
    BadResponse(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(e) => write!(f, "data source unavailable: {e}"),
            SourceError::BadResponse(e) => write!(f, "data source bad response: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::BadResponse(e.to_string())
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

/// Remote store of rooms, bookings and the activity log.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_rooms(&self) -> Result<Vec<Room>, SourceError>;
    async fn fetch_bookings(&self) -> Result<Vec<BookingRecord>, SourceError>;
    async fn persist_rooms(&self, rooms: &[Room]) -> Result<(), SourceError>;
    async fn persist_bookings(&self, bookings: &[BookingRecord]) -> Result<(), SourceError>;
    async fn persist_logs(&self, logs: &[LogEntry]) -> Result<(), SourceError>;
}

/// A booking as the remote collaborator stores it: one flat object with the
/// assigned room's key inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RemoteBooking {
    booking_id: Ulid,
    room_id: String,
    building: String,
    course_name: String,
    #[serde(default)]
    instructor: Option<String>,
    date: NaiveDate,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    capacity: u32,
    /// The building the request was limited to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requested_building: Option<String>,
    #[serde(default)]
    facilities: Facilities,
    timestamp: Ms,
}

impl From<&BookingRecord> for RemoteBooking {
    fn from(record: &BookingRecord) -> Self {
        let request = &record.request;
        Self {
            booking_id: record.id,
            room_id: record.room.room_id.clone(),
            building: record.room.building.clone(),
            course_name: request.course_name.clone(),
            instructor: request.instructor.clone(),
            date: request.date,
            start_time: request.slot.start,
            end_time: request.slot.end,
            capacity: request.capacity,
            requested_building: request.building.clone(),
            facilities: request.facilities,
            timestamp: record.created_at,
        }
    }
}

impl From<RemoteBooking> for BookingRecord {
    fn from(remote: RemoteBooking) -> Self {
        Self {
            id: remote.booking_id,
            room: RoomKey::new(remote.room_id, remote.building),
            request: BookingRequest {
                course_name: remote.course_name,
                instructor: remote.instructor,
                date: remote.date,
                slot: TimeSlot::new(remote.start_time, remote.end_time),
                capacity: remote.capacity,
                building: remote.requested_building,
                facilities: remote.facilities,
            },
            created_at: remote.timestamp,
        }
    }
}

/// JSON over HTTP: `GET`/`PUT {base}/{tenant}/{collection}`.
pub struct HttpSource {
    client: Client,
    base_url: String,
    tenant: String,
}

impl HttpSource {
    pub fn new(base_url: &str, tenant: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: tenant.to_string(),
        })
    }

    fn url(&self, collection: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.tenant, collection)
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str) -> Result<T, SourceError> {
        let resp = self
            .client
            .get(self.url(collection))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn put<T: Serialize + ?Sized + Sync>(
        &self,
        collection: &str,
        body: &T,
    ) -> Result<(), SourceError> {
        self.client
            .put(self.url(collection))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch_rooms(&self) -> Result<Vec<Room>, SourceError> {
        self.get("rooms").await
    }

    async fn fetch_bookings(&self) -> Result<Vec<BookingRecord>, SourceError> {
        let remote: Vec<RemoteBooking> = self.get("bookings").await?;
        Ok(remote.into_iter().map(BookingRecord::from).collect())
    }

    async fn persist_rooms(&self, rooms: &[Room]) -> Result<(), SourceError> {
        self.put("rooms", rooms).await
    }

    async fn persist_bookings(&self, bookings: &[BookingRecord]) -> Result<(), SourceError> {
        let remote: Vec<RemoteBooking> = bookings.iter().map(RemoteBooking::from).collect();
        self.put("bookings", &remote).await
    }

    async fn persist_logs(&self, logs: &[LogEntry]) -> Result<(), SourceError> {
        self.put("logs", logs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> BookingRecord {
        BookingRecord {
            id: Ulid::from_string("01JGZ5Q0X8A9B7C6D5E4F3G2H1").unwrap(),
            room: RoomKey::new("101", "Main"),
            request: BookingRequest {
                course_name: "Algorithms".into(),
                instructor: Some("Dr. Knuth".into()),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                slot: TimeSlot::new("09:00".parse().unwrap(), "10:00".parse().unwrap()),
                capacity: 48,
                building: None,
                facilities: Facilities::default(),
            },
            created_at: 1_735_722_000_000,
        }
    }

    #[test]
    fn bookings_travel_as_flat_objects() {
        let value = serde_json::to_value(RemoteBooking::from(&record())).unwrap();
        assert_eq!(value["booking_id"], "01JGZ5Q0X8A9B7C6D5E4F3G2H1");
        assert_eq!(value["room_id"], "101");
        assert_eq!(value["building"], "Main");
        assert_eq!(value["course_name"], "Algorithms");
        assert_eq!(value["instructor"], "Dr. Knuth");
        assert_eq!(value["date"], "2025-01-01");
        assert_eq!(value["start_time"], "09:00");
        assert_eq!(value["end_time"], "10:00");
        assert_eq!(value["capacity"], 48);
        assert_eq!(value["timestamp"], 1_735_722_000_000i64);
        assert!(value.get("request").is_none());
        assert!(value.get("requested_building").is_none());
    }

    #[test]
    fn flat_booking_without_optional_fields_loads() {
        let remote: RemoteBooking = serde_json::from_value(json!({
            "booking_id": "01JGZ5Q0X8A9B7C6D5E4F3G2H1",
            "room_id": "101",
            "building": "Main",
            "course_name": "Algorithms",
            "date": "2025-01-01",
            "start_time": "09:00",
            "end_time": "10:00",
            "capacity": 48,
            "timestamp": 1_735_722_000_000i64,
        }))
        .unwrap();
        let loaded = BookingRecord::from(remote);
        assert_eq!(loaded.request.instructor, None);
        assert_eq!(loaded.room, record().room);
        assert_eq!(loaded.slot(), record().slot());
        assert_eq!(BookingRecord::from(RemoteBooking::from(&record())), record());
    }

    #[test]
    fn url_joins_base_tenant_and_collection() {
        let src = HttpSource::new("http://campus.local/api/", "north", Duration::from_secs(1)).unwrap();
        assert_eq!(src.url("rooms"), "http://campus.local/api/north/rooms");
        assert_eq!(src.url("logs"), "http://campus.local/api/north/logs");
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let src = HttpSource::new("http://127.0.0.1:9", "t", Duration::from_millis(200)).unwrap();
        match src.fetch_rooms().await {
            Err(SourceError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
