//! Plain-text exports of the room store and the activity log.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat};

use crate::model::{LogEntry, Ms, Room};

const ROOMS_HEADER: &str = "room_id,building,capacity,floor,facilities";

/// RFC 4180: quote fields holding a separator, a quote or a line break.
fn csv_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

pub fn rooms_csv(rooms: &[Room]) -> Vec<u8> {
    let mut out = String::with_capacity(64 * (rooms.len() + 1));
    out.push_str(ROOMS_HEADER);
    out.push('\n');
    for room in rooms {
        csv_field(&mut out, &room.room_id);
        out.push(',');
        csv_field(&mut out, &room.building);
        let _ = write!(out, ",{},", room.capacity);
        if let Some(floor) = room.floor {
            let _ = write!(out, "{floor}");
        }
        out.push(',');
        csv_field(&mut out, &room.facilities.to_string());
        out.push('\n');
    }
    out.into_bytes()
}

pub(crate) fn format_timestamp(ms: Ms) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

/// One line per entry, in the order given (the log queue is newest first).
pub fn logs_text(entries: &[LogEntry]) -> Vec<u8> {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "[{}] {} {}",
            format_timestamp(entry.timestamp),
            entry.kind.as_str().to_uppercase(),
            entry.message
        );
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    #[test]
    fn rooms_csv_header_and_rows() {
        let rooms = vec![
            Room::new("101", "Main", 50, Some(1), Facilities::default().with(Facility::Projector).with(Facility::Audio)),
            Room::new("LAB-A", "Science", 25, None, Facilities::default()),
        ];
        let csv = String::from_utf8(rooms_csv(&rooms)).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "room_id,building,capacity,floor,facilities");
        assert_eq!(lines[1], "101,Main,50,1,projector;audio");
        assert_eq!(lines[2], "LAB-A,Science,25,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn rooms_csv_quotes_awkward_fields() {
        let rooms = vec![Room::new("A,1", "The \"Annex\"", 10, Some(-1), Facilities::default())];
        let csv = String::from_utf8(rooms_csv(&rooms)).unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), "\"A,1\",\"The \"\"Annex\"\"\",10,-1,");
    }

    #[test]
    fn rooms_csv_empty_store_is_header_only() {
        assert_eq!(rooms_csv(&[]), b"room_id,building,capacity,floor,facilities\n");
    }

    #[test]
    fn logs_text_lines() {
        let entries = vec![
            LogEntry {
                kind: LogKind::Success,
                message: "Allocated Main 101".into(),
                timestamp: 1_735_725_600_000,
            },
            LogEntry {
                kind: LogKind::Info,
                message: "Processing allocation".into(),
                timestamp: 0,
            },
        ];
        let text = String::from_utf8(logs_text(&entries)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "[2025-01-01T10:00:00.000Z] SUCCESS Allocated Main 101");
        assert_eq!(lines[1], "[1970-01-01T00:00:00.000Z] INFO Processing allocation");
    }
}
