use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Bytes around each payload: a `u32` length before it, a `u32` crc32 after.
const FRAME_OVERHEAD: usize = 8;

fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal entry too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

/// Why a frame could not be decoded.
enum BadFrame {
    Torn,
    Checksum,
    Undecodable(bincode::Error),
}

/// Decode the frame at `at`. Returns the event and the offset just past it.
fn decode_frame(bytes: &[u8], at: usize) -> Result<(Event, usize), BadFrame> {
    let len = read_u32(bytes, at).ok_or(BadFrame::Torn)? as usize;
    let payload_start = at + 4;
    let payload = bytes
        .get(payload_start..payload_start + len)
        .ok_or(BadFrame::Torn)?;
    let crc = read_u32(bytes, payload_start + len).ok_or(BadFrame::Torn)?;
    if crc != crc32fast::hash(payload) {
        return Err(BadFrame::Checksum);
    }
    let event = bincode::deserialize(payload).map_err(BadFrame::Undecodable)?;
    Ok((event, at + len + FRAME_OVERHEAD))
}

/// The intact prefix of a journal file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Length in bytes of the intact prefix. Anything after it is garbage.
    pub valid_len: u64,
}

/// Append-only local cache of campus events.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`. Opening with
/// [`Journal::recover`] cuts a torn or corrupt tail off the file before the
/// first append, so new entries always follow the last intact one.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Journal {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Replay the intact prefix, truncate whatever follows it and open the
    /// file for appends.
    pub fn recover(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let replay = Self::replay(path)?;
        if path.exists() && fs::metadata(path)?.len() > replay.valid_len {
            tracing::warn!(
                "journal {}: truncating to {} bytes",
                path.display(),
                replay.valid_len
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }
        Ok((Self::open(path)?, replay.events))
    }

    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Buffer an event; nothing is durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Write `events` to a sibling temp file, fsync it, rename it over the
    /// journal and reopen for appends.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp = self.path.with_extension("journal.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Decode frames until the first bad one. A missing file is an empty journal.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };

        let mut replay = Replay::default();
        let mut at = 0;
        while at < bytes.len() {
            match decode_frame(&bytes, at) {
                Ok((event, next)) => {
                    replay.events.push(event);
                    at = next;
                }
                Err(BadFrame::Torn) => {
                    tracing::warn!("journal {}: torn entry at byte {at}", path.display());
                    break;
                }
                Err(BadFrame::Checksum) => {
                    tracing::warn!("journal {}: crc mismatch at byte {at}", path.display());
                    break;
                }
                Err(BadFrame::Undecodable(e)) => {
                    tracing::warn!("journal {}: undecodable entry at byte {at}: {e}", path.display());
                    break;
                }
            }
        }
        replay.valid_len = at as u64;
        Ok(replay)
    }
}
