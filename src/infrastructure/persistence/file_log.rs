//! File-backed event log
//!
//! A single append-only file of CRC-checked frames (see `codec`). The frame
//! offsets are indexed on open so `read_from` can seek straight to any
//! position.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::codec::{Decoded, FrameCodec, FRAME_HEADER_LEN, MAX_FRAME_LEN};
use super::event_log::{EventLog, EventStream, PersistenceError};
use crate::domain::events::{EngineEvent, LogEntry};

struct FileState {
    file: File,
    /// Byte offset of every frame, indexed by position
    offsets: Vec<u64>,
    /// Byte length of the valid prefix
    end: u64,
}

pub struct FileEventLog {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileEventLog {
    /// Opens or creates the log at `path`.
    ///
    /// A torn frame at the end of the file (an append cut short by a crash)
    /// is truncated away. A bad frame followed by more data is corruption
    /// and fails the open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let mut offsets = Vec::new();
        let mut offset = 0usize;
        loop {
            let position = offsets.len() as u64;
            match FrameCodec::decode(&data[offset..], position) {
                Ok(Decoded::Frame(_, used)) => {
                    offsets.push(offset as u64);
                    offset += used;
                }
                Ok(Decoded::Incomplete) => break,
                Err(PersistenceError::Corrupt { position, reason }) => {
                    if !Self::is_tail_frame(&data[offset..]) {
                        return Err(PersistenceError::Corrupt { position, reason });
                    }
                    warn!(
                        "event log {}: discarding bad trailing frame at position {}: {}",
                        path.display(),
                        position,
                        reason
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if offset < data.len() {
            warn!(
                "event log {}: truncating {} trailing bytes after position {}",
                path.display(),
                data.len() - offset,
                offsets.len()
            );
            file.set_len(offset as u64)?;
            file.sync_data()?;
        }

        info!(
            "opened event log {} with {} events",
            path.display(),
            offsets.len()
        );

        Ok(Self {
            path,
            state: Mutex::new(FileState {
                file,
                offsets,
                end: offset as u64,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.lock().offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().offsets.is_empty()
    }

    /// Whether the bad frame at the start of `rest` can be an append cut
    /// short by a crash. A cut-short append leaves a prefix of a frame we
    /// wrote, so its header, when complete, carries a plausible length.
    fn is_tail_frame(rest: &[u8]) -> bool {
        if rest.len() < FRAME_HEADER_LEN {
            return true;
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len > MAX_FRAME_LEN {
            // 长度字段损坏：后面还有数据就是文件中部损坏
            return rest.len() == FRAME_HEADER_LEN;
        }
        FRAME_HEADER_LEN + len >= rest.len()
    }
}

impl EventLog for FileEventLog {
    fn append_batch(&self, events: &[EngineEvent]) -> Result<u64, PersistenceError> {
        let mut state = self.state.lock();
        let first = state.offsets.len() as u64;
        if events.is_empty() {
            return Ok(first);
        }

        let mut buf = Vec::new();
        let mut frame_offsets = Vec::with_capacity(events.len());
        let mut cursor = state.end;
        for event in events {
            frame_offsets.push(cursor);
            cursor += FrameCodec::encode(event, &mut buf)? as u64;
        }

        let start = state.end;
        if let Err(e) = write_durably(&mut state.file, start, &buf) {
            // 回滚部分写入
            if let Err(rollback) = state.file.set_len(start) {
                warn!(
                    "event log {}: rollback to {} failed: {}",
                    self.path.display(),
                    start,
                    rollback
                );
            }
            return Err(e.into());
        }

        state.offsets.extend(frame_offsets);
        state.end = cursor;
        Ok(first)
    }

    fn read_from(&self, position: u64) -> Result<EventStream<'_>, PersistenceError> {
        let (start, end) = {
            let state = self.state.lock();
            let end = state.offsets.len() as u64;
            if position > end {
                return Err(PersistenceError::OutOfRange {
                    requested: position,
                    end,
                });
            }
            let start = state
                .offsets
                .get(position as usize)
                .copied()
                .unwrap_or(state.end);
            (start, end)
        };

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;
        Ok(Box::new(FrameStream {
            reader: BufReader::new(file),
            position,
            end,
        }))
    }

    fn next_position(&self) -> u64 {
        self.state.lock().offsets.len() as u64
    }
}

fn write_durably(file: &mut File, start: u64, buf: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(start))?;
    file.write_all(buf)?;
    file.sync_data()
}

/// Reads frames from `position` up to the end captured when the stream was
/// created. Stops after the first error.
struct FrameStream {
    reader: BufReader<File>,
    position: u64,
    end: u64,
}

impl Iterator for FrameStream {
    type Item = Result<LogEntry, PersistenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }
        let position = self.position;
        match FrameCodec::read_frame(&mut self.reader, position) {
            Ok(Some(event)) => {
                self.position += 1;
                Some(Ok(LogEntry { position, event }))
            }
            Ok(None) => {
                self.position = self.end;
                Some(Err(PersistenceError::Corrupt {
                    position,
                    reason: "log ended before indexed end".to_string(),
                }))
            }
            Err(e) => {
                self.position = self.end;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::CancelReason;
    use std::fs;
    use tempfile::TempDir;

    fn cancelled(order_id: u64) -> EngineEvent {
        EngineEvent::OrderCancelled {
            symbol: "ETH/USD".to_string(),
            order_id,
            reason: CancelReason::UserRequested,
            remaining_quantity: 10,
            timestamp: order_id * 100,
        }
    }

    fn read_all(log: &FileEventLog, from: u64) -> Vec<EngineEvent> {
        log.read_from(from)
            .unwrap()
            .map(|entry| entry.unwrap().event)
            .collect()
    }

    #[test]
    fn test_append_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");

        {
            let log = FileEventLog::open(&path).unwrap();
            assert_eq!(log.append(&cancelled(1)).unwrap(), 0);
            assert_eq!(log.append_batch(&[cancelled(2), cancelled(3)]).unwrap(), 1);
            assert_eq!(read_all(&log, 2), vec![cancelled(3)]);
        }

        let log = FileEventLog::open(&path).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(read_all(&log, 0), vec![cancelled(1), cancelled(2), cancelled(3)]);
        assert_eq!(log.append(&cancelled(4)).unwrap(), 3);
        assert_eq!(read_all(&log, 3), vec![cancelled(4)]);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        {
            let log = FileEventLog::open(&path).unwrap();
            log.append_batch(&[cancelled(1), cancelled(2)]).unwrap();
        }
        let full = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full - 3).unwrap();
        drop(file);

        let log = FileEventLog::open(&path).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(read_all(&log, 0), vec![cancelled(1)]);
        assert_eq!(log.append(&cancelled(5)).unwrap(), 1);
        assert_eq!(read_all(&log, 0), vec![cancelled(1), cancelled(5)]);
    }

    #[test]
    fn test_mid_file_corruption_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        {
            let log = FileEventLog::open(&path).unwrap();
            log.append_batch(&[cancelled(1), cancelled(2)]).unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        bytes[FRAME_HEADER_LEN] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FileEventLog::open(&path),
            Err(PersistenceError::Corrupt { position: 0, .. })
        ));
    }

    #[test]
    fn test_mid_file_bad_length_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        let second = {
            let log = FileEventLog::open(&path).unwrap();
            log.append(&cancelled(1)).unwrap();
            let second = fs::metadata(&path).unwrap().len() as usize;
            log.append_batch(&[cancelled(2), cancelled(3)]).unwrap();
            second
        };
        let mut bytes = fs::read(&path).unwrap();
        let size = bytes.len() as u64;
        bytes[second..second + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        // 不得截断后续已提交的帧
        assert!(matches!(
            FileEventLog::open(&path),
            Err(PersistenceError::Corrupt { position: 1, .. })
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), size);
    }

    #[test]
    fn test_bad_length_in_last_header_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        {
            let log = FileEventLog::open(&path).unwrap();
            log.append(&cancelled(1)).unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        fs::write(&path, &bytes).unwrap();

        let log = FileEventLog::open(&path).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(read_all(&log, 0), vec![cancelled(1)]);
    }

    #[test]
    fn test_read_past_end() {
        let dir = TempDir::new().unwrap();
        let log = FileEventLog::open(dir.path().join("events.log")).unwrap();
        assert_eq!(log.read_from(0).unwrap().count(), 0);
        assert!(matches!(
            log.read_from(1),
            Err(PersistenceError::OutOfRange { requested: 1, end: 0 })
        ));
    }
}
