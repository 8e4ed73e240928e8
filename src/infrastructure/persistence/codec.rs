/// 事件帧编解码器
///
/// Frame layout, little endian:
///
/// ```text
/// [payload_len: u32][crc32c(payload): u32][payload: bincode(EngineEvent)]
/// ```
///
/// The payload is the serde encoding of the event under bincode's standard
/// configuration.
use std::io::{self, Read};

use crate::domain::events::EngineEvent;
use crate::infrastructure::persistence::event_log::PersistenceError;

pub const FRAME_HEADER_LEN: usize = 8;

/// Frames larger than this are treated as corruption
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Outcome of decoding from a byte slice
#[derive(Debug)]
pub enum Decoded {
    /// A whole, checksum-valid frame and the bytes it occupied
    Frame(EngineEvent, usize),
    /// The slice ends inside a frame
    Incomplete,
}

pub struct FrameCodec;

impl FrameCodec {
    /// Appends one frame to `buf`, returning the frame length.
    pub fn encode(event: &EngineEvent, buf: &mut Vec<u8>) -> Result<usize, PersistenceError> {
        let payload = bincode::serde::encode_to_vec(event, bincode::config::standard())
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(PersistenceError::Encode(format!(
                "event of {} bytes exceeds frame limit",
                payload.len()
            )));
        }

        buf.reserve(FRAME_HEADER_LEN + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&crc32c::crc32c(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(FRAME_HEADER_LEN + payload.len())
    }

    /// Decodes the frame at the start of `data`. `position` is only used in
    /// error reports.
    pub fn decode(data: &[u8], position: u64) -> Result<Decoded, PersistenceError> {
        if data.len() < FRAME_HEADER_LEN {
            return Ok(Decoded::Incomplete);
        }
        let (len, checksum) = Self::parse_header(&data[..FRAME_HEADER_LEN], position)?;
        let total = FRAME_HEADER_LEN + len;
        if data.len() < total {
            return Ok(Decoded::Incomplete);
        }
        let event = Self::decode_payload(&data[FRAME_HEADER_LEN..total], checksum, position)?;
        Ok(Decoded::Frame(event, total))
    }

    /// Reads one frame from a stream. `Ok(None)` on a clean end of stream.
    pub fn read_frame<R: Read>(
        reader: &mut R,
        position: u64,
    ) -> Result<Option<EngineEvent>, PersistenceError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let (len, checksum) = Self::parse_header(&header, position)?;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PersistenceError::Corrupt {
                position,
                reason: "truncated frame".to_string(),
            },
            _ => PersistenceError::Io(e),
        })?;
        Self::decode_payload(&payload, checksum, position).map(Some)
    }

    fn parse_header(header: &[u8], position: u64) -> Result<(usize, u32), PersistenceError> {
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_FRAME_LEN {
            return Err(PersistenceError::Corrupt {
                position,
                reason: format!("implausible frame length {}", len),
            });
        }
        Ok((len, checksum))
    }

    fn decode_payload(
        payload: &[u8],
        checksum: u32,
        position: u64,
    ) -> Result<EngineEvent, PersistenceError> {
        let actual = crc32c::crc32c(payload);
        if actual != checksum {
            return Err(PersistenceError::Corrupt {
                position,
                reason: format!("checksum mismatch: stored {:08x}, computed {:08x}", checksum, actual),
            });
        }
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map(|(event, _)| event)
            .map_err(|e| PersistenceError::Decode {
                position,
                reason: e.to_string(),
            })
    }
}
