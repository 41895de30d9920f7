//! The 2-byte telemetry wire format.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes with no delimiter:
//!
//! | bits | meaning |
//! |---|---|
//! | byte 0, bits 7-6 | message type (0-3) |
//! | byte 0, bits 5-0 | sensor id (0-63) |
//! | byte 1, bits 7-0 | temperature in °C (0-255), meaningful for type 2 only |
//!
//! Only [`MessageType::Reading`] frames turn into a [`Reading`]; the other
//! types are filtered out, not treated as errors.
//!
//! # Example
//!
//! ```
//! use thermo_types::frame::decode_stream_at;
//!
//! // sensor 0 @ 20°C, a type-1 frame (dropped), sensor 2 @ 30°C
//! let readings = decode_stream_at(&[0x80, 0x14, 0x41, 0x19, 0x82, 0x1E], 1_000);
//! assert_eq!(readings.len(), 2);
//! assert_eq!((readings[0].sensor_id, readings[0].temperature), (0, 20));
//! assert_eq!((readings[1].sensor_id, readings[1].temperature), (2, 30));
//! ```

use core::fmt;

use bytes::Buf;

use crate::error::{FrameError, FrameResult};
use crate::types::{Reading, now_millis};

/// Size of one frame on the wire.
pub const FRAME_LEN: usize = 2;

/// Highest sensor id the 6-bit field can carry.
pub const MAX_SENSOR_ID: u8 = 0b0011_1111;

const TYPE_SHIFT: u8 = 6;

/// The 2-bit message type tag in the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Type `0b00`, not consumed by this system.
    Reserved0 = 0,
    /// Type `0b01`, not consumed by this system.
    Reserved1 = 1,
    /// Type `0b10`, a temperature reading.
    Reading = 2,
    /// Type `0b11`, not consumed by this system.
    Reserved3 = 3,
}

impl From<u8> for MessageType {
    /// Takes the low two bits of `value`.
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => MessageType::Reserved0,
            1 => MessageType::Reserved1,
            2 => MessageType::Reading,
            _ => MessageType::Reserved3,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Reading => write!(f, "2 (reading)"),
            other => write!(f, "{}", *other as u8),
        }
    }
}

/// One raw frame, of any message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Message type tag.
    pub message_type: MessageType,
    /// Sensor id, always within `0..=63`.
    pub sensor_id: u8,
    /// Second byte of the frame; the temperature for reading frames.
    pub value: u8,
}

impl Frame {
    /// Build a frame. The sensor id is truncated to its 6-bit field.
    pub fn new(message_type: MessageType, sensor_id: u8, value: u8) -> Self {
        Self {
            message_type,
            sensor_id: sensor_id & MAX_SENSOR_ID,
            value,
        }
    }

    /// Build a temperature reading frame.
    pub fn reading(sensor_id: u8, temperature: u8) -> Self {
        Self::new(MessageType::Reading, sensor_id, temperature)
    }

    /// Parse the first [`FRAME_LEN`] bytes of `data`. Extra bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InsufficientBytes`] if `data` is shorter than a frame.
    pub fn parse(data: &[u8]) -> FrameResult<Self> {
        if data.len() < FRAME_LEN {
            return Err(FrameError::InsufficientBytes {
                expected: FRAME_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let header = buf.get_u8();
        let value = buf.get_u8();

        Ok(Self {
            message_type: MessageType::from(header >> TYPE_SHIFT),
            sensor_id: header & MAX_SENSOR_ID,
            value,
        })
    }

    /// Wire representation of this frame.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        [
            ((self.message_type as u8) << TYPE_SHIFT) | (self.sensor_id & MAX_SENSOR_ID),
            self.value,
        ]
    }

    /// Convert a reading frame into a [`Reading`] stamped with `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnsupportedType`] for any type other than
    /// [`MessageType::Reading`].
    pub fn into_reading(self, timestamp: u64) -> FrameResult<Reading> {
        match self.message_type {
            MessageType::Reading => Ok(Reading {
                sensor_id: self.sensor_id,
                temperature: self.value,
                timestamp,
            }),
            other => Err(FrameError::UnsupportedType(other)),
        }
    }
}

/// Decode the frame starting at `offset`, stamping it with the current time.
///
/// Returns `None` when fewer than two bytes remain or the frame is not a
/// reading.
pub fn decode_one(data: &[u8], offset: usize) -> Option<Reading> {
    decode_one_at(data, offset, now_millis())
}

/// Like [`decode_one`] with an explicit capture timestamp.
pub fn decode_one_at(data: &[u8], offset: usize, timestamp: u64) -> Option<Reading> {
    let window = data.get(offset..)?;
    Frame::parse(window).ok()?.into_reading(timestamp).ok()
}

/// Decode every reading frame in `data`, stamping them with the current time.
pub fn decode_stream(data: &[u8]) -> Vec<Reading> {
    decode_stream_at(data, now_millis())
}

/// Decode every reading frame in `data` in strict 2-byte strides from offset 0.
///
/// Rejected frames are skipped without resynchronizing. A trailing unpaired
/// byte is left alone; callers that stream data keep it for the next chunk.
pub fn decode_stream_at(data: &[u8], timestamp: u64) -> Vec<Reading> {
    data.chunks_exact(FRAME_LEN)
        .filter_map(|window| decode_one_at(window, 0, timestamp))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: u64 = 1_700_000_000_000;

    #[test]
    fn test_decode_spec_example() {
        let reading = decode_one_at(&[0xA1, 0x10], 0, TS).unwrap();
        assert_eq!(reading.sensor_id, 33);
        assert_eq!(reading.temperature, 16);
        assert_eq!(reading.timestamp, TS);
    }

    #[test]
    fn test_decode_filters_non_reading_types() {
        assert!(decode_one_at(&[0x73, 0x0F], 0, TS).is_none()); // type 1
        assert!(decode_one_at(&[0x00, 0x20], 0, TS).is_none()); // type 0
        assert!(decode_one_at(&[0xC0, 0x30], 0, TS).is_none()); // type 3
    }

    #[test]
    fn test_decode_sensor_id_bounds() {
        let low = decode_one_at(&[0x80, 0x19], 0, TS).unwrap();
        assert_eq!((low.sensor_id, low.temperature), (0, 25));

        let high = decode_one_at(&[0xBF, 0xFF], 0, TS).unwrap();
        assert_eq!((high.sensor_id, high.temperature), (63, 255));
    }

    #[test]
    fn test_decode_short_buffer() {
        assert!(decode_one_at(&[], 0, TS).is_none());
        assert!(decode_one_at(&[0xA1], 0, TS).is_none());
        assert!(decode_one_at(&[0xA1, 0x10, 0xA1], 2, TS).is_none());
        assert!(decode_one_at(&[0xA1, 0x10], 5, TS).is_none());
    }

    #[test]
    fn test_decode_at_offset() {
        let data = [0x00, 0x00, 0xA1, 0x10];
        let reading = decode_one_at(&data, 2, TS).unwrap();
        assert_eq!(reading.sensor_id, 33);
    }

    #[test]
    fn test_decode_one_uses_wall_clock() {
        let before = now_millis();
        let reading = decode_one(&[0x85, 0x20], 0).unwrap();
        assert!(reading.timestamp >= before);
        assert_eq!(reading.sensor_id, 5);
    }

    #[test]
    fn test_decode_stream_keeps_alignment_after_rejected_frame() {
        let readings = decode_stream_at(&[0x80, 0x14, 0x41, 0x19, 0x82, 0x1E], TS);
        let pairs: Vec<_> = readings
            .iter()
            .map(|r| (r.sensor_id, r.temperature))
            .collect();
        assert_eq!(pairs, vec![(0, 20), (2, 30)]);
    }

    #[test]
    fn test_decode_stream_ignores_trailing_byte() {
        let readings = decode_stream_at(&[0xA1, 0x10, 0x82], TS);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor_id, 33);

        assert!(decode_stream(&[0x82]).is_empty());
        assert!(decode_stream(&[]).is_empty());
    }

    #[test]
    fn test_decode_stream_does_not_resync() {
        // A reading header sitting on an odd offset is never picked up.
        let readings = decode_stream_at(&[0x00, 0xA1, 0x10, 0x00], TS);
        assert!(readings.is_empty());
    }

    #[test]
    fn test_frame_parse_insufficient_bytes() {
        let err = Frame::parse(&[0xA1]).unwrap_err();
        assert_eq!(
            err,
            FrameError::InsufficientBytes {
                expected: 2,
                actual: 1
            }
        );
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_frame_into_reading_unsupported_type() {
        let frame = Frame::parse(&[0x73, 0x0F]).unwrap();
        assert_eq!(frame.message_type, MessageType::Reserved1);
        assert_eq!(frame.sensor_id, 0x33);

        let err = frame.into_reading(TS).unwrap_err();
        assert_eq!(err, FrameError::UnsupportedType(MessageType::Reserved1));
        assert_eq!(err.to_string(), "Unsupported message type: 1");
    }

    #[test]
    fn test_frame_encode() {
        assert_eq!(Frame::reading(33, 16).encode(), [0xA1, 0x10]);
        assert_eq!(
            Frame::new(MessageType::Reserved1, 0x33, 0x0F).encode(),
            [0x73, 0x0F]
        );
        // Out-of-range ids are truncated to the 6-bit field.
        assert_eq!(Frame::reading(0x41, 0).sensor_id, 1);
    }

    #[test]
    fn test_message_type_from_u8() {
        assert_eq!(MessageType::from(0), MessageType::Reserved0);
        assert_eq!(MessageType::from(1), MessageType::Reserved1);
        assert_eq!(MessageType::from(2), MessageType::Reading);
        assert_eq!(MessageType::from(3), MessageType::Reserved3);
        assert_eq!(MessageType::from(0b110), MessageType::Reading);
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::Reading.to_string(), "2 (reading)");
        assert_eq!(MessageType::Reserved3.to_string(), "3");
    }
}
