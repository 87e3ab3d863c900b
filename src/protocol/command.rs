//! Inbound command parsing and validation
//!
//! Each UDP datagram carries exactly one command. The first two bytes
//! select the command kind; the rest is a fixed layout per kind.
//!
//! # Set indicator (selector 1, exactly 56 bytes)
//!
//! | Offset | Type | Field             |
//! |--------|------|-------------------|
//! | 0      | u16  | command = 1       |
//! | 2      | u16  | external id       |
//! | 4      | u32  | indicator type id |
//! | 8      | f64  | latitude          |
//! | 16     | f64  | longitude         |
//! | 24     | f64  | altitude          |
//! | 32     | f64  | heading           |
//! | 40     | f64  | bank              |
//! | 48     | f64  | pitch             |
//!
//! # Remove indicators (selector 2, variable length)
//!
//! | Offset | Type  | Field                     |
//! |--------|-------|---------------------------|
//! | 0      | u16   | command = 2               |
//! | 2..    | u16[] | external ids, may be none |
//!
//! An empty id list means "remove every tracked indicator". Parse
//! failures are ordinary values; the caller logs them and drops the
//! datagram. A command is never returned partially decoded.

use crate::protocol::codec;
use crate::types::{IndicatorId, WorldPosition};

/// Selector for placing or moving an indicator
pub const CMD_SET_INDICATOR: u16 = 1;
/// Selector for removing indicators
pub const CMD_REMOVE_INDICATORS: u16 = 2;

/// Exact datagram length of a set-indicator command
pub const SET_COMMAND_LEN: usize = 56;

// Field offsets within a set-indicator datagram
pub const OFFSET_COMMAND: usize = 0;
pub const OFFSET_INDICATOR_ID: usize = 2;
pub const OFFSET_TYPE_ID: usize = 4;
pub const OFFSET_LATITUDE: usize = 8;
pub const OFFSET_LONGITUDE: usize = 16;
pub const OFFSET_ALTITUDE: usize = 24;
pub const OFFSET_HEADING: usize = 32;
pub const OFFSET_BANK: usize = 40;
pub const OFFSET_PITCH: usize = 48;

/// Tolerance for range checks on transported doubles. Values that drift
/// past a boundary by less than this during the encode round-trip are
/// still accepted.
const RANGE_EPSILON: f64 = 1e-10;

/// A validated client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Place a marker, or move it if the id is already shown
    SetIndicator {
        id: IndicatorId,
        type_id: u32,
        position: WorldPosition,
    },
    /// Remove the listed markers; an empty list removes all of them
    RemoveIndicators { ids: Vec<IndicatorId> },
}

/// Why a datagram was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Datagram too short to carry a command selector
    #[error("missing command selector")]
    MissingCommand,

    /// Selector is not a known command
    #[error("unknown command selector: {0}")]
    UnknownCommand(u16),

    /// Set-indicator datagram has the wrong total length
    #[error("set-indicator command must be 56 bytes, got {0}")]
    SetInvalidLength(usize),

    /// Remove-indicators datagram has a truncated id list
    #[error("remove-indicators command has a truncated id list ({0} bytes)")]
    RemoveInvalidLength(usize),

    /// Latitude outside [-90, 90]
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180]
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
}

/// Parse one datagram into a validated command.
pub fn parse(bytes: &[u8]) -> Result<Command, ParseError> {
    if bytes.len() < 2 {
        return Err(ParseError::MissingCommand);
    }

    match codec::read_u16(bytes, OFFSET_COMMAND) {
        CMD_SET_INDICATOR => parse_set(bytes),
        CMD_REMOVE_INDICATORS => parse_remove(bytes),
        other => Err(ParseError::UnknownCommand(other)),
    }
}

fn parse_set(bytes: &[u8]) -> Result<Command, ParseError> {
    if bytes.len() != SET_COMMAND_LEN {
        return Err(ParseError::SetInvalidLength(bytes.len()));
    }

    let position = WorldPosition {
        latitude: codec::read_f64(bytes, OFFSET_LATITUDE),
        longitude: codec::read_f64(bytes, OFFSET_LONGITUDE),
        altitude: codec::read_f64(bytes, OFFSET_ALTITUDE),
        heading: codec::read_f64(bytes, OFFSET_HEADING),
        bank: codec::read_f64(bytes, OFFSET_BANK),
        pitch: codec::read_f64(bytes, OFFSET_PITCH),
    };

    // Only latitude/longitude are bounds-checked; altitude and the
    // attitude angles pass through unvalidated.
    if !in_range(position.latitude, -90.0, 90.0) {
        return Err(ParseError::LatitudeOutOfRange(position.latitude));
    }
    if !in_range(position.longitude, -180.0, 180.0) {
        return Err(ParseError::LongitudeOutOfRange(position.longitude));
    }

    Ok(Command::SetIndicator {
        id: codec::read_u16(bytes, OFFSET_INDICATOR_ID),
        type_id: codec::read_u32(bytes, OFFSET_TYPE_ID),
        position,
    })
}

fn parse_remove(bytes: &[u8]) -> Result<Command, ParseError> {
    if (bytes.len() - 2) % 2 != 0 {
        return Err(ParseError::RemoveInvalidLength(bytes.len()));
    }

    let ids = (2..bytes.len())
        .step_by(2)
        .map(|offset| codec::read_u16(bytes, offset))
        .collect();

    Ok(Command::RemoveIndicators { ids })
}

/// Range check with tolerance for floating-point transport rounding:
/// reject only if the value is strictly below `min - eps` or strictly
/// above `max + eps`.
fn in_range(value: f64, min: f64, max: f64) -> bool {
    !(value < min - RANGE_EPSILON || value > max + RANGE_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a well-formed set-indicator datagram
    fn set_datagram(id: IndicatorId, type_id: u32, position: &WorldPosition) -> [u8; SET_COMMAND_LEN] {
        let mut buf = [0u8; SET_COMMAND_LEN];
        codec::write_u16(&mut buf, OFFSET_COMMAND, CMD_SET_INDICATOR);
        codec::write_u16(&mut buf, OFFSET_INDICATOR_ID, id);
        codec::write_u32(&mut buf, OFFSET_TYPE_ID, type_id);
        codec::write_f64(&mut buf, OFFSET_LATITUDE, position.latitude);
        codec::write_f64(&mut buf, OFFSET_LONGITUDE, position.longitude);
        codec::write_f64(&mut buf, OFFSET_ALTITUDE, position.altitude);
        codec::write_f64(&mut buf, OFFSET_HEADING, position.heading);
        codec::write_f64(&mut buf, OFFSET_BANK, position.bank);
        codec::write_f64(&mut buf, OFFSET_PITCH, position.pitch);
        buf
    }

    fn position(latitude: f64, longitude: f64) -> WorldPosition {
        WorldPosition {
            latitude,
            longitude,
            altitude: 1500.0,
            heading: 270.0,
            bank: -5.0,
            pitch: 2.5,
        }
    }

    #[test]
    fn test_too_short_is_missing_command() {
        assert_eq!(parse(&[]), Err(ParseError::MissingCommand));
        assert_eq!(parse(&[0x01]), Err(ParseError::MissingCommand));
    }

    #[test]
    fn test_unknown_selector() {
        assert_eq!(parse(&[0x00, 0x00]), Err(ParseError::UnknownCommand(0)));
        assert_eq!(parse(&[0x00, 0x03]), Err(ParseError::UnknownCommand(3)));
        // Byte order matters: a little-endian 1 reads as 256
        assert_eq!(parse(&[0x01, 0x00]), Err(ParseError::UnknownCommand(256)));
    }

    #[test]
    fn test_set_rejects_wrong_length() {
        assert_eq!(parse(&[0x00, 0x01]), Err(ParseError::SetInvalidLength(2)));

        let full = set_datagram(1, 1, &position(10.0, 20.0));
        assert_eq!(
            parse(&full[..SET_COMMAND_LEN - 1]),
            Err(ParseError::SetInvalidLength(55))
        );

        let mut long = full.to_vec();
        long.push(0);
        assert_eq!(parse(&long), Err(ParseError::SetInvalidLength(57)));
    }

    #[test]
    fn test_set_decodes_all_fields() {
        let pos = WorldPosition {
            latitude: 48.353889,
            longitude: 11.786111,
            altitude: 1487.0,
            heading: 83.5,
            bank: -12.25,
            pitch: 3.75,
        };
        let buf = set_datagram(0x0102, 0xA0B0C0D0, &pos);

        let cmd = parse(&buf).unwrap();
        assert_eq!(
            cmd,
            Command::SetIndicator {
                id: 0x0102,
                type_id: 0xA0B0C0D0,
                position: pos,
            }
        );
    }

    #[test]
    fn test_latitude_boundaries() {
        assert!(parse(&set_datagram(1, 1, &position(90.0, 0.0))).is_ok());
        assert!(parse(&set_datagram(1, 1, &position(-90.0, 0.0))).is_ok());

        // Within epsilon of the boundary: accepted
        assert!(parse(&set_datagram(1, 1, &position(90.0 + 9.0e-11, 0.0))).is_ok());
        assert!(parse(&set_datagram(1, 1, &position(-90.0 - 9.0e-11, 0.0))).is_ok());

        // Past epsilon: rejected
        let high = 90.0 + 1.0e-9;
        assert_eq!(
            parse(&set_datagram(1, 1, &position(high, 0.0))),
            Err(ParseError::LatitudeOutOfRange(high))
        );
        let low = -90.0 - 1.0e-9;
        assert_eq!(
            parse(&set_datagram(1, 1, &position(low, 0.0))),
            Err(ParseError::LatitudeOutOfRange(low))
        );
    }

    #[test]
    fn test_longitude_boundaries() {
        assert!(parse(&set_datagram(1, 1, &position(0.0, 180.0))).is_ok());
        assert!(parse(&set_datagram(1, 1, &position(0.0, -180.0))).is_ok());
        assert!(parse(&set_datagram(1, 1, &position(0.0, 180.0 + 9.0e-11))).is_ok());

        let high = 180.0 + 1.0e-9;
        assert_eq!(
            parse(&set_datagram(1, 1, &position(0.0, high))),
            Err(ParseError::LongitudeOutOfRange(high))
        );
        let low = -180.0 - 1.0e-9;
        assert_eq!(
            parse(&set_datagram(1, 1, &position(0.0, low))),
            Err(ParseError::LongitudeOutOfRange(low))
        );
    }

    #[test]
    fn test_latitude_checked_before_longitude() {
        let buf = set_datagram(1, 1, &position(91.0, 200.0));
        assert_eq!(parse(&buf), Err(ParseError::LatitudeOutOfRange(91.0)));
    }

    #[test]
    fn test_remove_decodes_ids_in_order() {
        let buf = [0x00, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
        assert_eq!(
            parse(&buf),
            Ok(Command::RemoveIndicators {
                ids: vec![1, 2, 3]
            })
        );
    }

    #[test]
    fn test_remove_empty_means_all() {
        assert_eq!(
            parse(&[0x00, 0x02]),
            Ok(Command::RemoveIndicators { ids: vec![] })
        );
    }

    #[test]
    fn test_remove_rejects_odd_length() {
        assert_eq!(
            parse(&[0x00, 0x02, 0x07]),
            Err(ParseError::RemoveInvalidLength(3))
        );
        assert_eq!(
            parse(&[0x00, 0x02, 0x00, 0x01, 0x00]),
            Err(ParseError::RemoveInvalidLength(5))
        );
    }

    #[test]
    fn test_in_range_tolerance() {
        assert!(in_range(90.0, -90.0, 90.0));
        assert!(in_range(90.0 + 5.0e-11, -90.0, 90.0));
        assert!(!in_range(90.0 + 2.0e-10, -90.0, 90.0));
        assert!(in_range(-90.0 - 5.0e-11, -90.0, 90.0));
        assert!(!in_range(-90.0 - 2.0e-10, -90.0, 90.0));
    }
}
