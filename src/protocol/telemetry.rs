//! Outbound telemetry encoding
//!
//! While a flight is active the bridge forwards one aircraft state
//! sample per host telemetry tick as a single 56-byte datagram:
//!
//! | Offset | Type | Field     |
//! |--------|------|-----------|
//! | 0      | f64  | latitude  |
//! | 8      | f64  | longitude |
//! | 16     | f64  | altitude  |
//! | 24     | f64  | heading   |
//! | 32     | f64  | bank      |
//! | 40     | f64  | pitch     |
//! | 48     | f64  | speed     |

use crate::protocol::codec;
use crate::types::{AircraftState, WorldPosition};

/// Total size of an outbound telemetry datagram
pub const TELEMETRY_LEN: usize = 56;

const OFFSET_LATITUDE: usize = 0;
const OFFSET_LONGITUDE: usize = 8;
const OFFSET_ALTITUDE: usize = 16;
const OFFSET_HEADING: usize = 24;
const OFFSET_BANK: usize = 32;
const OFFSET_PITCH: usize = 40;
const OFFSET_SPEED: usize = 48;

/// Encode an aircraft state sample into its wire form.
pub fn encode_state(state: &AircraftState) -> [u8; TELEMETRY_LEN] {
    let mut buf = [0u8; TELEMETRY_LEN];
    codec::write_f64(&mut buf, OFFSET_LATITUDE, state.position.latitude);
    codec::write_f64(&mut buf, OFFSET_LONGITUDE, state.position.longitude);
    codec::write_f64(&mut buf, OFFSET_ALTITUDE, state.position.altitude);
    codec::write_f64(&mut buf, OFFSET_HEADING, state.position.heading);
    codec::write_f64(&mut buf, OFFSET_BANK, state.position.bank);
    codec::write_f64(&mut buf, OFFSET_PITCH, state.position.pitch);
    codec::write_f64(&mut buf, OFFSET_SPEED, state.speed);
    buf
}

/// Decode a telemetry datagram, as a client of the bridge would.
/// Returns `None` if the buffer is not exactly [`TELEMETRY_LEN`] bytes.
pub fn decode_state(buf: &[u8]) -> Option<AircraftState> {
    if buf.len() != TELEMETRY_LEN {
        return None;
    }
    Some(AircraftState {
        position: WorldPosition {
            latitude: codec::read_f64(buf, OFFSET_LATITUDE),
            longitude: codec::read_f64(buf, OFFSET_LONGITUDE),
            altitude: codec::read_f64(buf, OFFSET_ALTITUDE),
            heading: codec::read_f64(buf, OFFSET_HEADING),
            bank: codec::read_f64(buf, OFFSET_BANK),
            pitch: codec::read_f64(buf, OFFSET_PITCH),
        },
        speed: codec::read_f64(buf, OFFSET_SPEED),
    })
}
