//! UDP wire protocol
//!
//! The bridge speaks a small fixed-layout binary protocol, big-endian
//! throughout. Inbound datagrams carry indicator commands
//! ([`command`]), outbound datagrams carry aircraft telemetry
//! ([`telemetry`]). There is no framing beyond the datagram boundary,
//! no acknowledgement and no error channel back to the client: bad
//! input is logged and dropped.

pub mod codec;
pub mod command;
pub mod telemetry;

pub use command::{
    CMD_REMOVE_INDICATORS, CMD_SET_INDICATOR, Command, ParseError, SET_COMMAND_LEN, parse,
};
pub use telemetry::{TELEMETRY_LEN, decode_state, encode_state};
