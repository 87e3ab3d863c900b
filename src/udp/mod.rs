//! UDP surfaces of the bridge
//!
//! One inbound socket for indicator commands ([`listener`]) and one
//! outbound socket for telemetry ([`telemetry`]). Both are plain
//! blocking sockets; the command listener occupies the main thread and
//! the telemetry sender is driven from the dispatch thread.

pub mod listener;
pub mod telemetry;

pub use listener::{CommandHandler, CommandListener};
pub use telemetry::TelemetrySender;
