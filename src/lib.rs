//! Bridge between UDP clients and a flight simulation host
//!
//! This library provides the components for receiving indicator
//! commands over UDP, mirroring them into a running simulation as
//! world objects and streaming aircraft telemetry back out.
//!
//! ```text
//! UDP client ──commands──▶ listener ──channel──▶ dispatch ──▶ sim host
//! UDP client ◀─telemetry── sender   ◀────────── dispatch ◀── sim host
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod sim;
pub mod types;
pub mod udp;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
