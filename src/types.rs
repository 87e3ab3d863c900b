//! Core data types shared across the bridge
//!
//! These are plain value types. The identifiers exchanged with the
//! simulation host are opaque integers and stay that way: they are only
//! ever used as map keys in the indicator registry.

use serde::{Deserialize, Serialize};

/// Client-chosen identifier for an indicator marker (wire: u16)
pub type IndicatorId = u16;

/// Correlation id for an outstanding host request, allocated by this process
pub type RequestId = u32;

/// Identifier the host assigns to a created in-world object
pub type ObjectHandle = u32;

/// A position and attitude in the simulated world
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
    /// Altitude above the host's reference level
    pub altitude: f64,
    /// True heading in degrees
    pub heading: f64,
    /// Bank angle in degrees
    pub bank: f64,
    /// Pitch angle in degrees
    pub pitch: f64,
}

/// One aircraft telemetry sample as reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// Aircraft position and attitude
    pub position: WorldPosition,
    /// Airspeed in knots
    pub speed: f64,
}
