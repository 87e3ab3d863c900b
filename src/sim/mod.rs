//! Simulation host abstraction
//!
//! The bridge never talks to a simulator API directly; it drives a
//! [`SimulatorLink`], which wraps one connection to a host. The link's
//! calls are cheap and synchronous, but object creation and removal
//! complete asynchronously: the host answers later through the event
//! stream returned by [`SimulatorLink::poll_event`], correlated by the
//! request id the caller tagged the call with.
//!
//! The shipped backend is [`MockSimulator`], an in-memory host used
//! both by the tests and, with a scripted demo flight, as a runnable
//! stand-in when no simulator is installed. Host-native adapters
//! implement the same trait and register in [`create_link`].

pub mod driver;
pub mod mock;

pub use driver::{DriverHandle, LinkState, SimulatorDriver};
pub use mock::{MockSimulator, SimCall};

use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::types::{AircraftState, ObjectHandle, RequestId, WorldPosition};

/// Request id of the periodic aircraft-state subscription. Sits below
/// [`crate::registry::USER_REQUEST_BASE`] so it can never collide with
/// an id allocated for a user command.
pub const STATE_POLL_REQUEST: RequestId = 1;

/// Host lifecycle streams a link can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// A flight became active
    SimulationStarted,
    /// The active flight ended
    SimulationStopped,
}

/// Asynchronous events delivered by the simulation host
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A flight became active (aircraft loaded, simulation running)
    SimulationStarted,
    /// The active flight ended (menu, loading screen, world reload)
    SimulationStopped,
    /// The host created the object requested under `request`
    ObjectAssigned {
        request: RequestId,
        handle: ObjectHandle,
    },
    /// Periodic aircraft state sample
    Telemetry(AircraftState),
    /// The host is going away; the connection is dead
    Quit,
}

/// One connection to a simulation host.
pub trait SimulatorLink: Send {
    /// Open the connection. Retriable; the host may simply not be
    /// running yet.
    fn open(&mut self) -> Result<()>;

    /// Subscribe to a lifecycle event stream.
    fn subscribe(&mut self, event: SystemEvent) -> Result<()>;

    /// Ask the host to push aircraft state samples periodically, tagged
    /// with a request id from the reserved band.
    fn request_periodic_state(&mut self, request: RequestId) -> Result<()>;

    /// Request creation of an in-world object. The host confirms later
    /// with [`SimEvent::ObjectAssigned`] carrying the same `request`.
    fn create_object(
        &mut self,
        model: &str,
        position: WorldPosition,
        request: RequestId,
    ) -> Result<()>;

    /// Request removal of an in-world object. Fire-and-forget; no
    /// confirmation is awaited.
    fn remove_object(&mut self, handle: ObjectHandle, request: RequestId) -> Result<()>;

    /// Next pending host event, if any. Non-blocking.
    fn poll_event(&mut self) -> Result<Option<SimEvent>>;

    /// Tear the connection down. Idempotent.
    fn close(&mut self);
}

/// Sink for aircraft state samples leaving the dispatch loop.
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, state: &AircraftState);
}

/// Instantiate the simulator backend named in the configuration.
pub fn create_link(config: &SimulatorConfig) -> Result<Box<dyn SimulatorLink>> {
    match config.backend.as_str() {
        "mock" => Ok(Box::new(MockSimulator::with_demo_flight())),
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}
