//! Virtual simulator backend
//!
//! Implements [`SimulatorLink`] against an in-memory world instead of a
//! running simulator. It serves two purposes:
//!
//! - tests drive the dispatch loop deterministically: the mock is
//!   cloneable, and every clone shares the same state, so a test keeps
//!   one handle for injecting events and inspecting the recorded host
//!   calls while the driver owns the other;
//! - `backend = "mock"` in the daemon configuration enables a scripted
//!   demo flight (a gentle orbit with Gaussian jitter), so UDP clients
//!   get live telemetry and working indicator commands with no
//!   simulator installed.
//!
//! Object creation follows the host's asynchronous model: the
//! confirmation is queued as an event rather than returned, so the
//! dispatch loop is exercised exactly as a real host would exercise it.

use crate::error::{Error, Result};
use crate::sim::{SimEvent, SimulatorLink, SystemEvent};
use crate::types::{AircraftState, ObjectHandle, RequestId, WorldPosition};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// Demo flight: a left-hand orbit near Munich at pattern altitude
const DEMO_CENTER_LAT: f64 = 48.353889;
const DEMO_CENTER_LON: f64 = 11.786111;
const DEMO_RADIUS_DEG: f64 = 0.05;
const DEMO_ALTITUDE: f64 = 1800.0;
const DEMO_SPEED_KTS: f64 = 132.0;
const DEMO_ORBIT_PERIOD_S: f64 = 180.0;
const DEMO_TICK_MS: u64 = 250;

/// First handle the mock assigns to a created object
const FIRST_OBJECT_HANDLE: ObjectHandle = 1000;

/// One host call recorded by the virtual simulator, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Create {
        model: String,
        position: WorldPosition,
        request: RequestId,
    },
    Remove {
        handle: ObjectHandle,
        request: RequestId,
    },
}

struct DemoFlight {
    rng: SmallRng,
    announced: bool,
    angle: f64,
    last_tick: Instant,
}

impl DemoFlight {
    fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            announced: false,
            angle: 0.0,
            last_tick: Instant::now(),
        }
    }

    fn gaussian(&mut self, stddev: f64) -> f64 {
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    fn tick(&mut self) -> Option<SimEvent> {
        if !self.announced {
            self.announced = true;
            return Some(SimEvent::SimulationStarted);
        }
        if self.last_tick.elapsed() < Duration::from_millis(DEMO_TICK_MS) {
            return None;
        }
        self.last_tick = Instant::now();

        self.angle = (self.angle + TAU * DEMO_TICK_MS as f64 / 1000.0 / DEMO_ORBIT_PERIOD_S) % TAU;
        let latitude = DEMO_CENTER_LAT + DEMO_RADIUS_DEG * self.angle.cos();
        let longitude =
            DEMO_CENTER_LON + DEMO_RADIUS_DEG * self.angle.sin() / DEMO_CENTER_LAT.to_radians().cos();

        Some(SimEvent::Telemetry(AircraftState {
            position: WorldPosition {
                latitude,
                longitude,
                altitude: DEMO_ALTITUDE + self.gaussian(15.0),
                heading: (self.angle.to_degrees() + 90.0).rem_euclid(360.0),
                bank: 12.0 + self.gaussian(1.0),
                pitch: 1.5 + self.gaussian(0.5),
            },
            speed: DEMO_SPEED_KTS + self.gaussian(2.0),
        }))
    }
}

struct Inner {
    connected: bool,
    /// Remaining open() calls that fail before one succeeds
    open_failures: u32,
    subscriptions: Vec<SystemEvent>,
    state_requests: Vec<RequestId>,
    events: VecDeque<SimEvent>,
    calls: Vec<SimCall>,
    /// Live objects by handle
    objects: HashMap<ObjectHandle, String>,
    next_handle: ObjectHandle,
    /// Queue the assignment confirmation as soon as an object is created
    auto_confirm: bool,
    demo: Option<DemoFlight>,
}

/// In-memory simulation host. Clones share state.
#[derive(Clone)]
pub struct MockSimulator {
    inner: Arc<Mutex<Inner>>,
}

impl MockSimulator {
    /// Inert mock for tests: no events until injected, creations are
    /// confirmed immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                connected: false,
                open_failures: 0,
                subscriptions: Vec::new(),
                state_requests: Vec::new(),
                events: VecDeque::new(),
                calls: Vec::new(),
                objects: HashMap::new(),
                next_handle: FIRST_OBJECT_HANDLE,
                auto_confirm: true,
                demo: None,
            })),
        }
    }

    /// Mock with the scripted demo flight, used by the `mock` backend of
    /// the daemon.
    pub fn with_demo_flight() -> Self {
        let mock = Self::new();
        mock.lock().demo = Some(DemoFlight::new());
        mock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Test-control surface, used through a clone of the driver's link

    /// Queue an event for the next poll.
    pub fn push_event(&self, event: SimEvent) {
        self.lock().events.push_back(event);
    }

    /// Fail the next `count` open() calls.
    pub fn fail_next_opens(&self, count: u32) {
        self.lock().open_failures = count;
    }

    /// Confirm creations immediately (default) or leave them pending.
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.lock().auto_confirm = enabled;
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Recorded host calls in call order.
    pub fn calls(&self) -> Vec<SimCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Handles of objects currently alive in the mock world, ascending.
    pub fn live_handles(&self) -> Vec<ObjectHandle> {
        let mut handles: Vec<ObjectHandle> = self.lock().objects.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn subscriptions(&self) -> Vec<SystemEvent> {
        self.lock().subscriptions.clone()
    }

    pub fn state_requests(&self) -> Vec<RequestId> {
        self.lock().state_requests.clone()
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorLink for MockSimulator {
    fn open(&mut self) -> Result<()> {
        let mut inner = self.lock();
        if inner.open_failures > 0 {
            inner.open_failures -= 1;
            return Err(Error::NotConnected);
        }
        inner.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, event: SystemEvent) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        inner.subscriptions.push(event);
        Ok(())
    }

    fn request_periodic_state(&mut self, request: RequestId) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        inner.state_requests.push(request);
        Ok(())
    }

    fn create_object(
        &mut self,
        model: &str,
        position: WorldPosition,
        request: RequestId,
    ) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        inner.calls.push(SimCall::Create {
            model: model.to_string(),
            position,
            request,
        });
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.objects.insert(handle, model.to_string());
        if inner.auto_confirm {
            inner
                .events
                .push_back(SimEvent::ObjectAssigned { request, handle });
        }
        Ok(())
    }

    fn remove_object(&mut self, handle: ObjectHandle, request: RequestId) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        inner.calls.push(SimCall::Remove { handle, request });
        inner.objects.remove(&handle);
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<SimEvent>> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        if let Some(event) = inner.events.pop_front() {
            return Ok(Some(event));
        }
        if let Some(demo) = inner.demo.as_mut() {
            return Ok(demo.tick());
        }
        Ok(None)
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        inner.connected = false;
        inner.events.clear();
        // Objects survive: a host does not destroy the world because one
        // client went away
        if let Some(demo) = inner.demo.as_mut() {
            demo.announced = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_require_connection() {
        let mut mock = MockSimulator::new();
        assert!(mock.poll_event().is_err());
        assert!(mock.subscribe(SystemEvent::SimulationStarted).is_err());

        mock.open().unwrap();
        assert!(mock.poll_event().unwrap().is_none());
    }

    #[test]
    fn test_open_failure_countdown() {
        let mut mock = MockSimulator::new();
        mock.fail_next_opens(2);
        assert!(mock.open().is_err());
        assert!(mock.open().is_err());
        assert!(mock.open().is_ok());
        assert!(mock.is_connected());
    }

    #[test]
    fn test_create_auto_confirms_with_matching_request() {
        let mut mock = MockSimulator::new();
        mock.open().unwrap();
        mock.create_object("Windsock", WorldPosition::default(), 77)
            .unwrap();

        let event = mock.poll_event().unwrap().unwrap();
        let SimEvent::ObjectAssigned { request, handle } = event else {
            panic!("expected an assignment, got {:?}", event);
        };
        assert_eq!(request, 77);
        assert_eq!(mock.live_handles(), vec![handle]);
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_remove_deletes_object() {
        let mut mock = MockSimulator::new();
        mock.open().unwrap();
        mock.create_object("Windsock", WorldPosition::default(), 1)
            .unwrap();
        let handle = mock.live_handles()[0];

        mock.remove_object(handle, 2).unwrap();
        assert!(mock.live_handles().is_empty());
    }

    #[test]
    fn test_demo_flight_announces_then_streams() {
        let mut mock = MockSimulator::with_demo_flight();
        mock.open().unwrap();

        assert_eq!(
            mock.poll_event().unwrap(),
            Some(SimEvent::SimulationStarted)
        );
        // The first telemetry sample arrives one tick later
        std::thread::sleep(Duration::from_millis(DEMO_TICK_MS + 50));
        match mock.poll_event().unwrap() {
            Some(SimEvent::Telemetry(state)) => {
                assert!((state.position.latitude - DEMO_CENTER_LAT).abs() < 1.0);
                assert!((state.position.longitude - DEMO_CENTER_LON).abs() < 1.0);
            }
            other => panic!("expected telemetry, got {:?}", other),
        }
    }
}
