//! Simulation dispatch loop
//!
//! Owns the host connection and all indicator book-keeping. One
//! dedicated thread runs the whole connection lifecycle:
//!
//! ```text
//!                 ┌────────────────────────────────────────────┐
//!                 ▼                                            │
//! Disconnected → Connecting → Connected ─┬─▶ SimulationActive  │ host
//!                 ▲  (retry               └─▶ SimulationInactive│ quit
//!                 │   forever)                                 │
//!                 └────────────────────────────────────────────┘
//!                        ShuttingDown → Stopped on daemon exit
//! ```
//!
//! Connecting retries indefinitely with a fixed backoff; the host may
//! simply not be running yet, and may go away and come back at any
//! time. A host quit voids every correlation (request ids, object
//! handles), so the registry is cleared and the loop reconnects without
//! restarting the process.
//!
//! Commands arrive from the UDP thread through an unbounded channel and
//! are executed between event polls, so the receive thread never waits
//! on host API latency. The channel handoff also means a command can
//! arrive just as the simulation stops; the state is therefore checked
//! both at submission and again at execution.

use crate::catalog::IndicatorCatalog;
use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::protocol::Command;
use crate::registry::IndicatorRegistry;
use crate::sim::{STATE_POLL_REQUEST, SimEvent, SimulatorLink, SystemEvent, TelemetrySink};
use crate::types::{IndicatorId, ObjectHandle, WorldPosition};
use crate::udp::CommandHandler;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Connection lifecycle of the dispatch loop.
///
/// One enum behind one lock; every state question has exactly one
/// answer at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    SimulationActive,
    SimulationInactive,
    ShuttingDown,
    Stopped,
}

/// Slice long backoff sleeps so shutdown stays responsive
const SHUTDOWN_POLL_MS: u64 = 50;

/// State shared between the dispatch thread and command submitters
struct Shared {
    link: Mutex<Box<dyn SimulatorLink>>,
    state: Mutex<LinkState>,
    registry: IndicatorRegistry,
    catalog: IndicatorCatalog,
    sink: Box<dyn TelemetrySink>,
}

/// Why the per-connection event loop ended
enum SessionEnd {
    Shutdown,
    HostQuit,
}

/// Driver for one simulation host connection.
///
/// [`start`](Self::start) spawns the dispatch thread;
/// [`handle`](Self::handle) hands out cheap clones for submitting
/// commands from other threads.
pub struct SimulatorDriver {
    shared: Arc<Shared>,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
    /// Set to stop the dispatch thread
    shutdown: Arc<AtomicBool>,
    /// Dispatch thread handle, joined on shutdown
    thread: Option<JoinHandle<()>>,
    retry_delay: Duration,
    poll_idle: Duration,
}

impl SimulatorDriver {
    pub fn new(
        link: Box<dyn SimulatorLink>,
        catalog: IndicatorCatalog,
        sink: Box<dyn TelemetrySink>,
        config: &SimulatorConfig,
    ) -> Self {
        let (command_tx, command_rx) = unbounded();
        Self {
            shared: Arc::new(Shared {
                link: Mutex::new(link),
                state: Mutex::new(LinkState::Disconnected),
                registry: IndicatorRegistry::new(),
                catalog,
                sink,
            }),
            command_tx,
            command_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            thread: None,
            retry_delay: Duration::from_millis(config.connect_retry_ms),
            poll_idle: Duration::from_millis(config.poll_idle_ms),
        }
    }

    /// Spawn the dispatch thread.
    pub fn start(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let shutdown = Arc::clone(&self.shutdown);
        let commands = self.command_rx.clone();
        let retry = self.retry_delay;
        let idle = self.poll_idle;

        self.thread = Some(
            thread::Builder::new()
                .name("sim-dispatch".to_string())
                .spawn(move || {
                    shared.dispatch_loop(&commands, &shutdown, retry, idle);
                })
                .map_err(|e| Error::Other(format!("Failed to spawn dispatch thread: {}", e)))?,
        );

        log::info!("Simulation dispatch started");
        Ok(())
    }

    /// Handle for submitting commands from other threads.
    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            shared: Arc::clone(&self.shared),
            tx: self.command_tx.clone(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    /// Number of indicators with a confirmed in-world object.
    pub fn tracked_indicators(&self) -> usize {
        self.shared.registry.tracked_count()
    }

    /// Stop the dispatch thread and wait for it to finish.
    pub fn shutdown(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            handle.join().map_err(|_| Error::ThreadPanic)?;
        }
        Ok(())
    }
}

impl Drop for SimulatorDriver {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Cheap cloneable command submitter for the dispatch loop
#[derive(Clone)]
pub struct DriverHandle {
    shared: Arc<Shared>,
    tx: Sender<Command>,
}

impl CommandHandler for DriverHandle {
    fn handle_command(&self, command: Command) {
        let state = self.shared.state();
        if state != LinkState::SimulationActive {
            log::warn!(
                "Dropping command while simulation is not active ({:?}): {:?}",
                state,
                command
            );
            return;
        }
        if self.tx.send(command).is_err() {
            log::error!("Dispatch loop unavailable, command dropped");
        }
    }
}

impl Shared {
    fn dispatch_loop(
        &self,
        commands: &Receiver<Command>,
        shutdown: &AtomicBool,
        retry: Duration,
        idle: Duration,
    ) {
        log::info!("Simulation dispatch loop running");

        while !shutdown.load(Ordering::Relaxed) {
            self.set_state(LinkState::Connecting);
            if !self.connect_with_retry(shutdown, retry) {
                break;
            }
            self.set_state(LinkState::Connected);

            if let Err(e) = self.begin_session() {
                log::error!("Host session setup failed: {}", e);
                self.lock_link().close();
                sleep_unless_shutdown(shutdown, retry);
                continue;
            }

            match self.session_loop(commands, shutdown, idle) {
                SessionEnd::HostQuit => continue,
                SessionEnd::Shutdown => break,
            }
        }

        self.set_state(LinkState::ShuttingDown);
        self.lock_link().close();
        self.set_state(LinkState::Stopped);
        log::info!("Simulation dispatch loop stopped");
    }

    /// Open the host connection, retrying forever with a fixed backoff.
    /// Returns false if shutdown was requested while waiting.
    fn connect_with_retry(&self, shutdown: &AtomicBool, retry: Duration) -> bool {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }
            match self.lock_link().open() {
                Ok(()) => {
                    log::info!("Connected to simulation host");
                    return true;
                }
                Err(e) => {
                    log::warn!(
                        "Simulation host not available: {} (retrying in {} ms)",
                        e,
                        retry.as_millis()
                    );
                }
            }
            sleep_unless_shutdown(shutdown, retry);
        }
    }

    /// Subscribe to lifecycle events and order periodic telemetry.
    fn begin_session(&self) -> Result<()> {
        let mut link = self.lock_link();
        link.subscribe(SystemEvent::SimulationStarted)?;
        link.subscribe(SystemEvent::SimulationStopped)?;
        link.request_periodic_state(STATE_POLL_REQUEST)?;
        Ok(())
    }

    /// Drain queued commands and poll host events until the host quits
    /// or the daemon shuts down.
    fn session_loop(
        &self,
        commands: &Receiver<Command>,
        shutdown: &AtomicBool,
        idle: Duration,
    ) -> SessionEnd {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return SessionEnd::Shutdown;
            }

            loop {
                match commands.try_recv() {
                    Ok(command) => self.execute_command(command),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return SessionEnd::Shutdown,
                }
            }

            let polled = self.lock_link().poll_event();
            match polled {
                Ok(Some(event)) => {
                    if self.handle_event(event) {
                        return SessionEnd::HostQuit;
                    }
                }
                Ok(None) => thread::sleep(idle),
                Err(e) => {
                    log::warn!("Host event poll failed: {}", e);
                    thread::sleep(idle);
                }
            }
        }
    }

    /// React to one host event. Returns true when the host connection is
    /// gone and the loop must reconnect.
    fn handle_event(&self, event: SimEvent) -> bool {
        match event {
            SimEvent::SimulationStarted => {
                self.set_state(LinkState::SimulationActive);
            }
            SimEvent::SimulationStopped => {
                self.set_state(LinkState::SimulationInactive);
                // Stale markers must not survive into the next flight
                self.remove_all_indicators("simulation stopped");
            }
            SimEvent::ObjectAssigned { request, handle } => {
                if let Some(confirmation) = self.registry.confirm_object(request, handle) {
                    log::debug!(
                        "Indicator {} confirmed as object {}",
                        confirmation.indicator,
                        handle
                    );
                    if let Some(stale) = confirmation.replaced {
                        log::debug!(
                            "Removing superseded object {} for indicator {}",
                            stale,
                            confirmation.indicator
                        );
                        let removal = self.registry.allocate_request();
                        if let Err(e) = self.lock_link().remove_object(stale, removal) {
                            log::warn!("Failed to remove superseded object {}: {}", stale, e);
                        }
                    }
                }
            }
            SimEvent::Telemetry(state) => {
                // The host keeps sending samples while parked in a menu;
                // only an active flight is worth forwarding
                if self.state() == LinkState::SimulationActive {
                    self.sink.publish(&state);
                } else {
                    log::trace!("Dropping telemetry sample while simulation inactive");
                }
            }
            SimEvent::Quit => {
                log::warn!("Simulation host quit");
                let dropped = self.registry.tracked_count();
                self.registry.clear();
                self.catalog.reset();
                if dropped > 0 {
                    log::info!("Dropped {} tracked indicator mappings", dropped);
                }
                self.lock_link().close();
                self.set_state(LinkState::Disconnected);
                return true;
            }
        }
        false
    }

    fn execute_command(&self, command: Command) {
        // Re-check here: the simulation may have stopped between the UDP
        // thread's handoff and this drain
        let state = self.state();
        if state != LinkState::SimulationActive {
            log::warn!(
                "Dropping queued command, simulation no longer active ({:?}): {:?}",
                state,
                command
            );
            return;
        }

        match command {
            Command::SetIndicator {
                id,
                type_id,
                position,
            } => self.set_indicator(id, type_id, position),
            Command::RemoveIndicators { ids } => self.remove_indicators(&ids),
        }
    }

    fn set_indicator(&self, id: IndicatorId, type_id: u32, position: WorldPosition) {
        let Some(model) = self.catalog.resolve(type_id) else {
            log::warn!("Unknown indicator type {} for indicator {}", type_id, id);
            return;
        };

        let request = self.registry.reserve_request(id);

        // At most one live object per id: replace by removing first
        if let Some(old) = self.registry.forget(id) {
            let removal = self.registry.allocate_request();
            if let Err(e) = self.lock_link().remove_object(old, removal) {
                log::warn!("Failed to remove object {} for indicator {}: {}", old, id, e);
            }
        }

        log::debug!(
            "Placing indicator {} ({}) at {:.6}, {:.6} as request {}",
            id,
            model,
            position.latitude,
            position.longitude,
            request
        );
        if let Err(e) = self.lock_link().create_object(&model, position, request) {
            log::warn!("Failed to create object for indicator {}: {}", id, e);
            self.registry.abandon_request(request);
        }
    }

    fn remove_indicators(&self, ids: &[IndicatorId]) {
        if ids.is_empty() {
            self.remove_all_indicators("remove-all requested");
            return;
        }
        for &id in ids {
            match self.registry.forget(id) {
                Some(handle) => self.remove_object(handle, id),
                None => log::warn!("Remove requested for unknown indicator {}", id),
            }
        }
    }

    fn remove_all_indicators(&self, reason: &str) {
        let ids = self.registry.all_external_ids();
        if ids.is_empty() {
            return;
        }
        log::info!("Removing {} tracked indicators ({})", ids.len(), reason);
        for id in ids {
            if let Some(handle) = self.registry.forget(id) {
                self.remove_object(handle, id);
            }
        }
    }

    fn remove_object(&self, handle: ObjectHandle, id: IndicatorId) {
        let removal = self.registry.allocate_request();
        if let Err(e) = self.lock_link().remove_object(handle, removal) {
            log::warn!(
                "Failed to remove object {} for indicator {}: {}",
                handle,
                id,
                e
            );
        }
    }

    fn state(&self) -> LinkState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: LinkState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            log::info!("Link state: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    fn lock_link(&self) -> std::sync::MutexGuard<'_, Box<dyn SimulatorLink>> {
        self.link.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn sleep_unless_shutdown(shutdown: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(SHUTDOWN_POLL_MS);
    let mut remaining = total;
    while remaining > Duration::ZERO && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
