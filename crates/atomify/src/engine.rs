//! # Sync Engine
//!
//! Drives a [`SimulationBackend`] at a fixed cadence and mirrors every step
//! onto an [`EntityPool`].
//!
//! ```text
//! ┌─────────────────────────── tick thread ───────────────────────────┐
//! │ lock session                                                      │
//! │   1. pending reset?  backend.reset(preset)      → ResetApplied    │
//! │   2. backend.step()                                               │
//! │   3. backend.synchronize() → ParticleState                        │
//! │   4. reconcile(pool, state) → PlacementSnapshot                   │
//! │ unlock                                                            │
//! │ publish snapshot                                → TickCompleted   │
//! │   (any failure or panic in 1-4                  → TickFailed)     │
//! │ wait for next slot, or stop signal              → TickDeferred    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machine
//!
//! `Idle --start--> Running --stop--> Idle`. While idle the caller may
//! attach a backend and run single ticks with [`SyncEngine::tick_now`].
//!
//! ## Thread Safety
//!
//! The backend and pool live in one `Mutex`-guarded session. Only the tick
//! thread locks it while running, so ticks are strictly sequential and
//! `stop()` (which joins the thread) waits out an in-flight tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use atomify_core::{reconcile, EntityPool, EntityRenderer, PlacementSnapshot, PlacementsHandle};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::backend::SimulationBackend;
use crate::config::EngineConfig;
use crate::error::{BackendResult, EngineError, EngineResult, TickError};
use crate::events::{EventHub, EventReceiver, SyncEvent};
use crate::tick::{TickClock, TickStats, MAX_CADENCE};

/// Lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No tick thread.
    Idle,
    /// Tick thread running.
    Running,
}

/// Everything a tick mutates.
struct Session<B, R: EntityRenderer> {
    backend: Option<B>,
    pool: EntityPool<R>,
    clock: TickClock,
}

/// State shared between the engine handle and its tick thread.
struct Shared<B, R: EntityRenderer> {
    session: Mutex<Session<B, R>>,
    pending_reset: Mutex<Option<String>>,
    placements: PlacementsHandle,
    events: EventHub,
    stats: Mutex<TickStats>,
}

/// Running tick thread.
struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Mirrors a stepping simulation onto renderable entities.
pub struct SyncEngine<B, R>
where
    B: SimulationBackend + 'static,
    R: EntityRenderer + 'static,
{
    shared: Arc<Shared<B, R>>,
    config: EngineConfig,
    worker: Option<Worker>,
}

impl<B, R> SyncEngine<B, R>
where
    B: SimulationBackend + 'static,
    R: EntityRenderer + 'static,
{
    /// Creates an idle engine with no backend.
    #[must_use]
    pub fn new(renderer: R, config: EngineConfig) -> Self {
        let clock = TickClock::new(config.cadence());
        let stats = *clock.stats();
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    backend: None,
                    pool: EntityPool::new(renderer),
                    clock,
                }),
                pending_reset: Mutex::new(None),
                placements: PlacementsHandle::new(),
                events: EventHub::new(config.event_capacity),
                stats: Mutex::new(stats),
            }),
            config,
            worker: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.worker.is_some() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    /// Returns true while the tick thread runs.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Installs `backend`, replacing and returning any previous one.
    ///
    /// # Errors
    ///
    /// [`EngineError::Running`] while the tick thread runs.
    pub fn attach_backend(&mut self, backend: B) -> EngineResult<Option<B>> {
        if self.is_running() {
            return Err(EngineError::Running);
        }
        Ok(self.shared.session.lock().backend.replace(backend))
    }

    /// Removes and returns the backend.
    ///
    /// # Errors
    ///
    /// [`EngineError::Running`] while the tick thread runs.
    pub fn detach_backend(&mut self) -> EngineResult<Option<B>> {
        if self.is_running() {
            return Err(EngineError::Running);
        }
        Ok(self.shared.session.lock().backend.take())
    }

    /// Installs `backend` and starts ticking every `cadence`.
    ///
    /// The configured `initial_preset`, if any, is queued as a reset for
    /// the first tick.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyRunning`] if started twice,
    /// [`EngineError::InvalidCadence`] above [`MAX_CADENCE`], or
    /// [`EngineError::Spawn`] if the thread cannot be created.
    pub fn start(&mut self, backend: B, cadence: Duration) -> EngineResult<()> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        check_cadence(cadence)?;
        self.shared.session.lock().backend = Some(backend);
        if let Some(preset) = &self.config.initial_preset {
            let mut pending = self.shared.pending_reset.lock();
            if pending.is_none() {
                *pending = Some(preset.clone());
            }
        }
        self.resume(cadence)
    }

    /// Starts ticking with the backend already attached.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyRunning`], [`EngineError::InvalidCadence`],
    /// [`EngineError::NoBackend`], or [`EngineError::Spawn`].
    pub fn resume(&mut self, cadence: Duration) -> EngineResult<()> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        check_cadence(cadence)?;
        {
            let mut session = self.shared.session.lock();
            if session.backend.is_none() {
                return Err(EngineError::NoBackend);
            }
            session.clock.set_cadence(cadence);
        }

        let (stop_tx, stop_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("atomify-tick".to_string())
            .spawn(move || tick_loop(&shared, cadence, &stop_rx))
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        self.worker = Some(Worker { stop_tx, handle });
        tracing::info!("sync engine started at {:?} cadence", cadence);
        Ok(())
    }

    /// Stops the tick thread, waiting for an in-flight tick to finish.
    ///
    /// No-op while idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // Disconnect also wakes the loop, so a failed send is fine.
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            tracing::error!("tick thread panicked outside a tick");
        }

        let ticks = self.shared.session.lock().clock.tick_count();
        tracing::info!("sync engine stopped after {} ticks", ticks);
        self.shared.events.publish(&SyncEvent::Stopped { ticks });
    }

    /// Runs one tick on the calling thread.
    ///
    /// # Errors
    ///
    /// [`EngineError::Running`] while the tick thread runs,
    /// [`EngineError::NoBackend`] without a backend, or
    /// [`EngineError::Tick`] if the tick failed.
    pub fn tick_now(&self) -> EngineResult<Arc<PlacementSnapshot>> {
        if self.is_running() {
            return Err(EngineError::Running);
        }
        let mut session = self.shared.session.lock();
        if session.backend.is_none() {
            return Err(EngineError::NoBackend);
        }
        Ok(execute_tick(&self.shared, &mut session)?)
    }

    /// Queues a backend reset for the start of the next tick.
    ///
    /// A later request before that tick replaces an earlier one.
    pub fn request_reset(&self, preset: impl Into<String>) {
        let preset = preset.into();
        tracing::debug!("reset to {} queued", preset);
        *self.shared.pending_reset.lock() = Some(preset);
    }

    /// Subscribes to engine events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PlacementSnapshot> {
        self.shared.placements.latest()
    }

    /// Clonable handle to the published snapshots, for other threads.
    #[must_use]
    pub fn placements(&self) -> PlacementsHandle {
        self.shared.placements.clone()
    }

    /// Timing statistics as of the last finished tick.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        *self.shared.stats.lock()
    }

    /// Runs `f` with the pool between ticks.
    ///
    /// Blocks while a tick is in progress.
    pub fn with_pool<T>(&self, f: impl FnOnce(&EntityPool<R>) -> T) -> T {
        f(&self.shared.session.lock().pool)
    }

    /// Runs `f` with the backend between ticks.
    pub fn with_backend<T>(&self, f: impl FnOnce(Option<&B>) -> T) -> T {
        f(self.shared.session.lock().backend.as_ref())
    }
}

impl<B, R> Drop for SyncEngine<B, R>
where
    B: SimulationBackend + 'static,
    R: EntityRenderer + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<B, R> std::fmt::Debug for SyncEngine<B, R>
where
    B: SimulationBackend + 'static,
    R: EntityRenderer + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("generation", &self.shared.placements.generation())
            .finish_non_exhaustive()
    }
}

fn check_cadence(cadence: Duration) -> EngineResult<()> {
    if cadence > MAX_CADENCE {
        return Err(EngineError::InvalidCadence(cadence));
    }
    Ok(())
}

fn tick_loop<B, R>(shared: &Shared<B, R>, cadence: Duration, stop_rx: &Receiver<()>)
where
    B: SimulationBackend,
    R: EntityRenderer,
{
    shared.events.publish(&SyncEvent::Started { cadence });
    let mut next = Instant::now() + cadence;

    loop {
        let wait = next.saturating_duration_since(Instant::now());
        let stopped = if wait.is_zero() {
            !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
        } else {
            !matches!(stop_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout))
        };
        if stopped {
            break;
        }

        let mut session = shared.session.lock();
        let started = Instant::now();
        // Failures are already logged and published.
        let _ = execute_tick(shared, &mut session);

        let scheduled = session.clock.schedule(started, Instant::now());
        let upcoming = session.clock.tick_count() + 1;
        *shared.stats.lock() = *session.clock.stats();
        drop(session);

        if let Some(lag) = scheduled.lag {
            tracing::debug!("tick {} deferred by {:?}", upcoming, lag);
            shared.events.publish(&SyncEvent::TickDeferred {
                tick: upcoming,
                lag,
            });
        }
        next = scheduled.at;
    }
}

/// Runs one tick against a locked session, publishing its outcome.
fn execute_tick<B, R>(
    shared: &Shared<B, R>,
    session: &mut Session<B, R>,
) -> Result<Arc<PlacementSnapshot>, TickError>
where
    B: SimulationBackend,
    R: EntityRenderer,
{
    let (tick, start) = session.clock.begin_tick();
    let result = run_phases(shared, session);
    let duration = session.clock.end_tick(start, result.is_ok());
    *shared.stats.lock() = *session.clock.stats();

    match result {
        Ok(snapshot) => {
            let particles = snapshot.particle_count();
            shared.placements.cell().publish(snapshot.with_tick(tick));
            shared.events.publish(&SyncEvent::TickCompleted {
                tick,
                particles,
                duration,
            });
            Ok(shared.placements.latest())
        }
        Err(error) => {
            tracing::warn!("tick {} failed: {}", tick, error);
            shared.events.publish(&SyncEvent::TickFailed {
                tick,
                error: error.clone(),
            });
            Err(error)
        }
    }
}

fn run_phases<B, R>(
    shared: &Shared<B, R>,
    session: &mut Session<B, R>,
) -> Result<PlacementSnapshot, TickError>
where
    B: SimulationBackend,
    R: EntityRenderer,
{
    let Session { backend, pool, .. } = session;
    let Some(backend) = backend.as_mut() else {
        return Err(TickError::NoBackend);
    };

    let pending = shared.pending_reset.lock().take();
    if let Some(preset) = pending {
        guarded("reset", || backend.reset(&preset))?;
        tracing::info!("backend reset to {}", preset);
        shared.events.publish(&SyncEvent::ResetApplied { preset });
    }

    guarded("step", || backend.step())?;
    let state = guarded("synchronize", || backend.synchronize())?;

    match panic::catch_unwind(AssertUnwindSafe(|| reconcile::reconcile(pool, &state))) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(TickError::Panicked {
            operation: "reconcile",
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Calls into the backend, turning errors and panics into [`TickError`].
fn guarded<T>(operation: &'static str, f: impl FnOnce() -> BackendResult<T>) -> Result<T, TickError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(TickError::Panicked {
            operation,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
