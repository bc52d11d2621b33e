use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{BrewError, SessionError},
    models::{SessionPatch, SessionProgress, SessionStatus},
    store::SessionStore,
};

use super::{BrewMachine, BrewPlan, BrewSnapshot, BrewStage, MachineTick, Transition};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrewEvent {
    #[serde(rename_all = "camelCase")]
    StageChanged {
        transition: Transition,
        snapshot: BrewSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    Tick {
        stage: BrewStage,
        remaining_secs: u32,
        total_secs: u32,
        progress: f64,
    },
    Paused { snapshot: BrewSnapshot },
    Resumed { snapshot: BrewSnapshot },
    Cancelled { snapshot: BrewSnapshot },
    #[serde(rename_all = "camelCase")]
    SessionRemoved { session_id: String },
}

#[derive(Clone)]
struct SessionBinding {
    store: SessionStore,
    session_id: String,
}

/// State shared between the controller handles and the ticker task.
#[derive(Clone)]
struct Shared {
    machine: Arc<Mutex<BrewMachine>>,
    events: broadcast::Sender<BrewEvent>,
    binding: Option<SessionBinding>,
    log_ticks: bool,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Owns the one live ticker. Dropping the last controller handle stops it.
#[derive(Default)]
struct TickerSlot {
    current: StdMutex<Option<Ticker>>,
}

impl TickerSlot {
    fn replace(&self, next: Option<Ticker>) {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = guard.take() {
            previous.stop();
        }
        *guard = next;
    }
}

impl Drop for TickerSlot {
    fn drop(&mut self) {
        self.replace(None);
    }
}

/// Drives a [`BrewMachine`] in real time and, for session brews, writes
/// each transition back to the [`SessionStore`].
#[derive(Clone)]
pub struct BrewController {
    shared: Shared,
    ticker: Arc<TickerSlot>,
    tick_interval: Duration,
}

impl BrewController {
    pub fn new(plan: BrewPlan) -> Self {
        Self::from_machine(BrewMachine::new(plan), None)
    }

    /// Controller for a stored session. Activates the session and rejects
    /// sessions whose steep table cannot drive a brew.
    pub async fn for_session(store: SessionStore, session_id: &str) -> Result<Self, SessionError> {
        let session = store
            .set_active(Some(session_id))
            .await
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let machine = BrewMachine::for_session(&session)?;

        Ok(Self::from_machine(
            machine,
            Some(SessionBinding {
                store,
                session_id: session.id,
            }),
        ))
    }

    fn from_machine(machine: BrewMachine, binding: Option<SessionBinding>) -> Self {
        let debug_mode = std::env::var("TEABREW_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Shared {
                machine: Arc::new(Mutex::new(machine)),
                events,
                binding,
                log_ticks: debug_mode,
            },
            ticker: Arc::new(TickerSlot::default()),
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Overrides the one-second cadence.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrewEvent> {
        self.shared.events.subscribe()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.shared
            .binding
            .as_ref()
            .map(|binding| binding.session_id.as_str())
    }

    pub async fn snapshot(&self) -> BrewSnapshot {
        self.shared.machine.lock().await.snapshot()
    }

    pub async fn plan(&self) -> BrewPlan {
        self.shared.machine.lock().await.plan().clone()
    }

    pub async fn begin(&self) -> Result<BrewSnapshot, BrewError> {
        self.apply(BrewMachine::begin).await
    }

    pub async fn next_steep(&self) -> Result<BrewSnapshot, BrewError> {
        self.apply(BrewMachine::next_steep).await
    }

    pub async fn complete(&self) -> Result<BrewSnapshot, BrewError> {
        self.apply(BrewMachine::complete).await
    }

    pub async fn brew_another(&self) -> Result<BrewSnapshot, BrewError> {
        self.apply(BrewMachine::brew_another).await
    }

    /// Suspends the countdown. Bound sessions are marked paused even when
    /// no countdown was running.
    pub async fn pause(&self) -> Result<BrewSnapshot, BrewError> {
        let (result, snapshot) = {
            let mut machine = self.shared.machine.lock().await;
            let result = machine.pause();
            (result, machine.snapshot())
        };

        match (&result, &self.shared.binding) {
            (Ok(()), _) => self.ticker.replace(None),
            (Err(err), None) => return Err(err.clone()),
            (Err(_), Some(_)) => {}
        }

        if let Some(binding) = &self.shared.binding {
            binding.store.pause(&binding.session_id).await;
        }

        log_info!(
            "Brew paused in {} with {}s left",
            snapshot.stage,
            snapshot.remaining_secs
        );
        self.shared.emit(BrewEvent::Paused {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Continues a paused countdown from its remaining time.
    pub async fn resume(&self) -> Result<BrewSnapshot, BrewError> {
        let (result, snapshot, epoch) = {
            let mut machine = self.shared.machine.lock().await;
            let result = machine.resume();
            (result, machine.snapshot(), machine.epoch())
        };

        if let Some(binding) = &self.shared.binding {
            binding.store.resume(&binding.session_id).await;
        }

        match result {
            Ok(()) => {
                self.spawn_ticker(epoch);
                self.shared
                    .update_session(SessionPatch::status(status_for(snapshot.stage)))
                    .await;
            }
            Err(err) if self.shared.binding.is_none() => return Err(err),
            Err(_) => {}
        }

        self.shared.emit(BrewEvent::Resumed {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Leaves the brew: abandons any countdown and returns to preparation
    /// for the current steep. The stored session is left as it was.
    pub async fn cancel(&self) -> BrewSnapshot {
        let snapshot = {
            let mut machine = self.shared.machine.lock().await;
            machine.cancel();
            machine.snapshot()
        };
        self.ticker.replace(None);

        self.shared.emit(BrewEvent::Cancelled {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    /// Stops the ticker without touching the machine.
    pub fn shutdown(&self) {
        self.ticker.replace(None);
    }

    async fn apply<F>(&self, action: F) -> Result<BrewSnapshot, BrewError>
    where
        F: FnOnce(&mut BrewMachine) -> Result<Transition, BrewError>,
    {
        // The store write happens under the machine lock, so a ticker can
        // never land a write from an older run after this one.
        let mut machine = self.shared.machine.lock().await;
        let transition = action(&mut *machine)?;
        let snapshot = machine.snapshot();

        if machine.is_counting() {
            self.spawn_ticker(machine.epoch());
        } else {
            self.ticker.replace(None);
        }

        self.shared.record(&transition, &snapshot).await;
        Ok(snapshot)
    }

    /// Stops the previous ticker before the new one is spawned.
    fn spawn_ticker(&self, epoch: u64) {
        self.ticker.replace(None);

        let shared = self.shared.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            shared.run_ticker(epoch, tick_interval, token).await;
        });

        self.ticker.replace(Some(Ticker { handle, cancel }));
    }
}

impl Shared {
    async fn run_ticker(&self, epoch: u64, tick_interval: Duration, cancel: CancellationToken) {
        let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut held = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    match self.session_gate().await {
                        Gate::Removed(session_id) => {
                            self.abandon(epoch, session_id).await;
                            break;
                        }
                        Gate::Held => {
                            held = true;
                            continue;
                        }
                        Gate::Open => {}
                    }

                    // Held across the store writes below; a stale run
                    // exits here without writing anything.
                    let mut machine = self.machine.lock().await;
                    if machine.epoch() != epoch {
                        break;
                    }
                    let outcome = machine.tick();
                    let snapshot = machine.snapshot();

                    if held {
                        held = false;
                        self.update_session(SessionPatch::status(status_for(snapshot.stage)))
                            .await;
                    }

                    match outcome {
                        MachineTick::Ignored => break,
                        MachineTick::Counted { remaining_secs } => {
                            if self.log_ticks {
                                log_debug!("{} tick: {}s left", snapshot.stage, remaining_secs);
                            }
                            self.emit(BrewEvent::Tick {
                                stage: snapshot.stage,
                                remaining_secs,
                                total_secs: snapshot.total_secs,
                                progress: snapshot.progress,
                            });
                        }
                        MachineTick::Transitioned(transition) => {
                            self.record(&transition, &snapshot).await;
                            if !snapshot.stage.is_timed() {
                                break;
                            }
                        }
                    }
                    drop(machine);
                }
            }
        }
    }

    /// Whether the bound session still wants ticks.
    async fn session_gate(&self) -> Gate {
        let Some(binding) = &self.binding else {
            return Gate::Open;
        };
        match binding.store.get(&binding.session_id).await {
            None => Gate::Removed(binding.session_id.clone()),
            Some(session) if session.status == SessionStatus::Paused => Gate::Held,
            Some(_) => Gate::Open,
        }
    }

    async fn abandon(&self, epoch: u64, session_id: String) {
        {
            let mut machine = self.machine.lock().await;
            if machine.epoch() == epoch {
                machine.cancel();
            }
        }
        log_warn!("Session {session_id} was deleted mid-brew; countdown stopped");
        self.emit(BrewEvent::SessionRemoved { session_id });
    }

    async fn record(&self, transition: &Transition, snapshot: &BrewSnapshot) {
        log_info!(
            "Steep {}/{}: {} -> {}",
            transition.steep,
            snapshot.total_steeps,
            transition.from,
            transition.to
        );

        if let Some(binding) = &self.binding {
            let previous_start = binding
                .store
                .get(&binding.session_id)
                .await
                .and_then(|session| session.progress.current_step_start_time);
            let current_step_start_time = if transition.to == BrewStage::Heating {
                Some(Utc::now())
            } else {
                previous_start
            };

            self.update_session(SessionPatch {
                status: Some(status_for(transition.to)),
                current_steep: Some(transition.steep),
                progress: Some(SessionProgress {
                    completed_steeps: snapshot.completed_steeps.clone(),
                    current_step_start_time,
                }),
                ..SessionPatch::default()
            })
            .await;
        }

        self.emit(BrewEvent::StageChanged {
            transition: *transition,
            snapshot: snapshot.clone(),
        });
    }

    async fn update_session(&self, patch: SessionPatch) {
        if let Some(binding) = &self.binding {
            match binding.store.update(&binding.session_id, patch).await {
                Ok(Some(_)) => {}
                Ok(None) => log_warn!("Session {} vanished before update", binding.session_id),
                Err(err) => log_warn!("Session {} rejected update: {}", binding.session_id, err),
            }
        }
    }

    fn emit(&self, event: BrewEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

enum Gate {
    Open,
    Held,
    Removed(String),
}

/// Session status persisted for each stage. `Ready` waits on the user, so
/// it is stored as preparing.
pub fn status_for(stage: BrewStage) -> SessionStatus {
    match stage {
        BrewStage::Preparation | BrewStage::Ready => SessionStatus::Preparing,
        BrewStage::Heating => SessionStatus::Heating,
        BrewStage::Steeping => SessionStatus::Steeping,
        BrewStage::Completed => SessionStatus::Completed,
    }
}
