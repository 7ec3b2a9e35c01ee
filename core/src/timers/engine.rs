//! Timer state machine and tick driver
//!
//! `TimerEngine` implements the idle/running/paused/finished lifecycle on
//! top of the entity store. Commands mutate exactly one record through the
//! store, whose subscribers then receive the updated snapshot; every
//! running timer is additionally driven by its own 1 Hz tick task.
//!
//! # Lifecycle
//!
//! 1. A collaborator inserts an idle record via [`TimerEngine::store`]
//! 2. `start` computes the absolute deadline and spawns the tick loop
//! 3. Each tick re-derives remaining time from the deadline (never a
//!    decrement, so scheduler jitter cannot accumulate)
//! 4. On reaching zero the engine finishes the timer and emits one
//!    completion event

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};
use crate::store::{EntityStore, SubscriptionId};

use super::error::{TimerError, TimerOp};
use super::record::{TimerRecord, TimerStatus};
use super::ticker::{TICK_PERIOD, Tick, TickTasks};

/// Callback invoked with the finished record, exactly once per finish
/// transition.
pub type CompletionListener = Arc<dyn Fn(&TimerRecord) + Send + Sync>;

#[derive(Default)]
struct CompletionListeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, CompletionListener)>,
}

struct EngineInner {
    store: EntityStore<TimerRecord>,
    clock: Arc<dyn Clock>,
    ticks: TickTasks,
    completions: Mutex<CompletionListeners>,
}

/// Cooking-timer engine: state machine, tick scheduler, completion stream.
///
/// Cheap to clone; clones share the same store and tick tasks. Construct
/// one per owning context (typically per cooking session host) rather than
/// sharing a process-wide instance, and call [`TimerEngine::destroy`] when
/// that context is torn down.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<EngineInner>,
}

impl TimerEngine {
    /// Engine on the real system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Engine on an injected clock (manual clocks for tests and replay).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: EntityStore::new(),
                clock,
                ticks: TickTasks::default(),
                completions: Mutex::new(CompletionListeners::default()),
            }),
        }
    }

    /// The underlying record store.
    ///
    /// Collaborators create timers with `store().set(..)`, remove them with
    /// `store().remove(..)`, and observe snapshots with `store().subscribe(..)`.
    pub fn store(&self) -> &EntityStore<TimerRecord> {
        &self.inner.store
    }

    // ─── Commands ───────────────────────────────────────────────────────────

    /// Start an idle or paused timer.
    ///
    /// Computes `end_at = now + remaining_seconds` from the *current*
    /// remaining value, records the acting user, and begins the tick loop.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, id: &str, started_by: &str) -> Result<TimerRecord, TimerError> {
        self.transition_to_running(id, Some(started_by), TimerOp::Start)
    }

    /// Resume a paused timer. Identical effect to [`TimerEngine::start`]
    /// (the deadline is recomputed from the current remaining value), but
    /// only valid from `Paused` and leaves `started_by` untouched.
    pub fn resume(&self, id: &str) -> Result<TimerRecord, TimerError> {
        self.transition_to_running(id, None, TimerOp::Resume)
    }

    fn transition_to_running(
        &self,
        id: &str,
        started_by: Option<&str>,
        op: TimerOp,
    ) -> Result<TimerRecord, TimerError> {
        let now = self.inner.clock.now();
        let mut record = self.get_record(id)?;

        let allowed = match op {
            TimerOp::Start => matches!(record.status, TimerStatus::Idle | TimerStatus::Paused),
            _ => record.status == TimerStatus::Paused,
        };
        if !allowed {
            return Err(TimerError::InvalidTransition {
                id: id.to_string(),
                from: record.status,
                op,
            });
        }

        record.end_at = Some(now + Duration::seconds(record.remaining_seconds));
        record.status = TimerStatus::Running;
        if let Some(user) = started_by {
            record.started_by = Some(user.to_string());
        }
        record.updated_at = now;

        self.inner.store.set(record.clone());
        self.spawn_tick_loop(id);
        tracing::debug!(
            timer = %id,
            remaining = record.remaining_seconds,
            started_by = record.started_by.as_deref().unwrap_or(""),
            "timer running"
        );
        Ok(record)
    }

    /// Pause a running timer, freezing the remaining time computed from the
    /// deadline (floored, identical to what a tick at the same instant
    /// would produce).
    pub fn pause(&self, id: &str) -> Result<TimerRecord, TimerError> {
        let now = self.inner.clock.now();
        let mut record = self.get_record(id)?;

        if record.status != TimerStatus::Running {
            return Err(TimerError::InvalidTransition {
                id: id.to_string(),
                from: record.status,
                op: TimerOp::Pause,
            });
        }

        record.remaining_seconds = record.remaining_at(now);
        record.end_at = None;
        record.status = TimerStatus::Paused;
        record.updated_at = now;

        self.inner.ticks.cancel(id);
        self.inner.store.set(record.clone());
        tracing::debug!(timer = %id, remaining = record.remaining_seconds, "timer paused");
        Ok(record)
    }

    /// Reset a timer to idle with its full configured duration. Valid from
    /// any state; stops the tick loop if one is running.
    pub fn reset(&self, id: &str) -> Result<TimerRecord, TimerError> {
        let now = self.inner.clock.now();
        let mut record = self.get_record(id)?;

        record.remaining_seconds = record.default_seconds;
        record.end_at = None;
        record.status = TimerStatus::Idle;
        record.updated_at = now;

        self.inner.ticks.cancel(id);
        self.inner.store.set(record.clone());
        tracing::debug!(timer = %id, "timer reset");
        Ok(record)
    }

    fn get_record(&self, id: &str) -> Result<TimerRecord, TimerError> {
        self.inner
            .store
            .get(id)
            .ok_or_else(|| TimerError::NotFound { id: id.to_string() })
    }

    // ─── Tick path ──────────────────────────────────────────────────────────

    /// One tick: re-derive remaining time from the stored deadline.
    ///
    /// Never decrements; the value is recomputed from `end_at` so jitter in
    /// when the tick actually fired cannot accumulate. Reaching zero takes
    /// the finish transition instead of writing through the normal update
    /// path, which is what makes the completion event fire exactly once.
    pub(super) fn run_tick(&self, id: &str) -> Tick {
        let now = self.inner.clock.now();
        let Some(mut record) = self.inner.store.get(id) else {
            // record removed externally while its loop was still scheduled
            self.inner.ticks.forget(id);
            return Tick::Stopped;
        };
        if record.status != TimerStatus::Running {
            return Tick::Stopped;
        }

        let remaining = record.remaining_at(now);
        if remaining <= 0 {
            self.finish(record, now);
            Tick::Finished
        } else {
            record.remaining_seconds = remaining;
            record.updated_at = now;
            self.inner.store.set(record);
            Tick::Continue
        }
    }

    /// Terminal transition, reachable only from the tick path.
    fn finish(&self, mut record: TimerRecord, now: DateTime<Utc>) {
        record.remaining_seconds = 0;
        record.end_at = None;
        record.status = TimerStatus::Finished;
        record.updated_at = now;

        self.inner.ticks.forget(&record.id);
        self.inner.store.set(record.clone());

        // copy listeners out so completion callbacks can re-enter the engine
        let listeners: Vec<CompletionListener> = {
            let completions = self.inner.completions.lock().unwrap();
            completions
                .entries
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        tracing::debug!(timer = %record.id, session = %record.session_id, "timer finished");
        for listener in listeners {
            listener(&record);
        }
    }

    fn spawn_tick_loop(&self, id: &str) {
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first interval tick completes immediately; skip it so the
            // first recompute lands one full period after start
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let engine = TimerEngine { inner };
                match engine.run_tick(&task_id) {
                    Tick::Continue => {}
                    Tick::Finished | Tick::Stopped => break,
                }
            }
        });
        self.inner.ticks.insert(id, handle);
    }

    // ─── Completion stream ──────────────────────────────────────────────────

    /// Register a listener for finish transitions. Each listener receives
    /// the finished record exactly once per finish, independent of store
    /// subscriptions.
    pub fn on_complete(
        &self,
        listener: impl Fn(&TimerRecord) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut completions = self.inner.completions.lock().unwrap();
        let id = SubscriptionId::new(completions.next_id);
        completions.next_id += 1;
        completions.entries.push((id, Arc::new(listener)));
        id
    }

    /// Deregister a completion listener. Returns whether it was registered.
    pub fn remove_complete_listener(&self, id: SubscriptionId) -> bool {
        let mut completions = self.inner.completions.lock().unwrap();
        let before = completions.entries.len();
        completions.entries.retain(|(sid, _)| *sid != id);
        completions.entries.len() != before
    }

    // ─── Derived queries ────────────────────────────────────────────────────

    pub fn running_timers(&self) -> Vec<TimerRecord> {
        self.inner.store.filter(|t| t.status == TimerStatus::Running)
    }

    pub fn finished_timers(&self) -> Vec<TimerRecord> {
        self.inner.store.filter(|t| t.status == TimerStatus::Finished)
    }

    pub fn timers_for_session(&self, session_id: &str) -> Vec<TimerRecord> {
        self.inner.store.filter(|t| t.session_id == session_id)
    }

    // ─── Teardown ───────────────────────────────────────────────────────────

    /// Remove every timer belonging to one cooking session, stopping their
    /// tick loops first. Subscribers see a single store notification; no
    /// completion events fire. Returns the number of records removed.
    pub fn remove_session(&self, session_id: &str) -> usize {
        for timer in self.timers_for_session(session_id) {
            self.inner.ticks.cancel(&timer.id);
        }
        let removed = self.inner.store.retain(|t| t.session_id != session_id);
        tracing::debug!(session = %session_id, removed, "session timers removed");
        removed
    }

    /// Tear the engine down: stop every tick loop, drop all completion
    /// listeners, and clear the store (one notification). Used when the
    /// owning context goes away, so no orphaned timer can fire afterwards.
    pub fn destroy(&self) {
        self.inner.ticks.cancel_all();
        self.inner.completions.lock().unwrap().entries.clear();
        self.inner.store.clear();
        tracing::debug!("timer engine destroyed");
    }

    #[cfg(test)]
    pub(super) fn active_tick_count(&self) -> usize {
        self.inner.ticks.len()
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("store", &self.inner.store)
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}
