//! Timer system
//!
//! This module provides:
//! - **Records**: countdown timer state held in the entity store
//! - **Engine**: the state machine and per-timer tick scheduler
//! - **Preferences**: user overrides for chimes and display
//!
//! Commands (start/pause/resume/reset) mutate exactly one record through
//! the store, which fans the updated snapshot out to every subscriber.
//! While a timer runs, its tick loop re-derives the remaining time from
//! the stored deadline once per second and, on reaching zero, finishes the
//! timer and emits a completion event exactly once.

mod engine;
mod error;
mod preferences;
mod record;
mod ticker;


pub use engine::{CompletionListener, TimerEngine};
pub use error::{TimerError, TimerOp};
pub use preferences::{PreferencesError, TimerPreference, TimerPreferences};
pub use record::{TimerRecord, TimerStatus};
