pub mod clock;
pub mod store;
pub mod timers;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{Entity, EntityStore, Listener, SubscriptionId};
pub use timers::{
    CompletionListener, PreferencesError, TimerEngine, TimerError, TimerOp, TimerPreference,
    TimerPreferences, TimerRecord, TimerStatus,
};
