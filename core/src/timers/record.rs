//! Timer records (runtime state)
//!
//! A `TimerRecord` is one countdown timer in a cooking session. While the
//! timer is running, the absolute deadline `end_at` is authoritative and
//! `remaining_seconds` is a cached projection refreshed once per tick;
//! in every other state `remaining_seconds` is the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// Lifecycle state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// Terminal. Nothing leaves `Finished` except record removal or
    /// replacement by an external import.
    Finished,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// One countdown timer in a cooking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Unique identifier
    pub id: String,

    /// Cooking session this timer belongs to
    pub session_id: String,

    /// Human label ("Boil pasta"); never consulted by engine logic
    pub name: String,

    // ─── Timing ─────────────────────────────────────────────────────────────
    /// Originally configured duration in seconds; immutable after creation
    pub default_seconds: i64,

    /// Current countdown value. Authoritative while not running; while
    /// running, a cached projection of `end_at` updated once per tick.
    pub remaining_seconds: i64,

    /// Wall-clock deadline; `Some` exactly while `status == Running`
    pub end_at: Option<DateTime<Utc>>,

    // ─── State ──────────────────────────────────────────────────────────────
    /// Lifecycle state
    pub status: TimerStatus,

    /// User who last transitioned this timer into `Running`
    pub started_by: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation, ticks included
    pub updated_at: DateTime<Utc>,
}

impl TimerRecord {
    /// Create an idle timer with the full duration remaining.
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
        default_seconds: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let default_seconds = default_seconds.max(0);
        Self {
            id: id.into(),
            session_id: session_id.into(),
            name: name.into(),
            default_seconds,
            remaining_seconds: default_seconds,
            end_at: None,
            status: TimerStatus::Idle,
            started_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.status == TimerStatus::Finished
    }

    /// Recompute remaining whole seconds from the deadline at `now`.
    ///
    /// Floors to whole seconds and clamps to `[0, default_seconds]`. The
    /// upper clamp keeps a timer from gaining time when the system clock
    /// moves backward between start and a tick. Pause and the tick loop
    /// both go through this, so pausing right before a tick and observing
    /// during a tick agree on the value. Returns the cached value when
    /// there is no deadline.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        match self.end_at {
            Some(end_at) => {
                let ms = end_at.signed_duration_since(now).num_milliseconds();
                (ms.max(0) / 1000).min(self.default_seconds)
            }
            None => self.remaining_seconds,
        }
    }

    /// Completion progress as a 0-100 percentage of the configured duration.
    pub fn progress_percent(&self) -> f32 {
        if self.default_seconds <= 0 {
            return 100.0;
        }
        let done = self.default_seconds - self.remaining_seconds;
        (done as f32 / self.default_seconds as f32 * 100.0).clamp(0.0, 100.0)
    }
}

impl Entity for TimerRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_time(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, min, sec).unwrap()
    }

    #[test]
    fn new_record_is_idle_with_full_duration() {
        let now = make_time(18, 0, 0);
        let record = TimerRecord::new("t1", "s1", "Boil", 120, now);
        assert_eq!(record.status, TimerStatus::Idle);
        assert_eq!(record.remaining_seconds, 120);
        assert_eq!(record.default_seconds, 120);
        assert!(record.end_at.is_none());
        assert!(record.started_by.is_none());
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let record = TimerRecord::new("t1", "s1", "Bad", -10, make_time(18, 0, 0));
        assert_eq!(record.default_seconds, 0);
        assert_eq!(record.remaining_seconds, 0);
    }

    #[test]
    fn remaining_at_floors_whole_seconds() {
        let now = make_time(18, 0, 0);
        let mut record = TimerRecord::new("t1", "s1", "Boil", 120, now);
        record.status = TimerStatus::Running;
        record.end_at = Some(now + Duration::seconds(120));

        // 45.4s elapsed leaves 74.6s -> floors to 74
        let later = now + Duration::milliseconds(45_400);
        assert_eq!(record.remaining_at(later), 74);
        // exactly on the second boundary
        assert_eq!(record.remaining_at(now + Duration::seconds(45)), 75);
    }

    #[test]
    fn remaining_at_clamps_lower_bound() {
        let now = make_time(18, 0, 0);
        let mut record = TimerRecord::new("t1", "s1", "Boil", 10, now);
        record.status = TimerStatus::Running;
        record.end_at = Some(now + Duration::seconds(10));
        assert_eq!(record.remaining_at(now + Duration::seconds(25)), 0);
    }

    #[test]
    fn remaining_at_clamps_upper_bound_on_clock_rewind() {
        let now = make_time(18, 0, 0);
        let mut record = TimerRecord::new("t1", "s1", "Boil", 60, now);
        record.status = TimerStatus::Running;
        record.end_at = Some(now + Duration::seconds(60));
        // system clock jumped 5 minutes backward
        let earlier = now - Duration::seconds(300);
        assert_eq!(record.remaining_at(earlier), 60);
    }

    #[test]
    fn remaining_at_without_deadline_returns_cached() {
        let record = TimerRecord::new("t1", "s1", "Boil", 90, make_time(18, 0, 0));
        assert_eq!(record.remaining_at(make_time(19, 0, 0)), 90);
    }

    #[test]
    fn progress_percent_from_default() {
        let now = make_time(18, 0, 0);
        let mut record = TimerRecord::new("t1", "s1", "Boil", 100, now);
        assert_eq!(record.progress_percent(), 0.0);
        record.remaining_seconds = 25;
        assert_eq!(record.progress_percent(), 75.0);
        record.remaining_seconds = 0;
        assert_eq!(record.progress_percent(), 100.0);
    }

    #[test]
    fn status_serializes_snake_case() {
        #[derive(serde::Serialize)]
        struct Wrap {
            status: TimerStatus,
        }
        let rendered = toml::to_string(&Wrap {
            status: TimerStatus::Running,
        })
        .unwrap();
        assert_eq!(rendered.trim(), "status = \"running\"");
    }
}
