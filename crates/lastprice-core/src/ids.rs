//! Identifier and clock services shared by both extraction paths.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current date in local short form (`M/D/YYYY`).
    fn local_short_date(&self) -> String {
        self.now()
            .with_timezone(&Local)
            .format("%-m/%-d/%Y")
            .to_string()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Generator of numeric identifiers.
pub trait IdGenerator: Send + Sync {
    /// Return an identifier not handed out before by this generator.
    fn next_id(&self) -> u64;
}

/// Millisecond timestamps, bumped forward when two calls land in the same
/// millisecond.
#[derive(Debug, Default)]
pub struct TimestampIds {
    last: AtomicU64,
}

impl TimestampIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for TimestampIds {
    fn next_id(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Plain counter, mostly useful in tests.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Start counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_timestamp_ids_never_repeat() {
        let ids = TimestampIds::new();
        let mut seen = HashSet::new();
        let mut previous = 0;

        for _ in 0..1000 {
            let id = ids.next_id();
            assert!(id > previous);
            assert!(seen.insert(id));
            previous = id;
        }
    }

    #[test]
    fn test_timestamp_ids_are_time_derived() {
        let before = Utc::now().timestamp_millis() as u64;
        let id = TimestampIds::new().next_id();
        assert!(id >= before);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::starting_at(7);
        assert_eq!(ids.next_id(), 7);
        assert_eq!(ids.next_id(), 8);
        assert_eq!(SequentialIds::default().next_id(), 1);
    }

    #[test]
    fn test_local_short_date_has_no_padding() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let clock = FixedClock(instant);

        let expected = instant.with_timezone(&Local).format("%-m/%-d/%Y").to_string();
        assert_eq!(clock.local_short_date(), expected);
        assert!(!clock.local_short_date().starts_with('0'));
    }
}
