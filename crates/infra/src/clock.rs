//! Time source for ledger entries.

use std::sync::Mutex;

use chrono::{Local, NaiveDateTime, SubsecRound, TimeDelta};

/// Supplies the local wall-clock time recorded on history entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time, truncated to whole seconds.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

/// Deterministic clock for tests: returns a fixed instant, optionally
/// advancing by a step after every read.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<NaiveDateTime>,
    step: TimeDelta,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(at),
            step: TimeDelta::zero(),
        }
    }

    pub fn ticking(at: NaiveDateTime, step: TimeDelta) -> Self {
        Self {
            current: Mutex::new(at),
            step,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.current.lock() {
            Ok(mut current) => {
                let now = *current;
                *current = now + self.step;
                now
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
