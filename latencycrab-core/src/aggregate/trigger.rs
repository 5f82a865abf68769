use std::time::Duration;

use crate::types::ProcessingTime;

/// Processing-time deadline for the next periodic flush.
///
/// The task loop asks [`is_due`](Self::is_due) as processing time advances;
/// every flush, periodic or requested, restarts the period via
/// [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Immediate mode: nothing is ever buffered.
    Disabled,
    Periodic {
        interval: Duration,
        /// `None` until the operator is opened.
        next_due: Option<ProcessingTime>,
    },
}

impl FlushTrigger {
    /// A zero interval disables the trigger.
    pub fn periodic(interval: Duration) -> Self {
        if interval.is_zero() {
            FlushTrigger::Disabled
        } else {
            FlushTrigger::Periodic {
                interval,
                next_due: None,
            }
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            FlushTrigger::Disabled => None,
            FlushTrigger::Periodic { interval, .. } => Some(*interval),
        }
    }

    pub fn next_due(&self) -> Option<ProcessingTime> {
        match self {
            FlushTrigger::Disabled => None,
            FlushTrigger::Periodic { next_due, .. } => *next_due,
        }
    }

    /// Start a new period at `now`.
    pub fn reset(&mut self, now: ProcessingTime) {
        if let FlushTrigger::Periodic { interval, next_due } = self {
            *next_due = Some(now.saturating_add(interval.as_millis() as ProcessingTime));
        }
    }

    pub fn is_due(&self, now: ProcessingTime) -> bool {
        matches!(self.next_due(), Some(due) if now >= due)
    }

    /// How long the task loop may block waiting for input before it should
    /// check the deadline again.
    ///
    /// A quarter of the interval, at least 1ms.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.interval()
            .map(|interval| (interval / 4).max(Duration::from_millis(1)))
    }
}
