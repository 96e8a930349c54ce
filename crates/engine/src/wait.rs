//! The shared wait budget
//!
//! One deadline governs every assertion until the next `wait`. Remaining time
//! is always computed from the wall clock, never cached per statement.

use std::time::Duration;
use tokio::time::Instant;

/// Longest budget or pause a script can ask for
pub const MAX_WAIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Seconds from a script operand; negative and NaN are zero, huge values clamp
pub fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs)
        .unwrap_or(MAX_WAIT)
        .min(MAX_WAIT)
}

fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .or_else(|| now.checked_add(MAX_WAIT))
        .unwrap_or(now)
}

#[derive(Debug)]
pub struct WaitBudget {
    deadline: Instant,
    saved: Vec<Instant>,
}

impl WaitBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: deadline_after(budget),
            saved: Vec::new(),
        }
    }

    /// Reset the deadline to `budget` from now
    pub fn arm(&mut self, budget: Duration) {
        self.deadline = deadline_after(budget);
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// `push wait`
    pub fn push(&mut self) {
        self.saved.push(self.deadline);
    }

    /// `pop wait`; false when nothing was pushed
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(deadline) => {
                self.deadline = deadline;
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}
