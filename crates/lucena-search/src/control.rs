//! Search control — stop flag and time budgets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Soft budget multiplier: a new iteration only starts while elapsed time is
/// below `budget * TIME_FACTOR`. Roughly `log b / (b - 1)` for the effective
/// branching factor, so the soft cutoff lands where another full iteration
/// would not fit.
pub const TIME_FACTOR: f64 = 0.85;

/// Hard budget multiplier: the running iteration is cut off outright at
/// `budget * MAX_TIME_FACTOR`.
pub const MAX_TIME_FACTOR: f64 = 4.0;

/// Milliseconds per second.
pub const ONE_SECOND: u64 = 1000;

/// Expected number of moves left in the game, for clock allotment.
pub const MOVE_HORIZON: u64 = 38;

/// How a search is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Budget in milliseconds. A fixed `movetime` uses this mode too.
    Time(u64),
    /// Fixed depth in plies.
    Depth(u32),
}

/// Per-move time allotment from the remaining clock and increment.
pub fn allot_time(remaining_ms: u64, increment_ms: u64) -> u64 {
    (remaining_ms / MOVE_HORIZON + increment_ms).max(1)
}

/// Cooperative cancellation for a single search.
///
/// The stop flag is shared with the caller so an external `stop` command
/// works mid-search. The hard time limit is enforced by the search itself:
/// it calls [`check_hard_limit`](SearchControl::check_hard_limit) once per
/// move, which trips the flag when the budget is exhausted.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    hard_limit_ms: u64,
}

impl SearchControl {
    /// Create a control for the given mode. Depth-limited searches carry no
    /// time limit and only respond to the external stop flag.
    pub fn new(mode: SearchMode, stopped: Arc<AtomicBool>) -> SearchControl {
        let hard_limit_ms = match mode {
            SearchMode::Time(ms) => (MAX_TIME_FACTOR * ms as f64) as u64,
            SearchMode::Depth(_) => u64::MAX,
        };
        SearchControl {
            stopped,
            start: Instant::now(),
            hard_limit_ms,
        }
    }

    /// Milliseconds since the search started.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Trip the stop flag if the hard limit has been exceeded.
    pub fn check_hard_limit(&self) {
        if self.hard_limit_ms != u64::MAX && self.elapsed_ms() > self.hard_limit_ms {
            self.stopped.store(true, Ordering::Release);
        }
    }

    /// Whether the search should abort.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Set the stop flag. Called by the driver when a search completes.
    pub fn signal_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}
