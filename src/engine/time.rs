//! Time management: soft and hard deadlines from the clock state.

use std::time::Duration;

/// Moves assumed to remain when the GUI gives no `movestogo`.
const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Virtual extra moves added to `movestogo` so the last move before a
/// control never gets the whole remaining clock.
const OVERHEAD_MOVES: u64 = 2;

/// Hard limit as a multiple of the soft target.
const HARD_TARGET_MULT: u64 = 4;

/// Configuration shared by all time computations.
#[derive(Debug, Clone, Copy)]
pub struct TimeConfig {
    /// Reserve for I/O latency per move, in ms.
    pub move_overhead_ms: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            move_overhead_ms: 30,
        }
    }
}

/// The time control in force for one `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No limit: `go infinite`, or depth/node-limited searches.
    #[default]
    Unlimited,
    /// Exactly this long, no discretion.
    MoveTime { time_ms: u64 },
    /// Remaining clock, increment, and optionally moves to the next
    /// control.
    Incremental {
        time_left_ms: u64,
        inc_ms: u64,
        movestogo: Option<u64>,
    },
}

impl TimeControl {
    #[must_use]
    pub fn incremental(time_left: Duration, inc: Duration, movestogo: Option<u64>) -> Self {
        TimeControl::Incremental {
            time_left_ms: time_left.as_millis() as u64,
            inc_ms: inc.as_millis() as u64,
            movestogo,
        }
    }

    /// Compute `(soft_ms, hard_ms)`; `(0, 0)` means unlimited.
    #[must_use]
    pub fn compute_limits(&self, config: &TimeConfig) -> (u64, u64) {
        match *self {
            TimeControl::Unlimited => (0, 0),
            TimeControl::MoveTime { time_ms } => {
                let t = time_ms.max(1);
                (t, t)
            }
            TimeControl::Incremental {
                time_left_ms,
                inc_ms,
                movestogo,
            } => {
                let usable = time_left_ms.saturating_sub(config.move_overhead_ms).max(1);
                let divisor = movestogo.map_or(DEFAULT_MOVES_TO_GO, |m| {
                    m.clamp(1, DEFAULT_MOVES_TO_GO * 2) + OVERHEAD_MOVES
                });
                let target = (usable / divisor + inc_ms).max(1);
                let hard = (target * HARD_TARGET_MULT).min(usable).max(1);
                let soft = target.min(hard);
                (soft, hard)
            }
        }
    }
}
