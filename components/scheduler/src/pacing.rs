//! Execution pacing.

use std::time::{Duration, Instant};

use core_types::PacingMode;

/// Holds the run loop to a target instruction rate.
///
/// Pacing changes only how fast the engine runs against wall-clock time,
/// never what it computes.
#[derive(Debug)]
pub struct Pacer {
    mode: PacingMode,
    cycles_per_second: u64,
    started: Instant,
    cycles: u64,
}

impl Pacer {
    /// Creates a pacer. `cycles_per_second` is ignored when unlocked.
    pub fn new(mode: PacingMode, cycles_per_second: u64) -> Self {
        Self {
            mode,
            cycles_per_second: cycles_per_second.max(1),
            started: Instant::now(),
            cycles: 0,
        }
    }

    /// Pacing mode.
    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Cycles accounted so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// How far ahead of schedule the engine is after `cycles` cycles.
    fn ahead(&self) -> Option<Duration> {
        let due = Duration::from_secs_f64(self.cycles as f64 / self.cycles_per_second as f64);
        due.checked_sub(self.started.elapsed()).filter(|d| !d.is_zero())
    }

    /// Accounts for `cycles` executed and delays as the mode requires.
    pub fn pace(&mut self, cycles: u64) {
        self.cycles += cycles;
        match self.mode {
            PacingMode::Unlocked => {}
            PacingMode::Strict => {
                while self.ahead().is_some() {
                    std::hint::spin_loop();
                }
            }
            PacingMode::Weak => {
                if let Some(ahead) = self.ahead() {
                    std::thread::sleep(ahead);
                }
            }
        }
    }
}
