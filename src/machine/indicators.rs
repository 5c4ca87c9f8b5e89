//! Indicator drive.
//!
//! The power indicator mirrors the power output. The error indicator
//! shows the highest-priority active error: overcurrent lit solid, a
//! temperature error as a slow blink, a supply error as a fast blink.

use super::MachineState;

/// Slow-blink semi-period, in 10 ms ticks.
pub const SLOW_SEMI_PERIOD_TICKS: u32 = 20;
/// Fast-blink semi-period, in 10 ms ticks.
pub const FAST_SEMI_PERIOD_TICKS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What the error indicator should show.
pub enum ErrorPattern {
    Off,
    Solid,
    SlowBlink,
    FastBlink,
}

/// Highest-priority pattern for the current error flags.
pub fn error_pattern(machine: &MachineState) -> ErrorPattern {
    if machine.error_overcurrent {
        ErrorPattern::Solid
    } else if machine.error_temp_sensor_a || machine.error_temp_sensor_b {
        ErrorPattern::SlowBlink
    } else if machine.error_over_under_voltage {
        ErrorPattern::FastBlink
    } else {
        ErrorPattern::Off
    }
}

#[derive(Debug)]
/// Blink state of the error indicator. Advance once per tick.
pub struct ErrorIndicator {
    period: u32,
    lit: bool,
}

impl ErrorIndicator {
    pub const fn new() -> Self {
        Self {
            period: 0,
            lit: false,
        }
    }

    /// Advances one tick and returns the level to drive.
    ///
    /// The tick counter carries over between the two blink rates; only
    /// the off state resets it.
    pub fn tick(&mut self, pattern: ErrorPattern) -> bool {
        match pattern {
            ErrorPattern::Solid => self.lit = true,
            ErrorPattern::SlowBlink => self.advance(SLOW_SEMI_PERIOD_TICKS),
            ErrorPattern::FastBlink => self.advance(FAST_SEMI_PERIOD_TICKS),
            ErrorPattern::Off => {
                self.period = 0;
                self.lit = false;
            }
        }
        self.lit
    }

    fn advance(&mut self, semi_period: u32) {
        self.period += 1;
        if self.period > semi_period {
            self.period = 0;
            self.lit = !self.lit;
        }
    }
}

impl Default for ErrorIndicator {
    fn default() -> Self {
        Self::new()
    }
}
