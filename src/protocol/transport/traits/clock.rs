//! Time abstractions: a free-running millisecond counter for the periodic
//! publisher and a blocking pacer for the 10 ms control tick.

/// Free-running millisecond counter. Wraps at `u32::MAX`; consumers
/// compare instants with wrapping arithmetic.
pub trait MillisClock {
    fn now_ms(&self) -> u32;
}

/// Paces the control loop. One call blocks until the next 10 ms boundary.
pub trait TickPacer {
    fn wait_tick(&mut self);
}

/// Tick period of the control loop, in milliseconds.
pub const TICK_PERIOD_MS: u32 = 10;

#[cfg(feature = "embassy-clock")]
mod embassy_impl {
    use super::{MillisClock, TickPacer, TICK_PERIOD_MS};
    use embassy_time::Instant;

    /// [`MillisClock`] backed by the `embassy-time` driver.
    pub struct EmbassyClock;

    impl MillisClock for EmbassyClock {
        fn now_ms(&self) -> u32 {
            Instant::now().as_millis() as u32
        }
    }

    /// [`TickPacer`] that busy-polls the `embassy-time` driver until the
    /// next tick boundary. Suited to a bare-metal main loop without an
    /// executor.
    pub struct EmbassyTickPacer {
        next_deadline: Instant,
    }

    impl EmbassyTickPacer {
        pub fn new() -> Self {
            Self {
                next_deadline: Instant::now(),
            }
        }
    }

    impl Default for EmbassyTickPacer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TickPacer for EmbassyTickPacer {
        fn wait_tick(&mut self) {
            self.next_deadline += embassy_time::Duration::from_millis(TICK_PERIOD_MS as u64);
            while Instant::now() < self.next_deadline {
                core::hint::spin_loop();
            }
        }
    }
}

#[cfg(feature = "embassy-clock")]
pub use embassy_impl::{EmbassyClock, EmbassyTickPacer};
