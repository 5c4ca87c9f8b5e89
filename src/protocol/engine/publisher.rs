//! Periodic telemetry: cadence bookkeeping and the monitor frame layout.

use crate::machine::MachineState;
use crate::protocol::transport::can_frame::CanFrame;

/// Telemetry period after power-up, in milliseconds.
pub const DEFAULT_PERIOD_MS: u16 = 200;
/// Smallest accepted non-zero period, in milliseconds.
pub const MIN_PERIOD_MS: u16 = 50;

/// Decides when the monitor frame is due. Time comes from the
/// free-running millisecond clock, not the coarser control tick.
pub struct PeriodicPublisher {
    enabled: bool,
    period_ms: u16,
    last_ms: u32,
    force: bool,
}

impl PeriodicPublisher {
    /// Publishing starts disabled; the first period-set or output
    /// command on the bus enables it.
    pub const fn new() -> Self {
        Self {
            enabled: false,
            period_ms: DEFAULT_PERIOD_MS,
            last_ms: 0,
            force: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn period_ms(&self) -> u16 {
        self.period_ms
    }

    /// Accepts zero ("every tick") or anything from [`MIN_PERIOD_MS`]
    /// up. Values in between leave the period unchanged.
    pub fn set_period(&mut self, period_ms: u16) {
        if period_ms == 0 || period_ms >= MIN_PERIOD_MS {
            self.period_ms = period_ms;
        }
    }

    /// Requests one out-of-cadence send. Latched until a frame is
    /// actually composed, surviving busy-slot ticks and disabled spells.
    pub fn force_now(&mut self) {
        self.force = true;
    }

    /// Whether the monitor frame is due at `now_ms`.
    ///
    /// While disabled the accumulator is pinned to now, so enabling
    /// starts a fresh period. A zero period is due as soon as any time
    /// has passed.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if !self.enabled {
            self.last_ms = now_ms;
            return false;
        }
        if self.force {
            return true;
        }
        let elapsed = now_ms.wrapping_sub(self.last_ms);
        elapsed > 0 && elapsed >= u32::from(self.period_ms)
    }

    /// Accounts a composed frame: clears the force latch and restarts
    /// the period.
    pub fn mark_sent(&mut self, now_ms: u32) {
        self.force = false;
        self.last_ms = now_ms;
    }
}

impl Default for PeriodicPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Lays out the monitor frame: output and error bits, current, and the
/// two temperatures truncated to one byte each.
pub fn monitor_frame(id: u32, state: &MachineState) -> CanFrame {
    let mut data = [0u8; 8];
    if state.switch_on {
        data[0] |= 0x01;
    }
    if state.power_enabled {
        data[0] |= 0x02;
    }
    if state.error_over_under_voltage {
        data[1] |= 0x01;
    }
    if state.error_overcurrent {
        data[1] |= 0x02;
    }
    if state.error_temp_sensor_a {
        data[1] |= 0x04;
    }
    if state.error_temp_sensor_b {
        data[1] |= 0x08;
    }
    if state.error_thermal {
        data[1] |= 0x10;
    }
    data[2..4].copy_from_slice(&(state.current_centi_amps as u16).to_le_bytes());
    data[4] = state.temp_a_celsius as u8;
    data[5] = state.temp_b_celsius as u8;
    CanFrame {
        id,
        remote: false,
        len: 6,
        data,
    }
}
