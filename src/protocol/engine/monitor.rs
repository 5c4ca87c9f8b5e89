//! Bus fault monitor: decides each tick between carrying on, a bus
//! reinitialization, and degrading to transmit-disabled.

/// Transmit failures before periodic publishing is cut and outputs are
/// forced off.
pub const TX_ERROR_LIMIT: u16 = 10;
/// Ticks an unresolved error may persist before a reinitialization.
pub const CONSECUTIVE_ERROR_LIMIT: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Per-tick verdict of the monitor.
pub enum MonitorVerdict {
    /// Bus healthy enough, carry on.
    Nominal,
    /// Reinitialize the bus and clear the receive queue.
    Reinit,
    /// Reinitialize, and additionally disable periodic publishing and
    /// force outputs off.
    ReinitDegraded,
}

/// Error bookkeeping fed by the interrupt-side events.
pub struct BusMonitor {
    unresolved_error: bool,
    consecutive_errors: u8,
    tx_errors: u16,
    tx_errors_at_last_complete: u16,
}

impl BusMonitor {
    pub const fn new() -> Self {
        Self {
            unresolved_error: false,
            consecutive_errors: 0,
            tx_errors: 0,
            tx_errors_at_last_complete: 0,
        }
    }

    /// Any reception counts as a successful exchange.
    pub fn note_activity(&mut self) {
        self.unresolved_error = false;
    }

    /// A driver-reported bus error opens an unresolved-error window.
    pub fn note_bus_error(&mut self) {
        self.unresolved_error = true;
    }

    /// A refused or failed transmission attempt.
    pub fn note_transmit_failure(&mut self) {
        self.tx_errors = self.tx_errors.saturating_add(1);
    }

    /// A completed transmission closes the error window and, when no
    /// new failure happened since the previous completion, pays one
    /// accumulated transmit failure back.
    pub fn transmission_complete(&mut self) {
        if self.tx_errors != 0 && self.tx_errors == self.tx_errors_at_last_complete {
            self.tx_errors -= 1;
        }
        self.tx_errors_at_last_complete = self.tx_errors;
        self.unresolved_error = false;
    }

    /// Accumulated transmit failures.
    pub fn tx_errors(&self) -> u16 {
        self.tx_errors
    }

    /// One monitor pass per tick. `fault_active` is the driver's own
    /// error-state report.
    pub fn tick(&mut self, fault_active: bool) -> MonitorVerdict {
        if self.unresolved_error {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        } else {
            self.consecutive_errors = 0;
        }
        if !fault_active && self.consecutive_errors < CONSECUTIVE_ERROR_LIMIT {
            return MonitorVerdict::Nominal;
        }
        // The reinit itself resolves the window; failures keep counting
        // across reinits until completions pay them back.
        self.unresolved_error = false;
        self.consecutive_errors = 0;
        if self.tx_errors >= TX_ERROR_LIMIT {
            MonitorVerdict::ReinitDegraded
        } else {
            MonitorVerdict::Reinit
        }
    }
}

impl Default for BusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A quiet bus never triggers a verdict.
    #[test]
    fn test_nominal_bus() {
        let mut monitor = BusMonitor::new();
        for _ in 0..100 {
            assert_eq!(monitor.tick(false), MonitorVerdict::Nominal);
        }
    }

    /// An unresolved error persisting two ticks forces a reinit.
    #[test]
    fn test_unresolved_error_two_ticks() {
        let mut monitor = BusMonitor::new();
        monitor.note_bus_error();
        assert_eq!(monitor.tick(false), MonitorVerdict::Nominal);
        assert_eq!(monitor.tick(false), MonitorVerdict::Reinit);
        // Window resolved by the reinit.
        assert_eq!(monitor.tick(false), MonitorVerdict::Nominal);
    }

    /// Any reception resolves the error window before it counts twice.
    #[test]
    fn test_activity_resolves_window() {
        let mut monitor = BusMonitor::new();
        monitor.note_bus_error();
        assert_eq!(monitor.tick(false), MonitorVerdict::Nominal);
        monitor.note_activity();
        assert_eq!(monitor.tick(false), MonitorVerdict::Nominal);
    }

    /// A driver fault report forces a reinit immediately.
    #[test]
    fn test_driver_fault_reinits() {
        let mut monitor = BusMonitor::new();
        assert_eq!(monitor.tick(true), MonitorVerdict::Reinit);
    }

    /// Ten accumulated transmit failures degrade the node.
    #[test]
    fn test_tx_exhaustion_degrades() {
        let mut monitor = BusMonitor::new();
        for _ in 0..TX_ERROR_LIMIT {
            monitor.note_transmit_failure();
        }
        assert_eq!(monitor.tick(true), MonitorVerdict::ReinitDegraded);
        // Still degraded on the next fault: failures persist.
        assert_eq!(monitor.tick(true), MonitorVerdict::ReinitDegraded);
    }

    /// A completion with no failure since the previous one pays one
    /// failure back.
    #[test]
    fn test_completions_pay_failures_back() {
        let mut monitor = BusMonitor::new();
        monitor.note_transmit_failure();
        monitor.note_transmit_failure();

        // First completion only records the level.
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 2);
        // Quiet completions then decrement one by one.
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 1);
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 0);
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 0);
    }

    /// A fresh failure between completions resets the payback baseline.
    #[test]
    fn test_new_failure_resets_baseline() {
        let mut monitor = BusMonitor::new();
        monitor.note_transmit_failure();
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 1);
        monitor.note_transmit_failure();
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 2);
        monitor.transmission_complete();
        assert_eq!(monitor.tx_errors(), 1);
    }
}
