use super::*;
use crate::protocol::transport::bus_speed::BusSpeed;
use crate::protocol::transport::link::AcceptFilter;

/// Driver double that accepts or refuses every submission.
struct ScriptedDriver {
    accept: bool,
    submissions: u32,
}

impl ScriptedDriver {
    fn new(accept: bool) -> Self {
        Self {
            accept,
            submissions: 0,
        }
    }
}

impl CanDriver for ScriptedDriver {
    type Error = ();

    fn configure(&mut self, _speed: BusSpeed) -> Result<(), ()> {
        Ok(())
    }

    fn install_filter(&mut self, _filter: &AcceptFilter) -> Result<(), ()> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn submit(&mut self, _frame: &CanFrame) -> Result<(), ()> {
        self.submissions += 1;
        if self.accept {
            Ok(())
        } else {
            Err(())
        }
    }

    fn fault_active(&self) -> bool {
        false
    }
}

fn test_frame() -> CanFrame {
    CanFrame::data_frame(0x1005, &[0x01, 0x02]).unwrap()
}

/// An accepted submission moves the slot to `Sending`.
#[test]
fn test_submit_accepted() {
    let mut driver = ScriptedDriver::new(true);
    let mut slot = TxSlot::new();

    assert!(slot.submit(&mut driver, test_frame()));
    assert_eq!(slot.state(), SlotState::Sending);
    assert_eq!(slot.retries(), 0);
    assert!(!slot.is_ready());
}

/// A busy slot refuses new frames without touching the driver.
#[test]
fn test_submit_skipped_while_busy() {
    let mut driver = ScriptedDriver::new(true);
    let mut slot = TxSlot::new();
    slot.submit(&mut driver, test_frame());

    assert!(!slot.submit(&mut driver, test_frame()));
    assert_eq!(driver.submissions, 1);
}

/// A refused submission parks the frame for retry.
#[test]
fn test_submit_refused_parks_frame() {
    let mut driver = ScriptedDriver::new(false);
    let mut slot = TxSlot::new();

    assert!(slot.submit(&mut driver, test_frame()));
    assert_eq!(slot.state(), SlotState::RetryPending);
    assert_eq!(slot.retries(), 1);
}

/// Retry passes do nothing while the slot is not pending.
#[test]
fn test_retry_step_idle() {
    let mut driver = ScriptedDriver::new(true);
    let mut slot = TxSlot::new();

    assert_eq!(slot.retry_step(&mut driver), RetryOutcome::Idle);
    slot.submit(&mut driver, test_frame());
    assert_eq!(slot.retry_step(&mut driver), RetryOutcome::Idle);
    assert_eq!(driver.submissions, 1);
}

/// Exactly one exhaustion per cycle of consecutive failures, and the
/// slot keeps retrying afterwards.
#[test]
fn test_retry_cycle_exhaustion() {
    let mut driver = ScriptedDriver::new(false);
    let mut slot = TxSlot::new();
    slot.submit(&mut driver, test_frame());

    // --- Failures 2..=500 ---
    for _ in 0..(RETRY_CYCLE_LIMIT - 1) {
        assert_eq!(slot.retry_step(&mut driver), RetryOutcome::Failed);
    }
    assert_eq!(driver.submissions, u32::from(RETRY_CYCLE_LIMIT));
    assert_eq!(slot.retries(), RETRY_CYCLE_LIMIT);

    // --- Exhaustion pass makes no submission ---
    assert_eq!(slot.retry_step(&mut driver), RetryOutcome::CycleExhausted);
    assert_eq!(driver.submissions, u32::from(RETRY_CYCLE_LIMIT));
    assert_eq!(slot.state(), SlotState::RetryPending);
    assert_eq!(slot.retries(), 0);

    // --- Retrying resumes once the bus accepts again ---
    driver.accept = true;
    assert_eq!(slot.retry_step(&mut driver), RetryOutcome::Resubmitted);
    assert_eq!(slot.state(), SlotState::Sending);
}

/// Completion frees the slot and clears the failure count.
#[test]
fn test_transmission_complete_frees_slot() {
    let mut driver = ScriptedDriver::new(true);
    let mut slot = TxSlot::new();
    slot.submit(&mut driver, test_frame());

    slot.transmission_complete();
    assert!(slot.is_ready());
    assert_eq!(slot.retries(), 0);
}

/// An abort parks the in-flight frame for retry.
#[test]
fn test_transmission_aborted_parks_frame() {
    let mut driver = ScriptedDriver::new(true);
    let mut slot = TxSlot::new();
    slot.submit(&mut driver, test_frame());

    slot.transmission_aborted();
    assert_eq!(slot.state(), SlotState::RetryPending);
    assert_eq!(slot.retries(), 1);
    assert_eq!(slot.retry_step(&mut driver), RetryOutcome::Resubmitted);
}

/// A full reinitialization abandons the pending frame.
#[test]
fn test_reset_frees_slot() {
    let mut driver = ScriptedDriver::new(false);
    let mut slot = TxSlot::new();
    slot.submit(&mut driver, test_frame());

    slot.reset();
    assert!(slot.is_ready());
    assert_eq!(slot.retries(), 0);
}
