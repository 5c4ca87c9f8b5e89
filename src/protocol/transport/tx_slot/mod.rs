//! Single-frame transmit slot with bounded retry.
//!
//! The node never queues outbound traffic: replies and telemetry contend
//! for one slot, and a sender finding it busy simply skips that tick.
//! A frame the driver refuses is resubmitted every tick; after a full
//! cycle of failed attempts the engine reinitializes the bus and the
//! slot keeps retrying, so a transient wedge never becomes a giveup.

use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::CanDriver;

/// Failed attempts before the engine forces a bus reinitialization.
pub const RETRY_CYCLE_LIMIT: u16 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Lifecycle of the outbound frame.
pub enum SlotState {
    /// No frame in flight; a new one may be composed.
    Ready,
    /// Frame handed to the driver, completion pending.
    Sending,
    /// Last attempt failed or was aborted; resubmitted each tick.
    RetryPending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Result of one retry pass.
pub enum RetryOutcome {
    /// Nothing pending.
    Idle,
    /// The frame was handed to the driver again.
    Resubmitted,
    /// The driver refused the frame again.
    Failed,
    /// A full cycle of attempts failed; the bus needs a reinit.
    CycleExhausted,
}

/// The one outbound frame and its retry bookkeeping.
pub struct TxSlot {
    frame: CanFrame,
    state: SlotState,
    retries: u16,
}

impl TxSlot {
    pub const fn new() -> Self {
        Self {
            frame: CanFrame {
                id: 0,
                remote: false,
                len: 0,
                data: [0u8; 8],
            },
            state: SlotState::Ready,
            retries: 0,
        }
    }

    /// Whether a new frame may be composed this tick.
    pub fn is_ready(&self) -> bool {
        self.state == SlotState::Ready
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Consecutive failed attempts for the current frame.
    pub fn retries(&self) -> u16 {
        self.retries
    }

    /// Takes ownership of `frame` and hands it to the driver.
    ///
    /// Returns `false` without touching anything when the slot is busy.
    /// A driver refusal parks the frame in [`SlotState::RetryPending`];
    /// the frame is never lost once accepted here.
    pub fn submit<D: CanDriver>(&mut self, driver: &mut D, frame: CanFrame) -> bool {
        if self.state != SlotState::Ready {
            return false;
        }
        self.frame = frame;
        match driver.submit(&self.frame) {
            Ok(()) => {
                self.state = SlotState::Sending;
                self.retries = 0;
            }
            Err(_) => {
                self.state = SlotState::RetryPending;
                self.retries = 1;
            }
        }
        true
    }

    /// One retry pass, called every tick by the engine.
    ///
    /// [`RetryOutcome::CycleExhausted`] fires once per
    /// [`RETRY_CYCLE_LIMIT`] consecutive failures; the counter restarts
    /// and the slot stays pending so retrying resumes after the reinit.
    pub fn retry_step<D: CanDriver>(&mut self, driver: &mut D) -> RetryOutcome {
        if self.state != SlotState::RetryPending {
            return RetryOutcome::Idle;
        }
        if self.retries >= RETRY_CYCLE_LIMIT {
            self.retries = 0;
            return RetryOutcome::CycleExhausted;
        }
        match driver.submit(&self.frame) {
            Ok(()) => {
                self.state = SlotState::Sending;
                RetryOutcome::Resubmitted
            }
            Err(_) => {
                self.retries = self.retries.saturating_add(1);
                RetryOutcome::Failed
            }
        }
    }

    /// Applies a transmit-complete event.
    pub fn transmission_complete(&mut self) {
        self.state = SlotState::Ready;
        self.retries = 0;
    }

    /// Applies a transmit-abort event. The frame stays parked for retry.
    pub fn transmission_aborted(&mut self) {
        self.state = SlotState::RetryPending;
        self.retries = self.retries.saturating_add(1);
    }

    /// Frees the slot after a full bus reinitialization.
    pub fn reset(&mut self) {
        self.state = SlotState::Ready;
        self.retries = 0;
    }
}

impl Default for TxSlot {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
