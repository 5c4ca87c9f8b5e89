//! Synchronous abstraction over the platform CAN peripheral. The engine
//! only ever calls it from loop context; interrupt-side traffic flows
//! through [`CanLink`](crate::protocol::transport::link::CanLink) instead.
use crate::protocol::transport::bus_speed::BusSpeed;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::link::AcceptFilter;

/// Contract the platform CAN driver must fulfil.
///
/// Every call is expected to return within bounded time; `submit` hands a
/// frame to the peripheral's mailbox and must not wait for completion.
pub trait CanDriver {
    type Error: core::fmt::Debug;

    /// Programs bit timing for `speed`. The bus must be stopped.
    fn configure(&mut self, speed: BusSpeed) -> Result<(), Self::Error>;

    /// Programs hardware acceptance filtering for the given identifier set.
    ///
    /// Drivers without fine-grained hardware filters may accept everything;
    /// the link re-checks each frame against the same filter in software.
    fn install_filter(&mut self, filter: &AcceptFilter) -> Result<(), Self::Error>;

    /// Starts participating in bus traffic.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stops the peripheral and aborts pending transmissions.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Hands one frame to the peripheral. `Err` means the mailbox refused
    /// it; completion and aborts arrive later through the interrupt side.
    fn submit(&mut self, frame: &CanFrame) -> Result<(), Self::Error>;

    /// Whether the peripheral currently reports an error state (bus-off,
    /// error-passive, or a protocol fault latch).
    fn fault_active(&self) -> bool;
}
