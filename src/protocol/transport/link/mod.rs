//! Interrupt-to-loop reception link.
//!
//! A [`CanLink`] is the single structure shared between the driver's
//! interrupt callbacks and the control loop. The interrupt side pushes
//! accepted frames into a bounded channel and latches event flags; the
//! loop side drains one frame per tick and takes the flags in one swap.
//! Each field has exactly one writer per side, so no locking beyond the
//! critical section guarding each individual access is ever needed.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::wire::{derived_id, CommandSlot, CONFIG_NODE_ID};

//==================================================================================ACCEPT_FILTER

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Identifier set the interrupt receiver accepts frames for.
pub struct AcceptFilter {
    /// Fixed configuration identifier, always accepted.
    pub config_id: u32,
    /// Current receive base. Zero disables the derived set entirely.
    pub receive_base: u32,
    /// Current receive offset.
    pub receive_offset: u32,
}

impl AcceptFilter {
    /// Filter of a node with no receive base configured yet.
    pub const fn unconfigured() -> Self {
        Self {
            config_id: CONFIG_NODE_ID,
            receive_base: 0,
            receive_offset: 0,
        }
    }

    /// Whether a frame carrying `id` belongs to this node.
    pub fn accepts(&self, id: u32) -> bool {
        if id == self.config_id {
            return true;
        }
        if self.receive_base == 0 {
            return false;
        }
        CommandSlot::ALL
            .iter()
            .any(|slot| id == derived_id(self.receive_base, self.receive_offset, slot.multiplier()))
    }
}

//==================================================================================EVENTS

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Event flags latched by the interrupt side since the last tick.
///
/// Each flag means "at least once since the previous take"; the fault
/// monitor and the transmit slot only care about occurrence, not count.
pub struct LinkEvents {
    /// A frame was seen on the bus, accepted or not.
    pub rx_activity: bool,
    /// An accepted frame was lost to a full queue.
    pub rx_dropped: bool,
    /// The in-flight transmission completed.
    pub tx_completed: bool,
    /// The in-flight transmission was aborted by the driver.
    pub tx_aborted: bool,
    /// The driver reported a bus error condition.
    pub bus_error: bool,
}

//==================================================================================LINK

/// Shared boundary between interrupt context and the control loop.
///
/// `RX_CAP` sizes the frame queue; see
/// [`RX_QUEUE_DEPTH`](crate::protocol::transport::RX_QUEUE_DEPTH).
pub struct CanLink<const RX_CAP: usize> {
    frames: Channel<CriticalSectionRawMutex, CanFrame, RX_CAP>,
    filter: Mutex<CriticalSectionRawMutex, Cell<AcceptFilter>>,
    events: Mutex<CriticalSectionRawMutex, Cell<LinkEvents>>,
}

impl<const RX_CAP: usize> CanLink<RX_CAP> {
    /// Builds an empty link with the unconfigured filter. `const`, so a
    /// link can live in a `static`.
    pub const fn new() -> Self {
        Self {
            frames: Channel::new(),
            filter: Mutex::new(Cell::new(AcceptFilter::unconfigured())),
            events: Mutex::new(Cell::new(LinkEvents {
                rx_activity: false,
                rx_dropped: false,
                tx_completed: false,
                tx_aborted: false,
                bus_error: false,
            })),
        }
    }

    //==============================================================================INTERRUPT_SIDE

    /// Records a received frame. Call from the receive interrupt.
    ///
    /// Any reception counts as bus activity, even one addressed to
    /// another node; only frames passing the filter are queued, and a
    /// full queue drops the newest frame rather than older work.
    pub fn frame_received(&self, frame: &CanFrame) {
        self.events.lock(|events| {
            let mut flags = events.get();
            flags.rx_activity = true;
            events.set(flags);
        });
        let accepted = self.filter.lock(|filter| filter.get().accepts(frame.id));
        if !accepted {
            return;
        }
        if self.frames.try_send(frame.clone()).is_err() {
            self.events.lock(|events| {
                let mut flags = events.get();
                flags.rx_dropped = true;
                events.set(flags);
            });
        }
    }

    /// Records a completed transmission. Call from the tx-complete interrupt.
    pub fn transmit_complete(&self) {
        self.events.lock(|events| {
            let mut flags = events.get();
            flags.tx_completed = true;
            events.set(flags);
        });
    }

    /// Records an aborted transmission. Call from the tx-abort interrupt.
    pub fn transmit_aborted(&self) {
        self.events.lock(|events| {
            let mut flags = events.get();
            flags.tx_aborted = true;
            events.set(flags);
        });
    }

    /// Records a driver-reported bus error. Call from the error interrupt.
    pub fn bus_error(&self) {
        self.events.lock(|events| {
            let mut flags = events.get();
            flags.bus_error = true;
            events.set(flags);
        });
    }

    //==============================================================================LOOP_SIDE

    /// Takes the oldest queued frame, if any. Non-blocking.
    pub fn pop_frame(&self) -> Option<CanFrame> {
        self.frames.try_receive().ok()
    }

    /// Takes and clears the latched event flags in one swap.
    pub fn take_events(&self) -> LinkEvents {
        self.events.lock(|events| events.replace(LinkEvents::default()))
    }

    /// Replaces the acceptance filter after an addressing change.
    pub fn set_filter(&self, filter: AcceptFilter) {
        self.filter.lock(|cell| cell.set(filter));
    }

    /// Current acceptance filter.
    pub fn filter(&self) -> AcceptFilter {
        self.filter.lock(|cell| cell.get())
    }

    /// Drops every queued frame. Used when the bus is reinitialized.
    pub fn clear_queue(&self) {
        self.frames.clear();
    }

    /// Number of frames waiting in the queue.
    pub fn queued(&self) -> usize {
        self.frames.len()
    }
}

impl<const RX_CAP: usize> Default for CanLink<RX_CAP> {
    fn default() -> Self {
        Self::new()
    }
}
