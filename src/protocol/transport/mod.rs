//! CAN transport layer: frame representation, bit-rate table, the
//! interrupt-to-loop reception link, and driver abstraction traits.

pub mod bus_speed;
pub mod can_frame;
pub mod link;
pub mod traits;
pub mod tx_slot;

/// Capacity of the interrupt-side reception queue, in frames.
///
/// At 250 kbps a full extended frame occupies the bus for roughly 0.5 ms,
/// so twenty slots absorb a solid burst between two 10 ms service passes
/// without growing the queue past a few hundred bytes of RAM.
pub const RX_QUEUE_DEPTH: usize = 20;
