//! Abstraction traits decoupling the engine from the platform (CAN driver,
//! millisecond clock, and tick pacing).
pub mod can_driver;
pub mod clock;

pub use can_driver::CanDriver;
pub use clock::{MillisClock, TickPacer};
