//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame construction,
//! engine bring-up, bus reinitialization, etc.).
use thiserror_no_std::Error;

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors that can occur while building a CAN frame.
pub enum FrameError {
    /// Payload exceeds the eight bytes of a classic CAN frame.
    #[error("Payload too long: {len} bytes")]
    PayloadTooLong { len: usize },
}

#[derive(Error, Debug)]
/// Failures while bringing the communication engine up.
pub enum EngineInitError<D: core::fmt::Debug, S: core::fmt::Debug> {
    /// The persistent parameter store could not be read.
    #[error("Parameter store error: {0:?}")]
    Store(S),

    /// The CAN driver refused bit timing, filters, or start.
    #[error("CAN driver error: {0:?}")]
    Driver(D),
}

#[derive(Error, Debug)]
/// Failure while reconfiguring the bus at runtime.
pub enum ReinitError<D: core::fmt::Debug> {
    /// The CAN driver failed during the stop/configure/start cycle.
    #[error("CAN driver error: {0:?}")]
    Driver(D),
}
