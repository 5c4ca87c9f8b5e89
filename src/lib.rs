//! `powergate-can` library: the CAN communication engine for a remotely
//! configurable actuator/power-controller node in a `no_std` environment.
//! The crate exposes the infrastructure seams (persistent parameter store,
//! bootloader handoff area), the protocol logic (addressing, transport,
//! command dispatch, periodic telemetry), and the 10 ms machine control loop
//! that schedules everything.
#![no_std]
//==================================================================================
/// Domain and low-level errors (engine bring-up, parameter store access,
/// frame construction, and related issues).
pub mod error;
/// Infrastructure seams: persistent parameter storage and the shared
/// bootloader handoff area.
pub mod infra;
/// Machine-side state and control: status record, output/indicator drive,
/// and the tick loop.
pub mod machine;
/// Protocol implementation: wire constants, CAN transport, node addressing,
/// and the per-tick communication engine.
pub mod protocol;
/// Firmware identity reported on the bus.
pub mod version;
//==================================================================================
