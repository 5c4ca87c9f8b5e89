//! High-level components of the node protocol: wire constants, runtime
//! addressing, CAN transport, and the per-tick communication engine.
pub mod addressing;
pub mod engine;
pub mod transport;
pub mod wire;
