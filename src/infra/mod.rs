//! Infrastructure seams: the flash-backed parameter store contract and the
//! RAM area shared with the bootloader.
pub mod handoff;
pub mod nvm;
