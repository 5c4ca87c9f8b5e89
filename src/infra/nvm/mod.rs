//! Persistent parameter storage contract.
//!
//! The node keeps its addressing and speed across resets in a small
//! flash-backed key/value store of 16-bit words. Each 32-bit field is
//! split into a high and a low half at two consecutive virtual
//! addresses, high half first, matching the order writes hit flash.

//==================================================================================VIRTUAL_ADDRESSES

/// Layout version of the stored parameter set.
pub const VADDR_PARAMS_VERSION: u16 = 1;
/// Receive base identifier, high half.
pub const VADDR_RECEIVE_BASE_HI: u16 = 6;
/// Receive base identifier, low half.
pub const VADDR_RECEIVE_BASE_LO: u16 = 7;
/// Bus speed table index.
pub const VADDR_BUS_SPEED: u16 = 9;
/// Send base identifier, high half.
pub const VADDR_SEND_BASE_HI: u16 = 12;
/// Send base identifier, low half.
pub const VADDR_SEND_BASE_LO: u16 = 13;
/// Send-side offset, high half.
pub const VADDR_SEND_OFFSET_HI: u16 = 14;
/// Send-side offset, low half.
pub const VADDR_SEND_OFFSET_LO: u16 = 15;
/// Receive-side offset, high half.
pub const VADDR_RECEIVE_OFFSET_HI: u16 = 16;
/// Receive-side offset, low half.
pub const VADDR_RECEIVE_OFFSET_LO: u16 = 17;

/// Parameter-set version this firmware writes and understands.
pub const PARAMS_VERSION: u16 = 0x0001;

//==================================================================================STORE_TRAIT

/// Word-granular persistent store.
///
/// A read distinguishes "never written" (`Ok(None)`) from a hard medium
/// failure (`Err`). Writes are expected to be synchronous and bounded;
/// the engine only calls them from loop context.
pub trait ConfigStore {
    type Error: core::fmt::Debug;

    /// Reads the word at `vaddr`, `None` when the slot was never written.
    fn read_word(&mut self, vaddr: u16) -> Result<Option<u16>, Self::Error>;

    /// Writes the word at `vaddr`, replacing any previous value.
    fn write_word(&mut self, vaddr: u16, value: u16) -> Result<(), Self::Error>;

    /// Reads a 32-bit field split across `hi` and `lo`.
    ///
    /// The field only exists once both halves do.
    fn read_dword(&mut self, hi: u16, lo: u16) -> Result<Option<u32>, Self::Error> {
        let high = match self.read_word(hi)? {
            Some(word) => word,
            None => return Ok(None),
        };
        let low = match self.read_word(lo)? {
            Some(word) => word,
            None => return Ok(None),
        };
        Ok(Some((u32::from(high) << 16) | u32::from(low)))
    }

    /// Writes a 32-bit field split across `hi` and `lo`, high half first.
    fn write_dword(&mut self, hi: u16, lo: u16, value: u32) -> Result<(), Self::Error> {
        self.write_word(hi, (value >> 16) as u16)?;
        self.write_word(lo, value as u16)
    }
}
