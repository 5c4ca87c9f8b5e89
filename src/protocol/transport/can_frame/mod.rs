//! In-memory representation of a 29-bit extended CAN frame.
use crate::error::FrameError;
use embedded_can::{ExtendedId, Frame, Id};

/// Mask of the 29 identifier bits carried by an extended frame.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Raw extended frame as exchanged with the bus driver.
pub struct CanFrame {
    /// Full 29-bit CAN identifier stored inside a `u32`.
    pub id: u32,
    /// Remote (RTR) flag. Remote frames carry a length but no payload.
    pub remote: bool,
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
    /// Payload buffer. Unused bytes stay zeroed.
    pub data: [u8; 8],
}

impl CanFrame {
    /// Builds a data frame, validating identifier width and payload length.
    pub fn data_frame(id: u32, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > 8 {
            return Err(FrameError::PayloadTooLong {
                len: payload.len(),
            });
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id: id & EXTENDED_ID_MASK,
            remote: false,
            len: payload.len(),
            data,
        })
    }

    /// Builds a remote frame requesting `len` bytes.
    pub fn remote_frame(id: u32, len: usize) -> Result<Self, FrameError> {
        if len > 8 {
            return Err(FrameError::PayloadTooLong { len });
        }
        Ok(Self {
            id: id & EXTENDED_ID_MASK,
            remote: true,
            len,
            data: [0u8; 8],
        })
    }

    /// Reads the little-endian `u16` word starting at byte `2 * index`.
    ///
    /// Returns zero when the word lies past the payload length.
    pub fn word(&self, index: usize) -> u16 {
        let at = index * 2;
        if at + 2 > self.len {
            return 0;
        }
        u16::from_le_bytes([self.data[at], self.data[at + 1]])
    }

    /// Writes a little-endian `u16` word starting at byte `2 * index`,
    /// growing `len` to cover it.
    pub fn set_word(&mut self, index: usize, value: u16) {
        let at = index * 2;
        let bytes = value.to_le_bytes();
        self.data[at] = bytes[0];
        self.data[at + 1] = bytes[1];
        if self.len < at + 2 {
            self.len = at + 2;
        }
    }

    /// Converts a frame received from an [`embedded_can`] driver.
    ///
    /// Standard-identifier frames are foreign to this protocol and map
    /// to `None`.
    pub fn from_bus_frame(frame: &impl Frame) -> Option<Self> {
        let id = match frame.id() {
            Id::Extended(id) => id.as_raw(),
            Id::Standard(_) => return None,
        };
        let mut data = [0u8; 8];
        let len = if frame.is_remote_frame() {
            frame.dlc()
        } else {
            let payload = frame.data();
            data[..payload.len()].copy_from_slice(payload);
            payload.len()
        };
        Some(Self {
            id,
            remote: frame.is_remote_frame(),
            len,
            data,
        })
    }
}

impl Frame for CanFrame {
    /// Builds a data frame. Standard identifiers are rejected.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Extended(id) => CanFrame::data_frame(id.as_raw(), data).ok(),
            Id::Standard(_) => None,
        }
    }

    /// Builds a remote frame. Standard identifiers are rejected.
    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        match id.into() {
            Id::Extended(id) => CanFrame::remote_frame(id.as_raw(), dlc).ok(),
            Id::Standard(_) => None,
        }
    }

    fn is_extended(&self) -> bool {
        true
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        Id::Extended(ExtendedId::new(self.id).unwrap_or(ExtendedId::ZERO))
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len]
        }
    }
}
