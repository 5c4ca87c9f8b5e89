//! Bootloader handoff area.
//!
//! Firmware and bootloader share a fixed 64-byte RAM block surviving a
//! warm reset. The bootloader fills it with its version and the board
//! name; the firmware only ever reads those fields and sets the upgrade
//! bit before restarting. The block counts as present only when both
//! recognition magics check out, so uninitialized RAM is never trusted.

/// Size of the shared block, in bytes.
pub const HANDOFF_AREA_LEN: usize = 64;

/// Recognition magic at the head of the block.
pub const HEAD_MAGIC: u16 = 0xC057;
/// Recognition magic at the trailer position.
pub const TAIL_MAGIC: u16 = 0x61AD;
/// Check code the bootloader expects from a valid application image.
pub const APP_CHECK_CODE: u16 = 0xAB01;

//==================================================================================LAYOUT
// Byte offsets of the fixed fields. The trailer magic floats: its
// position in 16-bit words is stored at TAIL_POS.
const AT_HEAD: usize = 0;
const AT_TAIL_POS: usize = 2;
const AT_VERSION: usize = 3;
const AT_BTL_MAJOR: usize = 4;
const AT_BTL_MINOR: usize = 6;
const AT_BTL_PATCH: usize = 8;
const AT_BOARD_NAME: usize = 10;
const BOARD_NAME_LEN: usize = 20;
const AT_APP_CHECK: usize = 30;
const AT_FLAGS: usize = 32;
const FLAG_UPGRADE: u16 = 0x0001;

//==================================================================================AREA

#[derive(Clone, Debug)]
/// Raw copy of the shared block, as handed over by the platform.
pub struct HandoffArea {
    bytes: [u8; HANDOFF_AREA_LEN],
}

impl HandoffArea {
    pub const fn from_bytes(bytes: [u8; HANDOFF_AREA_LEN]) -> Self {
        Self { bytes }
    }

    fn word_at(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    /// Parses the block into a record.
    ///
    /// `None` when either magic is missing or the stored trailer
    /// position points outside the block.
    pub fn record(&self) -> Option<HandoffRecord> {
        if self.word_at(AT_HEAD) != HEAD_MAGIC {
            return None;
        }
        let tail_at = usize::from(self.bytes[AT_TAIL_POS]) * 2;
        if tail_at + 2 > HANDOFF_AREA_LEN {
            return None;
        }
        if self.word_at(tail_at) != TAIL_MAGIC {
            return None;
        }
        let mut board_name = [0u8; BOARD_NAME_LEN];
        board_name.copy_from_slice(&self.bytes[AT_BOARD_NAME..AT_BOARD_NAME + BOARD_NAME_LEN]);
        Some(HandoffRecord {
            structure_version: self.bytes[AT_VERSION],
            bootloader_major: self.word_at(AT_BTL_MAJOR),
            bootloader_minor: self.word_at(AT_BTL_MINOR),
            bootloader_patch: self.word_at(AT_BTL_PATCH),
            board_name,
            app_check_code: self.word_at(AT_APP_CHECK),
            upgrade_requested: self.word_at(AT_FLAGS) & FLAG_UPGRADE != 0,
        })
    }
}

//==================================================================================RECORD

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded handoff block with both magics verified.
pub struct HandoffRecord {
    /// Layout version of the shared block itself.
    pub structure_version: u8,
    pub bootloader_major: u16,
    pub bootloader_minor: u16,
    pub bootloader_patch: u16,
    board_name: [u8; BOARD_NAME_LEN],
    /// Check code the bootloader left for application validation.
    pub app_check_code: u16,
    /// Whether an upgrade request is already latched.
    pub upgrade_requested: bool,
}

impl HandoffRecord {
    /// Board name as filled in by the bootloader, trimmed at the first
    /// NUL byte.
    pub fn board_name(&self) -> &[u8] {
        let end = self
            .board_name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(BOARD_NAME_LEN);
        &self.board_name[..end]
    }
}

//==================================================================================MEMORY_TRAIT

/// Platform access to the shared block.
///
/// `request_upgrade` must write through to the real RAM area so the bit
/// survives the warm reset that follows.
pub trait HandoffMemory {
    /// Snapshots the shared block.
    fn load(&self) -> HandoffArea;

    /// Latches the upgrade-request bit in the shared block.
    fn request_upgrade(&mut self);
}
