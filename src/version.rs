//! Firmware identity reported by the version poll. Release bumps touch
//! this file only.

/// Numeric build code identifying this firmware line.
pub const BUILD_CODE: u16 = 2225;
/// Firmware major version.
pub const VERSION_MAJOR: u16 = 0;
/// Firmware minor version.
pub const VERSION_MINOR: u16 = 1;
/// Firmware patch version.
pub const VERSION_PATCH: u16 = 0;

/// Board name reported when the bootloader handoff area carries none.
pub const FALLBACK_BOARD_NAME: &[u8] = b"HW.dev";

/// Payload words of the firmware-version reply, in wire order.
pub const fn version_words() -> [u16; 4] {
    [BUILD_CODE, VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH]
}
