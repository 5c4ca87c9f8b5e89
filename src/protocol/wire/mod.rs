//! Wire-level constants of the node protocol: the fixed configuration
//! identifier, command opcodes, check words, and the derived-identifier
//! slot layout.
//!
//! Every multi-byte payload field is a little-endian `u16` word at an even
//! byte offset; 32-bit values travel as a low word followed by a high word.

//==================================================================================IDENTIFIERS

/// Fixed identifier every node listens on for configuration traffic.
pub const CONFIG_NODE_ID: u32 = 0x2001;

//==================================================================================OPCODES

/// Set or report the receive base identifier.
pub const OPC_RECEIVE_BASE: u16 = 0x0000;
/// Set or report the send base identifier.
pub const OPC_SEND_BASE: u16 = 0x0001;
/// Set or report the derived-identifier offset.
pub const OPC_ID_OFFSET: u16 = 0x0002;
/// Change the bus bit rate.
pub const OPC_BUS_SPEED: u16 = 0x0100;
/// Request the jump into the bootloader.
pub const OPC_BOOTLOADER: u16 = 0x1000;

//==================================================================================CHECK_WORDS

/// First guard word of the bootloader request (payload word 1).
pub const CHECK_WORD_A: u16 = 0x1234;
/// Second guard word of the bootloader request (payload word 2).
pub const CHECK_WORD_B: u16 = 0x5157;
/// Guard word of addressing and speed commands (last payload word).
pub const CHECK_WORD_C: u16 = 0xDCCD;

//==================================================================================SLOTS

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Command slots reachable at `receive_base + receive_offset * multiplier`.
pub enum CommandSlot {
    /// Telemetry period update (data, 2 bytes).
    TelemetryPeriod = 0,
    /// Power/switch output command (data, 4 bytes).
    OutputEnable = 1,
    /// Operational bus-speed change (data, 2 bytes).
    SpeedChange = 2,
    /// Board-name poll (remote frame).
    BoardName = 3,
    /// Firmware-version poll (remote frame).
    FirmwareVersion = 4,
}

impl CommandSlot {
    /// All slots, in multiplier order.
    pub const ALL: [CommandSlot; 5] = [
        CommandSlot::TelemetryPeriod,
        CommandSlot::OutputEnable,
        CommandSlot::SpeedChange,
        CommandSlot::BoardName,
        CommandSlot::FirmwareVersion,
    ];

    /// Offset multiplier applied on top of the receive base.
    pub const fn multiplier(self) -> u32 {
        self as u32
    }
}

/// Telemetry slot reachable at `send_base + send_offset * multiplier`.
pub const TELEMETRY_SLOT_MONITOR: u32 = 0;

/// Number of offset multiples reserved per base identifier. Collision
/// validation covers this whole range on both the receive and send side.
pub const RESERVED_SLOT_SPAN: u32 = 5;

/// Identifier of slot `multiplier` under `base`, wrapping on overflow.
pub const fn derived_id(base: u32, offset: u32, multiplier: u32) -> u32 {
    base.wrapping_add(offset.wrapping_mul(multiplier))
}
