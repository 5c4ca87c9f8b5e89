//! Bit-rate table shared by speed-change commands and persistent
//! configuration.
//!
//! A stored index of nine or above means "never configured" and falls back
//! to the default rate, so a blank store still yields a working bus.

/// Stored index meaning "no speed configured yet".
pub const SPEED_INDEX_UNSET: u16 = 9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Supported CAN bit rates, indexed as carried on the wire: the table
/// runs from the fastest rate at index zero down to the slowest.
pub enum BusSpeed {
    /// 1 Mbit/s.
    Rate1M = 0,
    /// 800 kbit/s.
    Rate800k = 1,
    /// 500 kbit/s.
    Rate500k = 2,
    /// 250 kbit/s, the power-on default.
    #[default]
    Rate250k = 3,
    /// 125 kbit/s.
    Rate125k = 4,
    /// 100 kbit/s.
    Rate100k = 5,
    /// 50 kbit/s.
    Rate50k = 6,
    /// 20 kbit/s.
    Rate20k = 7,
    /// 10 kbit/s.
    Rate10k = 8,
}

impl BusSpeed {
    /// Maps a wire or stored index onto a rate. Indices past the table
    /// (including [`SPEED_INDEX_UNSET`]) yield `None`.
    pub const fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(BusSpeed::Rate1M),
            1 => Some(BusSpeed::Rate800k),
            2 => Some(BusSpeed::Rate500k),
            3 => Some(BusSpeed::Rate250k),
            4 => Some(BusSpeed::Rate125k),
            5 => Some(BusSpeed::Rate100k),
            6 => Some(BusSpeed::Rate50k),
            7 => Some(BusSpeed::Rate20k),
            8 => Some(BusSpeed::Rate10k),
            _ => None,
        }
    }

    /// Index carried on the wire and in the persistent store.
    pub const fn index(self) -> u16 {
        self as u16
    }

    /// Nominal bit rate in bits per second.
    pub const fn bits_per_second(self) -> u32 {
        match self {
            BusSpeed::Rate10k => 10_000,
            BusSpeed::Rate20k => 20_000,
            BusSpeed::Rate50k => 50_000,
            BusSpeed::Rate100k => 100_000,
            BusSpeed::Rate125k => 125_000,
            BusSpeed::Rate250k => 250_000,
            BusSpeed::Rate500k => 500_000,
            BusSpeed::Rate800k => 800_000,
            BusSpeed::Rate1M => 1_000_000,
        }
    }
}
