//! Node addressing: mutable base identifiers and offsets, their
//! collision rules against the fixed configuration identifier, and
//! persistence of accepted changes.
//!
//! Identifier math wraps on overflow so an extreme base or offset can
//! never fault; the collision check sees the same wrapped values the
//! filter does.

use crate::infra::nvm::{
    ConfigStore, VADDR_BUS_SPEED, VADDR_RECEIVE_BASE_HI, VADDR_RECEIVE_BASE_LO,
    VADDR_RECEIVE_OFFSET_HI, VADDR_RECEIVE_OFFSET_LO, VADDR_SEND_BASE_HI, VADDR_SEND_BASE_LO,
    VADDR_SEND_OFFSET_HI, VADDR_SEND_OFFSET_LO,
};
use crate::protocol::transport::bus_speed::BusSpeed;
use crate::protocol::transport::link::AcceptFilter;
use crate::protocol::wire::{derived_id, CommandSlot, CONFIG_NODE_ID, RESERVED_SLOT_SPAN};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Result of an addressing mutation.
pub enum ApplyOutcome {
    /// Change validated, applied, and persisted.
    Applied,
    /// Change collided with the configuration identifier.
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Current addressing of the node, loaded at start and mutated only by
/// validated configuration commands.
pub struct NodeAddressing {
    receive_base: u32,
    receive_offset: u32,
    send_base: u32,
    send_offset: u32,
    speed: BusSpeed,
}

impl NodeAddressing {
    //==============================================================================LOAD

    /// Loads addressing from the store.
    ///
    /// A node with no stored receive base starts unaddressed (base 0,
    /// offsets 1) and ignores the rest of the stored set. The send side
    /// falls back to the receive side wherever its own value is absent.
    /// A stored speed index outside the table is treated as unset.
    pub fn load<S: ConfigStore>(store: &mut S) -> Result<Self, S::Error> {
        let mut addressing = Self {
            receive_base: 0,
            receive_offset: 1,
            send_base: 0,
            send_offset: 1,
            speed: BusSpeed::default(),
        };
        if let Some(base) = store.read_dword(VADDR_RECEIVE_BASE_HI, VADDR_RECEIVE_BASE_LO)? {
            addressing.receive_base = base;
            addressing.send_base = base;
            if let Some(send_base) = store.read_dword(VADDR_SEND_BASE_HI, VADDR_SEND_BASE_LO)? {
                addressing.send_base = send_base;
            }
            if let Some(offset) =
                store.read_dword(VADDR_RECEIVE_OFFSET_HI, VADDR_RECEIVE_OFFSET_LO)?
            {
                addressing.receive_offset = offset;
            }
            addressing.send_offset = addressing.receive_offset;
            if let Some(offset) = store.read_dword(VADDR_SEND_OFFSET_HI, VADDR_SEND_OFFSET_LO)? {
                addressing.send_offset = offset;
            }
        }
        if let Some(index) = store.read_word(VADDR_BUS_SPEED)? {
            if let Some(speed) = BusSpeed::from_index(index) {
                addressing.speed = speed;
            }
        }
        Ok(addressing)
    }

    //==============================================================================GETTERS

    pub fn receive_base(&self) -> u32 {
        self.receive_base
    }

    pub fn receive_offset(&self) -> u32 {
        self.receive_offset
    }

    pub fn send_base(&self) -> u32 {
        self.send_base
    }

    pub fn send_offset(&self) -> u32 {
        self.send_offset
    }

    pub fn speed(&self) -> BusSpeed {
        self.speed
    }

    /// Identifier of a receive-side command slot.
    pub fn receive_slot_id(&self, slot: CommandSlot) -> u32 {
        derived_id(self.receive_base, self.receive_offset, slot.multiplier())
    }

    /// Identifier of a send-side telemetry slot.
    pub fn send_slot_id(&self, multiplier: u32) -> u32 {
        derived_id(self.send_base, self.send_offset, multiplier)
    }

    /// Acceptance filter matching the current receive side.
    pub fn accept_filter(&self) -> AcceptFilter {
        AcceptFilter {
            config_id: CONFIG_NODE_ID,
            receive_base: self.receive_base,
            receive_offset: self.receive_offset,
        }
    }

    //==============================================================================MUTATIONS

    /// Checks every derived identifier, on both sides, against the
    /// configuration identifier.
    fn collides_with_config_id(&self) -> bool {
        for multiplier in 0..RESERVED_SLOT_SPAN {
            if derived_id(self.receive_base, self.receive_offset, multiplier) == CONFIG_NODE_ID {
                return true;
            }
            if derived_id(self.send_base, self.send_offset, multiplier) == CONFIG_NODE_ID {
                return true;
            }
        }
        false
    }

    /// Sets the receive base. A send base still at zero is seeded with
    /// the same value; a collision reverts both.
    pub fn apply_receive_base<S: ConfigStore>(&mut self, value: u32, store: &mut S) -> ApplyOutcome {
        let prior_receive = self.receive_base;
        let prior_send = self.send_base;
        self.receive_base = value;
        let seeded = self.send_base == 0;
        if seeded {
            self.send_base = value;
        }
        if self.collides_with_config_id() {
            self.receive_base = prior_receive;
            self.send_base = prior_send;
            #[cfg(feature = "defmt")]
            defmt::warn!("receive base {=u32:#x} rejected, collides with config id", value);
            return ApplyOutcome::Rejected;
        }
        self.persist_dword(store, VADDR_RECEIVE_BASE_HI, VADDR_RECEIVE_BASE_LO, self.receive_base);
        if seeded {
            self.persist_dword(store, VADDR_SEND_BASE_HI, VADDR_SEND_BASE_LO, self.send_base);
        }
        ApplyOutcome::Applied
    }

    /// Sets the send base. A collision retains the prior value.
    pub fn apply_send_base<S: ConfigStore>(&mut self, value: u32, store: &mut S) -> ApplyOutcome {
        let prior = self.send_base;
        self.send_base = value;
        if self.collides_with_config_id() {
            self.send_base = prior;
            #[cfg(feature = "defmt")]
            defmt::warn!("send base {=u32:#x} rejected, collides with config id", value);
            return ApplyOutcome::Rejected;
        }
        self.persist_dword(store, VADDR_SEND_BASE_HI, VADDR_SEND_BASE_LO, self.send_base);
        ApplyOutcome::Applied
    }

    /// Sets both offsets to the same value. A collision resets both to
    /// one instead. Either way the resulting offsets are persisted, so
    /// the filter change this forces is always reflected in the store.
    pub fn apply_offset<S: ConfigStore>(&mut self, value: u32, store: &mut S) -> ApplyOutcome {
        self.receive_offset = value;
        self.send_offset = value;
        let outcome = if self.collides_with_config_id() {
            self.receive_offset = 1;
            self.send_offset = 1;
            #[cfg(feature = "defmt")]
            defmt::warn!("offset {=u32} rejected, collides with config id", value);
            ApplyOutcome::Rejected
        } else {
            ApplyOutcome::Applied
        };
        self.persist_dword(
            store,
            VADDR_RECEIVE_OFFSET_HI,
            VADDR_RECEIVE_OFFSET_LO,
            self.receive_offset,
        );
        self.persist_dword(store, VADDR_SEND_OFFSET_HI, VADDR_SEND_OFFSET_LO, self.send_offset);
        outcome
    }

    /// Switches the live speed. Persistence is deferred to
    /// [`persist_speed`](Self::persist_speed) once the new speed has
    /// proven itself.
    pub fn set_speed(&mut self, speed: BusSpeed) {
        self.speed = speed;
    }

    /// Persists the current speed index.
    pub fn persist_speed<S: ConfigStore>(&self, store: &mut S) {
        if store.write_word(VADDR_BUS_SPEED, self.speed.index()).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("speed persist failed");
        }
    }

    /// Best-effort write of a split 32-bit field. The live value stays
    /// authoritative when the medium refuses the write.
    fn persist_dword<S: ConfigStore>(&self, store: &mut S, hi: u16, lo: u16, value: u32) {
        if store.write_dword(hi, lo, value).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("config persist failed");
        }
    }
}
