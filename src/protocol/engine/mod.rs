//! The per-tick communication engine.
//!
//! One [`CanEngine`] owns the driver, the persistent store, the
//! bootloader handoff access, and all protocol state. The control loop
//! calls [`CanEngine::service`] once per 10 ms tick; everything else
//! reaches the engine through the interrupt side of the shared
//! [`CanLink`].
//!
//! Tick order: interrupt events, fault monitor, one command dispatch,
//! configuration-gate recompute, transmit retry, periodic telemetry.
//! The gate is recomputed after dispatch, so a command sees the gate
//! state of the previous tick.

pub mod monitor;
pub mod publisher;

use crate::error::{EngineInitError, ReinitError};
use crate::infra::handoff::HandoffMemory;
use crate::infra::nvm::{ConfigStore, PARAMS_VERSION, VADDR_PARAMS_VERSION};
use crate::machine::MachineState;
use crate::protocol::addressing::{ApplyOutcome, NodeAddressing};
use crate::protocol::transport::bus_speed::BusSpeed;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::link::CanLink;
use crate::protocol::transport::traits::{CanDriver, MillisClock};
use crate::protocol::transport::tx_slot::{RetryOutcome, SlotState, TxSlot};
use crate::protocol::wire::{
    CommandSlot, CHECK_WORD_A, CHECK_WORD_B, CHECK_WORD_C, CONFIG_NODE_ID, OPC_BOOTLOADER,
    OPC_BUS_SPEED, OPC_ID_OFFSET, OPC_RECEIVE_BASE, OPC_SEND_BASE, TELEMETRY_SLOT_MONITOR,
};
use crate::version::{version_words, FALLBACK_BOARD_NAME};

use monitor::{BusMonitor, MonitorVerdict};
use publisher::{monitor_frame, PeriodicPublisher};

//==================================================================================OUTCOMES

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Running counters, for diagnostics only.
pub struct LinkStats {
    /// Frames taken off the receive queue.
    pub frames_processed: u32,
    /// Ticks on which the interrupt side reported a dropped frame.
    pub frames_dropped: u32,
    /// Dispatched frames that executed a command or answered a poll.
    pub commands_executed: u32,
    /// Replies handed to the transmit slot.
    pub replies_sent: u32,
    /// Telemetry frames handed to the transmit slot.
    pub telemetry_sent: u32,
    /// Bus reinitializations, fault-driven and configuration-driven.
    pub bus_reinits: u32,
    /// Exhausted transmit retry cycles.
    pub retry_cycles_exhausted: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What the control loop must do after a service pass.
pub enum TickOutcome {
    Nominal,
    /// Transmit exhaustion degraded the node: force both outputs off.
    OutputsOff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Classification result of one dequeued frame.
enum DispatchOutcome {
    /// No shape matched, a guard word was missing, or the gate was
    /// closed. Nothing changed.
    Ignored,
    /// A command or poll was executed. Proves the bus works at the
    /// current speed, confirming any pending speed persist.
    Executed,
    /// A new speed was applied live; its persist waits for the next
    /// executed frame.
    SpeedChangePending,
}

//==================================================================================ENGINE

/// Protocol engine of one node.
pub struct CanEngine<'a, D, S, H, K, const RX_CAP: usize>
where
    D: CanDriver,
    S: ConfigStore,
    H: HandoffMemory,
    K: MillisClock,
{
    driver: D,
    store: S,
    handoff: H,
    clock: K,
    link: &'a CanLink<RX_CAP>,
    addressing: NodeAddressing,
    slot: TxSlot,
    monitor: BusMonitor,
    publisher: PeriodicPublisher,
    /// Round-robin position of the configuration report.
    report_cycle: u8,
    /// A live speed change waiting for its first proof of reception.
    speed_persist_pending: bool,
    /// Gate state computed at the end of the previous tick.
    config_allowed: bool,
    stats: LinkStats,
}

impl<'a, D, S, H, K, const RX_CAP: usize> CanEngine<'a, D, S, H, K, RX_CAP>
where
    D: CanDriver,
    S: ConfigStore,
    H: HandoffMemory,
    K: MillisClock,
{
    //==============================================================================STARTUP

    /// Brings the engine up: parameter-version check, addressing load,
    /// driver configuration, filter install, bus start.
    pub fn new(
        mut driver: D,
        mut store: S,
        handoff: H,
        clock: K,
        link: &'a CanLink<RX_CAP>,
    ) -> Result<Self, EngineInitError<D::Error, S::Error>> {
        check_params_version(&mut store).map_err(EngineInitError::Store)?;
        let addressing = NodeAddressing::load(&mut store).map_err(EngineInitError::Store)?;

        driver.configure(addressing.speed()).map_err(EngineInitError::Driver)?;
        let filter = addressing.accept_filter();
        driver.install_filter(&filter).map_err(EngineInitError::Driver)?;
        driver.start().map_err(EngineInitError::Driver)?;
        link.set_filter(filter);
        link.clear_queue();

        #[cfg(feature = "defmt")]
        defmt::info!(
            "engine up: speed {}, receive base {=u32:#x}, send base {=u32:#x}",
            addressing.speed(),
            addressing.receive_base(),
            addressing.send_base()
        );

        Ok(Self {
            driver,
            store,
            handoff,
            clock,
            link,
            addressing,
            slot: TxSlot::new(),
            monitor: BusMonitor::new(),
            publisher: PeriodicPublisher::new(),
            report_cycle: 0,
            speed_persist_pending: false,
            config_allowed: false,
            stats: LinkStats::default(),
        })
    }

    //==============================================================================SERVICE

    /// One engine pass. Call exactly once per 10 ms tick.
    pub fn service(&mut self, machine: &mut MachineState) -> TickOutcome {
        let mut outcome = TickOutcome::Nominal;

        // Interrupt events. Errors open the unresolved window first, so
        // an exchange in the same window closes it again.
        let events = self.link.take_events();
        if events.bus_error {
            self.monitor.note_bus_error();
        }
        if events.rx_activity {
            self.monitor.note_activity();
        }
        if events.rx_dropped {
            self.stats.frames_dropped += 1;
        }
        if events.tx_completed {
            self.slot.transmission_complete();
            self.monitor.transmission_complete();
        }
        if events.tx_aborted {
            self.slot.transmission_aborted();
        }

        // Fault monitor.
        match self.monitor.tick(self.driver.fault_active()) {
            MonitorVerdict::Nominal => {}
            MonitorVerdict::Reinit => self.recover_bus(),
            MonitorVerdict::ReinitDegraded => {
                self.recover_bus();
                self.publisher.disable();
                outcome = TickOutcome::OutputsOff;
                #[cfg(feature = "defmt")]
                defmt::warn!("transmit exhaustion, node degraded");
            }
        }

        // At most one command per tick.
        if let Some(frame) = self.link.pop_frame() {
            self.stats.frames_processed += 1;
            match self.dispatch(&frame, machine) {
                DispatchOutcome::Ignored => {}
                DispatchOutcome::Executed => {
                    self.stats.commands_executed += 1;
                    if self.speed_persist_pending {
                        self.speed_persist_pending = false;
                        self.addressing.persist_speed(&mut self.store);
                        #[cfg(feature = "defmt")]
                        defmt::info!("speed {} confirmed and persisted", self.addressing.speed());
                    }
                }
                DispatchOutcome::SpeedChangePending => {
                    self.speed_persist_pending = true;
                }
            }
        }

        // Gate for the next tick's commands.
        self.config_allowed = !self.publisher.is_enabled() && machine.outputs_quiescent();

        // Transmit retry.
        match self.slot.retry_step(&mut self.driver) {
            RetryOutcome::Idle | RetryOutcome::Resubmitted => {}
            RetryOutcome::Failed => self.monitor.note_transmit_failure(),
            RetryOutcome::CycleExhausted => {
                // Queue and pending frame survive this reinit.
                self.stats.retry_cycles_exhausted += 1;
                #[cfg(feature = "defmt")]
                defmt::warn!("transmit retry cycle exhausted, reinitializing bus");
                if self.reinit_driver().is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("bus reinit failed");
                }
                self.stats.bus_reinits += 1;
            }
        }

        // Periodic telemetry, deferred while the slot is busy.
        let now_ms = self.clock.now_ms();
        if self.publisher.poll(now_ms) && self.slot.is_ready() {
            let id = self.addressing.send_slot_id(TELEMETRY_SLOT_MONITOR);
            self.submit_frame(monitor_frame(id, machine));
            self.publisher.mark_sent(now_ms);
            self.stats.telemetry_sent += 1;
        }

        outcome
    }

    //==============================================================================DISPATCH

    fn dispatch(&mut self, frame: &CanFrame, machine: &mut MachineState) -> DispatchOutcome {
        if frame.remote {
            return self.dispatch_poll(frame);
        }
        if frame.id == CONFIG_NODE_ID {
            return self.dispatch_config(frame, machine);
        }
        self.dispatch_operational(frame, machine)
    }

    /// Remote frames: the round-robin configuration report and the two
    /// version polls. Replies go out on the polled identifier.
    fn dispatch_poll(&mut self, frame: &CanFrame) -> DispatchOutcome {
        if frame.id == CONFIG_NODE_ID {
            let (opcode, value) = match self.report_cycle {
                0 => (OPC_RECEIVE_BASE, self.addressing.receive_base()),
                1 => (OPC_SEND_BASE, self.addressing.send_base()),
                _ => (OPC_ID_OFFSET, self.addressing.receive_offset()),
            };
            self.report_cycle = (self.report_cycle + 1) % 3;
            let mut data = [0u8; 8];
            data[0..2].copy_from_slice(&opcode.to_le_bytes());
            data[2..6].copy_from_slice(&value.to_le_bytes());
            self.reply(CanFrame {
                id: CONFIG_NODE_ID,
                remote: false,
                len: 6,
                data,
            });
            return DispatchOutcome::Executed;
        }
        if frame.id == self.addressing.receive_slot_id(CommandSlot::BoardName) {
            let mut data = [0u8; 8];
            let area = self.handoff.load();
            let record = area.record();
            let name = match &record {
                Some(record) => record.board_name(),
                None => FALLBACK_BOARD_NAME,
            };
            let len = name.len().min(8);
            data[..len].copy_from_slice(&name[..len]);
            self.reply(CanFrame {
                id: frame.id,
                remote: false,
                len: 8,
                data,
            });
            return DispatchOutcome::Executed;
        }
        if frame.id == self.addressing.receive_slot_id(CommandSlot::FirmwareVersion) {
            let mut data = [0u8; 8];
            for (chunk, word) in data.chunks_exact_mut(2).zip(version_words()) {
                chunk.copy_from_slice(&word.to_le_bytes());
            }
            self.reply(CanFrame {
                id: frame.id,
                remote: false,
                len: 8,
                data,
            });
            return DispatchOutcome::Executed;
        }
        DispatchOutcome::Ignored
    }

    /// Data frames on the configuration identifier.
    fn dispatch_config(&mut self, frame: &CanFrame, machine: &mut MachineState) -> DispatchOutcome {
        match frame.word(0) {
            OPC_RECEIVE_BASE if frame.len == 8 && frame.word(3) == CHECK_WORD_C => {
                if !self.config_allowed {
                    return DispatchOutcome::Ignored;
                }
                let value = (u32::from(frame.word(2)) << 16) | u32::from(frame.word(1));
                if self.addressing.apply_receive_base(value, &mut self.store)
                    == ApplyOutcome::Applied
                {
                    self.reinit_after_config();
                }
                DispatchOutcome::Executed
            }
            OPC_SEND_BASE if frame.len == 8 && frame.word(3) == CHECK_WORD_C => {
                if !self.config_allowed {
                    return DispatchOutcome::Ignored;
                }
                let value = (u32::from(frame.word(2)) << 16) | u32::from(frame.word(1));
                if self.addressing.apply_send_base(value, &mut self.store) == ApplyOutcome::Applied
                {
                    self.reinit_after_config();
                }
                DispatchOutcome::Executed
            }
            OPC_ID_OFFSET if frame.len == 8 && frame.word(3) == CHECK_WORD_C => {
                if !self.config_allowed {
                    return DispatchOutcome::Ignored;
                }
                let value = (u32::from(frame.word(2)) << 16) | u32::from(frame.word(1));
                // A rejected offset still resets to one, so the filter
                // must follow either way.
                let _ = self.addressing.apply_offset(value, &mut self.store);
                self.reinit_after_config();
                DispatchOutcome::Executed
            }
            OPC_BUS_SPEED if frame.len == 6 && frame.word(2) == CHECK_WORD_C => {
                self.change_speed(frame.word(1))
            }
            OPC_BOOTLOADER
                if frame.len == 6
                    && frame.word(1) == CHECK_WORD_A
                    && frame.word(2) == CHECK_WORD_B =>
            {
                if self.handoff.load().record().is_none() {
                    return DispatchOutcome::Ignored;
                }
                machine.bootloader_requested = true;
                #[cfg(feature = "defmt")]
                defmt::info!("bootloader handoff requested");
                DispatchOutcome::Executed
            }
            _ => DispatchOutcome::Ignored,
        }
    }

    /// Data frames on the receive-derived command identifiers.
    fn dispatch_operational(&mut self, frame: &CanFrame, machine: &mut MachineState) -> DispatchOutcome {
        if frame.id == self.addressing.receive_slot_id(CommandSlot::TelemetryPeriod)
            && frame.len == 2
        {
            self.publisher.set_period(frame.word(0));
            self.publisher.enable();
            return DispatchOutcome::Executed;
        }
        if frame.id == self.addressing.receive_slot_id(CommandSlot::OutputEnable) && frame.len == 4
        {
            if frame.word(0) & 0x0001 != 0 {
                machine.power_enabled = true;
                machine.error_overcurrent = false;
                machine.error_thermal = false;
            } else {
                machine.power_enabled = false;
            }
            machine.switch_on = frame.word(1) & 0x0001 != 0;
            self.publisher.enable();
            return DispatchOutcome::Executed;
        }
        if frame.id == self.addressing.receive_slot_id(CommandSlot::SpeedChange) && frame.len == 2
        {
            return self.change_speed(frame.word(0));
        }
        DispatchOutcome::Ignored
    }

    /// Shared by the configuration and operational speed commands: a
    /// matching index just confirms, a new valid one goes live at once
    /// with its persist deferred.
    fn change_speed(&mut self, index: u16) -> DispatchOutcome {
        if index == self.addressing.speed().index() {
            return DispatchOutcome::Executed;
        }
        let speed = match BusSpeed::from_index(index) {
            Some(speed) => speed,
            None => return DispatchOutcome::Ignored,
        };
        self.addressing.set_speed(speed);
        #[cfg(feature = "defmt")]
        defmt::info!("speed change to {}, persist deferred", speed);
        if self.reinit_driver().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus reinit failed");
        }
        self.stats.bus_reinits += 1;
        DispatchOutcome::SpeedChangePending
    }

    //==============================================================================TRANSMIT

    /// Hands a reply to the slot, skipping it when a send is in flight.
    fn reply(&mut self, frame: CanFrame) {
        if !self.slot.is_ready() {
            return;
        }
        self.submit_frame(frame);
        self.stats.replies_sent += 1;
    }

    fn submit_frame(&mut self, frame: CanFrame) {
        self.slot.submit(&mut self.driver, frame);
        if self.slot.state() == SlotState::RetryPending {
            self.monitor.note_transmit_failure();
        }
    }

    //==============================================================================RECOVERY

    /// Fault-driven recovery: abandon the in-flight frame, drop queued
    /// work, and rebuild the driver state.
    fn recover_bus(&mut self) {
        self.slot.reset();
        self.link.clear_queue();
        #[cfg(feature = "defmt")]
        defmt::warn!("bus fault, reinitializing");
        if self.reinit_driver().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus reinit failed");
        }
        self.stats.bus_reinits += 1;
    }

    /// Stop, reconfigure at the current speed, reinstall filters, start.
    fn reinit_driver(&mut self) -> Result<(), ReinitError<D::Error>> {
        self.driver.stop().map_err(ReinitError::Driver)?;
        self.driver
            .configure(self.addressing.speed())
            .map_err(ReinitError::Driver)?;
        let filter = self.addressing.accept_filter();
        self.driver.install_filter(&filter).map_err(ReinitError::Driver)?;
        self.link.set_filter(filter);
        self.driver.start().map_err(ReinitError::Driver)
    }

    /// After an addressing change: same speed, fresh filters.
    fn reinit_after_config(&mut self) {
        if self.reinit_driver().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus reinit failed");
        }
        self.stats.bus_reinits += 1;
    }

    //==============================================================================ACCESSORS

    /// Requests one out-of-cadence telemetry frame.
    pub fn force_telemetry(&mut self) {
        self.publisher.force_now();
    }

    /// Latches the upgrade request in the bootloader handoff area. Call
    /// right before the warm reset that hands control over.
    pub fn request_bootloader_upgrade(&mut self) {
        self.handoff.request_upgrade();
    }

    pub fn addressing(&self) -> &NodeAddressing {
        &self.addressing
    }

    /// Whether gated configuration commands would be honored this tick.
    pub fn config_allowed(&self) -> bool {
        self.config_allowed
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.publisher.is_enabled()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

/// Reads the stored parameter-set version and stamps the current one
/// when it is absent or older. A version bump is where a migration
/// would hook in; none exists yet.
fn check_params_version<S: ConfigStore>(store: &mut S) -> Result<(), S::Error> {
    let stored = store.read_word(VADDR_PARAMS_VERSION)?.unwrap_or(0);
    if stored >= PARAMS_VERSION {
        return Ok(());
    }
    #[cfg(feature = "defmt")]
    defmt::info!("parameter set version {=u16} -> {=u16}", stored, PARAMS_VERSION);
    store.write_word(VADDR_PARAMS_VERSION, PARAMS_VERSION)
}
