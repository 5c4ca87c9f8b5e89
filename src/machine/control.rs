//! The 10 ms control loop.
//!
//! [`Controller::step`] runs one tick end to end: communication engine,
//! sensor ingestion, protection logic, output and indicator drive, and
//! the bootloader handoff. [`Controller::run`] paces it forever.
//!
//! The thermal and overcurrent trips latch their error flag and drop
//! the power output; only a power-enable command clears them. The
//! supply and temperature flags follow their source.

use crate::infra::handoff::HandoffMemory;
use crate::infra::nvm::ConfigStore;
use crate::protocol::engine::{CanEngine, TickOutcome};
use crate::protocol::transport::traits::{CanDriver, MillisClock, TickPacer};

use super::indicators::{error_pattern, ErrorIndicator};
use super::io::{MachineIo, SystemReset};
use super::{MachineState, TEMP_LIMIT_CELSIUS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What one tick decided.
pub enum StepOutcome {
    Running,
    /// The upgrade request is latched and the outputs are off; the
    /// caller must warm-reset into the bootloader.
    EnterBootloader,
}

/// The control loop of one node.
pub struct Controller<'a, D, S, H, K, IO, R, const RX_CAP: usize>
where
    D: CanDriver,
    S: ConfigStore,
    H: HandoffMemory,
    K: MillisClock,
    IO: MachineIo,
    R: SystemReset,
{
    engine: CanEngine<'a, D, S, H, K, RX_CAP>,
    machine: MachineState,
    indicator: ErrorIndicator,
    io: IO,
    reset: R,
}

impl<'a, D, S, H, K, IO, R, const RX_CAP: usize> Controller<'a, D, S, H, K, IO, R, RX_CAP>
where
    D: CanDriver,
    S: ConfigStore,
    H: HandoffMemory,
    K: MillisClock,
    IO: MachineIo,
    R: SystemReset,
{
    /// Wraps an already-started engine. The machine starts with both
    /// outputs off and no errors.
    pub fn new(engine: CanEngine<'a, D, S, H, K, RX_CAP>, io: IO, reset: R) -> Self {
        Self {
            engine,
            machine: MachineState::default(),
            indicator: ErrorIndicator::new(),
            io,
            reset,
        }
    }

    /// One 10 ms tick.
    pub fn step(&mut self) -> StepOutcome {
        if self.engine.service(&mut self.machine) == TickOutcome::OutputsOff {
            self.machine.force_outputs_off();
        }

        let readings = self.io.read_sensors();
        self.machine.current_centi_amps = readings.current_centi_amps;
        self.machine.temp_a_celsius = readings.temp_a_celsius;
        self.machine.temp_b_celsius = readings.temp_b_celsius;

        self.machine.error_temp_sensor_a = readings.temp_a_celsius >= TEMP_LIMIT_CELSIUS;
        self.machine.error_temp_sensor_b = readings.temp_b_celsius >= TEMP_LIMIT_CELSIUS;

        let faults = self.io.read_faults();
        if faults.thermal_tripped {
            self.machine.error_thermal = true;
            self.machine.power_enabled = false;
        }
        if faults.overcurrent_tripped {
            self.machine.error_overcurrent = true;
            self.machine.power_enabled = false;
        }
        self.machine.error_over_under_voltage = faults.voltage_out_of_range;

        self.io.set_power_output(self.machine.power_enabled);
        self.io.set_switch_output(self.machine.switch_on);

        let lit = self.indicator.tick(error_pattern(&self.machine));
        self.io.set_error_indicator(lit);
        self.io.set_power_indicator(self.machine.power_enabled);

        if self.machine.bootloader_requested {
            self.engine.request_bootloader_upgrade();
            self.machine.force_outputs_off();
            self.io.set_power_output(false);
            self.io.set_switch_output(false);
            #[cfg(feature = "defmt")]
            defmt::info!("handing off to the bootloader");
            return StepOutcome::EnterBootloader;
        }
        StepOutcome::Running
    }

    /// Runs the loop forever. The first tick runs immediately, so the
    /// outputs reach their commanded state before the bus can ask for
    /// anything; after that one [`step`](Self::step) per pacer tick.
    pub fn run<P: TickPacer>(mut self, pacer: &mut P) -> ! {
        loop {
            if self.step() == StepOutcome::EnterBootloader {
                self.reset.restart();
            }
            pacer.wait_tick();
        }
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn engine(&self) -> &CanEngine<'a, D, S, H, K, RX_CAP> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CanEngine<'a, D, S, H, K, RX_CAP> {
        &mut self.engine
    }
}
