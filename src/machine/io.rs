//! Board seams of the control loop.
//!
//! The loop reaches the hardware only through [`MachineIo`] and
//! [`SystemReset`]; implementations map the logical signals onto the
//! pins and converters of the board. The protection inputs are exposed
//! as trip states: on boards where they are active-low pins, the
//! implementation inverts the level before reporting.

/// One tick's worth of analog measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReadings {
    /// Output current, in centiamperes.
    pub current_centi_amps: u32,
    /// Sensor A temperature, in degrees Celsius.
    pub temp_a_celsius: i16,
    /// Sensor B temperature, in degrees Celsius.
    pub temp_b_celsius: i16,
}

/// Protection-input trip states, already mapped from pin levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultInputs {
    /// Thermal protection tripped.
    pub thermal_tripped: bool,
    /// Overcurrent protection tripped.
    pub overcurrent_tripped: bool,
    /// Supply voltage out of its window.
    pub voltage_out_of_range: bool,
}

/// Board access of the control loop: sensors, protection inputs, the
/// two outputs and the two indicators.
pub trait MachineIo {
    /// Latest analog measurements.
    fn read_sensors(&mut self) -> SensorReadings;

    /// Protection-input trip states.
    fn read_faults(&mut self) -> FaultInputs;

    /// Drives the power-stage output.
    fn set_power_output(&mut self, on: bool);

    /// Drives the switch output.
    fn set_switch_output(&mut self, on: bool);

    /// Drives the error indicator.
    fn set_error_indicator(&mut self, lit: bool);

    /// Drives the power indicator.
    fn set_power_indicator(&mut self, lit: bool);
}

/// Warm-reset seam of the bootloader handoff.
pub trait SystemReset {
    /// Resets the system. Implementations may let the outputs settle
    /// for a couple of milliseconds first; they must not return.
    fn restart(&mut self) -> !;
}
