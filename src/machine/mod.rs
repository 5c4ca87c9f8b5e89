//! Machine-side state and control: the status record shared between the
//! communication engine and the control loop, fault logic, output and
//! indicator drive, and the loop itself.
pub mod control;
pub mod indicators;
pub mod io;

/// Temperature threshold for the sensor error flags, in degrees Celsius.
pub const TEMP_LIMIT_CELSIUS: i16 = 80;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Full machine status.
///
/// Owned by the control loop. The dispatcher writes the command-driven
/// fields, fault logic the error flags, sensor ingestion the measures;
/// the publisher only reads.
pub struct MachineState {
    /// Latched by the bootloader command; acted on at the end of a tick.
    pub bootloader_requested: bool,

    /// Thermal-protection input tripped. Forces power off and stays set
    /// until a power-enable command clears it.
    pub error_thermal: bool,
    /// Overcurrent input tripped. Forces power off and stays set until
    /// a power-enable command clears it.
    pub error_overcurrent: bool,
    /// Supply out of range. Follows the input, no latching.
    pub error_over_under_voltage: bool,
    /// Sensor A at or above [`TEMP_LIMIT_CELSIUS`]. Follows the reading.
    pub error_temp_sensor_a: bool,
    /// Sensor B at or above [`TEMP_LIMIT_CELSIUS`]. Follows the reading.
    pub error_temp_sensor_b: bool,

    /// Power-stage output commanded on.
    pub power_enabled: bool,
    /// Switch output commanded on.
    pub switch_on: bool,

    /// Output current, in centiamperes.
    pub current_centi_amps: u32,
    /// Sensor A temperature, in degrees Celsius.
    pub temp_a_celsius: i16,
    /// Sensor B temperature, in degrees Celsius.
    pub temp_b_celsius: i16,
}

impl MachineState {
    /// Whether both outputs are commanded off. One of the conditions
    /// for entering configuration mode.
    pub fn outputs_quiescent(&self) -> bool {
        !self.power_enabled && !self.switch_on
    }

    /// Drops both output commands, as done on a degraded bus or right
    /// before the bootloader jump.
    pub fn force_outputs_off(&mut self) {
        self.power_enabled = false;
        self.switch_on = false;
    }
}
