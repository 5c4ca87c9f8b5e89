/// Test doubles standing in for the board during integration tests: CAN
/// driver, parameter store, bootloader handoff area, clock, machine IO,
/// and the warm-reset hook. Every double hands out `Clone` handles over
/// shared state, so a test keeps visibility after moving one into the
/// engine.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use powergate_can::infra::handoff::{
    HandoffArea, HandoffMemory, APP_CHECK_CODE, HANDOFF_AREA_LEN, HEAD_MAGIC, TAIL_MAGIC,
};
use powergate_can::infra::nvm::ConfigStore;
use powergate_can::machine::io::{FaultInputs, MachineIo, SensorReadings, SystemReset};
use powergate_can::protocol::engine::CanEngine;
use powergate_can::protocol::transport::bus_speed::BusSpeed;
use powergate_can::protocol::transport::can_frame::CanFrame;
use powergate_can::protocol::transport::link::{AcceptFilter, CanLink};
use powergate_can::protocol::transport::traits::{CanDriver, MillisClock, TickPacer};
use powergate_can::protocol::wire::{
    derived_id, CommandSlot, CHECK_WORD_A, CHECK_WORD_B, CHECK_WORD_C, CONFIG_NODE_ID,
    OPC_BOOTLOADER, OPC_BUS_SPEED,
};

//==================================================================================DRIVER

#[derive(Default)]
struct DriverInner {
    sent: RefCell<Vec<CanFrame>>,
    refuse_submits: Cell<u32>,
    fault: Cell<bool>,
    configures: Cell<u32>,
    stops: Cell<u32>,
    last_speed: Cell<Option<BusSpeed>>,
    last_filter: Cell<Option<AcceptFilter>>,
}

#[derive(Clone, Default)]
/// In-memory CAN driver recording everything the engine asks of it.
pub struct MockDriver {
    inner: Rc<DriverInner>,
}

#[allow(dead_code)]
impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames the driver accepted, in submission order.
    pub fn sent(&self) -> Vec<CanFrame> {
        self.inner.sent.borrow().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.borrow().len()
    }

    pub fn last_sent(&self) -> CanFrame {
        self.inner.sent.borrow().last().expect("no frame was submitted").clone()
    }

    /// Makes the next `count` submissions fail, as a full mailbox would.
    pub fn refuse_submits(&self, count: u32) {
        self.inner.refuse_submits.set(count);
    }

    pub fn set_fault(&self, active: bool) {
        self.inner.fault.set(active);
    }

    /// Stop/configure/start cycles seen so far, bring-up excluded.
    pub fn reinit_count(&self) -> u32 {
        self.inner.stops.get()
    }

    pub fn last_speed(&self) -> Option<BusSpeed> {
        self.inner.last_speed.get()
    }

    pub fn last_filter(&self) -> Option<AcceptFilter> {
        self.inner.last_filter.get()
    }
}

impl CanDriver for MockDriver {
    type Error = ();

    fn configure(&mut self, speed: BusSpeed) -> Result<(), ()> {
        self.inner.configures.set(self.inner.configures.get() + 1);
        self.inner.last_speed.set(Some(speed));
        Ok(())
    }

    fn install_filter(&mut self, filter: &AcceptFilter) -> Result<(), ()> {
        self.inner.last_filter.set(Some(*filter));
        Ok(())
    }

    fn start(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ()> {
        self.inner.stops.set(self.inner.stops.get() + 1);
        Ok(())
    }

    fn submit(&mut self, frame: &CanFrame) -> Result<(), ()> {
        let refuse = self.inner.refuse_submits.get();
        if refuse > 0 {
            self.inner.refuse_submits.set(refuse - 1);
            return Err(());
        }
        self.inner.sent.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn fault_active(&self) -> bool {
        self.inner.fault.get()
    }
}

//==================================================================================STORE

#[derive(Clone, Default)]
/// Word store over a plain array, mimicking the flash-emulation layer.
pub struct MemStore {
    words: Rc<RefCell<[Option<u16>; 32]>>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn word(&self, vaddr: u16) -> Option<u16> {
        self.words.borrow()[vaddr as usize]
    }

    pub fn dword(&self, hi: u16, lo: u16) -> Option<u32> {
        let words = self.words.borrow();
        let high = words[hi as usize]?;
        let low = words[lo as usize]?;
        Some((u32::from(high) << 16) | u32::from(low))
    }

    pub fn seed_word(&self, vaddr: u16, value: u16) {
        self.words.borrow_mut()[vaddr as usize] = Some(value);
    }

    pub fn seed_dword(&self, hi: u16, lo: u16, value: u32) {
        self.seed_word(hi, (value >> 16) as u16);
        self.seed_word(lo, value as u16);
    }
}

impl ConfigStore for MemStore {
    type Error = ();

    fn read_word(&mut self, vaddr: u16) -> Result<Option<u16>, ()> {
        Ok(self.words.borrow()[vaddr as usize])
    }

    fn write_word(&mut self, vaddr: u16, value: u16) -> Result<(), ()> {
        self.words.borrow_mut()[vaddr as usize] = Some(value);
        Ok(())
    }
}

//==================================================================================HANDOFF

struct HandoffInner {
    bytes: Cell<[u8; HANDOFF_AREA_LEN]>,
    upgrade: Cell<bool>,
}

#[derive(Clone)]
/// RAM block shared with the bootloader, valid or deliberately blank.
pub struct MockHandoff {
    inner: Rc<HandoffInner>,
}

#[allow(dead_code)]
impl MockHandoff {
    /// A block the way the bootloader leaves it: both magics, version,
    /// bootloader 2.0.7, board name `HW.act`.
    pub fn valid() -> Self {
        let mut bytes = [0u8; HANDOFF_AREA_LEN];
        bytes[0..2].copy_from_slice(&HEAD_MAGIC.to_le_bytes());
        bytes[2] = 29;
        bytes[3] = 1;
        bytes[4..6].copy_from_slice(&2u16.to_le_bytes());
        bytes[8..10].copy_from_slice(&7u16.to_le_bytes());
        bytes[10..16].copy_from_slice(b"HW.act");
        bytes[30..32].copy_from_slice(&APP_CHECK_CODE.to_le_bytes());
        bytes[58..60].copy_from_slice(&TAIL_MAGIC.to_le_bytes());
        Self::from_bytes(bytes)
    }

    /// Uninitialized RAM: no magics, nothing to trust.
    pub fn blank() -> Self {
        Self::from_bytes([0u8; HANDOFF_AREA_LEN])
    }

    fn from_bytes(bytes: [u8; HANDOFF_AREA_LEN]) -> Self {
        Self {
            inner: Rc::new(HandoffInner {
                bytes: Cell::new(bytes),
                upgrade: Cell::new(false),
            }),
        }
    }

    pub fn upgrade_requested(&self) -> bool {
        self.inner.upgrade.get()
    }
}

impl HandoffMemory for MockHandoff {
    fn load(&self) -> HandoffArea {
        HandoffArea::from_bytes(self.inner.bytes.get())
    }

    fn request_upgrade(&mut self) {
        self.inner.upgrade.set(true);
    }
}

//==================================================================================CLOCK

#[derive(Clone, Default)]
/// Hand-cranked millisecond clock.
pub struct MockClock {
    now: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: u32) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: u32) {
        self.now.set(self.now.get().wrapping_add(delta_ms));
    }
}

impl MillisClock for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

//==================================================================================MACHINE_IO

#[allow(dead_code)]
#[derive(Default)]
struct IoInner {
    sensors: Cell<SensorReadings>,
    faults: Cell<FaultInputs>,
    power_output: Cell<bool>,
    switch_output: Cell<bool>,
    error_led: Cell<bool>,
    power_led: Cell<bool>,
}

#[allow(dead_code)]
#[derive(Clone, Default)]
/// Board IO double: scripted sensors and inputs, recorded outputs.
pub struct MockIo {
    inner: Rc<IoInner>,
}

#[allow(dead_code)]
impl MockIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sensors(&self, current_centi_amps: u32, temp_a: i16, temp_b: i16) {
        self.inner.sensors.set(SensorReadings {
            current_centi_amps,
            temp_a_celsius: temp_a,
            temp_b_celsius: temp_b,
        });
    }

    pub fn set_faults(&self, thermal: bool, overcurrent: bool, voltage: bool) {
        self.inner.faults.set(FaultInputs {
            thermal_tripped: thermal,
            overcurrent_tripped: overcurrent,
            voltage_out_of_range: voltage,
        });
    }

    pub fn power_output(&self) -> bool {
        self.inner.power_output.get()
    }

    pub fn switch_output(&self) -> bool {
        self.inner.switch_output.get()
    }

    pub fn error_led(&self) -> bool {
        self.inner.error_led.get()
    }

    pub fn power_led(&self) -> bool {
        self.inner.power_led.get()
    }
}

impl MachineIo for MockIo {
    fn read_sensors(&mut self) -> SensorReadings {
        self.inner.sensors.get()
    }

    fn read_faults(&mut self) -> FaultInputs {
        self.inner.faults.get()
    }

    fn set_power_output(&mut self, on: bool) {
        self.inner.power_output.set(on);
    }

    fn set_switch_output(&mut self, on: bool) {
        self.inner.switch_output.set(on);
    }

    fn set_error_indicator(&mut self, lit: bool) {
        self.inner.error_led.set(lit);
    }

    fn set_power_indicator(&mut self, lit: bool) {
        self.inner.power_led.set(lit);
    }
}

//==================================================================================RESET

#[allow(dead_code)]
#[derive(Clone, Copy, Default)]
/// Reset hook aborting the test with a recognizable panic instead of
/// actually resetting.
pub struct PanicReset;

impl SystemReset for PanicReset {
    fn restart(&mut self) -> ! {
        panic!("warm reset requested");
    }
}

#[allow(dead_code)]
#[derive(Clone, Copy, Default)]
/// Pacer that does not pace: ticks run back to back.
pub struct InstantPacer;

impl TickPacer for InstantPacer {
    fn wait_tick(&mut self) {}
}

//==================================================================================BENCH

/// One board's worth of doubles, cloned into the engine while the test
/// keeps its own handles.
pub struct Bench {
    pub driver: MockDriver,
    pub store: MemStore,
    pub handoff: MockHandoff,
    pub clock: MockClock,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self {
            driver: MockDriver::new(),
            store: MemStore::new(),
            handoff: MockHandoff::valid(),
            clock: MockClock::new(),
        }
    }

    /// Brings an engine up against this bench.
    pub fn engine<'l, const CAP: usize>(
        &self,
        link: &'l CanLink<CAP>,
    ) -> CanEngine<'l, MockDriver, MemStore, MockHandoff, MockClock, CAP> {
        CanEngine::new(
            self.driver.clone(),
            self.store.clone(),
            self.handoff.clone(),
            self.clock.clone(),
            link,
        )
        .expect("engine bring-up failed")
    }
}

//==================================================================================FRAMES

#[allow(dead_code)]
/// Addressing command on the configuration identifier: opcode, 32-bit
/// value low word first, guard word last.
pub fn config_cmd(opcode: u16, value: u32) -> CanFrame {
    let mut frame = CanFrame::data_frame(CONFIG_NODE_ID, &[0; 8]).unwrap();
    frame.set_word(0, opcode);
    frame.set_word(1, value as u16);
    frame.set_word(2, (value >> 16) as u16);
    frame.set_word(3, CHECK_WORD_C);
    frame
}

#[allow(dead_code)]
pub fn speed_cmd(index: u16) -> CanFrame {
    let mut frame = CanFrame::data_frame(CONFIG_NODE_ID, &[0; 6]).unwrap();
    frame.set_word(0, OPC_BUS_SPEED);
    frame.set_word(1, index);
    frame.set_word(2, CHECK_WORD_C);
    frame
}

#[allow(dead_code)]
pub fn bootloader_cmd() -> CanFrame {
    let mut frame = CanFrame::data_frame(CONFIG_NODE_ID, &[0; 6]).unwrap();
    frame.set_word(0, OPC_BOOTLOADER);
    frame.set_word(1, CHECK_WORD_A);
    frame.set_word(2, CHECK_WORD_B);
    frame
}

#[allow(dead_code)]
/// Data command on a derived receive slot.
pub fn slot_cmd(base: u32, offset: u32, slot: CommandSlot, words: &[u16]) -> CanFrame {
    let id = derived_id(base, offset, slot.multiplier());
    let mut frame = CanFrame::data_frame(id, &[]).unwrap();
    for (index, word) in words.iter().enumerate() {
        frame.set_word(index, *word);
    }
    frame
}

#[allow(dead_code)]
pub fn config_poll() -> CanFrame {
    CanFrame::remote_frame(CONFIG_NODE_ID, 0).unwrap()
}
