//! # Quickstart
//!
//! Minimal host-side walk through powergate-can:
//! - Bring the engine up over an in-memory board
//! - Commission a receive base over the configuration identifier
//! - Switch the outputs on and watch the monitor frame
//! - Poll the addressing report
//!
//! The board is simulated: the driver prints every frame it would put
//! on the wire.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::cell::Cell;
use std::rc::Rc;

use powergate_can::infra::handoff::{
    HandoffArea, HandoffMemory, APP_CHECK_CODE, HANDOFF_AREA_LEN, HEAD_MAGIC, TAIL_MAGIC,
};
use powergate_can::infra::nvm::ConfigStore;
use powergate_can::machine::MachineState;
use powergate_can::protocol::engine::CanEngine;
use powergate_can::protocol::transport::bus_speed::BusSpeed;
use powergate_can::protocol::transport::can_frame::CanFrame;
use powergate_can::protocol::transport::link::{AcceptFilter, CanLink};
use powergate_can::protocol::transport::traits::{CanDriver, MillisClock};
use powergate_can::protocol::transport::RX_QUEUE_DEPTH;
use powergate_can::protocol::wire::{CommandSlot, CHECK_WORD_C, CONFIG_NODE_ID, OPC_RECEIVE_BASE};

/// Driver that prints instead of transmitting.
struct PrintDriver;

impl CanDriver for PrintDriver {
    type Error = ();

    fn configure(&mut self, speed: BusSpeed) -> Result<(), ()> {
        println!("   [driver] configured at {} bit/s", speed.bits_per_second());
        Ok(())
    }

    fn install_filter(&mut self, filter: &AcceptFilter) -> Result<(), ()> {
        println!(
            "   [driver] filter: config 0x{:04X}, base 0x{:04X}",
            filter.config_id, filter.receive_base
        );
        Ok(())
    }

    fn start(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn submit(&mut self, frame: &CanFrame) -> Result<(), ()> {
        print!("   [driver] tx id 0x{:04X}, {} bytes:", frame.id, frame.len);
        for byte in &frame.data[..frame.len] {
            print!(" {:02X}", byte);
        }
        println!();
        Ok(())
    }

    fn fault_active(&self) -> bool {
        false
    }
}

/// Word store over a plain array.
#[derive(Default)]
struct ArrayStore {
    words: [Option<u16>; 32],
}

impl ConfigStore for ArrayStore {
    type Error = ();

    fn read_word(&mut self, vaddr: u16) -> Result<Option<u16>, ()> {
        Ok(self.words[vaddr as usize])
    }

    fn write_word(&mut self, vaddr: u16, value: u16) -> Result<(), ()> {
        self.words[vaddr as usize] = Some(value);
        Ok(())
    }
}

/// Handoff block the way the bootloader would leave it.
struct DemoHandoff;

impl HandoffMemory for DemoHandoff {
    fn load(&self) -> HandoffArea {
        let mut bytes = [0u8; HANDOFF_AREA_LEN];
        bytes[0..2].copy_from_slice(&HEAD_MAGIC.to_le_bytes());
        bytes[2] = 29;
        bytes[10..16].copy_from_slice(b"HW.act");
        bytes[30..32].copy_from_slice(&APP_CHECK_CODE.to_le_bytes());
        bytes[58..60].copy_from_slice(&TAIL_MAGIC.to_le_bytes());
        HandoffArea::from_bytes(bytes)
    }

    fn request_upgrade(&mut self) {
        println!("   [handoff] upgrade bit latched");
    }
}

/// Hand-cranked clock. Clones share the instant, so the demo can move
/// time forward after the engine takes its copy.
#[derive(Clone)]
struct DemoClock(Rc<Cell<u32>>);

impl MillisClock for DemoClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

fn main() {
    println!("=== powergate-can quickstart ===\n");

    // ======================================================================
    // 1. Bring the engine up over a blank board
    // ======================================================================
    println!("1. Engine bring-up (blank store)");

    let link: CanLink<RX_QUEUE_DEPTH> = CanLink::new();
    let clock = DemoClock(Rc::new(Cell::new(0)));
    let hands = clock.clone();
    let mut engine = CanEngine::new(PrintDriver, ArrayStore::default(), DemoHandoff, clock, &link)
        .expect("bring-up failed");
    let mut machine = MachineState::default();

    engine.service(&mut machine);
    println!("   configuration gate open: {}\n", engine.config_allowed());

    // ======================================================================
    // 2. Commission a receive base
    // ======================================================================
    println!("2. Setting receive base 0x1000");

    let mut command = CanFrame::data_frame(CONFIG_NODE_ID, &[0; 8]).expect("frame");
    command.set_word(0, OPC_RECEIVE_BASE);
    command.set_word(1, 0x1000);
    command.set_word(2, 0x0000);
    command.set_word(3, CHECK_WORD_C);
    link.frame_received(&command);
    engine.service(&mut machine);

    println!(
        "   receive base 0x{:04X}, send base 0x{:04X} (seeded)\n",
        engine.addressing().receive_base(),
        engine.addressing().send_base()
    );

    // ======================================================================
    // 3. Switch the outputs on
    // ======================================================================
    println!("3. Output-enable command on the derived identifier");

    let id = engine.addressing().receive_slot_id(CommandSlot::OutputEnable);
    let mut enable = CanFrame::data_frame(id, &[0; 4]).expect("frame");
    enable.set_word(0, 1);
    enable.set_word(1, 1);
    link.frame_received(&enable);
    engine.service(&mut machine);

    println!(
        "   power {}, switch {}, telemetry {}\n",
        machine.power_enabled,
        machine.switch_on,
        if engine.telemetry_enabled() { "on" } else { "off" }
    );

    // ======================================================================
    // 4. One telemetry period later the monitor frame goes out
    // ======================================================================
    println!("4. Monitor frame after one period");

    hands.0.set(210);
    engine.service(&mut machine);
    link.transmit_complete();
    println!();

    // ======================================================================
    // 5. Poll the addressing report
    // ======================================================================
    println!("5. Remote poll on the configuration identifier");

    link.frame_received(&CanFrame::remote_frame(CONFIG_NODE_ID, 0).expect("frame"));
    engine.service(&mut machine);

    let stats = engine.stats();
    println!(
        "\n   processed {}, executed {}, replies {}, telemetry {}",
        stats.frames_processed,
        stats.commands_executed,
        stats.replies_sent,
        stats.telemetry_sent
    );
}
