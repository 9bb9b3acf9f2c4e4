//! knxip firmware entry point.
//!
//! Wires the telegram engine to ESP-IDF: NVS for persisted state, lwIP
//! UDP multicast for the bus, the high-resolution timer as clock.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  NvsAdapter        UdpMulticastTransport   MonotonicClock │
//! │  (StoragePort)     (DatagramTransport)     (Clock)        │
//! │  ─────────────────── Port Trait Boundary ─────────────    │
//! │  ┌────────────────────────────────────────────────────┐   │
//! │  │ KnxEngine: dispatch · config · feedback            │   │
//! │  └────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Network bring-up is the host's job; the loop below just retries the
//! multicast bind until an interface is available.

#![deny(unused_must_use)]

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use knxip::adapters::{MonotonicClock, NvsAdapter, UdpMulticastTransport};
use knxip::app::KnxEngine;
use knxip::app::ports::Clock;
use knxip::config::EngineConfig;
use knxip::protocol::dpt::{self, Datapoint};
use knxip::protocol::{Address, CommandType, Message};
use knxip::registry::OptionEntry;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const BIND_RETRY: Duration = Duration::from_secs(2);

static MODES: [OptionEntry; 4] = [
    OptionEntry { name: "Auto", value: 0 },
    OptionEntry { name: "Comfort", value: 1 },
    OptionEntry { name: "Standby", value: 2 },
    OptionEntry { name: "Frost protection", value: 4 },
];

fn is_value_telegram(msg: &Message) -> bool {
    matches!(msg.command, CommandType::Write | CommandType::Answer)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("knxip v{}", env!("CARGO_PKG_VERSION"));

    let mut nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init: {e}"))?;
    let clock = MonotonicClock::new();
    let mut engine = KnxEngine::new(EngineConfig::default())?;

    // ── 2. Shared firmware state ──────────────────────────────
    let setpoint = Rc::new(Cell::new(21.0_f32));
    let mode = Rc::new(Cell::new(0_u8));
    let send_now = Rc::new(Cell::new(false));

    // ── 3. Callbacks ──────────────────────────────────────────
    let sp = setpoint.clone();
    let setpoint_cb = engine.dispatch_mut().register_callback(
        "SetpointReceived",
        move |msg| {
            if !is_value_telegram(msg) {
                return;
            }
            match dpt::decode_float16(&msg.payload) {
                Ok(v) => {
                    info!("setpoint {v:.2} from {}", msg.source.physical_fields());
                    sp.set(v);
                }
                Err(e) => warn!("setpoint telegram: {e}"),
            }
        },
        None,
    )?;

    let m = mode.clone();
    let mode_cb = engine.dispatch_mut().register_callback(
        "ModeReceived",
        move |msg| {
            if !is_value_telegram(msg) {
                return;
            }
            match dpt::decode_1byte_uint(&msg.payload) {
                Ok(v) => {
                    info!("mode {v} from {}", msg.source.physical_fields());
                    m.set(v);
                }
                Err(e) => warn!("mode telegram: {e}"),
            }
        },
        None,
    )?;

    // ── 4. Config slots ───────────────────────────────────────
    let configs = engine.configs_mut();
    let status_ga = configs.register_group_address("Setpoint status GA", None)?;
    let interval = configs.register_int("Status interval (s)", 60, None)?;
    let default_mode = configs.register_options("Default mode", &MODES, 0, None)?;
    configs.register_string("Room", 32, "", None)?;

    // ── 5. Feedback ───────────────────────────────────────────
    let sp = setpoint.clone();
    let m = mode.clone();
    let flag = send_now.clone();
    let feedbacks = engine.feedbacks_mut();
    feedbacks.register_float("Setpoint", move || sp.get(), 1, None)?;
    feedbacks.register_int("Mode", move || i32::from(m.get()), None)?;
    feedbacks.register_action("Send status now", move || flag.set(true), None)?;

    // ── 6. Restore persisted state ────────────────────────────
    let restored = match engine.load(&nvs) {
        Ok(restored) => restored,
        Err(e) => {
            warn!("restore failed ({e}), starting from defaults");
            false
        }
    };
    if !restored {
        let dispatch = engine.dispatch_mut();
        dispatch.assign(Address::group(3, 2, 0)?, setpoint_cb)?;
        dispatch.assign(Address::group(3, 4, 0)?, mode_cb)?;
        if let Err(e) = engine.save(&mut nvs) {
            warn!("initial save failed: {e}");
        }
    }
    mode.set(engine.configs().get_option(default_mode)?);

    // ── 7. Transport ──────────────────────────────────────────
    let mut transport = loop {
        match UdpMulticastTransport::bind(engine.config()) {
            Ok(t) => break t,
            Err(e) => {
                warn!("multicast bind failed ({e}), retrying");
                std::thread::sleep(BIND_RETRY);
            }
        }
    };

    // ── 8. Main loop ──────────────────────────────────────────
    let mut last_status_us = clock.now_us();
    loop {
        engine.poll(&mut transport, &clock);

        let period_us = u64::try_from(engine.configs().get_int(interval)?.max(1))? * 1_000_000;
        let now = clock.now_us();
        if send_now.replace(false) || now.saturating_sub(last_status_us) >= period_us {
            last_status_us = now;
            let dest = engine.configs().get_group_address(status_ga)?;
            if let Err(e) = engine.write(&mut transport, dest, &Datapoint::Float16(setpoint.get())) {
                warn!("status send failed: {e}");
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
