//! motionctl — Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  serial-rx thread (RX interrupt)                             │
//! │     stdin bytes ──▶ SerialRx::feed_byte ──▶ RX channel / RT  │
//! │                                                              │
//! │  ───────────────────── Port Trait Boundary ───────────────   │
//! │                                                              │
//! │  Supervisor                                                  │
//! │    bootstrap ─▶ [ reset pass ─▶ LineProtocol ] forever       │
//! │                  SimMachine (every collaborator port)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `motionctl [config.json]`.  G-code is read from stdin and
//! responses are written to stdout; logs go to stderr.
#![deny(unused_must_use)]

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use motionctl::adapters::log_sink::LogEventSink;
use motionctl::adapters::machine::SimMachine;
use motionctl::adapters::protocol::LineProtocol;
use motionctl::adapters::serial::{RxChannel, SerialRx};
use motionctl::config::MachineConfig;
use motionctl::supervisor::Supervisor;
use motionctl::system::RealtimeFlags;

// ── Interrupt-shared state ────────────────────────────────────

static RT: RealtimeFlags = RealtimeFlags::new();
static RX: RxChannel = RxChannel::new();
static RX2: RxChannel = RxChannel::new();

// ── Startup helpers ───────────────────────────────────────────

fn init_logging() -> Result<()> {
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    Ok(())
}

fn load_config() -> Result<MachineConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("config: no file given, using defaults");
        return Ok(MachineConfig::default());
    };
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    let config = MachineConfig::from_json(&text).with_context(|| format!("loading config {path}"))?;
    info!("config: loaded {}", path);
    Ok(config)
}

/// Feed stdin into the RX path, standing in for the UART interrupt.
fn spawn_rx_thread(rx: SerialRx<'static>, rt: &'static RealtimeFlags) -> Result<()> {
    std::thread::Builder::new()
        .name("serial-rx".into())
        .spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                let byte = match byte {
                    Ok(b) => b,
                    Err(e) => {
                        warn!("serial-rx: {}", e);
                        break;
                    }
                };
                // Hold the sender back rather than dropping streamed input.
                while !rx.feed_byte(byte, rt) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            info!("serial-rx: input closed");
        })
        .context("spawning serial RX thread")?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  motionctl v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;

    let mut machine = SimMachine::new(&RX).with_echo(true).with_interrupts(&RT);
    if config.comm.secondary_channel {
        machine = machine.with_secondary(&RX2);
    }
    let engine = LineProtocol::new(&config);
    let mut sink = LogEventSink::new();

    let supervisor = Supervisor::boot(config, &RT, machine, engine, &mut sink);

    // Interrupts are live once bootstrap returns.
    spawn_rx_thread(SerialRx::new(&RX), &RT)?;

    supervisor.run(&mut sink)
}
