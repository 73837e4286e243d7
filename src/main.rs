//! `rmp` binary: wire the panel runtime to a display and a button source.
//!
//! On the appliance the display trait is implemented over the I2C controller
//! and button interrupts feed the channel; this entry point runs the same
//! core against the in-memory display and a stdin button feeder, which is
//! also how the panel is exercised off-device.

use std::io::BufRead as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;

use room_monitor_panel::core::config::PanelConfig;
use room_monitor_panel::core::errors::Result;
use room_monitor_panel::display::interface::{BufferDisplay, CharDisplay};
use room_monitor_panel::io::buttons::ButtonMask;
use room_monitor_panel::panel::runtime::{PanelRuntime, SignalHandler};

#[derive(Debug, Parser)]
#[command(name = "rmp", version, about = "Room monitor front panel")]
struct Cli {
    /// Path to the process configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Echo every display write to stderr.
    #[arg(long)]
    echo_display: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("[RMP] fatal: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = PanelConfig::load(cli.config.as_deref())?;

    let mut display = BufferDisplay::new(config.display.columns);
    if cli.echo_display {
        display = display.with_echo();
    }
    let display: Arc<Mutex<dyn CharDisplay>> = Arc::new(Mutex::new(display));

    let (button_tx, button_rx) = bounded::<ButtonMask>(16);
    spawn_stdin_buttons(button_tx);

    let signals = SignalHandler::new();
    let mut runtime = PanelRuntime::init(&config, display, button_rx, signals)?;
    runtime.run()
}

/// Feed button masks from stdin: a single digit `0`–`4` presses that button,
/// anything else parsing as an integer is taken as a raw 5-bit mask.
fn spawn_stdin_buttons(tx: Sender<ButtonMask>) {
    std::thread::Builder::new()
        .name("rmp-buttons".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim();
                let mask = match trimmed {
                    "0" => ButtonMask(0b00001),
                    "1" => ButtonMask(0b00010),
                    "2" => ButtonMask(0b00100),
                    "3" => ButtonMask(0b01000),
                    "4" => ButtonMask(0b10000),
                    other => match other.parse::<u8>() {
                        Ok(raw) => ButtonMask(raw),
                        Err(_) => continue,
                    },
                };
                if tx.send(mask).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| eprintln!("[RMP] button feeder failed to start: {err}"))
        .ok();
}
