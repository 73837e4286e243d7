//! Main control loop: fixed-period tick, serialized button handling, and
//! orderly shutdown.
//!
//! Two threads of control exist in the whole panel: this loop, and the
//! transition renderer owned by the dispatcher's coordinator. Button events
//! arrive on a crossbeam channel and are drained to completion before the
//! tick runs, so a press handled while the loop slept can never be
//! preempted by another press.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::core::config::PanelConfig;
use crate::core::errors::Result;
use crate::display::interface::CharDisplay;
use crate::display::transition::{TransitionCoordinator, TransitionTiming};
use crate::io::audio::AlarmAnnunciator;
use crate::io::buttons::ButtonMask;
use crate::io::presence::PresenceChannel;
use crate::io::sensor::SensorReader;
use crate::logger::{EventLoggerHandle, PanelEvent, spawn_logger};
use crate::panel::dispatcher::Dispatcher;
use crate::settings::store::SettingsStore;

// ──────────────────── signal handler ────────────────────

/// Thread-safe shutdown flag shared between the signal handler and the main
/// loop, polled every iteration.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register SIGINT/SIGTERM hooks. Registration is
    /// best-effort; failures are logged, not fatal.
    #[must_use]
    pub fn new() -> Self {
        let handler = Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        };
        for signal in [SIGINT, SIGTERM] {
            if let Err(err) =
                signal_hook::flag::register(signal, Arc::clone(&handler.shutdown_flag))
            {
                eprintln!("[RMP-SIGNAL] failed to register signal {signal}: {err}");
            }
        }
        handler
    }

    /// Check whether a shutdown has been requested.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown (tests, fatal errors).
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────── runtime ────────────────────

/// Owns the dispatcher and runs the tick loop until shutdown.
pub struct PanelRuntime {
    dispatcher: Dispatcher,
    signals: SignalHandler,
    button_rx: Receiver<ButtonMask>,
    tick_interval: Duration,
    logger: EventLoggerHandle,
    logger_join: Option<thread::JoinHandle<()>>,
    start_time: Instant,
}

impl PanelRuntime {
    /// Wire every component from the process configuration.
    pub fn init(
        config: &PanelConfig,
        display: Arc<Mutex<dyn CharDisplay>>,
        button_rx: Receiver<ButtonMask>,
        signals: SignalHandler,
    ) -> Result<Self> {
        let (logger, logger_join) = spawn_logger(config.paths.event_log.clone())?;
        logger.send(PanelEvent::PanelStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        let timing = TransitionTiming::new(
            config.display.transition_frames,
            config.display.frame_delay_ms,
            config.display.settle_delay_ms,
        );
        let transitions = TransitionCoordinator::spawn(Arc::clone(&display), timing)?;

        let audio = AlarmAnnunciator::new(
            config.audio.player_command.clone(),
            config.audio.led_device.clone(),
        );

        let dispatcher = Dispatcher::new(
            SettingsStore::new(config.paths.settings_snapshot.clone()),
            display,
            transitions,
            PresenceChannel::new(config.paths.presence_fifo.clone()),
            SensorReader::new(
                config.paths.sensor_snapshot.clone(),
                config.paths.sensor_snapshot_aside.clone(),
                Duration::from_millis(config.timing.sensor_retry_delay_ms),
            ),
            Box::new(audio),
            logger.clone(),
            Local::now().naive_local(),
        );

        Ok(Self {
            dispatcher,
            signals,
            button_rx,
            tick_interval: Duration::from_millis(config.timing.tick_interval_ms),
            logger,
            logger_join: Some(logger_join),
            start_time: Instant::now(),
        })
    }

    /// Run until a shutdown signal arrives. This is the `rmp` entry point.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.signals.should_shutdown() {
                break;
            }

            // Drain pending presses completely before the tick resumes.
            while let Ok(mask) = self.button_rx.try_recv() {
                if mask.any_pressed() {
                    self.dispatcher.handle_mask(mask, Local::now().naive_local());
                }
            }

            self.dispatcher.tick(Local::now().naive_local());
            thread::sleep(self.tick_interval);
        }

        self.shutdown();
        Ok(())
    }

    /// Orderly teardown: peripherals first, then the logger thread.
    fn shutdown(&mut self) {
        eprintln!("[RMP-PANEL] shutdown requested");
        self.dispatcher.shutdown();

        self.logger.send(PanelEvent::PanelStopped {
            reason: "operator interrupt".to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        });
        self.logger.shutdown();
        if let Some(join) = self.logger_join.take() {
            let _ = join.join();
        }
        eprintln!("[RMP-PANEL] shutdown complete");
    }

    /// The dispatcher, for integration tests.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::interface::BufferDisplay;
    use crate::panel::screens::Screen;
    use crossbeam_channel::bounded;
    use std::fs;

    fn test_config(dir: &tempfile::TempDir) -> PanelConfig {
        let mut config = PanelConfig::default();
        config.paths.presence_fifo = dir.path().join("pipe");
        config.paths.sensor_snapshot = dir.path().join("sens_data.txt");
        config.paths.sensor_snapshot_aside = dir.path().join("sens_data_err.txt");
        config.paths.settings_snapshot = dir.path().join("settings.toml");
        config.paths.event_log = dir.path().join("panel.jsonl");
        config.timing.tick_interval_ms = 5;
        config.display.transition_frames = 2;
        config.display.frame_delay_ms = 1;
        config.display.settle_delay_ms = 1;
        config.audio.player_command = vec!["true".to_string()];
        fs::write(&config.paths.presence_fifo, "").unwrap();
        fs::write(&config.paths.sensor_snapshot, "21.50,48.00,55.1").unwrap();
        config
    }

    #[test]
    fn signal_handler_flags_are_sticky() {
        let handler = SignalHandler {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        };
        assert!(!handler.should_shutdown());
        handler.request_shutdown();
        assert!(handler.should_shutdown());
        assert!(handler.should_shutdown(), "flag is not cleared by reads");

        let clone = handler.clone();
        assert!(clone.should_shutdown(), "clones share the flag");
    }

    #[test]
    fn run_handles_buttons_and_exits_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let display = Arc::new(Mutex::new(BufferDisplay::new(16)));
        let shared: Arc<Mutex<dyn CharDisplay>> = display.clone();
        let (button_tx, button_rx) = bounded(16);
        let signals = SignalHandler {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        };

        let mut runtime = PanelRuntime::init(&config, shared, button_rx, signals.clone()).unwrap();

        let worker = thread::spawn(move || {
            runtime.run().unwrap();
            runtime
        });

        // Cycle sensor -> config while the loop runs.
        button_tx.send(ButtonMask(0b00001)).unwrap();
        thread::sleep(Duration::from_millis(100));
        signals.request_shutdown();
        let runtime = worker.join().unwrap();

        assert_eq!(runtime.dispatcher().screen(), Screen::Config);
        // Shutdown blanked the display.
        assert_eq!(display.lock().line(0), "");

        // The event log recorded the session bracketing events.
        let log = fs::read_to_string(dir.path().join("panel.jsonl")).unwrap();
        assert!(log.contains("panel_started"));
        assert!(log.contains("panel_stopped"));
        assert!(log.contains("screen_changed"));
    }
}
