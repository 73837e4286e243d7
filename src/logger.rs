//! Panel event logging: a dedicated logger thread owning a JSONL appender.
//!
//! All other threads send [`PanelEvent`] values through a bounded crossbeam
//! channel. Non-blocking `try_send()` ensures the UI loop is never blocked
//! by logging back-pressure; overflow increments a dropped-events counter
//! instead. A `Shutdown` sentinel drains and stops the thread.

#![allow(missing_docs)]

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde_json::json;

use crate::alarm::rules::AlarmId;
use crate::core::errors::{PanelError, Result};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── events ────────────────────

/// Events recorded to the panel's JSONL log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    PanelStarted {
        version: String,
    },
    PanelStopped {
        reason: String,
        uptime_secs: u64,
    },
    ScreenChanged {
        from: &'static str,
        to: &'static str,
    },
    SettingsPersisted {
        dirty_leaves: usize,
    },
    FactoryReset,
    AlarmFired {
        alarm: AlarmId,
    },
    AlarmSnoozed {
        alarm: AlarmId,
        auto: bool,
    },
    AlarmDismissed {
        alarm: AlarmId,
    },
    SuppressionMode {
        mode: char,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

impl PanelEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::PanelStarted { .. } => "panel_started",
            Self::PanelStopped { .. } => "panel_stopped",
            Self::ScreenChanged { .. } => "screen_changed",
            Self::SettingsPersisted { .. } => "settings_persisted",
            Self::FactoryReset => "factory_reset",
            Self::AlarmFired { .. } => "alarm_fired",
            Self::AlarmSnoozed { .. } => "alarm_snoozed",
            Self::AlarmDismissed { .. } => "alarm_dismissed",
            Self::SuppressionMode { .. } => "suppression_mode",
            Self::Error { .. } => "error",
            Self::Shutdown => "shutdown",
        }
    }

    fn severity(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::FactoryReset | Self::PanelStopped { .. } => "warn",
            _ => "info",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            Self::PanelStarted { version } => json!({ "version": version }),
            Self::PanelStopped {
                reason,
                uptime_secs,
            } => json!({ "reason": reason, "uptime_secs": uptime_secs }),
            Self::ScreenChanged { from, to } => json!({ "from": from, "to": to }),
            Self::SettingsPersisted { dirty_leaves } => json!({ "dirty_leaves": dirty_leaves }),
            Self::AlarmFired { alarm } => json!({ "alarm": alarm.tree_name() }),
            Self::AlarmSnoozed { alarm, auto } => {
                json!({ "alarm": alarm.tree_name(), "auto": auto })
            }
            Self::AlarmDismissed { alarm } => json!({ "alarm": alarm.tree_name() }),
            Self::SuppressionMode { mode } => json!({ "mode": mode.to_string() }),
            Self::Error { code, message } => json!({ "code": code, "message": message }),
            Self::FactoryReset | Self::Shutdown => json!({}),
        }
    }
}

// ──────────────────── handle ────────────────────

/// Thread-safe, cheaply-cloneable handle for sending log events.
#[derive(Clone)]
pub struct EventLoggerHandle {
    tx: Sender<PanelEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl EventLoggerHandle {
    /// Send an event to the logger thread. Non-blocking: a full channel
    /// drops the event and bumps the counter.
    pub fn send(&self, event: PanelEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped to back-pressure so far.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to drain and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(PanelEvent::Shutdown);
    }

    /// Handle with no logger thread behind it; sends vanish. For tests and
    /// for running without a writable log location.
    #[must_use]
    pub fn disconnected() -> Self {
        let (tx, _) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread appending JSONL to `path`.
pub fn spawn_logger(path: PathBuf) -> Result<(EventLoggerHandle, thread::JoinHandle<()>)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| PanelError::io(parent, source))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| PanelError::io(&path, source))?;

    let (tx, rx) = bounded::<PanelEvent>(CHANNEL_CAPACITY);
    let join = thread::Builder::new()
        .name("rmp-logger".to_string())
        .spawn(move || logger_thread_main(&rx, file))
        .map_err(|source| PanelError::Runtime {
            details: format!("failed to spawn logger thread: {source}"),
        })?;

    Ok((
        EventLoggerHandle {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        },
        join,
    ))
}

fn logger_thread_main(rx: &Receiver<PanelEvent>, mut file: fs::File) {
    while let Ok(event) = rx.recv() {
        if event == PanelEvent::Shutdown {
            break;
        }
        let entry = json!({
            "ts": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "severity": event.severity(),
            "event": event.name(),
            "details": event.payload(),
        });
        if writeln!(file, "{entry}").is_err() {
            // Logging must never crash the panel; stderr is the fallback.
            eprintln!("[RMP-LOGGER] append failed for {}", event.name());
        }
    }
    let _ = file.flush();
}
