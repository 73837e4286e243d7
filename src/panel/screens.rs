//! Screen topology and the fixed clock/sensor format tables.
//!
//! Frame builders here are pure functions of the data handed in; the
//! dispatcher decides when to draw them.

#![allow(missing_docs)]

use chrono::NaiveDateTime;

use crate::alarm::rules::AlarmId;
use crate::alarm::scheduler::{AlarmPhase, AlarmScheduler};
use crate::display::interface::ScreenFrame;
use crate::io::sensor::SensorSnapshot;
use crate::settings::navigator::FocusView;
use crate::settings::tree::SettingsTree;

// ──────────────────── screens ────────────────────

/// Top-level screens, cycled by button bit 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    Clock,
    #[default]
    Sensor,
    Config,
    Alarm,
}

impl Screen {
    /// Stable name used for labels, logging, and the `initial_screen` leaf.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Sensor => "sensor",
            Self::Config => "config",
            Self::Alarm => "alarm",
        }
    }

    /// Next screen in cycle order, wrapping back to the first.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Clock => Self::Sensor,
            Self::Sensor => Self::Config,
            Self::Config => Self::Alarm,
            Self::Alarm => Self::Clock,
        }
    }

    /// Resolve the `initial_screen` setting value.
    #[must_use]
    pub fn from_setting(value: &str) -> Option<Self> {
        match value {
            "clock" => Some(Self::Clock),
            "sensor" => Some(Self::Sensor),
            "config" => Some(Self::Config),
            "alarm" => Some(Self::Alarm),
            _ => None,
        }
    }
}

// ──────────────────── format tables ────────────────────

/// The eleven clock layouts cycled on the clock screen.
const CLOCK_FORMATS: [&str; 11] = [
    "%m/%d %H:%M %a",
    " %m/%d %H:%M %a",
    "%m/%d %H:%M",
    "  %m/%d %H:%M",
    "    %m/%d %H:%M",
    "%H:%M  %a",
    "  %H:%M  %a",
    "    %H:%M %a",
    "      %H:%M %a",
    "        %H:%M",
    "          %H:%M",
];

/// Number of clock layouts.
pub const CLOCK_FORMAT_COUNT: usize = CLOCK_FORMATS.len();

/// Render the clock in the given style (out-of-range falls back to style 0).
#[must_use]
pub fn format_clock(style: usize, now: NaiveDateTime) -> String {
    let format: &str = CLOCK_FORMATS.get(style).copied().unwrap_or(CLOCK_FORMATS[0]);
    now.format(format).to_string()
}

/// Render the temperature/humidity record in the given style.
#[must_use]
pub fn format_sensor(style: usize, snapshot: &SensorSnapshot) -> String {
    let temperature = snapshot.temperature;
    let humidity = snapshot.humidity;
    match style {
        1 => format!(" {temperature:05.2}C   {humidity:04.1}%"),
        2 => format!("  {temperature:05.2}C  {humidity:04.1}%"),
        _ => format!("{temperature:05.2}C   {humidity:04.1}%"),
    }
}

// ──────────────────── frame builders ────────────────────

/// Clock screen: one line, double height.
#[must_use]
pub fn clock_frame(tree: &SettingsTree, now: NaiveDateTime) -> ScreenFrame {
    let style = usize::try_from(tree.int("clock_style").unwrap_or(0)).unwrap_or(0);
    ScreenFrame::new(format_clock(style, now), "").double_height()
}

/// Sensor screen: the record alone (double height) when the clock overlay is
/// off, otherwise overlay clock on line 0 and the record on line 1.
#[must_use]
pub fn sensor_frame(
    tree: &SettingsTree,
    snapshot: Option<&SensorSnapshot>,
    now: NaiveDateTime,
) -> ScreenFrame {
    let overlay = usize::try_from(tree.int("sens_style.clock").unwrap_or(0)).unwrap_or(0);
    let style = usize::try_from(tree.int("sens_style.sens").unwrap_or(0)).unwrap_or(0);
    let record = snapshot.map_or_else(|| "sens n/a".to_string(), |s| format_sensor(style, s));

    if overlay == 0 {
        ScreenFrame::new(record, "").double_height()
    } else {
        ScreenFrame::new(format_clock(overlay - 1, now), record)
    }
}

/// Config screen: the navigator's focus view, always single height.
#[must_use]
pub fn config_frame(view: &FocusView) -> ScreenFrame {
    let mut frame = ScreenFrame::new(view.line0.clone(), view.line1.clone());
    if let Some(col) = view.cursor_col {
        frame = frame.with_cursor(1, col);
    }
    frame
}

/// Alarm screen: one alarm's rule summary plus its next occurrence or the
/// live alarm phase.
#[must_use]
pub fn alarm_frame(scheduler: &AlarmScheduler, focus: AlarmId) -> ScreenFrame {
    let Some(rule) = scheduler.rule(focus) else {
        return ScreenFrame::new("alarm", "none configured");
    };

    let line0 = format!(
        "{} {} {}",
        focus.tree_name(),
        if rule.enabled { "ON " } else { "OFF" },
        rule.recurrence.code(),
    );

    let line1 = match scheduler.phase() {
        AlarmPhase::Sounding { alarm, .. } if *alarm == focus => "sounding".to_string(),
        AlarmPhase::Snoozed {
            alarm, resume_at, ..
        } if *alarm == focus => format!("snooze {}", resume_at.format("%H:%M")),
        _ => scheduler
            .queue()
            .iter()
            .find(|e| e.alarm == focus)
            .map_or_else(
                || "off".to_string(),
                |e| format!("next {}", e.next_fire.format("%m/%d %H:%M")),
            ),
    };

    ScreenFrame::new(line0, line1)
}
