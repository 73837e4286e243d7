#![forbid(unsafe_code)]

//! Room monitor panel (rmp) — the on-device UI brain of a two-line LCD
//! appliance: five buttons, a status LED, and a buzzer.
//!
//! Three tightly coupled cores:
//! 1. **Settings navigator** — an arbitrary-depth settings tree browsed and
//!    edited with four buttons
//! 2. **Alarm scheduler** — recurrence rules, a sorted fire queue, and the
//!    alarm/snooze state machine
//! 3. **Transition renderer** — cancellable animated screen changes on a
//!    background thread
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use room_monitor_panel::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use room_monitor_panel::settings::tree::SettingsTree;
//! use room_monitor_panel::alarm::rules::calc_next_fire;
//! ```

pub mod prelude;

pub mod alarm;
pub mod core;
pub mod display;
pub mod io;
pub mod logger;
pub mod panel;
pub mod settings;
