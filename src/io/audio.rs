//! Alarm annunciator: one-shot audio playback plus LED quiesce.
//!
//! `start` spawns the configured player process; `stop` kills it and sends a
//! silence-reset byte to the LED/PWM driver used while the alarm sounds.
//! Every failure here is logged and degrades to a no-op: a missing player
//! binary must never take the UI loop down, and stopping with no live
//! process handle does nothing.

use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::alarm::scheduler::AudioSink;

/// Spawns and stops the alarm playback process.
#[derive(Debug)]
pub struct AlarmAnnunciator {
    command: Vec<String>,
    led_device: Option<PathBuf>,
    child: Option<Child>,
}

impl AlarmAnnunciator {
    /// Annunciator running `command` (program + args) on start, and writing
    /// the silence-reset byte to `led_device` on stop.
    #[must_use]
    pub const fn new(command: Vec<String>, led_device: Option<PathBuf>) -> Self {
        Self {
            command,
            led_device,
            child: None,
        }
    }

    /// Whether a playback process is currently believed to be running.
    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(Some(_)) => {
                    // One-shot playback already finished; reap the handle.
                    self.child = None;
                    false
                }
                Ok(None) => true,
                Err(_) => false,
            },
            None => false,
        }
    }

    fn quiesce_led(&self) {
        let Some(device) = self.led_device.as_ref() else {
            return;
        };
        if let Err(err) = fs::write(device, b"0") {
            eprintln!(
                "[RMP-AUDIO] LED quiesce write failed for {}: {err}",
                device.display()
            );
        }
    }
}

impl AudioSink for AlarmAnnunciator {
    fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        let Some((program, args)) = self.command.split_first() else {
            eprintln!("[RMP-AUDIO] no player command configured");
            return;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => self.child = Some(child),
            Err(err) => {
                eprintln!("[RMP-AUDIO] player spawn failed ({program}): {err}");
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.quiesce_led();
    }
}

impl Drop for AlarmAnnunciator {
    fn drop(&mut self) {
        self.stop();
    }
}
