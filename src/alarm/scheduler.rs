//! Alarm queue and the Idle/Sounding/Snoozed state machine.
//!
//! The scheduler owns one rule per configured alarm and a time-ordered queue
//! of `(alarm, next_fire)` entries for the enabled ones. `polling(now)` is
//! the only place `Idle → Sounding` happens and it never mutates the queue;
//! snoozing is a phase-local override (`resume_at`) so the recurring entry
//! keeps its position until the alarm is dismissed and recomputed.

#![allow(missing_docs)]

use chrono::{Duration, NaiveDateTime};

use crate::alarm::rules::{AlarmId, AlarmRule, calc_next_fire};
use crate::io::buttons::ActionKey;

/// Sounding longer than this auto-snoozes.
const SOUNDING_AUTO_SNOOZE_SECS: i64 = 60;
/// Snooze length before re-sounding.
const SNOOZE_SECS: i64 = 5 * 60;
/// Consecutive same-key presses while snoozed that dismiss the alarm.
const DISMISS_PRESSES: u8 = 3;

// ──────────────────── audio seam ────────────────────

/// Start/stop seam for the audio peripheral. The production implementation
/// spawns and kills the playback process; tests record calls.
pub trait AudioSink {
    /// Begin alarm playback. Best-effort.
    fn start(&mut self);
    /// Stop alarm playback. A no-op when nothing is playing.
    fn stop(&mut self);
}

// ──────────────────── state ────────────────────

/// One queued future firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub alarm: AlarmId,
    pub next_fire: NaiveDateTime,
}

/// Current alarm/snooze phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmPhase {
    /// Waiting for the earliest queue entry to come due.
    Idle,
    /// Audio running since `since`.
    Sounding {
        alarm: AlarmId,
        since: NaiveDateTime,
    },
    /// Quiet until `resume_at`; tracks the same-key dismissal streak.
    Snoozed {
        alarm: AlarmId,
        resume_at: NaiveDateTime,
        confirm_key: Option<ActionKey>,
        confirm_count: u8,
    },
}

/// State-machine transitions surfaced to the dispatcher for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    Fired(AlarmId),
    AutoSnoozed {
        alarm: AlarmId,
        resume_at: NaiveDateTime,
    },
    Snoozed {
        alarm: AlarmId,
        key: ActionKey,
    },
    Resumed(AlarmId),
    Dismissed(AlarmId),
}

// ──────────────────── the scheduler ────────────────────

/// Maintains per-alarm recurrence rules, the sorted fire queue, and the
/// alarm/snooze phase.
#[derive(Debug)]
pub struct AlarmScheduler {
    rules: Vec<AlarmRule>,
    queue: Vec<QueueEntry>,
    phase: AlarmPhase,
}

impl AlarmScheduler {
    /// Build from one rule per alarm, computing the initial queue.
    #[must_use]
    pub fn new(rules: Vec<AlarmRule>, now: NaiveDateTime) -> Self {
        let mut scheduler = Self {
            rules,
            queue: Vec::new(),
            phase: AlarmPhase::Idle,
        };
        scheduler.recompute_all(now);
        scheduler
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> &AlarmPhase {
        &self.phase
    }

    /// Whether action buttons should be routed here instead of the screen.
    #[must_use]
    pub const fn wants_buttons(&self) -> bool {
        !matches!(self.phase, AlarmPhase::Idle)
    }

    /// Rule for one alarm, if configured.
    #[must_use]
    pub fn rule(&self, id: AlarmId) -> Option<&AlarmRule> {
        self.rules.get(id.0)
    }

    /// Number of configured alarms.
    #[must_use]
    pub fn alarm_count(&self) -> usize {
        self.rules.len()
    }

    /// The queue, sorted ascending by fire time.
    #[must_use]
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    /// Earliest pending entry.
    #[must_use]
    pub fn next_entry(&self) -> Option<&QueueEntry> {
        self.queue.first()
    }

    /// Whether any alarm is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.rules.iter().any(|r| r.enabled)
    }

    /// Replace one alarm's rule and recompute only that alarm's entry.
    pub fn update_rule(&mut self, id: AlarmId, rule: AlarmRule, now: NaiveDateTime) {
        if let Some(slot) = self.rules.get_mut(id.0) {
            *slot = rule;
            self.recompute_entry(id, now);
        }
    }

    /// Replace every rule (factory reset) and recompute the whole queue.
    pub fn reset_all(&mut self, rules: Vec<AlarmRule>, now: NaiveDateTime) {
        self.rules = rules;
        self.recompute_all(now);
    }

    /// Periodic tick. Drives the timed transitions; the only place
    /// `Idle → Sounding` happens. Never mutates the queue.
    pub fn polling(&mut self, now: NaiveDateTime, audio: &mut dyn AudioSink) -> Option<AlarmEvent> {
        match self.phase {
            AlarmPhase::Idle => {
                let first = self.queue.first().copied()?;
                if now >= first.next_fire {
                    audio.start();
                    self.phase = AlarmPhase::Sounding {
                        alarm: first.alarm,
                        since: now,
                    };
                    return Some(AlarmEvent::Fired(first.alarm));
                }
                None
            }
            AlarmPhase::Sounding { alarm, since } => {
                if (now - since).num_seconds() >= SOUNDING_AUTO_SNOOZE_SECS {
                    audio.stop();
                    let resume_at = now + Duration::seconds(SNOOZE_SECS);
                    self.phase = AlarmPhase::Snoozed {
                        alarm,
                        resume_at,
                        confirm_key: None,
                        confirm_count: 0,
                    };
                    return Some(AlarmEvent::AutoSnoozed { alarm, resume_at });
                }
                None
            }
            AlarmPhase::Snoozed {
                alarm, resume_at, ..
            } => {
                if now >= resume_at {
                    audio.start();
                    self.phase = AlarmPhase::Sounding { alarm, since: now };
                    return Some(AlarmEvent::Resumed(alarm));
                }
                None
            }
        }
    }

    /// A button press while the alarm subsystem owns the buttons.
    pub fn on_button(
        &mut self,
        key: ActionKey,
        now: NaiveDateTime,
        audio: &mut dyn AudioSink,
    ) -> Option<AlarmEvent> {
        match self.phase {
            AlarmPhase::Idle => None,
            AlarmPhase::Sounding { alarm, .. } => {
                audio.stop();
                self.phase = AlarmPhase::Snoozed {
                    alarm,
                    resume_at: now + Duration::seconds(SNOOZE_SECS),
                    confirm_key: Some(key),
                    confirm_count: 1,
                };
                Some(AlarmEvent::Snoozed { alarm, key })
            }
            AlarmPhase::Snoozed {
                alarm,
                resume_at,
                confirm_key,
                confirm_count,
            } => {
                if confirm_key == Some(key) {
                    let count = confirm_count + 1;
                    if count >= DISMISS_PRESSES {
                        self.phase = AlarmPhase::Idle;
                        // Back to the normal queue position for the next
                        // occurrence; the snooze override is fully dropped.
                        self.recompute_entry(alarm, now);
                        return Some(AlarmEvent::Dismissed(alarm));
                    }
                    self.phase = AlarmPhase::Snoozed {
                        alarm,
                        resume_at,
                        confirm_key: Some(key),
                        confirm_count: count,
                    };
                } else {
                    // Different key resets the streak without touching the
                    // snooze deadline.
                    self.phase = AlarmPhase::Snoozed {
                        alarm,
                        resume_at,
                        confirm_key: Some(key),
                        confirm_count: 1,
                    };
                }
                None
            }
        }
    }

    // ──────────────────── queue maintenance ────────────────────

    fn recompute_entry(&mut self, id: AlarmId, now: NaiveDateTime) {
        self.queue.retain(|e| e.alarm != id);
        if let Some(rule) = self.rules.get(id.0)
            && rule.enabled
        {
            self.queue.push(QueueEntry {
                alarm: id,
                next_fire: calc_next_fire(rule, now),
            });
        }
        self.sort_queue();
    }

    fn recompute_all(&mut self, now: NaiveDateTime) {
        self.queue.clear();
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.enabled {
                self.queue.push(QueueEntry {
                    alarm: AlarmId(idx),
                    next_fire: calc_next_fire(rule, now),
                });
            }
        }
        self.sort_queue();
    }

    fn sort_queue(&mut self) {
        self.queue.sort_by_key(|e| (e.next_fire, e.alarm));
    }
}
