//! Top-level button routing and screen coordination.
//!
//! The dispatcher owns the settings tree, the navigator, the alarm
//! scheduler, and the display/transition plumbing, and maps the five-button
//! input onto whichever of them the active screen selects. It also owns the
//! "alarm subsystem suppresses the presence detector" coupling: the config
//! and alarm screens write `'0'` to the collaborator FIFO, clock and sensor
//! write `'1'` when the persisted setting allows, and every minute boundary
//! resends the current mode in case the collaborator timed out.

use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::alarm::rules::{AlarmId, AlarmRule};
use crate::alarm::scheduler::{AlarmEvent, AlarmScheduler, AudioSink};
use crate::display::interface::{CharDisplay, ScreenFrame};
use crate::display::transition::{TransitionCoordinator, TransitionRequest};
use crate::io::buttons::{ActionKey, ButtonMask, ButtonPress};
use crate::io::presence::{PresenceChannel, PresenceMode};
use crate::io::sensor::{SensorReader, SensorSnapshot};
use crate::logger::{EventLoggerHandle, PanelEvent};
use crate::panel::screens::{self, Screen};
use crate::settings::navigator::ConfigNavigator;
use crate::settings::store::SettingsStore;
use crate::settings::tree::{ALARM_BRANCH, SettingNode, SettingValue, SettingsTree, ValueDomain};

/// Wires button events to the per-screen state machines and keeps the
/// display and external collaborators in sync.
pub struct Dispatcher {
    screen: Screen,
    tree: SettingsTree,
    navigator: ConfigNavigator,
    store: SettingsStore,
    scheduler: AlarmScheduler,
    display: Arc<Mutex<dyn CharDisplay>>,
    transitions: TransitionCoordinator,
    presence: PresenceChannel,
    sensor: SensorReader,
    audio: Box<dyn AudioSink + Send>,
    logger: EventLoggerHandle,
    alarm_focus: usize,
    last_sensor: Option<SensorSnapshot>,
    last_minute: i64,
}

impl Dispatcher {
    /// Build the dispatcher: load the settings snapshot, derive the alarm
    /// rules, pick the initial screen, and paint it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SettingsStore,
        display: Arc<Mutex<dyn CharDisplay>>,
        transitions: TransitionCoordinator,
        presence: PresenceChannel,
        sensor: SensorReader,
        audio: Box<dyn AudioSink + Send>,
        logger: EventLoggerHandle,
        now: NaiveDateTime,
    ) -> Self {
        let tree = store.load_or_defaults();
        let screen = tree
            .choice("initial_screen")
            .and_then(Screen::from_setting)
            .unwrap_or_default();
        let rules = rules_from_tree(&tree, &logger);
        let scheduler = AlarmScheduler::new(rules, now);

        let mut dispatcher = Self {
            screen,
            tree,
            navigator: ConfigNavigator::new(),
            store,
            scheduler,
            display,
            transitions,
            presence,
            sensor,
            audio,
            logger,
            alarm_focus: 0,
            last_sensor: None,
            last_minute: minute_stamp(now),
        };
        dispatcher.apply_suppression();
        dispatcher.draw_current(now);
        dispatcher
    }

    /// Active screen.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// The settings tree (read-only view).
    #[must_use]
    pub const fn tree(&self) -> &SettingsTree {
        &self.tree
    }

    /// The alarm scheduler (read-only view).
    #[must_use]
    pub const fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    // ──────────────────── button handling ────────────────────

    /// Handle one raw press mask, lowest bit first.
    pub fn handle_mask(&mut self, mask: ButtonMask, now: NaiveDateTime) {
        for press in mask.presses() {
            self.handle_press(press, now);
        }
    }

    fn handle_press(&mut self, press: ButtonPress, now: NaiveDateTime) {
        match press {
            ButtonPress::NextScreen => self.next_screen(now),
            ButtonPress::Action(key) => {
                // A sounding or snoozed alarm owns the action buttons on
                // every screen.
                if self.scheduler.wants_buttons() {
                    if let Some(event) = self.scheduler.on_button(key, now, self.audio.as_mut()) {
                        self.log_alarm_event(event);
                    }
                    self.draw_current(now);
                    return;
                }
                self.handle_screen_action(key);
                self.draw_current(now);
            }
        }
    }

    fn handle_screen_action(&mut self, key: ActionKey) {
        match self.screen {
            Screen::Clock => {
                let step = if matches!(key, ActionKey::K1 | ActionKey::K3) {
                    1
                } else {
                    -1
                };
                self.bump_style("clock_style", step);
            }
            Screen::Sensor => match key {
                ActionKey::K1 => self.bump_style("sens_style.clock", 1),
                ActionKey::K2 => self.bump_style("sens_style.clock", -1),
                ActionKey::K3 => self.bump_style("sens_style.sens", 1),
                ActionKey::K4 => self.bump_style("sens_style.sens", -1),
            },
            Screen::Config => {
                if let Err(err) = self.navigator.handle_key(&mut self.tree, key) {
                    // A corrupted value is surfaced, never clamped away.
                    eprintln!("[RMP-PANEL] settings edit rejected: {err}");
                    self.logger.send(PanelEvent::Error {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
            }
            Screen::Alarm => {
                let count = self.scheduler.alarm_count().max(1);
                self.alarm_focus = match key {
                    ActionKey::K1 | ActionKey::K3 => (self.alarm_focus + 1) % count,
                    ActionKey::K2 | ActionKey::K4 => (self.alarm_focus + count - 1) % count,
                };
            }
        }
    }

    /// Cycle style leaves from the clock/sensor screens: wrap within the
    /// range and mark dirty so the next config-screen exit persists them.
    fn bump_style(&mut self, path: &str, step: i64) {
        let Some(leaf) = self.tree.leaf_mut(path) else {
            return;
        };
        if let (ValueDomain::Range { min, max }, SettingValue::Int(v)) = (&leaf.domain, &leaf.value)
        {
            let next = if step > 0 {
                if *v >= *max { *min } else { v + 1 }
            } else if *v <= *min {
                *max
            } else {
                v - 1
            };
            leaf.value = SettingValue::Int(next);
            leaf.dirty = true;
        }
    }

    // ──────────────────── screen changes ────────────────────

    fn next_screen(&mut self, now: NaiveDateTime) {
        let from = self.screen;
        if from == Screen::Config {
            self.leave_config(now);
        }
        self.screen = from.next();
        self.logger.send(PanelEvent::ScreenChanged {
            from: from.name(),
            to: self.screen.name(),
        });
        self.apply_suppression();

        let final_frame = self.current_frame(now);
        let request = TransitionRequest {
            label: self.screen.name().to_string(),
            final_frame,
        };
        if let Err(err) = self.transitions.request_transition(request) {
            // Degraded: stale screen until the next minute redraw.
            eprintln!("[RMP-PANEL] transition request failed: {err}");
            self.logger.send(PanelEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            });
        }
    }

    /// Exit-from-config bookkeeping: collect dirty leaves, persist or
    /// factory-reset, and re-derive the affected alarm rules.
    fn leave_config(&mut self, now: NaiveDateTime) {
        let summary = ConfigNavigator::collect_dirty_and_clear(&mut self.tree);

        if summary.factory_reset {
            self.tree = match self.store.factory_reset() {
                Ok(tree) => tree,
                Err(err) => {
                    eprintln!("[RMP-PANEL] factory reset could not drop snapshot: {err}");
                    self.logger.send(PanelEvent::Error {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                    SettingsTree::defaults()
                }
            };
            self.navigator.reset();
            let rules = rules_from_tree(&self.tree, &self.logger);
            self.scheduler.reset_all(rules, now);
            self.logger.send(PanelEvent::FactoryReset);
            return;
        }

        if summary.is_empty() {
            return;
        }

        if let Err(err) = self.store.persist(&self.tree) {
            eprintln!("[RMP-PANEL] settings persist failed: {err}");
            self.logger.send(PanelEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            });
        }
        self.logger.send(PanelEvent::SettingsPersisted {
            dirty_leaves: summary.paths.len(),
        });

        for name in &summary.affected_alarms {
            if let Some(id) = AlarmId::from_tree_name(name) {
                let rule = rule_from_tree(&self.tree, id, &self.logger);
                self.scheduler.update_rule(id, rule, now);
            }
        }
    }

    // ──────────────────── suppression channel ────────────────────

    fn suppression_mode(&self) -> PresenceMode {
        match self.screen {
            Screen::Config | Screen::Alarm => PresenceMode::Suppressed,
            Screen::Clock | Screen::Sensor => {
                if self.tree.int("presence_mode") == Some(1) {
                    PresenceMode::Enabled
                } else {
                    PresenceMode::Suppressed
                }
            }
        }
    }

    fn apply_suppression(&self) {
        let mode = self.suppression_mode();
        match self.presence.write_mode(mode) {
            Ok(()) => self.logger.send(PanelEvent::SuppressionMode {
                mode: mode.as_byte() as char,
            }),
            Err(err) => {
                eprintln!("[RMP-PANEL] suppression write failed: {err}");
                self.logger.send(PanelEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    // ──────────────────── periodic tick ────────────────────

    /// 250 ms tick: drive the alarm machine; on a minute boundary, redraw
    /// and resend the suppression mode.
    pub fn tick(&mut self, now: NaiveDateTime) {
        if let Some(event) = self.scheduler.polling(now, self.audio.as_mut()) {
            self.log_alarm_event(event);
            self.draw_current(now);
        }

        let minute = minute_stamp(now);
        if minute != self.last_minute {
            self.last_minute = minute;
            self.draw_current(now);
            self.apply_suppression();
        }
    }

    // ──────────────────── rendering ────────────────────

    fn current_frame(&mut self, now: NaiveDateTime) -> ScreenFrame {
        match self.screen {
            Screen::Clock => screens::clock_frame(&self.tree, now),
            Screen::Sensor => {
                match self.sensor.read() {
                    Ok(snapshot) => self.last_sensor = Some(snapshot),
                    Err(err) => {
                        // Keep showing the last good reading.
                        eprintln!("[RMP-PANEL] sensor read failed: {err}");
                        self.logger.send(PanelEvent::Error {
                            code: err.code().to_string(),
                            message: err.to_string(),
                        });
                    }
                }
                screens::sensor_frame(&self.tree, self.last_sensor.as_ref(), now)
            }
            Screen::Config => {
                self.navigator.ensure_focus(&self.tree);
                screens::config_frame(&self.navigator.render_focus(&self.tree))
            }
            Screen::Alarm => screens::alarm_frame(&self.scheduler, AlarmId(self.alarm_focus)),
        }
    }

    /// Immediate full redraw, bypassing the transition animation.
    pub fn draw_current(&mut self, now: NaiveDateTime) {
        let frame = self.current_frame(now);
        if let Err(err) = frame.apply(&mut *self.display.lock()) {
            eprintln!("[RMP-PANEL] display redraw failed: {err}");
        }
    }

    fn log_alarm_event(&self, event: AlarmEvent) {
        let logged = match event {
            AlarmEvent::Fired(alarm) | AlarmEvent::Resumed(alarm) => {
                PanelEvent::AlarmFired { alarm }
            }
            AlarmEvent::AutoSnoozed { alarm, .. } => PanelEvent::AlarmSnoozed { alarm, auto: true },
            AlarmEvent::Snoozed { alarm, .. } => PanelEvent::AlarmSnoozed { alarm, auto: false },
            AlarmEvent::Dismissed(alarm) => PanelEvent::AlarmDismissed { alarm },
        };
        self.logger.send(logged);
    }

    // ──────────────────── shutdown ────────────────────

    /// Orderly teardown: silence the audio, stop the renderer thread, then
    /// blank the display. The renderer joins first so no in-flight redraw
    /// can land after the blank.
    pub fn shutdown(&mut self) {
        self.audio.stop();
        self.transitions.shutdown();
        let mut display = self.display.lock();
        let _ = display.clear();
        let _ = display.set_cursor(false);
    }
}

// ──────────────────── rule derivation ────────────────────

fn minute_stamp(now: NaiveDateTime) -> i64 {
    now.and_utc().timestamp() / 60
}

/// Derive one alarm's rule from its settings subtree. A corrupt subtree is
/// logged and yields a disabled rule rather than a crash.
fn rule_from_tree(tree: &SettingsTree, id: AlarmId, logger: &EventLoggerHandle) -> AlarmRule {
    let name = id.tree_name();
    let sw = tree.choice(&format!("{ALARM_BRANCH}.{name}.sw")).unwrap_or("OFF");
    let wek = tree.choice(&format!("{ALARM_BRANCH}.{name}.wek")).unwrap_or("wek");
    let hour = tree.int(&format!("{ALARM_BRANCH}.{name}.h")).unwrap_or(0);
    let minute = tree.int(&format!("{ALARM_BRANCH}.{name}.m")).unwrap_or(0);

    match AlarmRule::from_settings(sw, wek, hour, minute) {
        Ok(rule) => rule,
        Err(err) => {
            eprintln!("[RMP-PANEL] alarm {name} misconfigured, disabling: {err}");
            logger.send(PanelEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            });
            AlarmRule::disabled()
        }
    }
}

/// Derive every alarm rule, in subtree order.
fn rules_from_tree(tree: &SettingsTree, logger: &EventLoggerHandle) -> Vec<AlarmRule> {
    let count = tree
        .root()
        .get(ALARM_BRANCH)
        .and_then(SettingNode::as_branch)
        .map_or(0, |branch| branch.len());
    (0..count)
        .map(|idx| rule_from_tree(tree, AlarmId(idx), logger))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::rules::Recurrence;
    use crate::display::interface::BufferDisplay;
    use crate::display::transition::{TransitionState, TransitionTiming};
    use chrono::{Datelike, NaiveDate, Timelike};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct TestAudio {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl AudioSink for TestAudio {
        fn start(&mut self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        display: Arc<Mutex<BufferDisplay>>,
        audio: TestAudio,
        dir: tempfile::TempDir,
        now: NaiveDateTime,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let display = Arc::new(Mutex::new(BufferDisplay::new(16)));
        let shared: Arc<Mutex<dyn CharDisplay>> = display.clone();
        let transitions =
            TransitionCoordinator::spawn(shared, TransitionTiming::new(2, 1, 1)).unwrap();

        let pipe = dir.path().join("pipe");
        fs::write(&pipe, "").unwrap();

        let sensor_path = dir.path().join("sens_data.txt");
        fs::write(&sensor_path, "21.50,48.00,55.1").unwrap();

        let audio = TestAudio::default();
        // 2026-08-05 06:00, a Wednesday.
        let now = NaiveDate::from_ymd_opt(2026, 8, 5)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();

        let dispatcher = Dispatcher::new(
            SettingsStore::new(dir.path().join("settings.toml")),
            display.clone(),
            transitions,
            PresenceChannel::new(&pipe),
            SensorReader::new(
                &sensor_path,
                dir.path().join("sens_data_err.txt"),
                Duration::ZERO,
            ),
            Box::new(audio.clone()),
            EventLoggerHandle::disconnected(),
            now,
        );

        Fixture {
            dispatcher,
            display,
            audio,
            dir,
            now,
        }
    }

    fn pipe_contents(fixture: &Fixture) -> String {
        fs::read_to_string(fixture.dir.path().join("pipe")).unwrap()
    }

    fn wait_for_idle(fixture: &Fixture) {
        let start = Instant::now();
        // The renderer runs on its own thread; right after the request is
        // queued it may not have left Idle yet. Wait for it to pick the
        // request up (leave Idle) before waiting for it to settle back, so
        // we don't observe the pre-transition Idle and read a stale screen.
        while fixture.dispatcher.transitions.state() == TransitionState::Idle
            && start.elapsed() < Duration::from_secs(5)
        {
            std::thread::sleep(Duration::from_millis(1));
        }
        while fixture.dispatcher.transitions.state() != TransitionState::Idle
            && start.elapsed() < Duration::from_secs(5)
        {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn starts_on_the_configured_initial_screen() {
        let fixture = fixture();
        assert_eq!(fixture.dispatcher.screen(), Screen::Sensor);
        // Default overlay style 7 puts the record on line 1.
        assert_eq!(fixture.display.lock().line(1), "21.50C   55.1%");
        // Clock/sensor with presence_mode 1 enables the detector.
        assert_eq!(pipe_contents(&fixture), "1");
    }

    #[test]
    fn entering_config_suppresses_the_presence_detector() {
        let mut fixture = fixture();
        fixture
            .dispatcher
            .handle_mask(ButtonMask(0b00001), fixture.now);
        assert_eq!(fixture.dispatcher.screen(), Screen::Config);
        assert_eq!(pipe_contents(&fixture), "0");
    }

    #[test]
    fn leaving_config_with_dirty_leaves_persists_the_snapshot() {
        let mut fixture = fixture();
        let now = fixture.now;
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> config

        // Focus lands on initial_screen; K2 edits it forward (sensor -> alarm).
        fixture.dispatcher.handle_mask(ButtonMask(0b00100), now);
        assert_eq!(
            fixture.dispatcher.tree().choice("initial_screen"),
            Some("alarm")
        );

        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> alarm screen, exits config
        let snapshot_path = fixture.dir.path().join("settings.toml");
        assert!(snapshot_path.exists());
        let raw = fs::read_to_string(&snapshot_path).unwrap();
        assert!(raw.contains("initial_screen"));
        assert!(raw.contains("alarm"));
        assert!(
            !fixture
                .dispatcher
                .tree()
                .leaf("initial_screen")
                .unwrap()
                .dirty
        );
    }

    #[test]
    fn leaving_config_without_edits_persists_nothing() {
        let mut fixture = fixture();
        let now = fixture.now;
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> config
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> alarm
        assert!(!fixture.dir.path().join("settings.toml").exists());
    }

    #[test]
    fn dirty_alarm_leaves_rebuild_that_alarms_rule() {
        let mut fixture = fixture();
        let now = fixture.now;

        // Simulate config-screen edits: enable alarm1 for Wednesday 06:30.
        for (path, value) in [
            ("alarm.alarm1.sw", SettingValue::Choice("ON".to_string())),
            ("alarm.alarm1.wek", SettingValue::Choice("wed".to_string())),
            ("alarm.alarm1.h", SettingValue::Int(6)),
            ("alarm.alarm1.m", SettingValue::Int(30)),
        ] {
            let leaf = fixture.dispatcher.tree.leaf_mut(path).unwrap();
            leaf.value = value;
            leaf.dirty = true;
        }

        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> config
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // exit config

        let entry = fixture.dispatcher.scheduler().next_entry().unwrap();
        assert_eq!(entry.alarm, AlarmId(0));
        assert_eq!(entry.next_fire.hour(), 6);
        assert_eq!(entry.next_fire.minute(), 30);
        assert_eq!(entry.next_fire.weekday(), chrono::Weekday::Wed);
    }

    #[test]
    fn factory_reset_discards_snapshot_and_reinitializes() {
        let mut fixture = fixture();
        let now = fixture.now;

        // Seed a persisted snapshot so the reset has something to discard.
        fixture.dispatcher.tree.leaf_mut("clock_style").unwrap().dirty = true;
        fixture
            .dispatcher
            .tree
            .set_leaf_value("clock_style", SettingValue::Int(0))
            .unwrap();
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // config
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // exit; persists
        assert!(fixture.dir.path().join("settings.toml").exists());

        // Now request the factory reset.
        let reset = fixture.dispatcher.tree.leaf_mut("reset").unwrap();
        reset.value = SettingValue::Choice("yes".to_string());
        reset.dirty = true;
        // Cycle through config once more.
        for _ in 0..3 {
            fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // alarm->clock->sensor->config
        }
        assert_eq!(fixture.dispatcher.screen(), Screen::Config);
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // exit

        assert!(!fixture.dir.path().join("settings.toml").exists());
        assert_eq!(*fixture.dispatcher.tree(), SettingsTree::defaults());
    }

    #[test]
    fn clock_screen_keys_cycle_the_style_both_ways() {
        let mut fixture = fixture();
        let now = fixture.now;
        // sensor -> config -> alarm -> clock
        for _ in 0..3 {
            fixture.dispatcher.handle_mask(ButtonMask(0b00001), now);
        }
        assert_eq!(fixture.dispatcher.screen(), Screen::Clock);

        fixture.dispatcher.handle_mask(ButtonMask(0b00010), now); // K1: forward
        assert_eq!(fixture.dispatcher.tree().int("clock_style"), Some(7));
        fixture.dispatcher.handle_mask(ButtonMask(0b00100), now); // K2: backward
        assert_eq!(fixture.dispatcher.tree().int("clock_style"), Some(6));
        assert!(fixture.dispatcher.tree().leaf("clock_style").unwrap().dirty);
    }

    #[test]
    fn sounding_alarm_owns_the_action_buttons() {
        let mut fixture = fixture();
        let now = fixture.now;

        fixture.dispatcher.scheduler.update_rule(
            AlarmId(0),
            AlarmRule {
                enabled: true,
                recurrence: Recurrence::Weekday(chrono::Weekday::Wed),
                hour: 6,
                minute: 0,
            },
            now - chrono::Duration::minutes(1),
        );
        fixture.dispatcher.tick(now);
        assert_eq!(fixture.audio.starts.load(Ordering::SeqCst), 1);
        assert!(fixture.dispatcher.scheduler().wants_buttons());

        // An action key snoozes instead of editing the sensor styles.
        let overlay_before = fixture.dispatcher.tree().int("sens_style.clock");
        fixture.dispatcher.handle_mask(ButtonMask(0b00010), now);
        assert_eq!(fixture.audio.stops.load(Ordering::SeqCst), 1);
        assert_eq!(
            fixture.dispatcher.tree().int("sens_style.clock"),
            overlay_before,
            "screen-local action must not run while snoozing"
        );
    }

    #[test]
    fn minute_boundary_resends_the_suppression_mode() {
        let mut fixture = fixture();
        let now = fixture.now;

        fs::write(fixture.dir.path().join("pipe"), "").unwrap();
        fixture.dispatcher.tick(now + chrono::Duration::seconds(30));
        assert_eq!(pipe_contents(&fixture), "", "same minute: no resend");

        fixture.dispatcher.tick(now + chrono::Duration::seconds(61));
        assert_eq!(pipe_contents(&fixture), "1");
    }

    #[test]
    fn display_failures_degrade_to_a_stale_screen() {
        let mut fixture = fixture();
        fixture.display.lock().fail_writes = true;
        fixture.dispatcher.draw_current(fixture.now); // must not panic
        fixture.display.lock().fail_writes = false;
    }

    #[test]
    fn screen_change_requests_a_transition_to_the_new_screen() {
        let mut fixture = fixture();
        let now = fixture.now;
        fixture.dispatcher.handle_mask(ButtonMask(0b00001), now); // -> config
        wait_for_idle(&fixture);
        // The transition's final redraw shows the config focus view.
        assert_eq!(fixture.display.lock().line(0), "initial_screen");
        assert!(fixture.display.lock().cursor_visible());
    }

    #[test]
    fn shutdown_silences_audio_and_blanks_the_display() {
        let mut fixture = fixture();
        fixture.dispatcher.shutdown();
        assert_eq!(fixture.audio.stops.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.display.lock().line(0), "");
        assert!(!fixture.display.lock().cursor_visible());
    }
}
