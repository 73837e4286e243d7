//! Alarm recurrence rules and next-fire computation.
//!
//! A rule pairs an enable switch with a recurrence pattern and a time of
//! day. `calc_next_fire` returns the next timestamp *strictly* after `now`
//! satisfying the pattern; the same-day case uses a strict comparison so an
//! alarm evaluated exactly at its fire time rolls to the next occurrence.

#![allow(missing_docs)]

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::core::errors::{PanelError, Result};

/// Stable identity of one of the configured alarms (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmId(pub usize);

impl AlarmId {
    /// Settings-tree child name for this alarm (`alarm1`, `alarm2`, …).
    #[must_use]
    pub fn tree_name(self) -> String {
        format!("alarm{}", self.0 + 1)
    }

    /// Parse a settings-tree child name back into an id.
    #[must_use]
    pub fn from_tree_name(name: &str) -> Option<Self> {
        let n: usize = name.strip_prefix("alarm")?.parse().ok()?;
        n.checked_sub(1).map(Self)
    }
}

/// When an alarm recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// A specific weekday, every week.
    Weekday(Weekday),
    /// Monday through Friday.
    AllWeekdays,
    /// Saturday and Sunday.
    Holidays,
    /// Exactly one minute from now, for testing the audio path.
    TestOneShot,
}

impl Recurrence {
    /// Short settings-tree code for this recurrence.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Weekday(Weekday::Mon) => "mon",
            Self::Weekday(Weekday::Tue) => "tue",
            Self::Weekday(Weekday::Wed) => "wed",
            Self::Weekday(Weekday::Thu) => "thr",
            Self::Weekday(Weekday::Fri) => "fri",
            Self::Weekday(Weekday::Sat) => "sat",
            Self::Weekday(Weekday::Sun) => "sun",
            Self::AllWeekdays => "wek",
            Self::Holidays => "hol",
            Self::TestOneShot => "tst",
        }
    }
}

/// One alarm's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmRule {
    pub enabled: bool,
    pub recurrence: Recurrence,
    /// 0–23.
    pub hour: u32,
    /// 0–59.
    pub minute: u32,
}

impl AlarmRule {
    /// Disabled placeholder rule.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            recurrence: Recurrence::AllWeekdays,
            hour: 0,
            minute: 0,
        }
    }

    /// Build a rule from the raw settings-tree leaf values of one alarm
    /// subtree (`sw`, `wek`, `h`, `m`).
    pub fn from_settings(sw: &str, wek: &str, hour: i64, minute: i64) -> Result<Self> {
        let recurrence = match wek {
            "mon" => Recurrence::Weekday(Weekday::Mon),
            "tue" => Recurrence::Weekday(Weekday::Tue),
            "wed" => Recurrence::Weekday(Weekday::Wed),
            "thr" => Recurrence::Weekday(Weekday::Thu),
            "fri" => Recurrence::Weekday(Weekday::Fri),
            "sat" => Recurrence::Weekday(Weekday::Sat),
            "sun" => Recurrence::Weekday(Weekday::Sun),
            "wek" => Recurrence::AllWeekdays,
            "hol" => Recurrence::Holidays,
            "tst" => Recurrence::TestOneShot,
            other => {
                return Err(PanelError::ValueNotInCandidateSet {
                    path: "wek".to_string(),
                    value: other.to_string(),
                });
            }
        };
        if !(0..=23).contains(&hour) || !(0..=59).contains(&minute) {
            return Err(PanelError::SnapshotMismatch {
                path: "h/m".to_string(),
                details: format!("alarm time {hour}:{minute} out of range"),
            });
        }
        Ok(Self {
            enabled: sw == "ON",
            recurrence,
            hour: u32::try_from(hour).unwrap_or(0),
            minute: u32::try_from(minute).unwrap_or(0),
        })
    }
}

/// Whether a weekday falls in the Monday–Friday partition.
#[must_use]
pub const fn is_working_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Next timestamp strictly after `now` satisfying the rule.
#[must_use]
pub fn calc_next_fire(rule: &AlarmRule, now: NaiveDateTime) -> NaiveDateTime {
    let time_of_day = NaiveTime::from_hms_opt(rule.hour, rule.minute, 0).unwrap_or_default();
    let today_candidate = now.date().and_time(time_of_day);

    match rule.recurrence {
        Recurrence::Weekday(target) => {
            let gap = i64::from(target.num_days_from_monday())
                - i64::from(now.weekday().num_days_from_monday());
            let days_ahead = gap.rem_euclid(7);
            if days_ahead == 0 {
                if today_candidate > now {
                    today_candidate
                } else {
                    today_candidate + Duration::days(7)
                }
            } else {
                today_candidate + Duration::days(days_ahead)
            }
        }
        Recurrence::AllWeekdays => next_in_partition(now, today_candidate, is_working_day),
        Recurrence::Holidays => next_in_partition(now, today_candidate, |d| !is_working_day(d)),
        Recurrence::TestOneShot => {
            let fire = now + Duration::minutes(1);
            fire.with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(fire)
        }
    }
}

/// Nearest day (today included, if the time has not passed) whose weekday
/// satisfies `accept`.
fn next_in_partition(
    now: NaiveDateTime,
    today_candidate: NaiveDateTime,
    accept: impl Fn(Weekday) -> bool,
) -> NaiveDateTime {
    if accept(now.weekday()) && today_candidate > now {
        return today_candidate;
    }
    for offset in 1..=7 {
        let candidate = today_candidate + Duration::days(offset);
        if accept(candidate.weekday()) {
            return candidate;
        }
    }
    // Unreachable: any 7-day window contains both partitions.
    today_candidate + Duration::days(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    fn rule(recurrence: Recurrence, hour: u32, minute: u32) -> AlarmRule {
        AlarmRule {
            enabled: true,
            recurrence,
            hour,
            minute,
        }
    }

    #[test]
    fn weekday_rule_missed_by_a_minute_rolls_a_full_week() {
        // 2026-08-05 is a Wednesday.
        let now = at(2026, 8, 5, 6, 31);
        let fire = calc_next_fire(&rule(Recurrence::Weekday(Weekday::Wed), 6, 30), now);
        assert_eq!(fire, at(2026, 8, 12, 6, 30));
    }

    #[test]
    fn weekday_rule_still_ahead_today_fires_today() {
        let now = at(2026, 8, 5, 6, 29);
        let fire = calc_next_fire(&rule(Recurrence::Weekday(Weekday::Wed), 6, 30), now);
        assert_eq!(fire, at(2026, 8, 5, 6, 30));
    }

    #[test]
    fn weekday_rule_exactly_at_fire_time_is_strictly_future() {
        let now = at(2026, 8, 5, 6, 30);
        let fire = calc_next_fire(&rule(Recurrence::Weekday(Weekday::Wed), 6, 30), now);
        assert_eq!(fire, at(2026, 8, 12, 6, 30));
    }

    #[test]
    fn all_weekdays_friday_evening_rolls_to_monday() {
        // 2026-08-07 is a Friday.
        let now = at(2026, 8, 7, 22, 0);
        let fire = calc_next_fire(&rule(Recurrence::AllWeekdays, 6, 45), now);
        assert_eq!(fire, at(2026, 8, 10, 6, 45));
        assert_eq!(fire.weekday(), Weekday::Mon);
    }

    #[test]
    fn all_weekdays_saturday_rolls_to_monday() {
        let now = at(2026, 8, 8, 5, 0);
        let fire = calc_next_fire(&rule(Recurrence::AllWeekdays, 6, 45), now);
        assert_eq!(fire, at(2026, 8, 10, 6, 45));
    }

    #[test]
    fn holidays_wednesday_rolls_to_saturday() {
        let now = at(2026, 8, 5, 12, 0);
        let fire = calc_next_fire(&rule(Recurrence::Holidays, 8, 0), now);
        assert_eq!(fire, at(2026, 8, 8, 8, 0));
        assert_eq!(fire.weekday(), Weekday::Sat);
    }

    #[test]
    fn holidays_sunday_morning_can_fire_same_day() {
        // 2026-08-09 is a Sunday.
        let now = at(2026, 8, 9, 6, 0);
        let fire = calc_next_fire(&rule(Recurrence::Holidays, 8, 0), now);
        assert_eq!(fire, at(2026, 8, 9, 8, 0));
    }

    #[test]
    fn test_one_shot_fires_next_minute_with_seconds_zeroed() {
        let now = NaiveDate::from_ymd_opt(2026, 8, 5)
            .unwrap()
            .and_hms_opt(10, 15, 42)
            .unwrap();
        let fire = calc_next_fire(&rule(Recurrence::TestOneShot, 0, 0), now);
        assert_eq!(fire, at(2026, 8, 5, 10, 16));
        assert!(fire > now);
    }

    #[test]
    fn settings_mapping_covers_all_week_codes() {
        let r = AlarmRule::from_settings("ON", "thr", 6, 45).unwrap();
        assert!(r.enabled);
        assert_eq!(r.recurrence, Recurrence::Weekday(Weekday::Thu));

        let r = AlarmRule::from_settings("OFF", "hol", 7, 0).unwrap();
        assert!(!r.enabled);
        assert_eq!(r.recurrence, Recurrence::Holidays);

        let r = AlarmRule::from_settings("ON", "tst", 0, 0).unwrap();
        assert_eq!(r.recurrence, Recurrence::TestOneShot);

        let err = AlarmRule::from_settings("ON", "xyz", 6, 45).unwrap_err();
        assert_eq!(err.code(), "RMP-1101");
    }

    #[test]
    fn settings_mapping_rejects_out_of_range_time() {
        let err = AlarmRule::from_settings("ON", "wek", 24, 0).unwrap_err();
        assert_eq!(err.code(), "RMP-1102");
    }

    #[test]
    fn alarm_id_tree_names_roundtrip() {
        for n in 0..3 {
            let id = AlarmId(n);
            assert_eq!(AlarmId::from_tree_name(&id.tree_name()), Some(id));
        }
        assert_eq!(AlarmId::from_tree_name("alarm0"), None);
        assert_eq!(AlarmId::from_tree_name("bogus"), None);
    }

    // ──────────────────── property tests ────────────────────

    fn arb_now() -> impl Strategy<Value = NaiveDateTime> {
        // A few years around the epoch of interest, any second of the day.
        (0i64..1500, 0u32..24, 0u32..60, 0u32..60).prop_map(|(day, h, m, s)| {
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(u64::try_from(day).unwrap()))
                .unwrap()
                .and_hms_opt(h, m, s)
                .unwrap()
        })
    }

    fn arb_weekday() -> impl Strategy<Value = Weekday> {
        (0u8..7).prop_map(|n| match n {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            _ => Weekday::Sun,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// A weekday rule always lands strictly in the future on the right
        /// weekday at the right time, within a week.
        #[test]
        fn weekday_fire_is_future_and_on_target(
            now in arb_now(),
            target in arb_weekday(),
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let fire = calc_next_fire(&rule(Recurrence::Weekday(target), hour, minute), now);
            prop_assert!(fire > now);
            prop_assert_eq!(fire.weekday(), target);
            prop_assert_eq!((fire.hour(), fire.minute(), fire.second()), (hour, minute, 0));
            prop_assert!(fire - now <= Duration::days(7));
        }

        /// Weekday-set rules stay in their partition and are strictly future.
        #[test]
        fn partition_rules_respect_their_partition(
            now in arb_now(),
            holidays in any::<bool>(),
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let recurrence = if holidays { Recurrence::Holidays } else { Recurrence::AllWeekdays };
            let fire = calc_next_fire(&rule(recurrence, hour, minute), now);
            prop_assert!(fire > now);
            prop_assert_eq!(is_working_day(fire.weekday()), !holidays);
            prop_assert!(fire - now <= Duration::days(7));
        }
    }
}
