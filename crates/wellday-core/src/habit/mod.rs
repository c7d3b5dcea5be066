//! Habit model and the per-habit completion state machine.
//!
//! Every operation here is a pure mutation of one [`Habit`] taking an
//! explicit timestamp. Persistence and id lookup live in
//! [`HabitEngine`](crate::engine::HabitEngine).
//!
//! Each habit has two states per day, Incomplete and Complete. A new day
//! always starts Incomplete because its key is simply absent from the
//! completion record.

pub mod day;
pub mod schedule;
pub mod streak;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use day::{day_key_for_date, normalize_to_day, week_start_sunday, DayKey};
pub use schedule::HabitSchedule;

/// One tracked behavior.
///
/// `current_value` and `streak` are caches; `completion_history` is the
/// source of truth. Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Habit {
    pub id: String,
    /// Category label, e.g. "Steps" or "Water".
    pub habit_type: String,
    /// Daily threshold; zero means the habit is a plain done/not-done marker.
    pub target_value: u32,
    pub unit: String,
    pub schedule: HabitSchedule,
    /// Soft-delete marker.
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub current_value: u32,
    /// Day that `current_value` was accumulated on.
    pub value_day: Option<DayKey>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub streak: u32,
    pub completion_history: BTreeMap<DayKey, bool>,
    /// Value is driven by an outside signal (step sensor) instead of taps.
    pub externally_synced: bool,
    pub reminder_hour: Option<u8>,
    pub reminder_minute: Option<u8>,
}

/// Input for creating a habit.
#[derive(Debug, Clone, Default)]
pub struct NewHabit {
    pub habit_type: String,
    pub target_value: u32,
    pub unit: String,
    pub schedule: HabitSchedule,
    pub externally_synced: bool,
    pub reminder: Option<(u8, u8)>,
}

impl NewHabit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.habit_type.trim().is_empty() {
            return Err(ValidationError::Blank("habit_type".into()));
        }
        if self.target_value == 0 {
            return Err(ValidationError::invalid(
                "target_value",
                "must be greater than zero",
            ));
        }
        if let Some((hour, minute)) = self.reminder {
            if hour > 23 || minute > 59 {
                return Err(ValidationError::invalid(
                    "reminder",
                    format!("{hour:02}:{minute:02} is not a valid time of day"),
                ));
            }
        }
        Ok(())
    }
}

/// Result of reconciling a habit against an external signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing to do.
    Unchanged,
    /// Signal was from another day; today's progress was cleared.
    StaleReset,
    /// Value crossed the target upward.
    Completed,
    /// Value dropped back under the target.
    Uncompleted,
    /// Value changed without crossing the target.
    Updated,
}

/// One cell of the Sunday-first week strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCell {
    pub date: NaiveDate,
    pub completed: bool,
    pub is_today: bool,
}

impl Habit {
    /// Build a habit from validated input.
    pub fn new(id: String, draft: NewHabit, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        draft.validate()?;
        Ok(Self {
            id,
            habit_type: draft.habit_type.trim().to_string(),
            target_value: draft.target_value,
            unit: draft.unit,
            schedule: draft.schedule,
            created_at: now,
            externally_synced: draft.externally_synced,
            reminder_hour: draft.reminder.map(|(h, _)| h),
            reminder_minute: draft.reminder.map(|(_, m)| m),
            ..Self::default()
        })
    }

    /// Habits with a positive target track numeric progress.
    pub fn is_countable(&self) -> bool {
        self.target_value > 0
    }

    pub fn is_completed_on_day(&self, day: DayKey) -> bool {
        self.completion_history.get(&day).copied().unwrap_or(false)
    }

    pub fn is_completed_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.is_completed_on_day(normalize_to_day(now))
    }

    /// Lookup for any timestamp within the day in question.
    pub fn was_completed_on<Tz: TimeZone>(&self, day: &DateTime<Tz>) -> bool {
        self.is_completed_on_day(normalize_to_day(day))
    }

    pub fn was_completed_on_date<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> bool {
        self.is_completed_on_day(day_key_for_date(date, tz))
    }

    /// Whether `date` is a due day under this habit's schedule.
    pub fn is_scheduled_on<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> bool {
        let anchor = self.created_at.with_timezone(tz).weekday();
        self.schedule.includes(date.weekday(), anchor)
    }

    /// Streak as of `now`, without touching the cache.
    pub fn current_streak<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        streak::current_streak(&self.completion_history, normalize_to_day(now))
    }

    /// Refresh the streak cache from the completion record.
    pub fn recompute_streak<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> u32 {
        self.streak = self.current_streak(now);
        self.streak
    }

    pub fn longest_streak(&self) -> u32 {
        streak::longest_streak(&self.completion_history)
    }

    /// Fraction of today's target reached, capped at 1.0.
    pub fn progress(&self) -> f64 {
        if !self.is_countable() {
            return if self.current_value > 0 { 1.0 } else { 0.0 };
        }
        (f64::from(self.current_value) / f64::from(self.target_value)).min(1.0)
    }

    /// Whether `current_value` may be rewritten for `day`. A day older than
    /// the one the value was counted on leaves the value alone.
    fn owns_value(&self, day: DayKey) -> bool {
        self.value_day.map_or(true, |counted| counted <= day)
    }

    /// Zero a value counted on another day. Externally synced habits keep
    /// theirs until the next signal.
    fn roll_over(&mut self, today: DayKey) -> bool {
        if self.externally_synced {
            return false;
        }
        match self.value_day {
            Some(counted) if counted != today => {
                self.current_value = 0;
                self.value_day = Some(today);
                true
            }
            _ => false,
        }
    }

    /// Mark the day of `at` complete. Returns false when it already was.
    pub fn mark_complete<Tz: TimeZone>(&mut self, at: &DateTime<Tz>) -> bool {
        let day = normalize_to_day(at);
        if self.is_completed_on_day(day) {
            return false;
        }
        self.completion_history.insert(day, true);
        self.last_completed_at = Some(at.with_timezone(&Utc));
        if self.owns_value(day) {
            self.roll_over(day);
            if self.is_countable() && self.current_value < self.target_value {
                self.current_value = self.target_value;
                self.value_day = Some(day);
            }
        }
        self.recompute_streak(at);
        true
    }

    /// Remove the day's completion entry. Returns whether one existed.
    ///
    /// Countable habits reset to zero unless externally synced; those wait
    /// for the next signal to supply the real value.
    pub fn unmark<Tz: TimeZone>(&mut self, at: &DateTime<Tz>) -> bool {
        let day = normalize_to_day(at);
        let removed = self.completion_history.remove(&day).is_some();
        if self.is_countable() && !self.externally_synced && self.owns_value(day) {
            self.current_value = 0;
            self.value_day = Some(day);
        }
        self.recompute_streak(at);
        removed
    }

    /// Add one unit of progress. Returns false when there was nothing to add.
    pub fn increment_progress<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        if !self.is_countable() {
            return false;
        }
        let today = normalize_to_day(now);
        self.roll_over(today);
        if self.current_value >= self.target_value {
            return false;
        }
        self.current_value += 1;
        self.value_day = Some(today);

        if self.current_value >= self.target_value && !self.is_completed_on_day(today) {
            self.completion_history.insert(today, true);
            self.last_completed_at = Some(now.with_timezone(&Utc));
            self.recompute_streak(now);
        }
        true
    }

    /// Flip today's state. Returns the new "completed" flag.
    pub fn toggle_completion<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        let today = normalize_to_day(now);
        if self.is_completed_on_day(today) {
            self.unmark(now);
            return false;
        }

        self.roll_over(today);
        self.completion_history.insert(today, true);
        self.last_completed_at = Some(now.with_timezone(&Utc));
        if self.is_countable() {
            self.current_value = self.target_value;
        } else if self.current_value == 0 {
            self.current_value = 1;
        }
        self.value_day = Some(today);
        self.recompute_streak(now);
        true
    }

    /// Reconcile against an external reading dated `signal_date`.
    ///
    /// `None` stands for a date that could not be read and is handled as
    /// stale.
    pub fn sync_from_external_signal<Tz: TimeZone>(
        &mut self,
        external_value: u32,
        signal_date: Option<NaiveDate>,
        now: &DateTime<Tz>,
    ) -> SyncOutcome {
        let today = normalize_to_day(now);

        if signal_date != Some(now.date_naive()) {
            if self.current_value == 0 && !self.is_completed_on_day(today) {
                return SyncOutcome::Unchanged;
            }
            self.current_value = 0;
            self.value_day = Some(today);
            self.completion_history.remove(&today);
            self.recompute_streak(now);
            return SyncOutcome::StaleReset;
        }

        if external_value == self.current_value {
            return SyncOutcome::Unchanged;
        }

        let was_completed = self.is_completed_on_day(today);
        self.current_value = external_value;
        self.value_day = Some(today);

        if self.current_value >= self.target_value && !was_completed {
            self.mark_complete(now);
            SyncOutcome::Completed
        } else if self.current_value < self.target_value && was_completed {
            self.unmark(now);
            SyncOutcome::Uncompleted
        } else {
            SyncOutcome::Updated
        }
    }

    /// Daily rollover, self-heal and streak refresh. Returns whether
    /// anything changed.
    pub fn reconcile<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        let today = normalize_to_day(now);
        let mut changed = self.roll_over(today);

        if self.is_countable()
            && self.is_completed_on_day(today)
            && self.current_value < self.target_value
        {
            self.current_value = self.target_value;
            self.value_day = Some(today);
            changed = true;
        }

        let before = self.streak;
        changed |= self.recompute_streak(now) != before;
        changed
    }

    /// Seven cells for the week containing `now`, Sunday first.
    pub fn week_strip<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<WeekCell> {
        let tz = now.timezone();
        let today = now.date_naive();
        let sunday = week_start_sunday(today);
        (0..7)
            .map(|offset| {
                let date = sunday + Duration::days(offset);
                WeekCell {
                    date,
                    completed: self.was_completed_on_date(date, &tz),
                    is_today: date == today,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use day::DAY_MS;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap()
    }

    fn habit(target: u32) -> Habit {
        Habit::new(
            "h-1".into(),
            NewHabit {
                habit_type: "Water".into(),
                target_value: target.max(1),
                unit: "glasses".into(),
                ..NewHabit::default()
            },
            now() - Duration::days(30),
        )
        .map(|mut h| {
            h.target_value = target;
            h
        })
        .unwrap()
    }

    fn days_ago(n: i64) -> DateTime<Utc> {
        now() - Duration::days(n)
    }

    #[test]
    fn new_habit_rejects_invalid_input() {
        let blank = NewHabit { habit_type: "  ".into(), target_value: 3, ..NewHabit::default() };
        assert_eq!(blank.validate(), Err(ValidationError::Blank("habit_type".into())));

        let zero = NewHabit { habit_type: "Read".into(), target_value: 0, ..NewHabit::default() };
        assert!(zero.validate().is_err());

        let bad_time = NewHabit {
            habit_type: "Read".into(),
            target_value: 1,
            reminder: Some((24, 0)),
            ..NewHabit::default()
        };
        assert!(bad_time.validate().is_err());
    }

    #[test]
    fn mark_complete_is_idempotent() {
        let mut h = habit(8);
        assert!(h.mark_complete(&now()));
        let once = h.clone();
        assert!(!h.mark_complete(&(now() + Duration::hours(2))));
        assert_eq!(h, once);
        assert_eq!(h.current_value, 8);
        assert_eq!(h.streak, 1);
    }

    #[test]
    fn mark_complete_never_clamps_down() {
        let mut h = habit(10);
        h.current_value = 14;
        h.mark_complete(&now());
        assert_eq!(h.current_value, 14);
    }

    #[test]
    fn toggle_round_trip_for_countable_habit() {
        let mut h = habit(10);
        assert!(h.toggle_completion(&now()));
        assert_eq!(h.current_value, 10);
        assert!(h.is_completed_today(&now()));

        assert!(!h.toggle_completion(&now()));
        assert_eq!(h.current_value, 0);
        assert!(!h.is_completed_today(&now()));
    }

    #[test]
    fn toggle_marks_non_countable_habit_as_done() {
        let mut h = habit(0);
        assert!(h.toggle_completion(&now()));
        assert_eq!(h.current_value, 1);
        assert!(!h.toggle_completion(&now()));
        // nothing countable to reset
        assert_eq!(h.current_value, 1);
    }

    #[test]
    fn unmark_keeps_value_of_externally_synced_habit() {
        let mut h = habit(10_000);
        h.externally_synced = true;
        h.current_value = 12_000;
        h.mark_complete(&now());
        assert!(h.unmark(&now()));
        assert_eq!(h.current_value, 12_000);
        assert!(!h.is_completed_today(&now()));
    }

    #[test]
    fn increment_completes_on_reaching_target() {
        let mut h = habit(2);
        assert!(h.increment_progress(&now()));
        assert!(!h.is_completed_today(&now()));
        assert!(h.increment_progress(&now()));
        assert!(h.is_completed_today(&now()));
        assert_eq!(h.current_value, 2);
        assert_eq!(h.streak, 1);
        assert!(!h.increment_progress(&now()), "at target is a no-op");
        assert_eq!(h.current_value, 2);
    }

    #[test]
    fn increment_starts_fresh_on_a_new_day() {
        let mut h = habit(3);
        h.increment_progress(&days_ago(1));
        h.increment_progress(&days_ago(1));
        assert!(h.increment_progress(&now()));
        assert_eq!(h.current_value, 1);
        assert_eq!(h.value_day, Some(normalize_to_day(&now())));
        assert!(!h.is_completed_today(&now()));
    }

    #[test]
    fn backfilling_an_earlier_day_keeps_todays_progress() {
        let mut h = habit(8);
        h.increment_progress(&now());
        h.increment_progress(&now());

        assert!(h.mark_complete(&days_ago(1)));
        assert_eq!(h.current_value, 2);
        assert_eq!(h.value_day, Some(normalize_to_day(&now())));
        assert!(h.was_completed_on(&days_ago(1)));

        assert!(h.unmark(&days_ago(1)));
        assert_eq!(h.current_value, 2);
        assert!(!h.reconcile(&now()));
        assert_eq!(h.current_value, 2);
    }

    #[test]
    fn sync_below_target_zeroes_tapped_habit() {
        let mut h = habit(10);
        let today = Some(now().date_naive());
        assert_eq!(h.sync_from_external_signal(12, today, &now()), SyncOutcome::Completed);
        assert_eq!(h.sync_from_external_signal(3, today, &now()), SyncOutcome::Uncompleted);
        assert_eq!(h.current_value, 0);
        assert_eq!(h.streak, 0);
    }

    #[test]
    fn increment_is_a_no_op_without_target() {
        let mut h = habit(0);
        assert!(!h.increment_progress(&now()));
        assert_eq!(h.current_value, 0);
    }

    #[test]
    fn grace_day_keeps_streak_until_today_is_marked() {
        let mut h = habit(1);
        h.mark_complete(&days_ago(2));
        h.mark_complete(&days_ago(1));
        assert_eq!(h.recompute_streak(&now()), 2);

        h.completion_history.insert(normalize_to_day(&now()), false);
        assert_eq!(h.recompute_streak(&now()), 2);

        h.completion_history.remove(&normalize_to_day(&now()));
        h.mark_complete(&now());
        assert_eq!(h.streak, 3);
    }

    #[test]
    fn gap_limits_streak_to_latest_run() {
        let mut h = habit(1);
        h.mark_complete(&days_ago(3));
        h.mark_complete(&days_ago(1));
        assert_eq!(h.recompute_streak(&now()), 1);
    }

    #[test]
    fn sync_crossing_target_completes_today() {
        let mut h = habit(10_000);
        h.externally_synced = true;
        h.current_value = 9_500;
        h.mark_complete(&days_ago(1));
        h.current_value = 9_500;
        let before = h.recompute_streak(&now());

        let outcome = h.sync_from_external_signal(10_200, Some(now().date_naive()), &now());
        assert_eq!(outcome, SyncOutcome::Completed);
        assert_eq!(h.current_value, 10_200);
        assert!(h.is_completed_today(&now()));
        assert_eq!(h.streak, before + 1);
    }

    #[test]
    fn sync_dropping_below_target_uncompletes() {
        let mut h = habit(10_000);
        h.externally_synced = true;
        h.current_value = 10_500;
        h.mark_complete(&now());
        let outcome = h.sync_from_external_signal(3_000, Some(now().date_naive()), &now());
        assert_eq!(outcome, SyncOutcome::Uncompleted);
        assert_eq!(h.current_value, 3_000);
        assert!(!h.is_completed_today(&now()));
    }

    #[test]
    fn sync_without_crossing_only_updates_value() {
        let mut h = habit(10_000);
        h.externally_synced = true;
        h.current_value = 1_000;
        let today = Some(now().date_naive());
        assert_eq!(h.sync_from_external_signal(2_000, today, &now()), SyncOutcome::Updated);
        assert_eq!(h.sync_from_external_signal(2_000, today, &now()), SyncOutcome::Unchanged);
        assert_eq!(h.current_value, 2_000);
        assert!(h.completion_history.is_empty());
    }

    #[test]
    fn stale_sync_clears_today() {
        let mut h = habit(10_000);
        h.externally_synced = true;
        h.mark_complete(&days_ago(1));
        h.current_value = 12_000;
        h.mark_complete(&now());
        assert_eq!(h.streak, 2);

        let yesterday = days_ago(1).date_naive();
        let outcome = h.sync_from_external_signal(12_000, Some(yesterday), &now());
        assert_eq!(outcome, SyncOutcome::StaleReset);
        assert_eq!(h.current_value, 0);
        assert!(!h.is_completed_today(&now()));
        assert_eq!(h.streak, 1, "yesterday still carries the streak");

        assert_eq!(h.sync_from_external_signal(5, None, &now()), SyncOutcome::Unchanged);
    }

    #[test]
    fn reconcile_rolls_over_yesterdays_progress() {
        let mut h = habit(8);
        h.increment_progress(&days_ago(1));
        h.increment_progress(&days_ago(1));
        assert_eq!(h.current_value, 2);

        assert!(h.reconcile(&now()));
        assert_eq!(h.current_value, 0);
        assert_eq!(h.value_day, Some(normalize_to_day(&now())));
        assert!(!h.reconcile(&now()));
    }

    #[test]
    fn reconcile_heals_under_target_completion() {
        let mut h = habit(5);
        h.completion_history.insert(normalize_to_day(&now()), true);
        h.current_value = 2;
        assert!(h.reconcile(&now()));
        assert_eq!(h.current_value, 5);
        assert_eq!(h.streak, 1);
    }

    #[test]
    fn week_strip_is_sunday_first() {
        let mut h = habit(1);
        // 2024-05-15 is a Wednesday; mark Monday and today
        h.mark_complete(&days_ago(2));
        h.mark_complete(&now());
        let strip = h.week_strip(&now());
        assert_eq!(strip.len(), 7);
        assert_eq!(strip[0].date, NaiveDate::from_ymd_opt(2024, 5, 12).unwrap());
        let flags: Vec<bool> = strip.iter().map(|c| c.completed).collect();
        assert_eq!(flags, vec![false, true, false, true, false, false, false]);
        assert!(strip[3].is_today);
    }

    #[test]
    fn weekly_schedule_anchors_on_creation_weekday() {
        let mut h = habit(1);
        h.schedule = HabitSchedule::Weekly;
        // created 30 days before a Wednesday -> a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        assert!(h.is_scheduled_on(monday, &Utc));
        assert!(!h.is_scheduled_on(monday + Duration::days(1), &Utc));
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let h: Habit = serde_json::from_str(r#"{"id":"x","habit_type":"Yoga"}"#).unwrap();
        assert_eq!(h.schedule, HabitSchedule::Daily);
        assert!(!h.archived);
        assert!(h.completion_history.is_empty());
        assert_eq!(h.streak, 0);
    }

    #[test]
    fn completion_history_round_trips_through_json() {
        let mut h = habit(3);
        h.mark_complete(&now());
        let json = serde_json::to_string(&h).unwrap();
        let back: Habit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert_eq!(
            back.completion_history.keys().next().copied().map(|k| k % DAY_MS),
            Some(0)
        );
    }
}
