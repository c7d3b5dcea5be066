//! Habit tracking engine.
//!
//! Owns an in-memory snapshot of the habit collection and an injected
//! [`HabitStore`]. Every mutation resolves one active habit by id, applies
//! the per-habit operation and writes the whole collection back. Mutations
//! take `&mut self`, so a single owner performs each read-modify-write.
//!
//! Unknown or archived ids are a logged no-op returning `Ok(None)`. A failed
//! save is returned as an error; the in-memory snapshot keeps the mutation.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::habit::{Habit, NewHabit, SyncOutcome};
use crate::signal::ExternalSignal;
use crate::storage::HabitStore;

/// Dashboard aggregate over active habits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub active_habits: usize,
    pub due_today: usize,
    pub completed_today: usize,
    pub best_current_streak: u32,
    pub best_longest_streak: u32,
    /// Mean of per-habit progress toward today's target, 0.0 to 1.0.
    pub average_progress: f64,
}

/// Result of routing one external signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalApplied {
    pub habit_id: String,
    pub outcome: SyncOutcome,
    pub current_value: u32,
}

pub struct HabitEngine<S: HabitStore> {
    store: S,
    habits: Vec<Habit>,
}

impl<S: HabitStore> HabitEngine<S> {
    /// Load the collection and reconcile every active habit against `now`.
    ///
    /// An unreadable collection is treated as a first run and replaced by an
    /// empty one. Reconciliation is not written back until the next
    /// mutation.
    pub fn load<Tz: TimeZone>(store: S, now: &DateTime<Tz>) -> Self {
        let habits = match store.load_all() {
            Ok(habits) => habits,
            Err(e) => {
                warn!(error = %e, "habit collection unreadable, starting empty");
                Vec::new()
            }
        };

        let mut engine = Self { store, habits };
        let reconciled = engine.reconcile_in_memory(now);
        info!(
            habits = engine.habits.len(),
            reconciled, "habit collection loaded"
        );
        engine
    }

    /// Every habit, archived ones included.
    pub fn all(&self) -> &[Habit] {
        &self.habits
    }

    /// Habits that are not archived.
    pub fn active(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter().filter(|h| !h.archived)
    }

    /// Look up any habit, archived or not.
    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Create a habit from validated input and persist it.
    ///
    /// # Errors
    /// Returns a validation error before anything is mutated, or the store's
    /// error if saving fails.
    pub fn add_habit(&mut self, draft: NewHabit, now: DateTime<Utc>) -> Result<Habit> {
        let habit = Habit::new(Uuid::new_v4().to_string(), draft, now)?;
        debug!(habit_id = %habit.id, habit_type = %habit.habit_type, "habit added");
        self.habits.push(habit.clone());
        self.persist()?;
        Ok(habit)
    }

    /// Soft delete. The habit stays in the stored collection.
    pub fn archive(&mut self, id: &str) -> Result<Option<Habit>> {
        self.mutate(id, "archive", |h| {
            h.archived = true;
            true
        })
    }

    pub fn mark_complete<Tz: TimeZone>(
        &mut self,
        id: &str,
        at: &DateTime<Tz>,
    ) -> Result<Option<Habit>> {
        self.mutate(id, "mark_complete", |h| h.mark_complete(at))
    }

    pub fn unmark<Tz: TimeZone>(&mut self, id: &str, at: &DateTime<Tz>) -> Result<Option<Habit>> {
        self.mutate(id, "unmark", |h| {
            h.unmark(at);
            true
        })
    }

    pub fn increment_progress<Tz: TimeZone>(
        &mut self,
        id: &str,
        now: &DateTime<Tz>,
    ) -> Result<Option<Habit>> {
        self.mutate(id, "increment_progress", |h| h.increment_progress(now))
    }

    pub fn toggle_completion<Tz: TimeZone>(
        &mut self,
        id: &str,
        now: &DateTime<Tz>,
    ) -> Result<Option<Habit>> {
        self.mutate(id, "toggle_completion", |h| {
            h.toggle_completion(now);
            true
        })
    }

    /// Reconcile one habit against an external reading.
    pub fn sync_habit<Tz: TimeZone>(
        &mut self,
        id: &str,
        external_value: u32,
        external_date: Option<NaiveDate>,
        now: &DateTime<Tz>,
    ) -> Result<Option<(Habit, SyncOutcome)>> {
        let mut outcome = SyncOutcome::Unchanged;
        let habit = self.mutate(id, "sync", |h| {
            outcome = h.sync_from_external_signal(external_value, external_date, now);
            outcome != SyncOutcome::Unchanged
        })?;
        Ok(habit.map(|h| (h, outcome)))
    }

    /// Route a signal to every active, externally synced habit of the
    /// signal's type.
    pub fn apply_signal<Tz: TimeZone>(
        &mut self,
        signal: &ExternalSignal,
        now: &DateTime<Tz>,
    ) -> Result<Vec<SignalApplied>> {
        let date = signal.parsed_date();
        if date.is_none() {
            warn!(date = %signal.date, "unreadable signal date, treating as stale");
        }

        let mut applied = Vec::new();
        for habit in self
            .habits
            .iter_mut()
            .filter(|h| !h.archived && h.externally_synced && signal.matches_type(&h.habit_type))
        {
            let outcome = habit.sync_from_external_signal(signal.value, date, now);
            debug!(habit_id = %habit.id, ?outcome, value = signal.value, "signal applied");
            applied.push(SignalApplied {
                habit_id: habit.id.clone(),
                outcome,
                current_value: habit.current_value,
            });
        }

        if applied.is_empty() {
            warn!(habit_type = %signal.habit_type, "no synced habit matches signal");
        } else if applied.iter().any(|a| a.outcome != SyncOutcome::Unchanged) {
            self.persist()?;
        }
        Ok(applied)
    }

    /// Run rollover and self-heal over active habits, saving if anything
    /// changed. Returns how many habits changed.
    pub fn reconcile<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<usize> {
        let changed = self.reconcile_in_memory(now);
        if changed > 0 {
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn summary<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DaySummary {
        let tz = now.timezone();
        let date = now.date_naive();
        let active: Vec<&Habit> = self.active().collect();

        let average_progress = if active.is_empty() {
            0.0
        } else {
            active.iter().map(|h| h.progress()).sum::<f64>() / active.len() as f64
        };

        DaySummary {
            date,
            active_habits: active.len(),
            due_today: active.iter().filter(|h| h.is_scheduled_on(date, &tz)).count(),
            completed_today: active.iter().filter(|h| h.is_completed_today(now)).count(),
            best_current_streak: active.iter().map(|h| h.current_streak(now)).max().unwrap_or(0),
            best_longest_streak: active.iter().map(|h| h.longest_streak()).max().unwrap_or(0),
            average_progress,
        }
    }

    fn reconcile_in_memory<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> usize {
        self.habits
            .iter_mut()
            .filter(|h| !h.archived)
            .map(|h| h.reconcile(now))
            .filter(|changed| *changed)
            .count()
    }

    /// Apply `op` to one active habit; save when it reports a change.
    fn mutate<F>(&mut self, id: &str, op: &str, f: F) -> Result<Option<Habit>>
    where
        F: FnOnce(&mut Habit) -> bool,
    {
        let Some(habit) = self.habits.iter_mut().find(|h| h.id == id && !h.archived) else {
            warn!(habit_id = %id, op, "habit not found or archived");
            return Ok(None);
        };

        let changed = f(habit);
        let snapshot = habit.clone();
        debug!(habit_id = %id, op, changed, streak = snapshot.streak, "habit mutated");

        if changed {
            self.persist()?;
        }
        Ok(Some(snapshot))
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save_all(&self.habits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap()
    }

    fn draft(habit_type: &str, target: u32) -> NewHabit {
        NewHabit {
            habit_type: habit_type.into(),
            target_value: target,
            unit: "times".into(),
            ..NewHabit::default()
        }
    }

    fn engine() -> HabitEngine<MemoryStore> {
        HabitEngine::load(MemoryStore::new(), &now())
    }

    #[test]
    fn add_habit_persists_whole_collection() {
        let mut engine = engine();
        engine.add_habit(draft("Water", 8), now()).unwrap();
        engine.add_habit(draft("Read", 1), now()).unwrap();
        assert_eq!(engine.store().save_count(), 2);
        assert_eq!(engine.store().habits().len(), 2);
    }

    #[test]
    fn add_habit_rejects_invalid_input_without_saving() {
        let mut engine = engine();
        assert!(engine.add_habit(draft(" ", 8), now()).is_err());
        assert!(engine.add_habit(draft("Water", 0), now()).is_err());
        assert!(engine.all().is_empty());
        assert_eq!(engine.store().save_count(), 0);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut engine = engine();
        assert!(engine.toggle_completion("missing", &now()).unwrap().is_none());
        assert!(engine.archive("missing").unwrap().is_none());
        assert_eq!(engine.store().save_count(), 0);
    }

    #[test]
    fn repeated_mark_complete_saves_once() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Water", 8), now()).unwrap().id;
        let first = engine.mark_complete(&id, &now()).unwrap().unwrap();
        let second = engine.mark_complete(&id, &now()).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.store().save_count(), 2);
    }

    #[test]
    fn archived_habits_stop_accepting_mutations() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Water", 8), now()).unwrap().id;
        engine.archive(&id).unwrap().unwrap();

        assert_eq!(engine.active().count(), 0);
        assert!(engine.get(&id).unwrap().archived);
        assert!(engine.increment_progress(&id, &now()).unwrap().is_none());
        assert_eq!(engine.store().habits().len(), 1);
    }

    #[test]
    fn signal_routes_to_matching_synced_habits_only() {
        let mut engine = engine();
        let mut steps = draft("Steps", 10_000);
        steps.externally_synced = true;
        let steps_id = engine.add_habit(steps, now()).unwrap().id;
        engine.add_habit(draft("Steps", 5), now()).unwrap();

        let signal = ExternalSignal::new("steps", 10_200, now().date_naive());
        let applied = engine.apply_signal(&signal, &now()).unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].habit_id, steps_id);
        assert_eq!(applied[0].outcome, SyncOutcome::Completed);
        assert!(engine.get(&steps_id).unwrap().is_completed_today(&now()));
    }

    #[test]
    fn unchanged_signal_does_not_save() {
        let mut engine = engine();
        let mut steps = draft("Steps", 10_000);
        steps.externally_synced = true;
        engine.add_habit(steps, now()).unwrap();
        let saves = engine.store().save_count();

        let stale = ExternalSignal::new("Steps", 0, now().date_naive() - Duration::days(1));
        let applied = engine.apply_signal(&stale, &now()).unwrap();
        assert_eq!(applied[0].outcome, SyncOutcome::Unchanged);
        assert_eq!(engine.store().save_count(), saves);
    }

    #[test]
    fn load_reconciles_yesterdays_progress() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Water", 8), now()).unwrap().id;
        let yesterday = now() - Duration::days(1);
        engine.increment_progress(&id, &yesterday).unwrap();
        engine.increment_progress(&id, &yesterday).unwrap();

        let store = engine.into_store();
        assert_eq!(store.habits()[0].current_value, 2);

        let reloaded = HabitEngine::load(store, &now());
        assert_eq!(reloaded.get(&id).unwrap().current_value, 0);
    }

    #[test]
    fn load_leaves_archived_habits_untouched() {
        let stale = Habit {
            id: "old".into(),
            habit_type: "Water".into(),
            target_value: 8,
            current_value: 3,
            archived: true,
            ..Habit::default()
        };
        let engine = HabitEngine::load(MemoryStore::with_habits(vec![stale]), &now());
        assert_eq!(engine.get("old").unwrap().current_value, 3);
        assert_eq!(engine.store().save_count(), 0);
    }

    #[test]
    fn progress_does_not_carry_past_midnight() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Water", 8), now()).unwrap().id;
        let late = Utc.with_ymd_and_hms(2024, 5, 15, 23, 50, 0).unwrap();
        for _ in 0..7 {
            engine.increment_progress(&id, &late).unwrap();
        }
        assert_eq!(engine.get(&id).unwrap().current_value, 7);

        let early = Utc.with_ymd_and_hms(2024, 5, 16, 0, 10, 0).unwrap();
        let habit = engine.increment_progress(&id, &early).unwrap().unwrap();
        assert_eq!(habit.current_value, 1);
        assert!(!habit.is_completed_today(&early));
        assert!(!habit.was_completed_on(&late));
    }

    #[test]
    fn sync_below_target_resets_tapped_habit() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Pushups", 10), now()).unwrap().id;
        let today = Some(now().date_naive());

        let (_, up) = engine.sync_habit(&id, 12, today, &now()).unwrap().unwrap();
        assert_eq!(up, SyncOutcome::Completed);

        let (habit, down) = engine.sync_habit(&id, 3, today, &now()).unwrap().unwrap();
        assert_eq!(down, SyncOutcome::Uncompleted);
        assert_eq!(habit.current_value, 0);
        assert!(!habit.is_completed_today(&now()));
    }

    #[test]
    fn sync_below_target_keeps_sensor_value() {
        let mut engine = engine();
        let mut steps = draft("Steps", 10_000);
        steps.externally_synced = true;
        let id = engine.add_habit(steps, now()).unwrap().id;
        let today = Some(now().date_naive());

        engine.sync_habit(&id, 10_500, today, &now()).unwrap();
        let (habit, down) = engine.sync_habit(&id, 3_000, today, &now()).unwrap().unwrap();
        assert_eq!(down, SyncOutcome::Uncompleted);
        assert_eq!(habit.current_value, 3_000);
    }

    #[test]
    fn summary_streak_lapses_with_time() {
        let mut engine = engine();
        let id = engine.add_habit(draft("Read", 1), now()).unwrap().id;
        engine.mark_complete(&id, &(now() - Duration::days(1))).unwrap();
        engine.mark_complete(&id, &now()).unwrap();
        assert_eq!(engine.summary(&now()).best_current_streak, 2);

        let later = engine.summary(&(now() + Duration::days(5)));
        assert_eq!(later.best_current_streak, 0);
        assert_eq!(later.best_longest_streak, 2);
    }

    #[test]
    fn summary_covers_active_habits() {
        let mut engine = engine();
        let water = engine.add_habit(draft("Water", 4), now()).unwrap().id;
        let read = engine.add_habit(draft("Read", 1), now()).unwrap().id;
        let old = engine.add_habit(draft("Old", 1), now()).unwrap().id;
        engine.increment_progress(&water, &now()).unwrap();
        engine.toggle_completion(&read, &now()).unwrap();
        engine.toggle_completion(&old, &now()).unwrap();
        engine.archive(&old).unwrap();

        let summary = engine.summary(&now());
        assert_eq!(summary.active_habits, 2);
        assert_eq!(summary.due_today, 2);
        assert_eq!(summary.completed_today, 1);
        assert_eq!(summary.best_current_streak, 1);
        assert!((summary.average_progress - 0.625).abs() < 1e-9);
    }
}
