//! Streak computation over a completion record.
//!
//! A streak is the most recent unbroken run of completed days ending today
//! or yesterday. Yesterday counts so that a habit not yet done today keeps
//! its streak until the day is over.

use std::collections::BTreeMap;

use super::day::{previous_day, DayKey};

/// Length of the run of consecutive completed days ending at `today` or the
/// day before it.
pub fn current_streak(record: &BTreeMap<DayKey, bool>, today: DayKey) -> u32 {
    // BTreeMap iterates ascending; walk from the newest key down
    let mut completed = record.iter().rev().filter(|(_, done)| **done).map(|(k, _)| *k);

    let Some(latest) = completed.next() else {
        return 0;
    };
    if latest != today && latest != previous_day(today) {
        return 0;
    }

    let mut anchor = latest;
    let mut run = 1;
    for day in completed {
        if day != previous_day(anchor) {
            break;
        }
        run += 1;
        anchor = day;
    }
    run
}

/// Longest run of consecutive completed days anywhere in the record.
pub fn longest_streak(record: &BTreeMap<DayKey, bool>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut last: Option<DayKey> = None;

    for day in record.iter().filter(|(_, done)| **done).map(|(k, _)| *k) {
        run = match last {
            Some(prev) if previous_day(day) == prev => run + 1,
            _ => 1,
        };
        best = best.max(run);
        last = Some(day);
    }
    best
}
