// Derived board views: due-date buckets, completion rate, activity heatmap
//
// All comparisons are at day granularity against the caller's "today".

use crate::models::Task;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashMap;

/// Width of the due-soon lookahead window, in days
pub const DUE_SOON_DAYS: u64 = 3;

/// Not completed and due strictly before today
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.is_completed() && task.due_date < today
}

/// Not completed and due strictly between today and today + 3 days.
///
/// A task due today is neither overdue nor due soon.
pub fn is_due_soon(task: &Task, today: NaiveDate) -> bool {
    let horizon = today.checked_add_days(Days::new(DUE_SOON_DAYS)).unwrap_or(NaiveDate::MAX);
    !task.is_completed() && task.due_date > today && task.due_date < horizon
}

pub fn overdue(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| is_overdue(t, today)).collect()
}

pub fn due_soon(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| is_due_soon(t, today)).collect()
}

/// Percentage (0-100) of completed tasks; 0 for an empty board
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|t| t.is_completed()).count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// One heatmap cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub count: usize,
}

/// Per-day activity for the `days` calendar days ending today, oldest first.
///
/// A task counts towards a day when it was created or last updated on it,
/// at most once per day. `date_of` maps an instant to its calendar day.
pub fn activity<F>(tasks: &[Task], today: NaiveDate, days: u32, date_of: F) -> Vec<ActivityDay>
where
    F: Fn(DateTime<Utc>) -> NaiveDate,
{
    let mut counts: HashMap<NaiveDate, usize> = HashMap::new();
    for task in tasks {
        let created = date_of(task.created_at);
        let updated = date_of(task.updated_at);
        *counts.entry(created).or_default() += 1;
        if updated != created {
            *counts.entry(updated).or_default() += 1;
        }
    }

    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| ActivityDay {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
