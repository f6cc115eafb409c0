// Input validation performed before commands reach the store

use crate::models::{NewTask, Priority, Tags, TaskStatus, TaskUpdate, TimeTracking};
use chrono::NaiveDate;
use eyre::{Context, Result, eyre};

pub const MIN_TITLE_LEN: usize = 3;

/// Raw field values collected from the user.
///
/// The same form backs both task creation and editing; fields left as `None`
/// take defaults on creation and are left untouched on edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assignee: Option<String>,
    pub tags: Option<Vec<String>>,
    pub estimated_minutes: Option<u32>,
    pub spent_minutes: Option<u32>,
}

impl TaskForm {
    /// Validate for creation; the due date defaults to `today`
    pub fn into_new_task(self, today: NaiveDate) -> Result<NewTask> {
        let title = validate_title(self.title.as_deref().unwrap_or_default())?;
        let assignee = validate_assignee(self.assignee.as_deref().unwrap_or_default())?;
        let due_date = match self.due_date.as_deref() {
            Some(raw) => parse_due_date(raw)?,
            None => today,
        };

        let mut new = NewTask::new(title, due_date);
        new.assignee = assignee;
        if let Some(description) = self.description {
            new.description = description.trim().to_string();
        }
        if let Some(status) = self.status.as_deref() {
            new.status = status.parse::<TaskStatus>()?;
        }
        if let Some(priority) = self.priority.as_deref() {
            new.priority = priority.parse::<Priority>()?;
        }
        if let Some(tags) = &self.tags {
            new.tags = collect_tags(tags);
        }
        new.time_tracking = time_tracking(self.estimated_minutes, self.spent_minutes, None);
        Ok(new)
    }

    /// Validate for editing; `current` supplies the other half of a partly
    /// specified time tracking pair
    pub fn into_update(self, current: Option<TimeTracking>) -> Result<TaskUpdate> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let due_date = self.due_date.as_deref().map(parse_due_date).transpose()?;
        let status = self.status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
        let priority = self.priority.as_deref().map(str::parse::<Priority>).transpose()?;
        let assignee = self.assignee.as_deref().map(validate_assignee).transpose()?;

        let time_tracking = if self.estimated_minutes.is_some() || self.spent_minutes.is_some() {
            Some(time_tracking(self.estimated_minutes, self.spent_minutes, current))
        } else {
            None
        };

        Ok(TaskUpdate {
            title,
            description: self.description.map(|d| d.trim().to_string()),
            status,
            priority,
            due_date,
            assignee,
            tags: self.tags.as_deref().map(collect_tags),
            time_tracking,
        })
    }
}

/// Trimmed title of at least [`MIN_TITLE_LEN`] characters
pub fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(eyre!("Title is required"));
    }
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(eyre!("Title must be at least {} characters", MIN_TITLE_LEN));
    }
    Ok(title.to_string())
}

/// Trimmed, non-empty assignee
pub fn validate_assignee(raw: &str) -> Result<String> {
    let assignee = raw.trim();
    if assignee.is_empty() {
        return Err(eyre!("Assignee is required"));
    }
    Ok(assignee.to_string())
}

pub fn validate_subtask_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(eyre!("Subtask title is required"));
    }
    Ok(title.to_string())
}

/// Parse a `YYYY-MM-DD` due date
pub fn parse_due_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid due date: {} (expected YYYY-MM-DD)", raw.trim()))
}

/// Trimmed, non-blank, first occurrence wins
pub fn collect_tags(raw: &[String]) -> Tags {
    raw.iter().collect()
}

fn time_tracking(estimated: Option<u32>, spent: Option<u32>, current: Option<TimeTracking>) -> Option<TimeTracking> {
    if estimated.is_none() && spent.is_none() {
        return current;
    }
    let base = current.unwrap_or_default();
    Some(TimeTracking {
        estimated: estimated.unwrap_or(base.estimated),
        spent: spent.unwrap_or(base.spent),
    })
}
