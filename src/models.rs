// Data models for the task board

use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unit of work on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub assignee: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_tracking: Option<TimeTracking>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from creation input; owned collections start empty
    pub fn from_new(id: String, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            assignee: new.assignee,
            tags: new.tags,
            subtasks: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            time_tracking: new.time_tracking,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this task.
    ///
    /// Only fields present in `update` are overwritten. Timestamps are left
    /// to the caller.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(assignee) = update.assignee {
            self.assignee = assignee;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(time_tracking) = update.time_tracking {
            self.time_tracking = time_tracking;
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Number of completed subtasks
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    /// Percentage of completed subtasks, 0 when there are none
    pub fn subtask_progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return 0.0;
        }
        self.completed_subtasks() as f64 / self.subtasks.len() as f64 * 100.0
    }
}

/// Checklist item owned by a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Append-only note on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Link to an external file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Estimated and spent effort, in minutes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTracking {
    pub estimated: u32,
    pub spent: u32,
}

/// Board column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Column heading used by the board view
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(eyre!(
                "Invalid status: {} (expected todo, in-progress or completed)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(eyre!("Invalid priority: {} (expected low, medium or high)", other)),
        }
    }
}

/// Ordered set of tags
///
/// Entries are trimmed, blank entries are dropped and duplicates are ignored,
/// including when loading persisted data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, returning false if it was blank or already present
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(values: Vec<String>) -> Self {
        values.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub assignee: String,
    pub tags: Tags,
    pub time_tracking: Option<TimeTracking>,
}

impl NewTask {
    /// A todo task of medium priority with everything else empty
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date,
            assignee: String::new(),
            tags: Tags::new(),
            time_tracking: None,
        }
    }
}

/// Partial update for a task; `None` fields are left untouched
///
/// `time_tracking` is doubly optional: `Some(None)` clears it.
/// Owned collections are not part of an update; they change only through
/// their own commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub tags: Option<Tags>,
    pub time_tracking: Option<Option<TimeTracking>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }
}

/// Input for attaching a file to a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub url: String,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = DateTime::parse_from_rfc3339("2024-03-01T09:30:00.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut new = NewTask::new("Write report", NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        new.tags = ["docs", "q1"].into_iter().collect();
        Task::from_new("task-1".to_string(), new, now)
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let status: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_task_field_names() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(json["dueDate"], "2024-03-05");
        assert_eq!(json["status"], "todo");
        assert_eq!(json["tags"], serde_json::json!(["docs", "q1"]));
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("timeTracking").is_none());
    }

    #[test]
    fn test_attachment_type_field() {
        let attachment = Attachment {
            id: "a1".to_string(),
            name: "spec.pdf".to_string(),
            url: "https://example.com/spec.pdf".to_string(),
            kind: "application/pdf".to_string(),
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["type"], "application/pdf");
    }

    #[test]
    fn test_task_serialization_preserves_timestamps() {
        let mut task = sample_task();
        task.time_tracking = Some(TimeTracking { estimated: 90, spent: 30 });
        task.subtasks.push(SubTask {
            id: "s1".to_string(),
            title: "Outline".to_string(),
            completed: true,
        });

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
        assert_eq!(back.created_at.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_tags_reject_duplicates_and_blanks() {
        let mut tags = Tags::new();
        assert!(tags.insert("ui"));
        assert!(!tags.insert("ui"));
        assert!(!tags.insert("  "));
        assert!(tags.insert(" backend "));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["ui", "backend"]);
        assert!(tags.remove("ui"));
        assert!(!tags.remove("ui"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_tags_lookup_trims_argument() {
        let mut tags: Tags = ["ui", "api"].into_iter().collect();
        assert!(tags.contains(" ui "));
        assert!(tags.remove(" ui "));
        assert!(!tags.contains("ui"));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["api"]);
    }

    #[test]
    fn test_tags_dedup_on_deserialize() {
        let tags: Tags = serde_json::from_str(r#"["a","b","a","c","b"]"#).unwrap();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut task = sample_task();
        let before = task.clone();

        task.apply(TaskUpdate {
            priority: Some(Priority::High),
            assignee: Some("Dana".to_string()),
            ..TaskUpdate::default()
        });

        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.assignee, "Dana");
        assert_eq!(task.title, before.title);
        assert_eq!(task.tags, before.tags);
        assert_eq!(task.due_date, before.due_date);
        assert_eq!(task.updated_at, before.updated_at);
    }

    #[test]
    fn test_apply_clears_time_tracking() {
        let mut task = sample_task();
        task.time_tracking = Some(TimeTracking { estimated: 60, spent: 0 });

        task.apply(TaskUpdate::default());
        assert!(task.time_tracking.is_some());

        task.apply(TaskUpdate {
            time_tracking: Some(None),
            ..TaskUpdate::default()
        });
        assert!(task.time_tracking.is_none());
    }

    #[test]
    fn test_subtask_progress() {
        let mut task = sample_task();
        assert_eq!(task.subtask_progress(), 0.0);

        for (i, done) in [true, false, false, true].into_iter().enumerate() {
            task.subtasks.push(SubTask {
                id: format!("s{}", i),
                title: format!("Step {}", i),
                completed: done,
            });
        }
        assert_eq!(task.completed_subtasks(), 2);
        assert_eq!(task.subtask_progress(), 50.0);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(TaskUpdate::default().is_empty());
        let update = TaskUpdate {
            title: Some("x".to_string()),
            ..TaskUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
