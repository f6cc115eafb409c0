// Query filtering for tasks

use crate::models::{Priority, Task, TaskStatus};

/// Conjunction of optional criteria; an empty filter matches every task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Compared case-insensitively
    pub assignee: Option<String>,
    pub tag: Option<String>,
}

impl TaskFilter {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
            && self
                .assignee
                .as_deref()
                .is_none_or(|assignee| task.assignee.trim().eq_ignore_ascii_case(assignee.trim()))
            && self.tag.as_deref().is_none_or(|tag| task.tags.contains(tag.trim()))
    }

    /// Matching tasks in their original order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}
