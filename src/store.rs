// Task board state store with durable slot persistence

use crate::clock::{Clock, DefaultClock, local_date, local_today};
use crate::filter::TaskFilter;
use crate::ids::{IdGenerator, UuidIds};
use crate::models::{Attachment, Comment, NewAttachment, NewTask, Priority, SubTask, Task, TaskStatus, TaskUpdate};
use crate::query::{self, ActivityDay};
use crate::slots::{SlotStorage, validate_slot_name};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Slot name used when none is configured
pub const DEFAULT_STORE_NAME: &str = "task-store";

const STATE_VERSION: u32 = 0;

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&[Task])>;

/// Authoritative in-process task state.
///
/// Every command that changes `tasks` writes the whole collection to the
/// store's slot and then notifies observers. Commands aimed at unknown ids do
/// nothing. Write failures are logged and never surface to the caller; the
/// in-memory state stays authoritative for the session.
pub struct TaskStore {
    name: String,
    tasks: Vec<Task>,
    /// Ids of deleted tasks; persisted so they are never handed out again
    retired: BTreeSet<String>,
    slots: Box<dyn SlotStorage>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl TaskStore {
    /// Open the store kept in slot `name`, using UUIDv7 ids and the system clock
    pub fn open(slots: Box<dyn SlotStorage>, name: &str) -> Result<Self> {
        Self::open_with(slots, name, Box::new(UuidIds), Box::new(DefaultClock))
    }

    /// Open with explicit id and time sources.
    ///
    /// A previously written slot value becomes the initial state. A missing
    /// slot starts the board empty, and so does an unreadable one (after a
    /// warning), matching the write-side failure policy.
    pub fn open_with(
        slots: Box<dyn SlotStorage>,
        name: &str,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        validate_slot_name(name).context("Invalid store name")?;

        let state = match slots.read(name) {
            Ok(Some(raw)) => match decode_state(&raw) {
                Ok(state) => {
                    info!(
                        store = name,
                        count = state.tasks.len(),
                        retired = state.retired_ids.len(),
                        "Rehydrated tasks"
                    );
                    state
                }
                Err(e) => {
                    warn!(store = name, error = ?e, "Failed to decode stored tasks, starting empty");
                    BoardState::default()
                }
            },
            Ok(None) => {
                debug!(store = name, "No stored tasks, starting empty");
                BoardState::default()
            }
            Err(e) => {
                warn!(store = name, error = ?e, "Failed to read stored tasks, starting empty");
                BoardState::default()
            }
        };

        Ok(Self {
            name: name.to_string(),
            tasks: state.tasks,
            retired: state.retired_ids,
            slots,
            ids,
            clock,
            observers: Vec::new(),
            next_subscription: 0,
        })
    }

    /// Slot name this store persists to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calendar day the due-date queries compare against
    pub fn today(&self) -> NaiveDate {
        local_today(self.clock.as_ref())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Append a new task and return its id
    pub fn add_task(&mut self, new: NewTask) -> String {
        let id = self.fresh_id(|candidate, store| {
            store.get_task(candidate).is_some() || store.retired.contains(candidate)
        });
        let task = Task::from_new(id.clone(), new, self.clock.utc());
        debug!(id = %task.id, title = %task.title, "add_task");

        self.tasks.push(task);
        self.commit();
        id
    }

    /// Merge the fields present in `update` into task `id`
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) {
        let now = self.clock.utc();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update_task: no such task");
            return;
        };

        task.apply(update);
        task.updated_at = advance(task.updated_at, now);
        self.commit();
    }

    /// Remove task `id` together with its subtasks, comments and attachments.
    /// The id is retired and never assigned to a new task.
    pub fn delete_task(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete_task: no such task");
            return;
        }
        self.retired.insert(id.to_string());
        self.commit();
    }

    /// Put task `id` in another column; every transition is allowed
    pub fn move_task(&mut self, id: &str, status: TaskStatus) {
        let now = self.clock.utc();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "move_task: no such task");
            return;
        };

        task.status = status;
        task.updated_at = advance(task.updated_at, now);
        self.commit();
    }

    pub fn add_subtask(&mut self, task_id: &str, title: impl Into<String>) {
        let Some(index) = self.position(task_id) else {
            debug!(task_id, "add_subtask: no such task");
            return;
        };

        let id = self.fresh_id(|candidate, store| store.tasks[index].subtasks.iter().any(|s| s.id == candidate));
        let now = self.clock.utc();
        let task = &mut self.tasks[index];
        task.subtasks.push(SubTask {
            id,
            title: title.into(),
            completed: false,
        });
        task.updated_at = advance(task.updated_at, now);
        self.commit();
    }

    /// Flip the completed flag of one subtask
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) {
        let now = self.clock.utc();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!(task_id, "toggle_subtask: no such task");
            return;
        };
        let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            debug!(task_id, subtask_id, "toggle_subtask: no such subtask");
            return;
        };

        subtask.completed = !subtask.completed;
        task.updated_at = advance(task.updated_at, now);
        self.commit();
    }

    /// Append a comment; comments are never edited or removed afterwards
    pub fn add_comment(&mut self, task_id: &str, content: impl Into<String>, author: impl Into<String>) {
        let Some(index) = self.position(task_id) else {
            debug!(task_id, "add_comment: no such task");
            return;
        };

        let id = self.fresh_id(|candidate, store| store.tasks[index].comments.iter().any(|c| c.id == candidate));
        let now = self.clock.utc();
        let task = &mut self.tasks[index];
        let created_at = advance(task.updated_at, now);
        task.comments.push(Comment {
            id,
            content: content.into(),
            author: author.into(),
            created_at,
        });
        task.updated_at = created_at;
        self.commit();
    }

    pub fn add_attachment(&mut self, task_id: &str, attachment: NewAttachment) {
        let Some(index) = self.position(task_id) else {
            debug!(task_id, "add_attachment: no such task");
            return;
        };

        let id = self.fresh_id(|candidate, store| store.tasks[index].attachments.iter().any(|a| a.id == candidate));
        let now = self.clock.utc();
        let task = &mut self.tasks[index];
        task.attachments.push(Attachment {
            id,
            name: attachment.name,
            url: attachment.url,
            kind: attachment.kind,
        });
        task.updated_at = advance(task.updated_at, now);
        self.commit();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        TaskFilter::status(status).apply(&self.tasks)
    }

    pub fn tasks_by_priority(&self, priority: Priority) -> Vec<&Task> {
        TaskFilter::priority(priority).apply(&self.tasks)
    }

    pub fn filter(&self, filter: &TaskFilter) -> Vec<&Task> {
        filter.apply(&self.tasks)
    }

    /// Open tasks due before today
    pub fn overdue_tasks(&self) -> Vec<&Task> {
        query::overdue(&self.tasks, self.today())
    }

    /// Open tasks due within the next three days, today excluded
    pub fn due_soon_tasks(&self) -> Vec<&Task> {
        query::due_soon(&self.tasks, self.today())
    }

    /// Percentage of completed tasks, 0 when the board is empty
    pub fn task_completion(&self) -> f64 {
        query::completion_rate(&self.tasks)
    }

    /// Heatmap cells for the last `days` days, oldest first
    pub fn activity(&self, days: u32) -> Vec<ActivityDay> {
        query::activity(&self.tasks, self.today(), days, local_date)
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register a callback invoked with the full task list after each change
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&[Task]) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Draw an id from the generator, suffixing it if `taken` reports a clash
    fn fresh_id<F>(&mut self, taken: F) -> String
    where
        F: Fn(&str, &Self) -> bool,
    {
        let base = self.ids.next_id();
        let mut candidate = base.clone();
        let mut n = 1;
        while taken(&candidate, self) {
            warn!(id = %candidate, "Generated id already in use");
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        candidate
    }

    fn commit(&self) {
        self.persist();
        for (_, observer) in &self.observers {
            observer(&self.tasks);
        }
    }

    fn persist(&self) {
        let encoded = match encode_state(&self.tasks, &self.retired) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(store = %self.name, error = ?e, "Failed to encode tasks");
                return;
            }
        };

        match self.slots.write(&self.name, &encoded) {
            Ok(()) => debug!(store = %self.name, count = self.tasks.len(), "Persisted tasks"),
            Err(e) => warn!(
                store = %self.name,
                error = ?e,
                "Failed to persist tasks, keeping in-memory state"
            ),
        }
    }
}

/// Next timestamp for a record last touched at `previous`; never goes backwards
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous)
}

// ============================================================================
// Persisted layout
// ============================================================================

#[derive(Serialize)]
struct SnapshotRef<'a> {
    state: StateRef<'a>,
    version: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateRef<'a> {
    tasks: &'a [Task],
    #[serde(skip_serializing_if = "no_retired_ids")]
    retired_ids: &'a BTreeSet<String>,
}

fn no_retired_ids(ids: &&BTreeSet<String>) -> bool {
    ids.is_empty()
}

#[derive(Deserialize)]
struct Snapshot {
    state: BoardState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardState {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    retired_ids: BTreeSet<String>,
}

fn encode_state(tasks: &[Task], retired_ids: &BTreeSet<String>) -> Result<String> {
    let snapshot = SnapshotRef {
        state: StateRef { tasks, retired_ids },
        version: STATE_VERSION,
    };
    serde_json::to_string(&snapshot).context("Failed to serialize tasks")
}

fn decode_state(raw: &str) -> Result<BoardState> {
    let snapshot: Snapshot = serde_json::from_str(raw).context("Failed to deserialize stored tasks")?;
    if snapshot.version != STATE_VERSION {
        warn!(
            version = snapshot.version,
            expected = STATE_VERSION,
            "Stored tasks have an unexpected version, loading as-is"
        );
    }
    Ok(snapshot.state)
}

/// Serialize tasks to the slot layout `{"state":{"tasks":[...]},"version":0}`
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    encode_state(tasks, &BTreeSet::new())
}

/// Parse the tasks out of a slot value written by [`encode_tasks`] or a store
pub fn decode_tasks(raw: &str) -> Result<Vec<Task>> {
    decode_state(raw).map(|state| state.tasks)
}
