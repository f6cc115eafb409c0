// End-to-end board scenarios through the public API and file-backed slots

use chrono::{NaiveDate, TimeDelta};
use std::collections::HashSet;
use taskboard::{
    DEFAULT_STORE_NAME, FileSlots, ManualClock, NewAttachment, NewTask, SequentialIds, SlotStorage, TaskStatus,
    TaskStore, TaskUpdate, decode_tasks,
};
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
}

fn open(dir: &TempDir, clock: &ManualClock) -> TaskStore {
    let slots = FileSlots::open(dir.path()).unwrap();
    TaskStore::open_with(
        Box::new(slots),
        DEFAULT_STORE_NAME,
        Box::new(SequentialIds::new("t")),
        Box::new(clock.clone()),
    )
    .unwrap()
}

#[test]
fn test_overdue_then_completed() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::at_noon(today());
    let mut store = open(&temp, &clock);

    let mut new = NewTask::new("A", today() - TimeDelta::days(1));
    new.assignee = "X".to_string();
    let id = store.add_task(new);

    let overdue: Vec<&str> = store.overdue_tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(overdue, vec![id.as_str()]);

    store.move_task(&id, TaskStatus::Completed);
    assert!(store.overdue_tasks().is_empty());
    assert_eq!(store.task_completion(), 100.0);
}

#[test]
fn test_due_today_is_in_neither_bucket() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::at_noon(today());
    let mut store = open(&temp, &clock);

    let soon = store.add_task(NewTask::new("Soon", today() + TimeDelta::days(2)));
    store.add_task(NewTask::new("Today", today()));

    let due_soon: Vec<&str> = store.due_soon_tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(due_soon, vec![soon.as_str()]);
    assert!(store.overdue_tasks().is_empty());
}

#[test]
fn test_state_survives_restart() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::at_noon(today());

    let before = {
        let mut store = open(&temp, &clock);
        let id = store.add_task(NewTask::new("Durable", today() + TimeDelta::days(7)));
        store.add_subtask(&id, "step one");
        clock.advance(TimeDelta::milliseconds(1500));
        store.add_comment(&id, "looks good", "Rae");
        store.add_attachment(&id, NewAttachment {
            name: "notes.md".to_string(),
            url: "https://example.com/notes.md".to_string(),
            kind: "text/markdown".to_string(),
        });
        store.update_task(&id, TaskUpdate {
            description: Some("kept across restarts".to_string()),
            ..TaskUpdate::default()
        });
        store.tasks().to_vec()
    };

    let store = open(&temp, &clock);
    assert_eq!(store.tasks(), before.as_slice());

    let slots = FileSlots::open(temp.path()).unwrap();
    let raw = slots.read(DEFAULT_STORE_NAME).unwrap().unwrap();
    assert_eq!(decode_tasks(&raw).unwrap(), before);
}

#[test]
fn test_ids_stay_unique_across_restart_and_delete() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::at_noon(today());
    let mut seen = HashSet::new();

    {
        let mut store = open(&temp, &clock);
        for i in 0..5 {
            seen.insert(store.add_task(NewTask::new(format!("Task {}", i), today())));
        }
        store.delete_task("t-2");
        store.delete_task("t-5");
    }

    let mut store = open(&temp, &clock);
    for i in 5..10 {
        let id = store.add_task(NewTask::new(format!("Task {}", i), today()));
        assert!(seen.insert(id));
    }
    assert_eq!(store.tasks().len(), 8);
    assert!(store.get_task("t-2").is_none());
    assert!(store.get_task("t-5").is_none());
}

#[test]
fn test_toggle_twice_restores_subtask() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::at_noon(today());
    let mut store = open(&temp, &clock);

    let id = store.add_task(NewTask::new("Checklist", today()));
    store.add_subtask(&id, "item");
    let sub_id = store.get_task(&id).unwrap().subtasks[0].id.clone();
    let t0 = store.get_task(&id).unwrap().updated_at;

    clock.advance(TimeDelta::seconds(1));
    store.toggle_subtask(&id, &sub_id);
    let t1 = store.get_task(&id).unwrap().updated_at;

    clock.advance(TimeDelta::seconds(1));
    store.toggle_subtask(&id, &sub_id);
    let task = store.get_task(&id).unwrap();

    assert!(!task.subtasks[0].completed);
    assert!(t1 > t0);
    assert!(task.updated_at > t1);
}
