// Taskboard - task board state store with local durable persistence

pub mod clock;
pub mod config;
pub mod filter;
pub mod form;
pub mod ids;
pub mod models;
pub mod query;
pub mod slots;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, DefaultClock, ManualClock};
pub use config::{Backend, Config, LogLevel};
pub use filter::TaskFilter;
pub use form::TaskForm;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use models::{
    Attachment, Comment, NewAttachment, NewTask, Priority, SubTask, Tags, Task, TaskStatus, TaskUpdate, TimeTracking,
};
pub use query::{ActivityDay, DUE_SOON_DAYS};
pub use slots::{FileSlots, MemorySlots, SlotStorage, SqliteSlots};
pub use store::{DEFAULT_STORE_NAME, SubscriptionId, TaskStore, decode_tasks, encode_tasks};
