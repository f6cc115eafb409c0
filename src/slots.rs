// Durable named key/value slots for serialized board state

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// A store of named string values that survive process restarts
pub trait SlotStorage {
    /// Read the value stored under `name`, or `None` if the slot was never written
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace the value stored under `name`
    fn write(&self, name: &str, value: &str) -> Result<()>;

    /// Remove the slot; removing a missing slot is not an error
    fn remove(&self, name: &str) -> Result<()>;
}

/// Slot names end up as file names and table keys
pub fn validate_slot_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(eyre!("Slot name cannot be empty"));
    }
    if name.len() > 64 {
        return Err(eyre!("Slot name too long: {} (max 64 chars)", name));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid slot name: {} (must be alphanumeric with _/-)", name));
    }
    Ok(())
}

// ============================================================================
// File-backed slots
// ============================================================================

/// One `{name}.json` file per slot inside a directory
#[derive(Debug, Clone)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    /// Open or create a slot directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create slot directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }
}

impl SlotStorage for FileSlots {
    fn read(&self, name: &str) -> Result<Option<String>> {
        validate_slot_name(name)?;
        let path = self.slot_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path).with_context(|| format!("Failed to read slot file {:?}", path))?;
        Ok(Some(value))
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        validate_slot_name(name)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(name))
            .context("Failed to open slot lock file")?;

        // Serialize writers from other processes; released when `lock` drops
        lock.lock_exclusive().context("Failed to acquire slot lock")?;

        let tmp_path = self.dir.join(format!("{}.json.tmp", name));
        let replaced = File::create(&tmp_path)
            .context("Failed to create temporary slot file")
            .and_then(|mut file| {
                file.write_all(value.as_bytes())
                    .context("Failed to write temporary slot file")?;
                file.sync_all().context("Failed to sync temporary slot file")
            })
            .and_then(|()| fs::rename(&tmp_path, self.slot_path(name)).context("Failed to replace slot file"));

        if let Err(e) = replaced {
            if tmp_path.exists() && fs::remove_file(&tmp_path).is_err() {
                warn!(path = ?tmp_path, "Failed to clean up temporary slot file");
            }
            return Err(e);
        }
        debug!(slot = name, bytes = value.len(), "Wrote file slot");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_slot_name(name)?;
        let path = self.slot_path(name);
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove slot file")?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite-backed slots
// ============================================================================

/// Slots stored as rows of a single SQLite table
pub struct SqliteSlots {
    db: Connection,
}

impl SqliteSlots {
    /// Open or create a slot database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create slot database directory")?;
        }
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    /// Slots that vanish with the connection
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        let slots = Self { db };
        slots.create_schema()?;
        Ok(slots)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating slot schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl SlotStorage for SqliteSlots {
    fn read(&self, name: &str) -> Result<Option<String>> {
        validate_slot_name(name)?;
        let value: Option<String> = self
            .db
            .query_row("SELECT value FROM slots WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        validate_slot_name(name)?;
        self.db.execute(
            "INSERT INTO slots (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![name, value, chrono::Utc::now().timestamp_millis()],
        )?;
        debug!(slot = name, bytes = value.len(), "Wrote SQLite slot");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_slot_name(name)?;
        self.db.execute("DELETE FROM slots WHERE name = ?1", [name])?;
        Ok(())
    }
}

// ============================================================================
// In-memory slots
// ============================================================================

/// Process-local slots.
///
/// Clones share storage, so a handle kept by a test observes what a store
/// writes. Writes can be made to fail to exercise persistence errors.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SlotStorage for MemorySlots {
    fn read(&self, name: &str) -> Result<Option<String>> {
        validate_slot_name(name)?;
        let values = self.values.lock().map_err(|_| eyre!("Memory slots lock poisoned"))?;
        Ok(values.get(name).cloned())
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        validate_slot_name(name)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(eyre!("Storage quota exceeded for slot {}", name));
        }
        let mut values = self.values.lock().map_err(|_| eyre!("Memory slots lock poisoned"))?;
        values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_slot_name(name)?;
        let mut values = self.values.lock().map_err(|_| eyre!("Memory slots lock poisoned"))?;
        values.remove(name);
        Ok(())
    }
}
