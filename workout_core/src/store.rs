//! Session record persistence.
//!
//! Records live in a JSON Lines file (one [`SessionRecord`] per line). Every
//! mutation runs inside [`SessionStore::transact`]: the store takes its
//! serialization point, hands the closure a [`SessionTable`] loaded from
//! storage, and writes the table back only if the closure succeeds.

use crate::{CompletedSet, Error, PlanId, Result, SessionRecord};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// In-transaction view of all session records
#[derive(Clone, Debug, Default)]
pub struct SessionTable {
    records: Vec<SessionRecord>,
    dirty: bool,
}

impl SessionTable {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self {
            records,
            dirty: false,
        }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SessionRecord> {
        self.records
    }

    /// Whether any mutation happened since the table was loaded
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The user's active record, across all plans
    pub fn find_active(&self, user_id: &str) -> Option<SessionRecord> {
        self.records
            .iter()
            .find(|r| r.user_id == user_id && r.is_active())
            .cloned()
    }

    pub fn find_active_for_plan(&self, user_id: &str, plan_id: PlanId) -> Vec<SessionRecord> {
        self.records
            .iter()
            .filter(|r| r.user_id == user_id && r.plan_id == plan_id && r.is_active())
            .cloned()
            .collect()
    }

    /// Completed exercises of one run of a (user, plan) pair.
    ///
    /// Records reclaimed from earlier, abandoned runs carry another `run_id`
    /// and are not counted.
    pub fn find_completed(&self, user_id: &str, plan_id: PlanId, run_id: Uuid) -> CompletedSet {
        let mut set = CompletedSet::default();
        set.positions.extend(
            self.records
                .iter()
                .filter(|r| {
                    r.user_id == user_id && r.plan_id == plan_id && r.run_id == run_id && r.completed
                })
                .map(|r| r.position),
        );
        set
    }

    /// All records of a (user, plan) pair, active or not
    pub fn records_for_plan(&self, user_id: &str, plan_id: PlanId) -> Vec<SessionRecord> {
        self.records
            .iter()
            .filter(|r| r.user_id == user_id && r.plan_id == plan_id)
            .cloned()
            .collect()
    }

    pub fn create(&mut self, record: SessionRecord) -> SessionRecord {
        self.records.push(record.clone());
        self.dirty = true;
        record
    }

    /// Flip a record to completed. Already completed records are left as is.
    pub fn mark_completed(&mut self, record_id: Uuid) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::NotFound(format!("session record {} not found", record_id)))?;

        if record.completed {
            return Ok(());
        }

        record.completed = true;
        record.completed_at = Some(chrono::Utc::now());
        self.dirty = true;
        Ok(())
    }

    /// Remove every record of a (user, plan) pair, returning how many went
    pub fn delete_all_for_plan(&mut self, user_id: &str, plan_id: PlanId) -> usize {
        let before = self.records.len();
        self.records
            .retain(|r| !(r.user_id == user_id && r.plan_id == plan_id));
        let removed = before - self.records.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }
}

/// Transactional access to session records.
///
/// `transact` must serialize against every other `transact` on the same
/// underlying data and persist the table only when the closure returns `Ok`.
pub trait SessionStore {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionTable) -> Result<T>;

    /// Consistent read-only copy of all records
    fn snapshot(&self) -> Result<SessionTable>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionTable) -> Result<T>,
    {
        (**self).transact(f)
    }

    fn snapshot(&self) -> Result<SessionTable> {
        (**self).snapshot()
    }
}

// ============================================================================
// JSON Lines store
// ============================================================================

/// JSONL-backed session store with file locking
#[derive(Clone, Debug)]
pub struct JsonlStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonlStore {
    /// Create a store for the given records file; the lock file sits next to it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    /// Store rooted in a data directory (`<data_dir>/sessions/sessions.jsonl`)
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("sessions").join("sessions.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn open_lock(&self) -> Result<File> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn run_locked<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionTable) -> Result<T>,
    {
        let mut table = SessionTable::new(read_records(&self.path)?);
        let out = f(&mut table)?;

        if table.is_dirty() {
            write_records(&self.path, table.records())?;
        }
        Ok(out)
    }
}

impl SessionStore for JsonlStore {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionTable) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = self.run_locked(f);

        // Closing the lock file releases the lock; the write above is already committed
        drop(lock);
        result
    }

    fn snapshot(&self) -> Result<SessionTable> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;

        let result = read_records(&self.path).map(SessionTable::new);

        drop(lock);
        result
    }
}

/// Read all session records from a JSONL file
///
/// Lines that fail to parse are logged and skipped.
pub fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable session record at line {}: {}",
                    line_num + 1,
                    e
                );
            }
        }
    }

    tracing::debug!("Read {} session records from {:?}", records.len(), path);
    Ok(records)
}

/// Atomically replace the JSONL file with `records`
///
/// Writes to a temp file in the same directory, syncs it, then renames it
/// over the original.
fn write_records(path: &Path, records: &[SessionRecord]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("session path {:?} has no parent", path)))?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for record in records {
            let line = serde_json::to_string(record)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {} session records to {:?}", records.len(), path);
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// Mutex-guarded store for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionTable) -> Result<T>,
    {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| Error::Storage("session store lock poisoned".into()))?;

        let mut table = SessionTable::new(guard.clone());
        let out = f(&mut table)?;

        if table.is_dirty() {
            *guard = table.into_records();
        }
        Ok(out)
    }

    fn snapshot(&self) -> Result<SessionTable> {
        let guard = self
            .records
            .lock()
            .map_err(|_| Error::Storage("session store lock poisoned".into()))?;
        Ok(SessionTable::new(guard.clone()))
    }
}
