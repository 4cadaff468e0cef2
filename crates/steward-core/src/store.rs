//! Persistent state, split in two trees.
//!
//! Definitions are versioned files under `.steward/` in the working copy.
//! Runtime status lives in the shared state dir so every working copy of the
//! repository observes one authoritative record per entity. Runtime updates
//! are read-modify-write under a per-entity advisory lock; all writes go
//! through the atomic temp-then-rename path.

use crate::epic::{Epic, EpicDef, EpicRuntime};
use crate::error::{Result, StewardError};
use crate::ids::{EpicId, TaskId};
use crate::task::{Task, TaskDef, TaskRuntime};
use crate::workspace::Workspace;
use crate::{io, paths};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// FileLock
// ---------------------------------------------------------------------------

/// Exclusive advisory lock on a lock file, released on drop. Acquisition is
/// non-blocking: a held lock surfaces as `LockContention` and the caller
/// decides whether to retry.
pub struct FileLock {
    _file: File,
}

impl FileLock {
    pub fn acquire(path: &Path, entity: &str) -> Result<FileLock> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(FileLock { _file: file }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(StewardError::LockContention(entity.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time load of every epic and task, the selector's input.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub epics: Vec<Epic>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    pub fn epic(&self, id: EpicId) -> Option<&Epic> {
        self.epics.iter().find(|e| e.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks_of(&self, epic: EpicId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.id.epic() == epic)
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

pub trait StateStore {
    fn list_epic_ids(&self) -> Result<Vec<EpicId>>;
    fn list_task_ids(&self, epic: EpicId) -> Result<Vec<TaskId>>;
    fn load_epic(&self, id: EpicId) -> Result<Epic>;
    fn load_task(&self, id: TaskId) -> Result<Task>;
    fn save_epic_def(&self, def: &EpicDef) -> Result<()>;
    fn save_task_def(&self, def: &TaskDef) -> Result<()>;
    fn load_epic_def(&self, id: EpicId) -> Result<EpicDef>;
    fn load_task_def(&self, id: TaskId) -> Result<TaskDef>;

    /// Read-modify-write the epic's runtime record under its entity lock.
    /// Nothing is persisted when `f` fails.
    fn update_epic_runtime<F>(&self, id: EpicId, f: F) -> Result<Epic>
    where
        F: FnOnce(&mut EpicRuntime) -> Result<()>;

    /// Read-modify-write the task's runtime record under its entity lock.
    fn update_task_runtime<F>(&self, id: TaskId, f: F) -> Result<Task>
    where
        F: FnOnce(&mut TaskRuntime) -> Result<()>;

    fn snapshot(&self) -> Result<Snapshot> {
        let mut epics = Vec::new();
        let mut tasks = Vec::new();
        for eid in self.list_epic_ids()? {
            epics.push(self.load_epic(eid)?);
            for tid in self.list_task_ids(eid)? {
                tasks.push(self.load_task(tid)?);
            }
        }
        Ok(Snapshot { epics, tasks })
    }
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    state: PathBuf,
}

impl LocalStore {
    pub fn new(ws: &Workspace) -> Self {
        Self {
            root: ws.root().to_path_buf(),
            state: ws.state_dir().to_path_buf(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state
    }

    /// Lock serializing id allocation for `epic create` / `task add`.
    pub fn create_lock(&self) -> Result<FileLock> {
        FileLock::acquire(&paths::create_lock_path(&self.state), "create")
    }

    fn entity_lock(&self, entity: &str) -> Result<FileLock> {
        FileLock::acquire(&paths::entity_lock_path(&self.state, entity), entity)
    }

    fn epic_runtime(&self, def: &EpicDef) -> Result<EpicRuntime> {
        let path = paths::epic_runtime_path(&self.state, def.id);
        if path.exists() {
            io::read_json(&path)
        } else {
            Ok(EpicRuntime::synthesize(def))
        }
    }

    fn task_runtime(&self, def: &TaskDef) -> Result<TaskRuntime> {
        let path = paths::task_runtime_path(&self.state, def.id);
        if path.exists() {
            io::read_json(&path)
        } else {
            Ok(TaskRuntime::synthesize(def))
        }
    }
}

impl StateStore for LocalStore {
    fn list_epic_ids(&self) -> Result<Vec<EpicId>> {
        let dir = paths::epics_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(id) = entry.file_name().to_string_lossy().parse::<EpicId>() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn list_task_ids(&self, epic: EpicId) -> Result<Vec<TaskId>> {
        let dir = paths::tasks_dir(&self.root, epic);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(id) = stem.parse::<TaskId>() {
                    if id.epic() == epic {
                        ids.push(id);
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load_epic_def(&self, id: EpicId) -> Result<EpicDef> {
        let path = paths::epic_def_path(&self.root, id);
        if !path.exists() {
            return Err(StewardError::EpicNotFound(id.to_string()));
        }
        io::read_json(&path)
    }

    fn load_task_def(&self, id: TaskId) -> Result<TaskDef> {
        let path = paths::task_def_path(&self.root, id);
        if !path.exists() {
            return Err(StewardError::TaskNotFound(id.to_string()));
        }
        io::read_json(&path)
    }

    fn load_epic(&self, id: EpicId) -> Result<Epic> {
        let def = self.load_epic_def(id)?;
        let rt = self.epic_runtime(&def)?;
        Ok(Epic::merge(def, rt))
    }

    fn load_task(&self, id: TaskId) -> Result<Task> {
        let def = self.load_task_def(id)?;
        let rt = self.task_runtime(&def)?;
        Ok(Task::merge(def, rt))
    }

    fn save_epic_def(&self, def: &EpicDef) -> Result<()> {
        io::write_json(&paths::epic_def_path(&self.root, def.id), def)
    }

    fn save_task_def(&self, def: &TaskDef) -> Result<()> {
        io::write_json(&paths::task_def_path(&self.root, def.id), def)
    }

    fn update_epic_runtime<F>(&self, id: EpicId, f: F) -> Result<Epic>
    where
        F: FnOnce(&mut EpicRuntime) -> Result<()>,
    {
        let def = self.load_epic_def(id)?;
        let _lock = self.entity_lock(&id.to_string())?;
        let mut rt = self.epic_runtime(&def)?;
        f(&mut rt)?;
        io::write_json(&paths::epic_runtime_path(&self.state, id), &rt)?;
        Ok(Epic::merge(def, rt))
    }

    fn update_task_runtime<F>(&self, id: TaskId, f: F) -> Result<Task>
    where
        F: FnOnce(&mut TaskRuntime) -> Result<()>,
    {
        let def = self.load_task_def(id)?;
        let _lock = self.entity_lock(&id.to_string())?;
        let mut rt = self.task_runtime(&def)?;
        f(&mut rt)?;
        io::write_json(&paths::task_runtime_path(&self.state, id), &rt)?;
        Ok(Task::merge(def, rt))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
