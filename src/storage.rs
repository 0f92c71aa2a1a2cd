//! File-backed task service.
//!
//! [`JsonTaskService`] keeps a remote-style task listing in a single
//! JSON document. It is the store the CLI syncs against and the
//! reference implementation of [`TaskService`] for tests; a network
//! service would implement the same trait. The store file is guarded by
//! an exclusive lock for the lifetime of the handle, so concurrent sync
//! invocations against the same store serialize instead of interleaving.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::remote::{InsertRequest, RemoteTask, TaskService};

const STORE_SCHEMA_VERSION: &str = "orgsync.store.v1";

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: String,
    tasks: Vec<RemoteTask>,
}

/// Task service backed by a JSON file.
#[derive(Debug)]
pub struct JsonTaskService {
    path: PathBuf,
    tasks: Vec<RemoteTask>,
    _lock: FileLock,
}

impl JsonTaskService {
    /// Open (or create) a store, taking its lock. A missing file is an
    /// empty listing; the file is only created on [`save`](Self::save).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock = FileLock::acquire(lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let tasks = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                let document: StoreDocument = serde_json::from_str(&content)?;
                if document.schema_version != STORE_SCHEMA_VERSION {
                    return Err(Error::OperationFailed(format!(
                        "unsupported store schema '{}' in {}",
                        document.schema_version,
                        path.display()
                    )));
                }
                document.tasks
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            tasks,
            _lock: lock,
        })
    }

    /// Persist the current listing atomically.
    pub fn save(&self) -> Result<()> {
        let document = StoreDocument {
            schema_version: STORE_SCHEMA_VERSION.to_string(),
            tasks: self.tasks.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        lock::write_atomic(&self.path, json.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", path.display()))
}

impl TaskService for JsonTaskService {
    fn list(&mut self) -> Result<Vec<RemoteTask>> {
        Ok(self.tasks.clone())
    }

    fn insert(&mut self, request: InsertRequest) -> Result<String> {
        if let Some(parent) = &request.parent {
            if !self.tasks.iter().any(|task| &task.id == parent) {
                return Err(Error::TaskNotFound(parent.clone()));
            }
        }
        let id = Ulid::new().to_string();
        self.tasks.push(RemoteTask {
            id: id.clone(),
            title: request.title,
            parent: request.parent,
            notes: request.notes,
            status: request.status,
        });
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}
