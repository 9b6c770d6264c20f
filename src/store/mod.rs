//! Durable task persistence.
//!
//! Tasks and their runtime state live in one JSON file under the data
//! directory. Every mutation rewrites the file through a temp-file rename so
//! a crash mid-write never corrupts committed records, and the in-memory map
//! is only advanced after the write lands (a failed write means the next
//! tick retries the same comparison rather than silently losing a signal).

use crate::error::EngineError;
use crate::models::{MonitorTask, TaskRuntimeState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Task definition plus its mutable evaluation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: MonitorTask,
    #[serde(default)]
    pub runtime: TaskRuntimeState,
}

pub struct TaskStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, TaskRecord>>,
}

impl TaskStore {
    /// Load the store from disk. A missing file starts empty; records with
    /// unknown timeframe/indicator/signal values are skipped with a warning
    /// (forward compatibility); a syntactically corrupt file is a startup
    /// failure since the task set cannot be determined safely.
    pub async fn open(path: PathBuf) -> Result<Self, EngineError> {
        let mut records = BTreeMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let parsed: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&raw).map_err(|e| {
                        EngineError::Persistence(format!(
                            "task store {} is corrupt: {}",
                            path.display(),
                            e
                        ))
                    })?;

                for (task_id, value) in parsed {
                    match serde_json::from_value::<TaskRecord>(value) {
                        Ok(record) => {
                            records.insert(task_id, record);
                        }
                        Err(e) => {
                            warn!(
                                task_id = %task_id,
                                error = %e,
                                "TaskStore: skipping unreadable record {}",
                                task_id
                            );
                        }
                    }
                }

                info!(
                    path = %path.display(),
                    count = records.len(),
                    "TaskStore: loaded {} tasks",
                    records.len()
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "TaskStore: starting with empty store");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub async fn load_all(&self) -> Vec<TaskRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    pub async fn contains(&self, task_id: &str) -> bool {
        self.records.lock().await.contains_key(task_id)
    }

    pub async fn tasks_for_user(&self, user_id: i64) -> Vec<MonitorTask> {
        self.records
            .lock()
            .await
            .values()
            .filter(|r| r.task.user_id == user_id)
            .map(|r| r.task.clone())
            .collect()
    }

    pub async fn upsert(&self, task: MonitorTask) -> Result<(), EngineError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let runtime = next
            .get(&task.id)
            .map(|r| r.runtime.clone())
            .unwrap_or_default();
        next.insert(task.id.clone(), TaskRecord { task, runtime });
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    pub async fn remove(&self, user_id: i64, task_id: &str) -> Result<(), EngineError> {
        let mut records = self.records.lock().await;
        let record = records
            .get(task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        if record.task.user_id != user_id {
            return Err(EngineError::PermissionDenied(task_id.to_string()));
        }

        let mut next = records.clone();
        next.remove(task_id);
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    pub async fn update_runtime(
        &self,
        task_id: &str,
        runtime: TaskRuntimeState,
    ) -> Result<(), EngineError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let record = next
            .get_mut(task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        record.runtime = runtime;
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn persist(&self, records: &BTreeMap<String, TaskRecord>) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
