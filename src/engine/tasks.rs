//! Task management operations exposed to the command layer

use crate::error::EngineError;
use crate::models::{IndicatorKind, MonitorTask, Timeframe};
use crate::store::TaskStore;
use std::sync::Arc;
use tracing::info;

/// Create/remove/list operations over the task store. The command front end
/// (bot, CLI, whatever) parses user input and calls these; validation and
/// ownership checks live here.
pub struct TaskService {
    store: Arc<TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    pub async fn create_task(
        &self,
        user_id: i64,
        symbol: &str,
        timeframe: &str,
        indicator: &str,
    ) -> Result<MonitorTask, EngineError> {
        let timeframe: Timeframe = timeframe.parse()?;
        let indicator: IndicatorKind = indicator.parse()?;

        let task = MonitorTask::new(user_id, symbol, timeframe, indicator);
        if self.store.contains(&task.id).await {
            return Err(EngineError::TaskExists(task.id));
        }
        self.store.upsert(task.clone()).await?;

        info!(
            task_id = %task.id,
            user_id,
            symbol = %task.symbol,
            timeframe = %task.timeframe,
            indicator = %task.indicator,
            "TaskService: created task {}",
            task.id
        );
        Ok(task)
    }

    pub async fn remove_task(&self, user_id: i64, task_id: &str) -> Result<(), EngineError> {
        self.store.remove(user_id, task_id).await?;
        info!(task_id = %task_id, user_id, "TaskService: removed task {}", task_id);
        Ok(())
    }

    pub async fn list_tasks(&self, user_id: i64) -> Vec<MonitorTask> {
        self.store.tasks_for_user(user_id).await
    }
}
