//! Task repository port and its placeholder implementation.
//!
//! `NullTaskRepository` accepts every call and stores nothing: listing is
//! always empty and mutations always succeed. It stays a placeholder until a
//! real persistence adapter is injected behind `TaskRepository`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            completed: false,
        }
    }
}

/// Data-access contract for task records.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>>;
    async fn add_task(&self, task: &Task) -> Result<()>;
    /// Replaces the task whose id matches `task.id`.
    async fn update_task(&self, task: &Task) -> Result<()>;
    async fn delete_task(&self, id: &TaskId) -> Result<()>;
}

/// Non-persisting repository: every operation resolves immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTaskRepository;

#[async_trait]
impl TaskRepository for NullTaskRepository {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(Vec::new())
    }

    async fn add_task(&self, task: &Task) -> Result<()> {
        debug!("add_task {} ignored", task.id);
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        debug!("update_task {} ignored", task.id);
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        debug!("delete_task {} ignored", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_always_empty() {
        let repo = NullTaskRepository;
        assert!(repo.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_succeed_and_do_nothing() {
        let repo = NullTaskRepository;
        let mut task = Task::new("water the plant");

        repo.add_task(&task).await.unwrap();
        assert!(repo.list_tasks().await.unwrap().is_empty());

        task.completed = true;
        repo.update_task(&task).await.unwrap();
        repo.delete_task(&task.id).await.unwrap();
        // Unknown ids are fine too
        repo.delete_task(&TaskId::new()).await.unwrap();
        repo.update_task(&Task::new("never added")).await.unwrap();

        assert!(repo.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let repo: Box<dyn TaskRepository> = Box::new(NullTaskRepository);
        for i in 0..10 {
            repo.add_task(&Task::new(format!("task {}", i))).await.unwrap();
        }
        assert_eq!(repo.list_tasks().await.unwrap(), Vec::new());
    }

    #[test]
    fn test_task_ids_are_unique() {
        assert_ne!(Task::new("a").id, Task::new("a").id);
    }
}
