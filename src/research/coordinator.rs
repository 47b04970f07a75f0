//! Per-query task state.
//!
//! The [`Coordinator`] is the only component holding state across queries. It
//! maps each [`QueryId`] to its task batch and enforces the forward-only task
//! lifecycle. Every operation takes a single mutex and never awaits while
//! holding it, so operations are atomic with respect to each other and
//! concurrent updates to different tasks of one batch are never lost.
//!
//! Retention is bounded: once `max_retained_queries` batches are stored,
//! registering a new query evicts the oldest batch whose tasks are all
//! terminal, or the oldest batch outright when every batch is still in flight.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::types::{AppError, QueryId, ResearchTask, Result};
use crate::utils::toml_config::CoordinatorConfig;

pub struct Coordinator {
    // Recency order is registration order: lookups and updates only peek.
    batches: Mutex<LruCache<QueryId, Vec<ResearchTask>>>,
}

impl Coordinator {
    /// Create a coordinator retaining at most `max_retained_queries` batches (minimum 1).
    pub fn new(max_retained_queries: usize) -> Self {
        let cap = NonZeroUsize::new(max_retained_queries).unwrap_or(NonZeroUsize::MIN);
        Self {
            batches: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.max_retained_queries)
    }

    /// Register a new batch under `query_id`.
    ///
    /// Fails with [`AppError::DuplicateQuery`] if the id is already registered,
    /// leaving existing state untouched.
    pub fn start_research(&self, query_id: QueryId, tasks: Vec<ResearchTask>) -> Result<()> {
        if tasks.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "query {} has no tasks to register",
                query_id
            )));
        }
        for (i, task) in tasks.iter().enumerate() {
            if tasks[..i].iter().any(|t| t.id() == task.id()) {
                return Err(AppError::InvalidInput(format!(
                    "duplicate task id '{}' in batch for query {}",
                    task.id(),
                    query_id
                )));
            }
        }

        let mut batches = self.batches.lock();
        if batches.contains(&query_id) {
            return Err(AppError::DuplicateQuery(query_id.to_string()));
        }

        if batches.len() >= batches.cap().get() {
            Self::evict_one(&mut batches);
        }

        debug!(query_id = %query_id, tasks = tasks.len(), "Registered research batch");
        batches.put(query_id, tasks);
        Ok(())
    }

    /// Record that a task has been dispatched (`pending -> running`).
    pub fn mark_running(&self, query_id: &QueryId, task_id: &str) -> Result<()> {
        self.with_task(query_id, task_id, |task| task.start())
    }

    /// Record a task's result, forcing it to `completed`.
    ///
    /// Fails with [`AppError::NotFound`] for an unknown query or task, and with
    /// [`AppError::InvalidTransition`] if the task is already terminal.
    pub fn update_task(
        &self,
        query_id: &QueryId,
        task_id: &str,
        result: impl Into<String>,
    ) -> Result<()> {
        let result = result.into();
        self.with_task(query_id, task_id, move |task| task.complete(result))
    }

    /// Record that a task failed. The task keeps no result.
    pub fn fail_task(&self, query_id: &QueryId, task_id: &str) -> Result<()> {
        self.with_task(query_id, task_id, |task| task.fail())
    }

    /// Current batch for `query_id`, or an empty list when the id is unknown.
    pub fn get_results(&self, query_id: &QueryId) -> Vec<ResearchTask> {
        self.batches
            .lock()
            .peek(query_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every retained batch, oldest registration first.
    pub fn snapshot(&self) -> Vec<(QueryId, Vec<ResearchTask>)> {
        self.batches
            .lock()
            .iter()
            .rev()
            .map(|(id, tasks)| (id.clone(), tasks.clone()))
            .collect()
    }

    /// Apply `f` to retained batches, newest registration first, and return the
    /// first `Some`. Batches are visited in place; only `f` decides what is cloned.
    pub fn find_map_newest<T, F>(&self, mut f: F) -> Option<T>
    where
        F: FnMut(&QueryId, &[ResearchTask]) -> Option<T>,
    {
        self.batches
            .lock()
            .iter()
            .find_map(|(id, tasks)| f(id, tasks.as_slice()))
    }

    /// Whether every task of the batch is terminal. Unknown ids are not settled.
    pub fn is_settled(&self, query_id: &QueryId) -> bool {
        self.batches
            .lock()
            .peek(query_id)
            .map(|tasks| tasks.iter().all(ResearchTask::is_terminal))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.batches.lock().cap().get()
    }

    fn with_task<F>(&self, query_id: &QueryId, task_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ResearchTask) -> Result<()>,
    {
        let mut batches = self.batches.lock();
        let tasks = batches
            .peek_mut(query_id)
            .ok_or_else(|| AppError::NotFound(format!("query {}", query_id)))?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id() == task_id)
            .ok_or_else(|| AppError::NotFound(format!("task {} in query {}", task_id, query_id)))?;
        apply(task)
    }

    fn evict_one(batches: &mut LruCache<QueryId, Vec<ResearchTask>>) {
        let settled = batches
            .iter()
            .rev()
            .find(|(_, tasks)| tasks.iter().all(ResearchTask::is_terminal))
            .map(|(id, _)| id.clone());

        match settled {
            Some(id) => {
                debug!(query_id = %id, "Evicting oldest settled research batch");
                batches.pop(&id);
            }
            None => {
                if let Some((id, _)) = batches.pop_lru() {
                    warn!(query_id = %id, "Evicting in-flight research batch; retention limit reached");
                }
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::from_config(&CoordinatorConfig::default())
    }
}
