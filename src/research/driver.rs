//! Orchestration driver.
//!
//! Sequences one query through decomposition, concurrent execution, state
//! tracking and synthesis, reporting progress along the way.
//!
//! Fan-out uses a [`JoinSet`]: every task is awaited whether its siblings
//! succeed or fail. With a deadline configured, executions still running when
//! it expires are aborted and recorded as failed so synthesis can proceed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::llm::GenerationGateway;
use crate::research::coordinator::Coordinator;
use crate::research::decomposer::TaskDecomposer;
use crate::research::executor::{SourceTemplates, TaskExecutor};
use crate::research::intent::is_research_request;
use crate::research::lookup::ResultsLookup;
use crate::research::progress::{NoopSink, ProgressEvent, ProgressSink};
use crate::research::synthesizer::Synthesizer;
use crate::types::{AppError, QueryId, ResearchOutcome, ResearchTask, Result, TaskMetadata};
use crate::utils::toml_config::SwarmConfig;

pub struct ResearchDriver {
    decomposer: TaskDecomposer,
    executor: Arc<TaskExecutor>,
    synthesizer: Synthesizer,
    coordinator: Arc<Coordinator>,
    sink: Arc<dyn ProgressSink>,
    deadline: Option<Duration>,
    summary_prefix_chars: usize,
}

impl ResearchDriver {
    /// Build a driver with its own coordinator and a no-op progress sink.
    pub fn new(gateway: Arc<dyn GenerationGateway>, config: &SwarmConfig) -> Self {
        Self {
            decomposer: TaskDecomposer::new(Arc::clone(&gateway), config.research.batch_size),
            executor: Arc::new(TaskExecutor::new(
                Arc::clone(&gateway),
                SourceTemplates::from_config(config),
            )),
            synthesizer: Synthesizer::new(gateway),
            coordinator: Arc::new(Coordinator::from_config(&config.coordinator)),
            sink: Arc::new(NoopSink),
            deadline: config.research.deadline(),
            summary_prefix_chars: config.research.summary_prefix_chars,
        }
    }

    /// Share an existing coordinator (e.g. with other drivers or lookups).
    pub fn with_coordinator(mut self, coordinator: Arc<Coordinator>) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Read-side view over this driver's coordinator.
    pub fn lookup(&self) -> ResultsLookup {
        ResultsLookup::new(Arc::clone(&self.coordinator), self.summary_prefix_chars)
    }

    /// Run research for a chat message, or return `None` if it is not a research request.
    pub async fn handle_message(&self, text: &str) -> Result<Option<ResearchOutcome>> {
        if !is_research_request(text) {
            return Ok(None);
        }
        self.run(text).await.map(Some)
    }

    /// Run the full pipeline under a freshly generated query id.
    pub async fn run(&self, query: &str) -> Result<ResearchOutcome> {
        self.run_with_id(QueryId::generate(), query).await
    }

    /// Run the full pipeline under a caller-supplied query id.
    pub async fn run_with_id(&self, query_id: QueryId, query: &str) -> Result<ResearchOutcome> {
        let start = Instant::now();
        let query = query.trim();

        self.sink
            .emit(ProgressEvent::started(query, self.decomposer.batch_size()));
        info!(query_id = %query_id, "Research started");

        let tasks = match self.decomposer.decompose(query).await {
            Ok(tasks) => tasks,
            Err(e) => return Err(self.abort(&query_id, e)),
        };

        if let Err(e) = self.coordinator.start_research(query_id.clone(), tasks.clone()) {
            return Err(self.abort(&query_id, e));
        }

        let batch = self.dispatch(&query_id, query, tasks).await;

        let completed = batch.iter().filter(|t| t.is_completed()).count();
        let failed = batch.len() - completed;
        info!(query_id = %query_id, completed, failed, "Research tasks settled");

        let answer = match self.synthesizer.synthesize(query, &batch).await {
            Ok(answer) => answer,
            Err(e) => return Err(self.abort(&query_id, e)),
        };

        let metadata: Vec<TaskMetadata> = batch.iter().map(TaskMetadata::from).collect();
        self.sink
            .emit(ProgressEvent::complete(&answer, metadata.clone()));
        info!(query_id = %query_id, "Research complete");

        Ok(ResearchOutcome {
            query_id,
            answer,
            tasks: metadata,
            completed,
            failed,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Execute every task concurrently and return the settled batch in dispatch order.
    async fn dispatch(
        &self,
        query_id: &QueryId,
        query: &str,
        tasks: Vec<ResearchTask>,
    ) -> Vec<ResearchTask> {
        let mut set = JoinSet::new();
        for task in &tasks {
            if let Err(e) = self.coordinator.mark_running(query_id, task.id()) {
                warn!(query_id = %query_id, task_id = task.id(), error = %e, "Failed to record dispatch");
            }

            let executor = Arc::clone(&self.executor);
            let task = task.clone();
            let original_query = query.to_string();
            set.spawn(async move { executor.execute(task, &original_query).await });
        }

        let mut batch = tasks;
        let deadline = self.deadline.map(|d| tokio::time::Instant::now() + d);

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            query_id = %query_id,
                            outstanding = set.len(),
                            "Research deadline expired; failing outstanding tasks"
                        );
                        set.abort_all();
                        break;
                    }
                },
                None => set.join_next().await,
            };

            match next {
                Some(Ok(task)) => {
                    self.persist(query_id, &task);
                    if let Some(slot) = batch.iter_mut().find(|t| t.id() == task.id()) {
                        *slot = task;
                    }
                }
                Some(Err(e)) => {
                    warn!(query_id = %query_id, error = %e, "Research task aborted");
                }
                None => break,
            }
        }

        // Timed out, panicked, or otherwise never settled
        for task in batch.iter_mut().filter(|t| !t.is_terminal()) {
            let _ = task.fail();
            if let Err(e) = self.coordinator.fail_task(query_id, task.id()) {
                warn!(query_id = %query_id, task_id = task.id(), error = %e, "Failed to record task failure");
            }
        }

        batch
    }

    fn persist(&self, query_id: &QueryId, task: &ResearchTask) {
        let recorded = match task.result() {
            Some(result) if task.is_completed() => {
                self.coordinator.update_task(query_id, task.id(), result)
            }
            _ => self.coordinator.fail_task(query_id, task.id()),
        };

        if let Err(e) = recorded {
            warn!(query_id = %query_id, task_id = task.id(), error = %e, "Failed to record task outcome");
        }
    }

    fn abort(&self, query_id: &QueryId, error: AppError) -> AppError {
        warn!(query_id = %query_id, error = %error, "Research aborted");
        self.sink.emit(ProgressEvent::failed(&error));
        error
    }
}
