use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============= Research Types =============

/// Information source a sub-task is bound to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Twitter/X: recent discussions and sentiment
    Twitter,
    /// GitHub: repositories and code implementations
    Github,
    /// Web: documentation and general information
    Web,
}

impl Source {
    /// Every known source, in canonical decomposition order.
    pub const ALL: [Source; 3] = [Source::Twitter, Source::Github, Source::Web];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Twitter => "twitter",
            Source::Github => "github",
            Source::Web => "web",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse for configuration keys; accepts `x` for Twitter.
impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Source::Twitter),
            "github" => Ok(Source::Github),
            "web" => Ok(Source::Web),
            other => Err(AppError::InvalidInput(format!("unknown source '{}'", other))),
        }
    }
}

/// Lifecycle of a sub-task. Forward-only: `Pending -> Running -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `Completed` and `Failed` admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Identifier of one research query and its task batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Wrap a caller-supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QueryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One source-bound unit of work within a query's batch.
///
/// `status` and `result` only change through the transition methods, which keep
/// `result` present exactly when the task is completed and never move a task
/// out of a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchTask {
    id: String,
    query: String,
    source: Source,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ResearchTask {
    /// New pending task with a fresh id.
    pub fn new(source: Source, query: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), source, query)
    }

    /// New pending task with an explicit id.
    pub fn with_id(id: impl Into<String>, source: Source, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            source,
            status: TaskStatus::Pending,
            result: None,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// `Pending -> Running`.
    pub fn start(&mut self) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.invalid_transition(TaskStatus::Running));
        }
        self.status = TaskStatus::Running;
        self.touch();
        Ok(())
    }

    /// `Pending | Running -> Completed`, recording the result.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<()> {
        if self.is_terminal() {
            return Err(self.invalid_transition(TaskStatus::Completed));
        }
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.touch();
        Ok(())
    }

    /// `Pending | Running -> Failed`. The result stays absent.
    pub fn fail(&mut self) -> Result<()> {
        if self.is_terminal() {
            return Err(self.invalid_transition(TaskStatus::Failed));
        }
        self.status = TaskStatus::Failed;
        self.result = None;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        // Wall clocks can step backwards; a task's timestamp must not.
        self.timestamp = Utc::now().max(self.timestamp);
    }

    fn invalid_transition(&self, to: TaskStatus) -> AppError {
        AppError::InvalidTransition {
            task_id: self.id.clone(),
            from: self.status,
            to,
        }
    }
}

/// Per-task metadata exposed to callers and progress events; never carries result bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub source: Source,
    pub query: String,
    pub status: TaskStatus,
}

impl From<&ResearchTask> for TaskMetadata {
    fn from(task: &ResearchTask) -> Self {
        Self {
            source: task.source(),
            query: task.query().to_string(),
            status: task.status(),
        }
    }
}

/// Final product of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub query_id: QueryId,
    pub answer: String,
    pub tasks: Vec<TaskMetadata>,
    pub completed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Read-side view of the most recent research that produced results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchSummary {
    pub query_id: QueryId,
    pub completed_count: usize,
    pub total_count: usize,
    pub short_summary: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Decomposition error: {0}")]
    Decomposition(String),

    #[error("Execution failure: {0}")]
    Execution(String),

    #[error("Duplicate query: {0}")]
    DuplicateQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending_without_result() {
        let task = ResearchTask::new(Source::Github, "rust agent frameworks");
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.result().is_none());
        assert!(!task.id().is_empty());
    }

    #[test]
    fn test_forward_transitions() {
        let mut task = ResearchTask::new(Source::Web, "q");
        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);

        task.complete("found it").unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.result(), Some("found it"));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut done = ResearchTask::new(Source::Web, "q");
        done.complete("r").unwrap();
        assert!(matches!(done.fail(), Err(AppError::InvalidTransition { .. })));
        assert!(done.complete("other").is_err());
        assert_eq!(done.result(), Some("r"));

        let mut failed = ResearchTask::new(Source::Twitter, "q");
        failed.start().unwrap();
        failed.fail().unwrap();
        assert!(failed.result().is_none());
        assert!(failed.complete("late").is_err());
        assert!(failed.start().is_err());
        assert!(failed.result().is_none());
    }

    #[test]
    fn test_start_only_from_pending() {
        let mut task = ResearchTask::new(Source::Web, "q");
        task.start().unwrap();
        let err = task.start().unwrap_err();
        assert!(err.to_string().contains("running -> running"));
    }

    #[test]
    fn test_timestamp_never_decreases() {
        let mut task = ResearchTask::new(Source::Web, "q");
        let created = task.timestamp();
        task.start().unwrap();
        let started = task.timestamp();
        task.complete("r").unwrap();
        assert!(started >= created);
        assert!(task.timestamp() >= started);
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("GitHub".parse::<Source>().unwrap(), Source::Github);
        assert_eq!(" twitter ".parse::<Source>().unwrap(), Source::Twitter);
        assert_eq!("x".parse::<Source>().unwrap(), Source::Twitter);
        assert!("reddit".parse::<Source>().is_err());
    }

    #[test]
    fn test_task_serializes_lowercase_and_skips_absent_result() {
        let task = ResearchTask::with_id("1", Source::Github, "q");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["source"], "github");
        assert_eq!(json["status"], "pending");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_metadata_omits_result() {
        let mut task = ResearchTask::new(Source::Web, "docs");
        task.complete("long body").unwrap();
        let meta = TaskMetadata::from(&task);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["query"], "docs");
        assert_eq!(json["status"], "completed");
        assert!(json.get("result").is_none());
    }
}
