//! Single sub-task execution.
//!
//! The executor turns a pending [`ResearchTask`] into a terminal one: it picks
//! the instruction template for the task's source, asks the gateway for text
//! and returns an updated copy. Gateway failures are absorbed into the
//! `failed` status; nothing is retried here and no shared state is touched.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{CapabilityTier, GenerationGateway};
use crate::types::{AppError, ResearchTask, Source};
use crate::utils::toml_config::{SwarmConfig, QUERY_PLACEHOLDER};

const TWITTER_TEMPLATE: &str = "Search Twitter/X for recent discussions about: {query}. \
Summarize the sentiment and key points from the last 30 days.";

const GITHUB_TEMPLATE: &str = "Search GitHub for repositories related to: {query}. \
List the top 3 repos with stars, description, and recent activity.";

const WEB_TEMPLATE: &str = "Search the web for: {query}. \
Provide a comprehensive summary from recent articles and documentation.";

/// Instruction templates keyed by source.
///
/// Sources without a template use the `web` template.
#[derive(Debug, Clone)]
pub struct SourceTemplates {
    templates: HashMap<Source, String>,
}

impl SourceTemplates {
    /// No source-specific templates; everything renders with the web template.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Built-in templates for every known source.
    pub fn builtin() -> Self {
        Self::empty()
            .with(Source::Twitter, TWITTER_TEMPLATE)
            .with(Source::Github, GITHUB_TEMPLATE)
            .with(Source::Web, WEB_TEMPLATE)
    }

    /// Built-ins overlaid with the `[templates]` table of the configuration.
    pub fn from_config(config: &SwarmConfig) -> Self {
        Source::ALL
            .iter()
            .fold(Self::builtin(), |templates, &source| {
                match config.get_template(source) {
                    Some(custom) => templates.with(source, custom),
                    None => templates,
                }
            })
    }

    pub fn with(mut self, source: Source, template: impl Into<String>) -> Self {
        self.templates.insert(source, template.into());
        self
    }

    /// Template for `source`, falling back to the web template.
    pub fn template_for(&self, source: Source) -> &str {
        self.templates
            .get(&source)
            .or_else(|| self.templates.get(&Source::Web))
            .map(|s| s.as_str())
            .unwrap_or(WEB_TEMPLATE)
    }

    pub fn render(&self, source: Source, query: &str) -> String {
        self.template_for(source).replace(QUERY_PLACEHOLDER, query)
    }
}

impl Default for SourceTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

pub struct TaskExecutor {
    gateway: Arc<dyn GenerationGateway>,
    templates: SourceTemplates,
}

impl TaskExecutor {
    pub fn new(gateway: Arc<dyn GenerationGateway>, templates: SourceTemplates) -> Self {
        Self { gateway, templates }
    }

    pub fn templates(&self) -> &SourceTemplates {
        &self.templates
    }

    /// Build the full instruction sent for `task`.
    pub fn build_prompt(&self, task: &ResearchTask, original_query: &str) -> String {
        let instruction = self.templates.render(task.source(), task.query());
        format!(
            "{}\n\nThis sub-query is part of broader research on: \"{}\"",
            instruction, original_query
        )
    }

    /// Run one task to a terminal status and return the updated copy.
    pub async fn execute(&self, mut task: ResearchTask, original_query: &str) -> ResearchTask {
        if let Err(e) = task.start() {
            warn!(task_id = task.id(), error = %e, "Skipping task that is not pending");
            return task;
        }

        let prompt = self.build_prompt(&task, original_query);
        debug!(task_id = task.id(), source = %task.source(), "Executing research task");

        let outcome = match self
            .gateway
            .generate_text(&prompt, CapabilityTier::SmallText)
            .await
        {
            Ok(text) if text.trim().is_empty() => {
                Err(AppError::Execution("gateway returned an empty reply".to_string()))
            }
            Ok(text) => Ok(text),
            Err(e) => Err(AppError::Execution(e.to_string())),
        };

        let transition = match outcome {
            Ok(text) => task.complete(text),
            Err(e) => {
                warn!(task_id = task.id(), source = %task.source(), error = %e, "Research task failed");
                task.fail()
            }
        };
        if let Err(e) = transition {
            warn!(task_id = task.id(), error = %e, "Could not record research task outcome");
        }

        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Result, TaskStatus};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rstest::rstest;

    struct TextGateway {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl TextGateway {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationGateway for TextGateway {
        async fn generate_structured(
            &self,
            _prompt: &str,
            _tier: CapabilityTier,
        ) -> Result<serde_json::Value> {
            unreachable!("execution only uses text generation")
        }

        async fn generate_text(&self, prompt: &str, tier: CapabilityTier) -> Result<String> {
            assert_eq!(tier, CapabilityTier::SmallText);
            self.prompts.lock().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| AppError::LLM("request timed out".to_string()))
        }
    }

    #[rstest]
    #[case(Source::Twitter, "Search Twitter/X for recent discussions about: rust")]
    #[case(Source::Github, "Search GitHub for repositories related to: rust")]
    #[case(Source::Web, "Search the web for: rust")]
    fn test_builtin_templates(#[case] source: Source, #[case] expected_prefix: &str) {
        let rendered = SourceTemplates::builtin().render(source, "rust");
        assert!(rendered.starts_with(expected_prefix), "{}", rendered);
    }

    #[test]
    fn test_missing_template_falls_back_to_web() {
        let templates = SourceTemplates::empty().with(Source::Web, "WEB {query}");
        assert_eq!(templates.render(Source::Github, "x"), "WEB x");
        assert!(SourceTemplates::empty()
            .render(Source::Twitter, "x")
            .starts_with("Search the web for: x"));
    }

    #[test]
    fn test_config_overrides() {
        let config =
            SwarmConfig::from_toml_str("[templates]\ngithub = \"Find crates for {query}\"\n")
                .unwrap();
        let templates = SourceTemplates::from_config(&config);
        assert_eq!(templates.render(Source::Github, "tokio"), "Find crates for tokio");
        assert!(templates.render(Source::Web, "tokio").starts_with("Search the web"));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let gateway = TextGateway::new(Some("three great repos"));
        let executor = TaskExecutor::new(gateway.clone(), SourceTemplates::default());
        let task = ResearchTask::new(Source::Github, "ai coding assistants");

        let done = executor.execute(task.clone(), "best AI coding tools").await;

        assert_eq!(done.id(), task.id());
        assert_eq!(done.source(), Source::Github);
        assert_eq!(done.status(), TaskStatus::Completed);
        assert_eq!(done.result(), Some("three great repos"));

        let prompt = gateway.prompts.lock()[0].clone();
        assert!(prompt.contains("ai coding assistants"));
        assert!(prompt.contains("best AI coding tools"));
    }

    #[tokio::test]
    async fn test_execute_failure_leaves_no_result() {
        let executor = TaskExecutor::new(TextGateway::new(None), SourceTemplates::default());
        let done = executor
            .execute(ResearchTask::new(Source::Twitter, "q"), "orig")
            .await;
        assert_eq!(done.status(), TaskStatus::Failed);
        assert!(done.result().is_none());
    }

    #[tokio::test]
    async fn test_blank_reply_is_failure() {
        let executor = TaskExecutor::new(TextGateway::new(Some("  \n")), SourceTemplates::default());
        let done = executor.execute(ResearchTask::new(Source::Web, "q"), "orig").await;
        assert_eq!(done.status(), TaskStatus::Failed);
    }

    #[rstest]
    #[case(Some("findings"), TaskStatus::Completed)]
    #[case(None, TaskStatus::Failed)]
    #[tokio::test]
    async fn test_outcome_is_always_recorded(
        #[case] reply: Option<&str>,
        #[case] expected: TaskStatus,
    ) {
        let executor = TaskExecutor::new(TextGateway::new(reply), SourceTemplates::default());
        let task = ResearchTask::new(Source::Github, "q");
        let created = task.timestamp();

        let done = executor.execute(task, "orig").await;
        assert_eq!(done.status(), expected);
        assert!(done.is_terminal());
        assert!(done.timestamp() >= created);
    }

    #[tokio::test]
    async fn test_running_task_is_not_executed_again() {
        let gateway = TextGateway::new(Some("new"));
        let executor = TaskExecutor::new(gateway.clone(), SourceTemplates::default());
        let mut task = ResearchTask::new(Source::Web, "q");
        task.start().unwrap();

        let out = executor.execute(task, "orig").await;
        assert_eq!(out.status(), TaskStatus::Running);
        assert!(gateway.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_task_is_returned_untouched() {
        let gateway = TextGateway::new(Some("new"));
        let executor = TaskExecutor::new(gateway.clone(), SourceTemplates::default());
        let mut task = ResearchTask::new(Source::Web, "q");
        task.complete("old").unwrap();

        let out = executor.execute(task, "orig").await;
        assert_eq!(out.result(), Some("old"));
        assert!(gateway.prompts.lock().is_empty());
    }
}
