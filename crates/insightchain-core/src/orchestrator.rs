//! Sequential four-stage research pipeline.
//!
//! Runs gather → analyze → summarize → insights for one query, threading each
//! stage's output into the next, and records successful runs in the
//! session history.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::agent::{Agent, AgentResult};
use crate::capability::{TextGeneration, WebSearch};
use crate::config::{Config, SearchProvider};
use crate::error::{ConfigurationError, ResearchError};
use crate::events::{EventCollector, PipelineStage};
use crate::history::{HistoryEntry, ResearchHistory};
use crate::llm::ChatCompletionsClient;
use crate::metrics;
use crate::profile::Role;
use crate::record::{ResearchRecord, ResearchResults};
use crate::search::{DuckDuckGoSearch, SearxngSearch};

pub const ANALYSIS_PREFIX: &str = "Analyze this information: ";
pub const SUMMARY_PREFIX: &str = "Summarize research on: ";
pub const INSIGHTS_PREFIX: &str = "Generate insights for: ";

/// Informational agent status. Agents hold no runtime state, so every role
/// always reports `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
        }
    }
}

/// Owns the four role agents and the session's research history.
pub struct ResearchOrchestrator {
    gatherer: Agent,
    analyzer: Agent,
    summarizer: Agent,
    insight_generator: Agent,
    history: ResearchHistory,
    events: Option<EventCollector>,
    deadline: Option<Duration>,
}

impl ResearchOrchestrator {
    /// Build the four agents over one shared generator; only the gatherer searches.
    pub fn new(generator: Arc<dyn TextGeneration>, search: Arc<dyn WebSearch>) -> Self {
        Self {
            gatherer: Agent::gatherer(generator.clone(), search),
            analyzer: Agent::analyzer(generator.clone()),
            summarizer: Agent::summarizer(generator.clone()),
            insight_generator: Agent::insight_generator(generator),
            history: ResearchHistory::new(),
            events: None,
            deadline: None,
        }
    }

    /// Build HTTP-backed capabilities from configuration.
    ///
    /// Fails with [`ConfigurationError::MissingCredential`] when no
    /// text-generation key is available.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let api_key = config.llm_api_key()?;
        let generator = ChatCompletionsClient::new(
            config.llm_base_url(),
            api_key,
            config.generation_settings(),
            config.request_timeout(),
        )?;

        let search: Arc<dyn WebSearch> = match config.search.provider {
            SearchProvider::Duckduckgo => match &config.search.endpoint {
                Some(endpoint) => Arc::new(DuckDuckGoSearch::with_endpoint(
                    endpoint.clone(),
                    config.search.timeout(),
                    config.search.max_results,
                )?),
                None => Arc::new(DuckDuckGoSearch::new(
                    config.search.timeout(),
                    config.search.max_results,
                )?),
            },
            SearchProvider::Searxng => {
                let endpoint = config.search.endpoint.clone().ok_or_else(|| {
                    ConfigurationError::Invalid(
                        "search.endpoint is required for the searxng provider".into(),
                    )
                })?;
                Arc::new(SearxngSearch::new(
                    endpoint,
                    config.search.timeout(),
                    config.search.max_results,
                )?)
            }
        };

        info!(
            provider = ?config.resolved_provider(),
            model = %generator.model(),
            search = ?config.search.provider,
            "research orchestrator configured"
        );

        let mut orchestrator = Self::new(Arc::new(generator), search);
        if let Some(capacity) = config.pipeline.max_history {
            orchestrator = orchestrator.with_history(ResearchHistory::with_capacity(capacity));
        }
        if let Some(deadline) = config.pipeline_deadline() {
            orchestrator = orchestrator.with_deadline(deadline);
        }
        Ok(orchestrator)
    }

    pub fn with_history(mut self, history: ResearchHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_events(mut self, events: EventCollector) -> Self {
        self.events = Some(events);
        self
    }

    /// Default deadline applied to every [`conduct_research`](Self::conduct_research) call.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Run the full pipeline for `query`.
    ///
    /// Empty queries are passed through unchanged. Any stage failure aborts
    /// the run and nothing is added to history.
    pub async fn conduct_research(&self, query: &str) -> Result<ResearchRecord, ResearchError> {
        let deadline = self.deadline.map(|budget| Instant::now() + budget);
        self.run_pipeline(query, deadline).await
    }

    /// Run the full pipeline under a deadline shared by all four stages.
    pub async fn conduct_research_with_deadline(
        &self,
        query: &str,
        budget: Duration,
    ) -> Result<ResearchRecord, ResearchError> {
        self.run_pipeline(query, Some(Instant::now() + budget)).await
    }

    #[instrument(name = "pipeline", skip(self, query), fields(query_len = query.len()))]
    async fn run_pipeline(
        &self,
        query: &str,
        deadline: Option<Instant>,
    ) -> Result<ResearchRecord, ResearchError> {
        info!(%query, "starting research");
        let started = std::time::Instant::now();

        match self.run_stages(query, deadline).await {
            Ok(results) => {
                let record = ResearchRecord::new(query, results);
                let duration_ms = started.elapsed().as_millis() as u64;

                self.history.push(record.clone()).await;
                metrics::record_pipeline_run("success", None);
                if let Some(events) = &self.events {
                    events.emit_completed(record.id, duration_ms);
                }
                info!(record_id = %record.id, duration_ms, "research completed");
                Ok(record)
            }
            Err(err) => {
                let stage = err.stage();
                metrics::record_pipeline_run("failure", Some(stage));
                if let Some(events) = &self.events {
                    events.emit_failed(stage, err.to_string());
                }
                warn!(%stage, error = %err, "research failed");
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        query: &str,
        deadline: Option<Instant>,
    ) -> Result<ResearchResults, ResearchError> {
        let information = self.run_stage(&self.gatherer, query, "", deadline).await?;

        let analysis = self
            .run_stage(
                &self.analyzer,
                &format!("{ANALYSIS_PREFIX}{query}"),
                &information.response,
                deadline,
            )
            .await?;

        // Summary and insights both draw on the same raw evidence; insights do
        // not chain off the summary.
        let combined = format!("{}\n\n{}", information.response, analysis.response);

        let summary = self
            .run_stage(
                &self.summarizer,
                &format!("{SUMMARY_PREFIX}{query}"),
                &combined,
                deadline,
            )
            .await?;

        let insights = self
            .run_stage(
                &self.insight_generator,
                &format!("{INSIGHTS_PREFIX}{query}"),
                &combined,
                deadline,
            )
            .await?;

        Ok(ResearchResults {
            information,
            analysis,
            summary,
            insights,
        })
    }

    async fn run_stage(
        &self,
        agent: &Agent,
        query: &str,
        context: &str,
        deadline: Option<Instant>,
    ) -> Result<AgentResult, ResearchError> {
        let role = agent.role();
        let stage = PipelineStage::for_role(role);
        if let Some(events) = &self.events {
            events.emit_stage_started(role);
        }
        let started = std::time::Instant::now();

        let outcome = match deadline {
            Some(at) => tokio::time::timeout_at(at, agent.process(query, context))
                .await
                .map_err(|_| ResearchError::DeadlineExceeded { stage })?,
            None => agent.process(query, context).await,
        };
        let result = outcome.map_err(|source| ResearchError::Stage { stage, source })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::record_stage_duration(stage, duration_ms);
        if let Some(events) = &self.events {
            events.emit_stage_finished(role, duration_ms);
        }
        Ok(result)
    }

    /// Status of every role, in pipeline order.
    pub fn get_agent_status(&self) -> Vec<(Role, AgentStatus)> {
        [
            &self.gatherer,
            &self.analyzer,
            &self.summarizer,
            &self.insight_generator,
        ]
        .into_iter()
        .map(|agent| (agent.role(), AgentStatus::Active))
        .collect()
    }

    pub fn agent(&self, role: Role) -> &Agent {
        match role {
            Role::Gatherer => &self.gatherer,
            Role::Analyzer => &self.analyzer,
            Role::Summarizer => &self.summarizer,
            Role::InsightGenerator => &self.insight_generator,
        }
    }

    /// History entries, oldest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.snapshot().await
    }

    /// The newest `n` history entries, newest first.
    pub async fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.recent(n).await
    }

    pub async fn history_len(&self) -> usize {
        self.history.len().await
    }

    pub async fn clear_history(&self) {
        self.history.clear().await;
    }
}
