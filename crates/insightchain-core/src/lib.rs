//! InsightChain core: a fixed four-stage research pipeline over a hosted
//! language model and a web-search service.
//!
//! A [`ResearchOrchestrator`] runs the gatherer, analyzer, summarizer and
//! insight-generator agents strictly in sequence, threading each stage's
//! output into the next, and keeps an in-memory history of completed runs.

mod agent;
mod capability;
mod config;
mod error;
mod events;
mod history;
mod llm;
pub mod metrics;
mod orchestrator;
mod profile;
mod record;
mod search;
mod security;
mod telemetry;

pub use agent::{Agent, AgentResult, SEARCH_SUFFIX};
pub use capability::{GenerationSettings, TextGeneration, WebSearch};
pub use config::{
    Config, ConfigLoader, LlmConfig, LoggingConfig, PipelineConfig, SearchConfig, SearchProvider,
};
pub use error::{
    AgentError, ConfigurationError, ErrorKind, GenerationError, ResearchError, SearchError,
};
pub use events::{EventCollector, PipelineEvent, PipelineStage};
pub use history::{HistoryEntry, LABEL_FORMAT, ResearchHistory};
pub use llm::{ChatCompletionsClient, GROQ_API_BASE, LlmProvider, OPENAI_API_BASE};
pub use orchestrator::{
    ANALYSIS_PREFIX, AgentStatus, INSIGHTS_PREFIX, ResearchOrchestrator, SUMMARY_PREFIX,
};
pub use profile::{PromptProfile, Role};
pub use record::{ResearchRecord, ResearchResults};
pub use search::{DEFAULT_MAX_RESULTS, DUCKDUCKGO_HTML_ENDPOINT, DuckDuckGoSearch, SearxngSearch};
pub use security::{SecretValue, require_env};
pub use telemetry::{TelemetryOptions, init_telemetry};
