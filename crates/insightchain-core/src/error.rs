use std::path::PathBuf;

use thiserror::Error;

use crate::events::PipelineStage;
use crate::profile::Role;

/// Raised while building agents from configuration. Fatal: no agent can be built.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no text-generation credential configured (set GROQ_API_KEY or OPENAI_API_KEY)")]
    MissingCredential,
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("I/O error while reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl ConfigurationError {
    pub fn io(path: PathBuf, source: std::io::Error) -> Self {
        Self::Io { path, source }
    }
}

/// Failure of the web-search capability.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("web search timed out")]
    Timeout,
    #[error("web search returned no results for {query:?}")]
    NoResults { query: String },
    #[error("web search transport failure: {0}")]
    Transport(String),
    #[error("web search endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed web search payload: {0}")]
    MalformedResponse(String),
}

/// Failure of the text-generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation rejected credentials ({status})")]
    Authentication { status: u16 },
    #[error("text generation timed out")]
    Timeout,
    #[error("text generation transport failure: {0}")]
    Transport(String),
    #[error("text generation endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed text generation payload: {0}")]
    MalformedResponse(String),
    #[error("text generation returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Error surfaced by a single agent call, tagged with the role that failed.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{role} search failed: {source}")]
    Search {
        role: Role,
        #[source]
        source: SearchError,
    },
    #[error("{role} generation failed: {source}")]
    Generation {
        role: Role,
        #[source]
        source: GenerationError,
    },
    #[error("{role} is configured without a web-search capability")]
    SearchUnavailable { role: Role },
}

impl AgentError {
    pub fn role(&self) -> Role {
        match self {
            Self::Search { role, .. }
            | Self::Generation { role, .. }
            | Self::SearchUnavailable { role } => *role,
        }
    }
}

/// Coarse classification of a failed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Search,
    Generation,
    Deadline,
}

/// Failure of a whole `conduct_research` call. No partial record survives it.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("research aborted during {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: AgentError,
    },
    #[error("research deadline exceeded during {stage}")]
    DeadlineExceeded { stage: PipelineStage },
}

impl ResearchError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Stage { stage, .. } | Self::DeadlineExceeded { stage } => *stage,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stage {
                source: AgentError::Generation { .. },
                ..
            } => ErrorKind::Generation,
            Self::Stage { .. } => ErrorKind::Search,
            Self::DeadlineExceeded { .. } => ErrorKind::Deadline,
        }
    }
}
