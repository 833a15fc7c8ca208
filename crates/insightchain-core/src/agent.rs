//! Single-stage research worker.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::capability::{TextGeneration, WebSearch};
use crate::error::{AgentError, GenerationError};
use crate::profile::{PromptProfile, Role};

/// Suffix appended to the query for the gatherer's web search.
pub const SEARCH_SUFFIX: &str = " comprehensive information";

/// Output of one agent call. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: String,
    pub role: String,
    pub query: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind_tag: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A [`PromptProfile`] bound to the shared capabilities.
#[derive(Clone)]
pub struct Agent {
    profile: &'static PromptProfile,
    generator: Arc<dyn TextGeneration>,
    search: Option<Arc<dyn WebSearch>>,
}

impl Agent {
    pub fn new(role: Role, generator: Arc<dyn TextGeneration>) -> Self {
        Self {
            profile: PromptProfile::for_role(role),
            generator,
            search: None,
        }
    }

    pub fn gatherer(generator: Arc<dyn TextGeneration>, search: Arc<dyn WebSearch>) -> Self {
        Self::new(Role::Gatherer, generator).with_search(search)
    }

    pub fn analyzer(generator: Arc<dyn TextGeneration>) -> Self {
        Self::new(Role::Analyzer, generator)
    }

    pub fn summarizer(generator: Arc<dyn TextGeneration>) -> Self {
        Self::new(Role::Summarizer, generator)
    }

    pub fn insight_generator(generator: Arc<dyn TextGeneration>) -> Self {
        Self::new(Role::InsightGenerator, generator)
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn profile(&self) -> &'static PromptProfile {
        self.profile
    }

    /// Run this role once against `query` and the accumulated `context`.
    ///
    /// Only the gatherer searches the web. Failures from either capability
    /// are returned as-is, tagged with the role; nothing is retried.
    #[instrument(
        name = "agent.process",
        skip(self, query, context),
        fields(role = %self.profile.role, query_len = query.len(), context_len = context.len())
    )]
    pub async fn process(&self, query: &str, context: &str) -> Result<AgentResult, AgentError> {
        let role = self.profile.role;

        let search_results = if role == Role::Gatherer {
            let search = self
                .search
                .as_ref()
                .ok_or(AgentError::SearchUnavailable { role })?;
            let results = search
                .search(&format!("{query}{SEARCH_SUFFIX}"))
                .await
                .map_err(|source| AgentError::Search { role, source })?;
            Some(results)
        } else {
            None
        };

        let instruction = self
            .profile
            .render(query, context, search_results.as_deref());
        debug!(instruction_len = instruction.len(), "prompt composed");

        let response = self
            .generator
            .generate(self.profile.system_instruction, &instruction)
            .await
            .map_err(|source| AgentError::Generation { role, source })?;

        if response.trim().is_empty() {
            return Err(AgentError::Generation {
                role,
                source: GenerationError::EmptyResponse,
            });
        }

        Ok(AgentResult {
            agent: self.profile.agent_name.to_string(),
            role: self.profile.role_description.to_string(),
            query: query.to_string(),
            response,
            search_results,
            kind_tag: self.profile.kind_tag.map(str::to_string),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TextGeneration for Recorder {
        async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(format!("generated for {}", user.len()))
        }

        fn model(&self) -> &str {
            "recorder"
        }
    }

    struct FixedSearch(Result<&'static str, ()>, Mutex<Vec<String>>);

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, query: &str) -> Result<String, SearchError> {
            self.1.lock().unwrap().push(query.to_string());
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(SearchError::NoResults {
                    query: query.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn gatherer_searches_and_keeps_results() {
        let generator = Arc::new(Recorder::default());
        let search = Arc::new(FixedSearch(Ok("S:ok"), Mutex::new(Vec::new())));
        let agent = Agent::gatherer(generator.clone(), search.clone());

        let result = agent.process("cats", "").await.expect("gatherer should succeed");

        assert_eq!(
            search.1.lock().unwrap().as_slice(),
            ["cats comprehensive information"]
        );
        assert_eq!(result.search_results.as_deref(), Some("S:ok"));
        assert_eq!(result.agent, "InfoGatherer");
        assert_eq!(result.role, "Information Gathering Specialist");
        assert_eq!(result.kind_tag, None);

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PromptProfile::for_role(Role::Gatherer).system_instruction);
        assert!(calls[0].1.contains("Search Results: S:ok"));
    }

    #[tokio::test]
    async fn analyzer_never_searches() {
        let generator = Arc::new(Recorder::default());
        let search = Arc::new(FixedSearch(Ok("unused"), Mutex::new(Vec::new())));
        let agent = Agent::analyzer(generator.clone()).with_search(search.clone());

        let result = agent.process("q", "some context").await.unwrap();

        assert!(search.1.lock().unwrap().is_empty());
        assert_eq!(result.search_results, None);
        assert_eq!(result.kind_tag.as_deref(), Some("comprehensive"));
        assert!(generator.calls.lock().unwrap()[0].1.contains("Context to Analyze: some context"));
    }

    #[tokio::test]
    async fn search_failure_skips_generation() {
        let generator = Arc::new(Recorder::default());
        let search = Arc::new(FixedSearch(Err(()), Mutex::new(Vec::new())));
        let agent = Agent::gatherer(generator.clone(), search);

        let err = agent.process("cats", "").await.unwrap_err();

        assert!(matches!(
            err,
            AgentError::Search {
                role: Role::Gatherer,
                source: SearchError::NoResults { .. }
            }
        ));
        assert!(generator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gatherer_without_search_is_rejected() {
        let agent = Agent::new(Role::Gatherer, Arc::new(Recorder::default()));
        let err = agent.process("cats", "").await.unwrap_err();
        assert!(matches!(err, AgentError::SearchUnavailable { role: Role::Gatherer }));
    }

    struct Blank;

    #[async_trait]
    impl TextGeneration for Blank {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerationError> {
            Ok("  \n".to_string())
        }

        fn model(&self) -> &str {
            "blank"
        }
    }

    #[tokio::test]
    async fn blank_generation_is_an_error() {
        let agent = Agent::summarizer(Arc::new(Blank));
        let err = agent.process("q", "ctx").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Generation {
                role: Role::Summarizer,
                source: GenerationError::EmptyResponse
            }
        ));
    }
}
