//! Scripted stand-ins for the text-generation and web-search services.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use insightchain_core::{GenerationError, SearchError, TextGeneration, WebSearch};

type Reply = dyn Fn(usize, &str) -> Result<String, GenerationError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
}

/// Generator whose reply is computed from the call index and user instruction.
pub struct ScriptedGenerator {
    reply: Box<Reply>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(usize, &str) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies `"R:" + first ten characters of the user instruction`.
    pub fn prefix_echo() -> Self {
        Self::new(|_, user| Ok(format!("R:{}", user.chars().take(10).collect::<String>())))
    }

    /// Replies with a distinct body per call: `response-<index>`.
    pub fn numbered() -> Self {
        Self::new(|idx, _| Ok(format!("response-{idx}")))
    }

    pub fn always_failing() -> Self {
        Self::new(|_, _| Err(GenerationError::Authentication { status: 401 }))
    }

    /// Fails on the call with index `failing_call` (zero based).
    pub fn failing_at(failing_call: usize) -> Self {
        Self::new(move |idx, _| {
            if idx == failing_call {
                Err(GenerationError::Upstream {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(format!("response-{idx}"))
            }
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGeneration for ScriptedGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let idx = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                system: system.to_string(),
                user: user.to_string(),
            });
            calls.len() - 1
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(idx, user)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Search returning a fixed blob, or failing with `NoResults`.
pub struct FixedSearch {
    reply: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    pub fn ok(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            reply: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FixedSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.reply.clone().ok_or_else(|| SearchError::NoResults {
            query: query.to_string(),
        })
    }
}
