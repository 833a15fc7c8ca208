//! Pipeline progress events.
//!
//! The orchestrator publishes every state transition through an optional
//! [`EventCollector`] so drivers can render progress while a run is in flight.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::profile::Role;

/// Per-invocation pipeline state.
///
/// `Start → Gathering → Analyzing → Summarizing → Insights → Done`; any
/// working stage may move to `Failed`. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Gathering,
    Analyzing,
    Summarizing,
    Insights,
    Done,
    Failed,
}

impl PipelineStage {
    /// Working stage in which `role` runs.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Gatherer => PipelineStage::Gathering,
            Role::Analyzer => PipelineStage::Analyzing,
            Role::Summarizer => PipelineStage::Summarizing,
            Role::InsightGenerator => PipelineStage::Insights,
        }
    }

    /// Next state on success. Terminal states stay put.
    pub fn advance(self) -> Self {
        match self {
            PipelineStage::Start => PipelineStage::Gathering,
            PipelineStage::Gathering => PipelineStage::Analyzing,
            PipelineStage::Analyzing => PipelineStage::Summarizing,
            PipelineStage::Summarizing => PipelineStage::Insights,
            PipelineStage::Insights | PipelineStage::Done => PipelineStage::Done,
            PipelineStage::Failed => PipelineStage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::Gathering => "gathering",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Summarizing => "summarizing",
            PipelineStage::Insights => "insights",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: PipelineStage,
        role: Role,
        timestamp: DateTime<Utc>,
    },
    StageFinished {
        stage: PipelineStage,
        role: Role,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    PipelineFailed {
        stage: PipelineStage,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    PipelineCompleted {
        record_id: uuid::Uuid,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PipelineEvent::StageStarted { timestamp, .. }
            | PipelineEvent::StageFinished { timestamp, .. }
            | PipelineEvent::PipelineFailed { timestamp, .. }
            | PipelineEvent::PipelineCompleted { timestamp, .. } => *timestamp,
        }
    }
}

/// Sender half handed to the orchestrator.
#[derive(Clone)]
pub struct EventCollector {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventCollector {
    /// Create a new event collector
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit_stage_started(&self, role: Role) {
        self.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::for_role(role),
            role,
            timestamp: Utc::now(),
        });
    }

    pub fn emit_stage_finished(&self, role: Role, duration_ms: u64) {
        self.emit(PipelineEvent::StageFinished {
            stage: PipelineStage::for_role(role),
            role,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn emit_failed(&self, stage: PipelineStage, reason: String) {
        self.emit(PipelineEvent::PipelineFailed {
            stage,
            reason,
            timestamp: Utc::now(),
        });
    }

    pub fn emit_completed(&self, record_id: uuid::Uuid, duration_ms: u64) {
        self.emit(PipelineEvent::PipelineCompleted {
            record_id,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!(error = %e, "failed to emit pipeline event");
        }
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_pipeline_order() {
        let mut stage = PipelineStage::Start;
        let mut seen = vec![stage];
        while !stage.is_terminal() {
            stage = stage.advance();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Start,
                PipelineStage::Gathering,
                PipelineStage::Analyzing,
                PipelineStage::Summarizing,
                PipelineStage::Insights,
                PipelineStage::Done,
            ]
        );
        assert_eq!(PipelineStage::Failed.advance(), PipelineStage::Failed);
    }

    #[test]
    fn role_stages_line_up() {
        let stages: Vec<_> = Role::PIPELINE
            .iter()
            .map(|role| PipelineStage::for_role(*role))
            .collect();
        let mut expected = Vec::new();
        let mut stage = PipelineStage::Start.advance();
        for _ in 0..4 {
            expected.push(stage);
            stage = stage.advance();
        }
        assert_eq!(stages, expected);
    }

    #[tokio::test]
    async fn collector_delivers_events_in_order() {
        let (collector, mut receiver) = EventCollector::new();

        collector.emit_stage_started(Role::Gatherer);
        collector.emit_stage_finished(Role::Gatherer, 12);
        drop(collector);

        match receiver.recv().await.unwrap() {
            PipelineEvent::StageStarted { stage, role, .. } => {
                assert_eq!(stage, PipelineStage::Gathering);
                assert_eq!(role, Role::Gatherer);
            }
            other => panic!("expected StageStarted, got {other:?}"),
        }
        match receiver.recv().await.unwrap() {
            PipelineEvent::StageFinished { duration_ms, .. } => assert_eq!(duration_ms, 12),
            other => panic!("expected StageFinished, got {other:?}"),
        }
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (collector, receiver) = EventCollector::new();
        drop(receiver);
        collector.emit_failed(PipelineStage::Analyzing, "boom".into());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let (collector, mut receiver) = EventCollector::new();
        collector.emit_stage_started(Role::InsightGenerator);
        let event = receiver.try_recv().unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage_started");
        assert_eq!(json["stage"], "insights");
        assert_eq!(json["role"], "insight_generator");
    }
}
