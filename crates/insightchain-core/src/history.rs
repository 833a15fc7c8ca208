use std::collections::VecDeque;

use chrono::Local;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::record::ResearchRecord;

/// Format of the human-facing label attached to each history entry.
pub const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed research run as remembered by the session.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub label: String,
    pub record: ResearchRecord,
}

/// Session-scoped, append-only log of completed research records.
///
/// Only successful runs are appended. With a capacity set, the oldest entry is
/// evicted once the log is full.
#[derive(Debug, Default)]
pub struct ResearchHistory {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: Option<usize>,
}

impl ResearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub async fn push(&self, record: ResearchRecord) {
        let label = record
            .timestamp
            .with_timezone(&Local)
            .format(LABEL_FORMAT)
            .to_string();
        let mut entries = self.entries.write().await;
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(HistoryEntry { label, record });
    }

    /// All entries, oldest first.
    pub async fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// The newest `n` entries, newest first.
    pub async fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().rev().take(n).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_record;

    #[tokio::test]
    async fn unbounded_history_keeps_everything_in_order() {
        let history = ResearchHistory::new();
        for query in ["a", "b", "c"] {
            history.push(sample_record(query)).await;
        }

        let queries: Vec<_> = history
            .snapshot()
            .await
            .into_iter()
            .map(|entry| entry.record.query)
            .collect();
        assert_eq!(queries, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn bounded_history_evicts_oldest() {
        let history = ResearchHistory::with_capacity(2);
        for query in ["a", "b", "c"] {
            history.push(sample_record(query)).await;
        }

        assert_eq!(history.len().await, 2);
        let recent: Vec<_> = history
            .recent(5)
            .await
            .into_iter()
            .map(|entry| entry.record.query)
            .collect();
        assert_eq!(recent, ["c", "b"]);
    }

    #[tokio::test]
    async fn zero_capacity_records_nothing() {
        let history = ResearchHistory::with_capacity(0);
        history.push(sample_record("a")).await;
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn labels_use_wall_clock_format() {
        let history = ResearchHistory::new();
        history.push(sample_record("a")).await;
        let label = &history.snapshot().await[0].label;
        assert!(chrono::NaiveDateTime::parse_from_str(label, LABEL_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let history = ResearchHistory::new();
        history.push(sample_record("a")).await;
        history.clear().await;
        assert_eq!(history.len().await, 0);
    }
}
