use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentResult;
use crate::profile::Role;

/// The four stage outputs of one run. Field order is execution order and is
/// the order used when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResults {
    pub information: AgentResult,
    pub analysis: AgentResult,
    pub summary: AgentResult,
    pub insights: AgentResult,
}

impl ResearchResults {
    pub fn get(&self, role: Role) -> &AgentResult {
        match role {
            Role::Gatherer => &self.information,
            Role::Analyzer => &self.analysis,
            Role::Summarizer => &self.summary,
            Role::InsightGenerator => &self.insights,
        }
    }

    /// `(stage key, result)` pairs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AgentResult)> + '_ {
        Role::PIPELINE
            .into_iter()
            .map(move |role| (role.stage_key(), self.get(role)))
    }
}

/// Aggregated, immutable result of one full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub id: Uuid,
    pub query: String,
    pub results: ResearchResults,
    pub timestamp: DateTime<Utc>,
    pub agents_used: Vec<String>,
}

impl ResearchRecord {
    pub(crate) fn new(query: &str, results: ResearchResults) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            results,
            timestamp: Utc::now(),
            agents_used: Role::PIPELINE
                .iter()
                .map(|role| role.key().to_string())
                .collect(),
        }
    }

    /// Render the record as a markdown report, one section per stage.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Research: {}\n\n", self.query);
        out.push_str(&format!(
            "_Completed {} by {}_\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.agents_used.join(", ")
        ));
        for (key, result) in self.results.iter() {
            out.push_str(&format!(
                "\n## {} ({})\n\n{}\n",
                section_title(key),
                result.agent,
                result.response.trim_end()
            ));
        }
        out
    }
}

fn section_title(stage_key: &str) -> &'static str {
    match stage_key {
        "information" => "Information Gathering Results",
        "analysis" => "Data Analysis Results",
        "summary" => "Executive Summary",
        "insights" => "Strategic Insights",
        _ => "Results",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn result(role: Role, response: &str) -> AgentResult {
        let profile = role.profile();
        AgentResult {
            agent: profile.agent_name.to_string(),
            role: profile.role_description.to_string(),
            query: "q".to_string(),
            response: response.to_string(),
            search_results: None,
            kind_tag: profile.kind_tag.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn sample_record(query: &str) -> ResearchRecord {
        ResearchRecord::new(
            query,
            ResearchResults {
                information: result(Role::Gatherer, "facts"),
                analysis: result(Role::Analyzer, "patterns"),
                summary: result(Role::Summarizer, "short"),
                insights: result(Role::InsightGenerator, "next steps"),
            },
        )
    }

    #[test]
    fn results_serialize_in_execution_order() {
        let record = sample_record("cats");
        let json = serde_json::to_string(&record.results).unwrap();
        let positions: Vec<_> = ["\"information\"", "\"analysis\"", "\"summary\"", "\"insights\""]
            .iter()
            .map(|key| json.find(key).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn agents_used_is_fixed() {
        let record = sample_record("anything at all");
        assert_eq!(
            record.agents_used,
            ["gatherer", "analyzer", "summarizer", "insight_generator"]
        );
    }

    #[test]
    fn markdown_has_one_section_per_stage() {
        let markdown = sample_record("cats").to_markdown();
        assert!(markdown.starts_with("# Research: cats"));
        assert_eq!(markdown.matches("\n## ").count(), 4);
        assert!(markdown.contains("## Strategic Insights (InsightGen)\n\nnext steps"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = sample_record("cats");
        let json = serde_json::to_string(&record).unwrap();
        let back: ResearchRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
