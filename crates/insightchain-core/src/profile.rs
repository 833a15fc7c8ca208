//! Static prompt configuration for the four research roles.
//!
//! Roles are data: each one is a [`PromptProfile`] value bound to the single
//! [`Agent`](crate::Agent) type, not a distinct agent implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed role set of the research pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Gatherer,
    Analyzer,
    Summarizer,
    InsightGenerator,
}

impl Role {
    pub const PIPELINE: [Role; 4] = [
        Role::Gatherer,
        Role::Analyzer,
        Role::Summarizer,
        Role::InsightGenerator,
    ];

    /// Identifier used in `agents_used` and agent status listings.
    pub fn key(self) -> &'static str {
        match self {
            Role::Gatherer => "gatherer",
            Role::Analyzer => "analyzer",
            Role::Summarizer => "summarizer",
            Role::InsightGenerator => "insight_generator",
        }
    }

    /// Key under which the role's result is stored in a research record.
    pub fn stage_key(self) -> &'static str {
        match self {
            Role::Gatherer => "information",
            Role::Analyzer => "analysis",
            Role::Summarizer => "summary",
            Role::InsightGenerator => "insights",
        }
    }

    pub fn profile(self) -> &'static PromptProfile {
        PromptProfile::for_role(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Role name, persona and response-shaping template for one agent.
#[derive(Debug)]
pub struct PromptProfile {
    pub role: Role,
    pub agent_name: &'static str,
    pub role_description: &'static str,
    pub system_instruction: &'static str,
    pub kind_tag: Option<&'static str>,
    request_label: &'static str,
    context_label: &'static str,
    preamble: &'static str,
    sections: &'static [&'static str],
    closing: Option<&'static str>,
}

impl PromptProfile {
    pub fn for_role(role: Role) -> &'static PromptProfile {
        match role {
            Role::Gatherer => &GATHERER,
            Role::Analyzer => &ANALYZER,
            Role::Summarizer => &SUMMARIZER,
            Role::InsightGenerator => &INSIGHT_GENERATOR,
        }
    }

    /// Section headings the role asks the model to cover, in order.
    pub fn sections(&self) -> &'static [&'static str] {
        self.sections
    }

    /// Build the user-level instruction for one call.
    ///
    /// `search_results` is only embedded when present; the gatherer always
    /// supplies it.
    pub fn render(&self, query: &str, context: &str, search_results: Option<&str>) -> String {
        let mut out = format!(
            "{}: {query}\n{}: {context}\n",
            self.request_label, self.context_label
        );
        if let Some(results) = search_results {
            out.push_str(&format!("Search Results: {results}\n"));
        }
        out.push('\n');
        out.push_str(self.preamble);
        out.push('\n');
        for (idx, section) in self.sections.iter().enumerate() {
            out.push_str(&format!("{}. {section}\n", idx + 1));
        }
        if let Some(closing) = self.closing {
            out.push('\n');
            out.push_str(closing);
            out.push('\n');
        }
        out
    }
}

static GATHERER: PromptProfile = PromptProfile {
    role: Role::Gatherer,
    agent_name: "InfoGatherer",
    role_description: "Information Gathering Specialist",
    system_instruction: "You are InfoGatherer, an expert at finding and collecting comprehensive information on any topic.
Your role is to:
1. Search for relevant information from multiple sources
2. Gather facts, statistics, and key details
3. Organize information in a structured format
4. Identify gaps in information that need further research

Always provide factual, well-sourced information.",
    kind_tag: None,
    request_label: "Research Topic",
    context_label: "Context",
    preamble: "Please provide a comprehensive overview of this topic, including:",
    sections: &[
        "Key facts and statistics",
        "Important details and context",
        "Current trends or developments",
        "Areas that need further investigation",
    ],
    closing: Some("Format your response as structured information."),
};

static ANALYZER: PromptProfile = PromptProfile {
    role: Role::Analyzer,
    agent_name: "DataAnalyzer",
    role_description: "Data Analysis Specialist",
    system_instruction: "You are DataAnalyzer, an expert at analyzing information and extracting meaningful insights.
Your role is to:
1. Analyze provided information for patterns and trends
2. Identify key relationships and correlations
3. Provide statistical insights where applicable
4. Highlight important implications and conclusions

Focus on analytical depth and critical thinking.",
    kind_tag: Some("comprehensive"),
    request_label: "Analysis Request",
    context_label: "Context to Analyze",
    preamble: "Please provide a detailed analysis including:",
    sections: &[
        "Key patterns and trends identified",
        "Statistical insights and correlations",
        "Critical evaluation of the information",
        "Implications and conclusions",
        "Areas requiring further investigation",
    ],
    closing: None,
};

static SUMMARIZER: PromptProfile = PromptProfile {
    role: Role::Summarizer,
    agent_name: "SummaryGen",
    role_description: "Summary Generation Specialist",
    system_instruction: "You are SummaryGen, an expert at creating clear, concise, and comprehensive summaries.
Your role is to:
1. Synthesize complex information into digestible summaries
2. Maintain accuracy while improving readability
3. Highlight the most important points
4. Create executive summaries for decision-making

Focus on clarity and completeness.",
    kind_tag: Some("comprehensive"),
    request_label: "Summary Request",
    context_label: "Information to Summarize",
    preamble: "Please create a comprehensive summary including:",
    sections: &[
        "Executive summary (2-3 sentences)",
        "Key points and findings",
        "Important details and context",
        "Conclusions and recommendations",
    ],
    closing: None,
};

static INSIGHT_GENERATOR: PromptProfile = PromptProfile {
    role: Role::InsightGenerator,
    agent_name: "InsightGen",
    role_description: "Insight Generation Specialist",
    system_instruction: "You are InsightGen, an expert at generating actionable insights and strategic recommendations.
Your role is to:
1. Identify strategic implications and opportunities
2. Provide actionable recommendations
3. Suggest next steps and future considerations
4. Highlight potential risks and challenges

Focus on practical value and strategic thinking.",
    kind_tag: Some("strategic"),
    request_label: "Insight Request",
    context_label: "Research Context",
    preamble: "Please provide strategic insights including:",
    sections: &[
        "Key opportunities and implications",
        "Actionable recommendations",
        "Potential risks and challenges",
        "Strategic next steps",
        "Future considerations and trends",
    ],
    closing: None,
};
