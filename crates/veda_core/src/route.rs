use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five production agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    Teach,
    Practice,
    Challenge,
    Wellbeing,
    Plan,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Teach => "teach",
            AgentName::Practice => "practice",
            AgentName::Challenge => "challenge",
            AgentName::Wellbeing => "wellbeing",
            AgentName::Plan => "plan",
        }
    }

    pub fn all() -> [AgentName; 5] {
        [
            AgentName::Teach,
            AgentName::Practice,
            AgentName::Challenge,
            AgentName::Wellbeing,
            AgentName::Plan,
        ]
    }
}

impl FromStr for AgentName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "teach" => Ok(AgentName::Teach),
            "practice" => Ok(AgentName::Practice),
            "challenge" => Ok(AgentName::Challenge),
            "wellbeing" => Ok(AgentName::Wellbeing),
            "plan" => Ok(AgentName::Plan),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a turn is routed: an agent, or session closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    Agent(AgentName),
    Finish,
}

impl RouteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::Agent(a) => a.as_str(),
            RouteTarget::Finish => "finish",
        }
    }
}

/// Which routing stage produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Slash,
    Rule,
    Llm,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub target: RouteTarget,
    pub reason: String,
    pub confidence: f64,
    pub source: RouteSource,
}

impl RouteDecision {
    pub fn new(
        target: RouteTarget,
        reason: impl Into<String>,
        confidence: f64,
        source: RouteSource,
    ) -> Self {
        Self {
            target,
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    pub fn slash(agent: AgentName, reason: impl Into<String>) -> Self {
        Self::new(RouteTarget::Agent(agent), reason, 1.0, RouteSource::Slash)
    }

    pub fn rule(target: RouteTarget, reason: impl Into<String>, confidence: f64) -> Self {
        Self::new(target, reason, confidence, RouteSource::Rule)
    }

    pub fn default_teach(reason: impl Into<String>) -> Self {
        Self::new(
            RouteTarget::Agent(AgentName::Teach),
            reason,
            0.5,
            RouteSource::Default,
        )
    }
}
