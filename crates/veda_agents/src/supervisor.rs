//! Turn routing: slash commands, closure detection, a priority rule table,
//! and an LLM fallback for everything else.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use veda_core::{AgentName, RouteDecision, RouteSource, RouteTarget, TurnState};
use veda_llms::{ChatMessage, GenerateRequest, Provider};

use crate::fixed::{is_closure, normalize};

/// Routing decisions below this confidence clamp to the default agent.
const MIN_LLM_CONFIDENCE: f64 = 0.5;

/// `(phrases, target, reason)` evaluated in priority order; first match
/// wins. Single-word phrases match on word boundaries.
const RULE_TABLE: &[(&[&str], RouteTarget, &str)] = &[
    (
        &[
            "stressed", "stress", "anxious", "anxiety", "scared", "overwhelmed", "nervous",
            "panic", "pressure", "cry",
        ],
        RouteTarget::Agent(AgentName::Wellbeing),
        "stress vocabulary",
    ),
    (
        &[
            "schedule", "study plan", "exam date", "syllabus", "revision", "timetable",
            "time table", "how am i doing", "my progress",
        ],
        RouteTarget::Agent(AgentName::Plan),
        "scheduling vocabulary",
    ),
    (
        &["mock test", "board exam", "80 marks", "sample paper"],
        RouteTarget::Agent(AgentName::Plan),
        "exam preparation vocabulary",
    ),
    (
        &["hard question", "challenge", "difficult question", "tough question", "harder"],
        RouteTarget::Agent(AgentName::Challenge),
        "challenge vocabulary",
    ),
    (
        &["practice", "question", "test", "quiz", "solve", "attempt"],
        RouteTarget::Agent(AgentName::Practice),
        "practice vocabulary",
    ),
    // acknowledgments stay with the teach agent; explicitly never `finish`
    (
        &[
            "thank", "thanks", "hello", "hi", "hey", "good morning", "good evening",
            "namaste", "kaise ho", "ok", "okay", "got it",
        ],
        RouteTarget::Agent(AgentName::Teach),
        "greeting or acknowledgment",
    ),
];

/// Slash-command overrides; unknown tokens fall through to normal routing.
fn slash_target(token: &str) -> Option<RouteTarget> {
    match token {
        "/test" => Some(RouteTarget::Agent(AgentName::Practice)),
        "/spark" => Some(RouteTarget::Agent(AgentName::Challenge)),
        "/chill" => Some(RouteTarget::Agent(AgentName::Wellbeing)),
        "/plan" | "/progress" | "/mock" => Some(RouteTarget::Agent(AgentName::Plan)),
        "/veda" => Some(RouteTarget::Agent(AgentName::Teach)),
        "/bye" => Some(RouteTarget::Finish),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct LlmRoute {
    target: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    confidence: f64,
}

pub struct Supervisor {
    provider: Option<Arc<dyn Provider>>,
    model: String,
    llm_timeout: Duration,
}

impl Supervisor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
            llm_timeout: Duration::from_secs(30),
        }
    }

    /// Rules-only supervisor; anything unmatched routes to the default.
    pub fn without_llm() -> Self {
        Self {
            provider: None,
            model: String::new(),
            llm_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub async fn route(&self, state: &TurnState) -> RouteDecision {
        let text = state.user_text();

        // caller-forced agent wins over everything
        if let Some(forced) = state.profile.as_ref().and_then(|p| p.force_agent) {
            return RouteDecision::new(
                RouteTarget::Agent(forced),
                "forced agent override",
                1.0,
                RouteSource::Slash,
            );
        }

        // 1. slash commands
        let trimmed = text.trim();
        if trimmed.starts_with('/') {
            let token = trimmed
                .split_whitespace()
                .next()
                .unwrap_or(trimmed)
                .to_lowercase();
            if let Some(target) = slash_target(&token) {
                return RouteDecision::new(target, token, 1.0, RouteSource::Slash);
            }
            debug!(token, "unknown slash command, falling through");
        }

        // 2. closure detection
        if is_closure(text) {
            return RouteDecision::rule(RouteTarget::Finish, "closure phrase", 0.98);
        }

        // 3. rule table
        if let Some(decision) = self.match_rules(text) {
            return decision;
        }

        // 4. LLM fallback
        match &self.provider {
            Some(provider) => self.llm_route(provider, state).await,
            None => RouteDecision::default_teach("no rule matched"),
        }
    }

    fn match_rules(&self, text: &str) -> Option<RouteDecision> {
        let normalized = normalize(text);
        let words: Vec<&str> = normalized.split(' ').collect();

        for (phrases, target, reason) in RULE_TABLE {
            for phrase in *phrases {
                let matched = if phrase.contains(' ') {
                    normalized.contains(phrase)
                } else {
                    words.contains(phrase)
                };
                if matched {
                    let confidence = match target {
                        RouteTarget::Agent(AgentName::Teach) => 0.85,
                        _ => 0.9,
                    };
                    return Some(RouteDecision::rule(*target, *reason, confidence));
                }
            }
        }
        None
    }

    async fn llm_route(&self, provider: &Arc<dyn Provider>, state: &TurnState) -> RouteDecision {
        let request = GenerateRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(
                    "You route a student's message to one tutoring agent. Agents: \
                     teach (explanations), practice (questions and grading), \
                     challenge (hard questions), wellbeing (emotional support), \
                     plan (study schedules). Respond with ONLY a JSON object \
                     {\"target\": \"...\", \"reason\": \"...\", \"confidence\": 0.0-1.0}.",
                ),
                ChatMessage::user(state.user_text().to_string()),
            ],
        )
        .with_temperature(0.1)
        .with_json_mode()
        .with_timeout(self.llm_timeout);

        let response = match provider.generate(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "routing LLM unavailable, using default");
                return RouteDecision::default_teach("routing llm unavailable");
            }
        };

        let parsed: Option<LlmRoute> = response
            .text
            .find('{')
            .and_then(|start| response.text.rfind('}').map(|end| (start, end)))
            .and_then(|(start, end)| serde_json::from_str(&response.text[start..=end]).ok());

        match parsed {
            Some(route) => {
                let target = route.target.parse::<AgentName>().ok();
                match target {
                    Some(agent) if route.confidence >= MIN_LLM_CONFIDENCE => RouteDecision::new(
                        RouteTarget::Agent(agent),
                        route.reason,
                        route.confidence,
                        RouteSource::Llm,
                    ),
                    Some(_) | None => {
                        RouteDecision::default_teach("low-confidence llm route")
                    }
                }
            }
            None => RouteDecision::default_teach("unparseable llm route"),
        }
    }
}
