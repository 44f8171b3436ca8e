//! The turn runner: assembles per-turn state, routes it, executes the
//! selected agent (including its tool calls), and persists the exchange.
//!
//! Split into focused submodules:
//! - **turn** — the unary entry point and deterministic reply paths
//! - **tools** — the agent LLM loop and tool-call dispatch
//! - **stream** — the token-streaming entry point

mod stream;
mod tools;
mod turn;

use std::collections::HashMap;
use std::sync::Arc;

use veda_agents::{roster, AgentConfig, Supervisor};
use veda_constant::persona::Persona;
use veda_core::{
    AgentName, AgentReply, MessageSink, NullSink, RouteDecision, SessionId, UserProfile,
};
use veda_llms::Provider;
use veda_toolbus::ToolBus;

use crate::config::RuntimeConfig;
use crate::memory::SessionStore;

#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub profile: Option<UserProfile>,
    /// Agent override by name; unknown values are ignored.
    pub force_agent: Option<String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_force_agent(mut self, agent: impl Into<String>) -> Self {
        self.force_agent = Some(agent.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub reply: AgentReply,
    pub agent: AgentName,
    pub route: RouteDecision,
}

pub struct TurnRunner {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) supervisor: Supervisor,
    pub(crate) agents: HashMap<AgentName, AgentConfig>,
    pub(crate) toolbus: Arc<ToolBus>,
    pub(crate) store: Arc<SessionStore>,
    pub(crate) sink: Arc<dyn MessageSink>,
    pub(crate) config: RuntimeConfig,
}

impl TurnRunner {
    pub fn new(provider: Arc<dyn Provider>, toolbus: Arc<ToolBus>, config: RuntimeConfig) -> Self {
        let supervisor = Supervisor::new(Arc::clone(&provider), config.model.as_str())
            .with_llm_timeout(config.llm_timeout);
        let store = Arc::new(SessionStore::new(config.session_ttl));
        Self {
            provider,
            supervisor,
            agents: roster(),
            toolbus,
            store,
            sink: Arc::new(NullSink),
            config,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Swap the supervisor, e.g. for a rules-only variant in tests.
    pub fn with_supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn persona_of(&self, agent: AgentName) -> Persona {
        self.agents
            .get(&agent)
            .map(|c| c.persona)
            .unwrap_or(veda_constant::persona::TEACH)
    }

    /// Merge the request's `force_agent` into the profile, ignoring values
    /// that name no agent.
    pub(crate) fn effective_profile(&self, request: &TurnRequest) -> Option<UserProfile> {
        let forced = request
            .force_agent
            .as_deref()
            .and_then(|raw| raw.parse::<AgentName>().ok());
        match (request.profile.clone(), forced) {
            (Some(mut profile), Some(agent)) => {
                profile.force_agent = Some(agent);
                Some(profile)
            }
            (None, Some(agent)) => Some(UserProfile::new().with_force_agent(agent)),
            (profile, None) => profile,
        }
    }
}
