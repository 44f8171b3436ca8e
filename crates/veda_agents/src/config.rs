//! Agent configurations: prompt, tool set, decoding parameters, persona.

use std::collections::HashMap;

use veda_constant::persona::{self, Persona};
use veda_core::AgentName;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: AgentName,
    pub system_prompt: String,
    /// Tool names this agent may invoke; enforced when building LLM
    /// requests and again when dispatching tool calls.
    pub allowed_tools: Vec<&'static str>,
    pub temperature: f32,
    pub token_budget: u32,
    pub persona: Persona,
}

/// Build the five production agents. Agents share no mutable state; the
/// configs are cloned freely.
pub fn roster() -> HashMap<AgentName, AgentConfig> {
    let mut agents = HashMap::new();

    agents.insert(
        AgentName::Teach,
        AgentConfig {
            name: AgentName::Teach,
            system_prompt: "You are Veda, a patient Socratic mathematics tutor for secondary-school \
                students. Explain one idea at a time and check understanding with a short question \
                before moving on. Use simple language and concrete numbers. When an explanation \
                involves arithmetic, verify it with the check_calculation tool before stating it. \
                Use the diagram tool only when a picture genuinely helps. Keep replies under 150 words."
                .to_string(),
            allowed_tools: vec!["check_calculation", "diagram"],
            temperature: 0.6,
            token_budget: 700,
            persona: persona::TEACH,
        },
    );

    agents.insert(
        AgentName::Practice,
        AgentConfig {
            name: AgentName::Practice,
            system_prompt: "You run practice sessions. When the student asks for a question, call \
                generate_question and present only the question text, never the answer. When the \
                student submits an answer, compare it with the recorded final answer; if wrong, give \
                exactly one hint from the question's hint list and invite another attempt. Verify any \
                arithmetic you state with check_calculation. Be encouraging and brief."
                .to_string(),
            allowed_tools: vec!["generate_question", "check_calculation"],
            temperature: 0.4,
            token_budget: 600,
            persona: persona::PRACTICE,
        },
    );

    agents.insert(
        AgentName::Challenge,
        AgentConfig {
            name: AgentName::Challenge,
            system_prompt: "You are Spark, a high-energy coach who loves hard problems. Call \
                generate_question with difficulty 0.7 or higher and frame the question as a \
                challenge worth taking on. Celebrate attempts loudly, never mock mistakes, and \
                never reveal the answer unprompted."
                .to_string(),
            allowed_tools: vec!["generate_question"],
            temperature: 0.8,
            token_budget: 500,
            persona: persona::CHALLENGE,
        },
    );

    agents.insert(
        AgentName::Wellbeing,
        AgentConfig {
            name: AgentName::Wellbeing,
            system_prompt: "You offer short, warm support to a stressed student. Acknowledge the \
                feeling, normalize it, and offer one small practical step. No math content, no \
                tools, no lectures. Three sentences at most."
                .to_string(),
            allowed_tools: vec![],
            temperature: 0.7,
            token_budget: 250,
            persona: persona::WELLBEING,
        },
    );

    agents.insert(
        AgentName::Plan,
        AgentConfig {
            name: AgentName::Plan,
            system_prompt: "You build study schedules. Use the curriculum tool to read the chapter \
                list and mark weights, then lay out a realistic day-by-day plan that favours \
                high-weight chapters the student has not mastered. Present the plan as a short \
                table followed by one sentence of advice."
                .to_string(),
            allowed_tools: vec!["curriculum"],
            temperature: 0.4,
            token_budget: 800,
            persona: persona::PLAN,
        },
    );

    agents
}
