//! Deterministic reply paths that short-circuit before any LLM call:
//! greetings, identity, follow-up worked examples, and closure.

use veda_core::{AgentReply, TurnState};
use veda_engine::example_for_text;

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "namaste",
    "kaise ho",
];

const CLOSURES_CONTAINED: &[&str] = &["goodbye", "see you later", "that's all", "i'm done"];

const IDENTITY: &[&str] = &["who are you", "what are you", "what can you do"];

const EXAMPLE_REQUESTS: &[&str] = &[
    "example",
    "show me",
    "ek aur",
    "one more",
    "another one",
];

/// Lowercase, trim, and strip punctuation except apostrophes (so "that's
/// all!" still matches).
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '\'')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the message closes the session: exact `bye` (optionally as the
/// slash form) or a closure phrase anywhere in the text.
pub fn is_closure(text: &str) -> bool {
    let normalized = normalize(text);
    if normalized == "bye" {
        return true;
    }
    let lowered = text.to_lowercase();
    CLOSURES_CONTAINED.iter().any(|p| lowered.contains(p))
}

pub fn is_greeting(text: &str) -> bool {
    let normalized = normalize(text);
    GREETINGS
        .iter()
        .any(|g| normalized == *g || normalized.starts_with(&format!("{} ", g)))
}

fn is_identity_question(text: &str) -> bool {
    let normalized = normalize(text);
    IDENTITY.iter().any(|q| normalized.contains(q))
}

fn is_example_request(text: &str) -> bool {
    let normalized = normalize(text);
    EXAMPLE_REQUESTS.iter().any(|p| normalized.contains(p))
}

fn prefers_hindi(state: &TurnState) -> bool {
    if let Some(lang) = state.language() {
        if lang.eq_ignore_ascii_case("hi") || lang.eq_ignore_ascii_case("hindi") {
            return true;
        }
    }
    let normalized = normalize(state.user_text());
    normalized.contains("namaste") || normalized.contains("kaise ho")
}

/// Try every fixed handler in priority order. `None` means the turn goes to
/// an agent.
pub fn fixed_reply(state: &TurnState) -> Option<AgentReply> {
    let text = state.user_text();

    if is_closure(text) {
        return Some(AgentReply::terminal(
            "Great session! Your progress is saved — come back any time and we'll pick up \
             right where you left off. 👋",
        ));
    }

    if is_identity_question(text) {
        return Some(AgentReply::text(
            "I'm Veda, your mathematics tutor. I can explain concepts step by step, give you \
             practice questions and grade your answers, set up harder challenges, help you plan \
             your revision, and just listen when the pressure builds. What shall we do first?",
        ));
    }

    if is_greeting(text) {
        let greeting = if prefers_hindi(state) {
            "Namaste! 🙏 Main Veda hoon, aapka maths tutor. Aaj kya seekhna chahenge?"
        } else {
            "Hello! I'm Veda, your maths tutor. What would you like to work on today?"
        };
        return Some(AgentReply::text(greeting));
    }

    // a follow-up example only makes sense right after something was taught;
    // the concept is read from the most recent exchange, both sides
    if is_example_request(text) {
        let mut topic_source = String::new();
        for message in state.history.iter().rev().skip(1).take(3) {
            topic_source.push_str(&message.content);
            topic_source.push(' ');
        }
        topic_source.push_str(text);
        if let Some(example) = example_for_text(&topic_source) {
            let mut reply = format!("Here's a worked example.\n\n{}\n\n", example.problem);
            for (i, step) in example.steps.iter().enumerate() {
                reply.push_str(&format!("Step {}: {}\n", i + 1, step));
            }
            reply.push_str(&format!("\nAnswer: {}", example.answer));
            return Some(
                AgentReply::text(reply)
                    .with_meta("worked_example", serde_json::json!(example.concept)),
            );
        }
    }

    None
}
