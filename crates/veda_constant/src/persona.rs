//! Agent persona constants surfaced to chat clients.
//!
//! Colors follow the Tokyo Night accents used across the product UI.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    /// Wire name, matches `AgentName::as_str()`.
    pub name: &'static str,
    /// Display label shown in the chat header.
    pub label: &'static str,
    pub emoji: &'static str,
    /// Hex accent color.
    pub color: &'static str,
}

/// Socratic explainer. The default persona for greetings and fallbacks.
pub const TEACH: Persona = Persona {
    name: "teach",
    label: "Veda",
    emoji: "📘",
    color: "#7aa2f7",
};

/// Question delivery and grading.
pub const PRACTICE: Persona = Persona {
    name: "practice",
    label: "Drill",
    emoji: "✏️",
    color: "#9ece6a",
};

/// High-energy hard questions.
pub const CHALLENGE: Persona = Persona {
    name: "challenge",
    label: "Spark",
    emoji: "⚡",
    color: "#e0af68",
};

/// Short empathetic support, no math tools.
pub const WELLBEING: Persona = Persona {
    name: "wellbeing",
    label: "Chill",
    emoji: "🌿",
    color: "#7dcfff",
};

/// Study scheduling from curriculum and progress.
pub const PLAN: Persona = Persona {
    name: "plan",
    label: "Compass",
    emoji: "🗓️",
    color: "#bb9af7",
};

pub const ALL: [Persona; 5] = [TEACH, PRACTICE, CHALLENGE, WELLBEING, PLAN];

/// Look up a persona by wire name.
pub fn by_name(name: &str) -> Option<Persona> {
    ALL.iter().find(|p| p.name == name).copied()
}
