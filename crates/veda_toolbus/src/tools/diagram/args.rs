use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiagramArgs {
    pub concept: String,
    pub scenario: String,
}

impl DiagramArgs {
    pub fn new(concept: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            scenario: scenario.into(),
        }
    }
}
