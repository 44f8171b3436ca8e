use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckCalculationArgs {
    pub expression: String,

    #[serde(default)]
    pub variables: HashMap<String, f64>,

    #[serde(default)]
    pub program: bool,
}

impl CheckCalculationArgs {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            variables: HashMap::new(),
            program: false,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: f64) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn as_program(mut self) -> Self {
        self.program = true;
        self
    }
}
