//! veda-sandbox — restricted evaluation of math expressions and short
//! assignment programs.
//!
//! Pipeline: **lex → parse → validate → evaluate**. Validation walks the
//! whole tree before any evaluation happens; a rejected program is never
//! run. The grammar has no attribute access, subscripting, loops, imports,
//! or definitions, and calls resolve only against a fixed whitelist of pure
//! math functions.

pub mod ast;
pub mod error;
pub mod eval;
pub mod funcs;
pub mod parser;
pub mod token;
pub mod validate;
pub mod value;

use std::time::{Duration, Instant};

pub use error::{Result, SandboxError};
pub use eval::Binding;
pub use validate::find_unparenthesized_powers;
pub use value::Value;

/// Default wall-clock budget for a single evaluation. Sandbox programs are
/// a handful of arithmetic statements; anything longer is a bug.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Sandbox {
    timeout: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Evaluate a single expression over named variables.
    pub fn eval_expression(&self, source: &str, binding: &Binding) -> Result<Value> {
        let expr = parser::parse_expression(source)?;
        validate::validate_expression(&expr, binding)?;
        let deadline = Instant::now() + self.timeout;
        eval::Evaluator::new(binding, deadline).eval_expression(&expr)
    }

    /// Evaluate an assignment sequence, optionally ending in `return`.
    pub fn eval_program(&self, source: &str, binding: &Binding) -> Result<Value> {
        let program = parser::parse_program(source)?;
        validate::validate_program(&program, binding)?;
        let deadline = Instant::now() + self.timeout;
        eval::Evaluator::new(binding, deadline).eval_program(&program)
    }

    /// Evaluate an expression expected to produce a boolean, e.g. a
    /// template validation rule.
    pub fn eval_predicate(&self, source: &str, binding: &Binding) -> Result<bool> {
        Ok(self.eval_expression(source, binding)?.is_truthy())
    }
}
