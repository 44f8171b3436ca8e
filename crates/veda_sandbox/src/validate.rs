//! Static validation. Runs after parsing and before evaluation; a program
//! that fails here is never evaluated.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Expr, Program, Stmt};
use crate::error::{Result, SandboxError};
use crate::eval::Binding;
use crate::funcs;

/// Validate a single expression against a binding.
pub fn validate_expression(expr: &Expr, binding: &Binding) -> Result<()> {
    let locals = HashSet::new();
    check_expr(expr, binding, &locals)
}

/// Validate a program statement by statement, tracking names defined so far.
/// Forward references surface here as `NameUnbound`.
pub fn validate_program(program: &Program, binding: &Binding) -> Result<()> {
    let mut locals: HashSet<String> = HashSet::new();
    for stmt in &program.statements {
        match stmt {
            Stmt::Assign { name, value } => {
                check_identifier(name)?;
                if funcs::is_function(name) {
                    return Err(SandboxError::SyntaxRejected(format!(
                        "cannot assign to whitelisted function {:?}",
                        name
                    )));
                }
                check_expr(value, binding, &locals)?;
                locals.insert(name.clone());
            }
            Stmt::Return(expr) => check_expr(expr, binding, &locals)?,
        }
    }
    Ok(())
}

fn check_expr(expr: &Expr, binding: &Binding, locals: &HashSet<String>) -> Result<()> {
    let mut result = Ok(());
    expr.walk(&mut |node| {
        if result.is_err() {
            return;
        }
        result = match node {
            Expr::Name(name) => check_name(name, binding, locals),
            Expr::Call { function, .. } => {
                if let Err(e) = check_identifier(function) {
                    Err(e)
                } else if !funcs::is_function(function) {
                    Err(SandboxError::SyntaxRejected(format!(
                        "call to non-whitelisted function {:?}",
                        function
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        };
    });
    result
}

fn check_name(name: &str, binding: &Binding, locals: &HashSet<String>) -> Result<()> {
    check_identifier(name)?;
    if locals.contains(name)
        || binding.contains_key(name)
        || funcs::constant(name).is_some()
    {
        return Ok(());
    }
    if funcs::is_function(name) {
        // bare reference to a function (not a call) is not a value here
        return Err(SandboxError::SyntaxRejected(format!(
            "function {:?} used without a call",
            name
        )));
    }
    Err(SandboxError::NameUnbound(name.to_string()))
}

fn check_identifier(name: &str) -> Result<()> {
    if name.contains("__") {
        return Err(SandboxError::SyntaxRejected(format!(
            "identifier {:?} contains a double underscore",
            name
        )));
    }
    Ok(())
}

static UNPARENTHESIZED_POWER: Lazy<Regex> = Lazy::new(|| {
    // a `{var}` placeholder immediately raised to a power
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}\s*\*\*").unwrap()
});

/// Catch the template shape that breaks for signed substitutions: `{b}**2`
/// renders as `-3**2` (which is `-(3**2)`), so the placeholder must be
/// parenthesized as `({b})**2`. Returns the offending variable names.
pub fn find_unparenthesized_powers(template: &str) -> Vec<String> {
    let mut offending = Vec::new();
    for caps in UNPARENTHESIZED_POWER.captures_iter(template) {
        let whole = caps.get(0).unwrap();
        let preceding = template[..whole.start()]
            .chars()
            .rev()
            .find(|c| !c.is_whitespace());
        if preceding != Some('(') {
            offending.push(caps[1].to_string());
        }
    }
    offending
}
