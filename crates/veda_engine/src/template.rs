//! Pattern templates: parameterized questions with sandbox-derived answers.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use veda_sandbox::{find_unparenthesized_powers, Binding};

use crate::error::{EngineError, Result};

/// How one template variable is produced. Insertion order in the schema is
/// evaluation order; `calculated` expressions may only reference variables
/// defined earlier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VarSpec {
    Int { min: i64, max: i64 },
    Real { min: f64, max: f64, precision: u32 },
    Choice { options: Vec<f64> },
    Calculated { expression: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVar {
    pub name: String,
    #[serde(flatten)]
    pub spec: VarSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternTemplate {
    pub pattern_id: String,
    pub concept: String,
    pub marks: u32,
    pub difficulty: f64,
    pub text_template: String,
    pub variables: Vec<TemplateVar>,
    pub solution_template: Vec<String>,
    /// A placeholder or derived-name whose sandbox value is the answer.
    pub answer_template: String,
    /// Optional phrasing around the answer value, e.g.
    /// "real and distinct (D = {d})". Defaults to `answer_template`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

impl PatternTemplate {
    /// Load-time validation: variable evaluation order, placeholder closure,
    /// and the power-parenthesization rule for every rendered string.
    pub fn validate(&self) -> Result<()> {
        let mut defined: HashSet<&str> = HashSet::new();
        for var in &self.variables {
            if defined.contains(var.name.as_str()) {
                return Err(EngineError::Catalog(format!(
                    "{}: variable {:?} defined twice",
                    self.pattern_id, var.name
                )));
            }
            if let VarSpec::Calculated { expression } = &var.spec {
                let parsed = veda_sandbox::parser::parse_expression(expression)
                    .map_err(|e| {
                        EngineError::Catalog(format!(
                            "{}: bad expression for {:?}: {}",
                            self.pattern_id, var.name, e
                        ))
                    })?;
                let mut forward = None;
                parsed.walk(&mut |node| {
                    if forward.is_some() {
                        return;
                    }
                    if let veda_sandbox::ast::Expr::Name(name) = node {
                        if !defined.contains(name.as_str())
                            && veda_sandbox::funcs::constant(name).is_none()
                        {
                            forward = Some(name.clone());
                        }
                    }
                });
                if let Some(name) = forward {
                    return Err(EngineError::Catalog(format!(
                        "{}: {:?} references {:?} before it is defined",
                        self.pattern_id, var.name, name
                    )));
                }
            }
            match &var.spec {
                VarSpec::Int { min, max } if min > max => {
                    return Err(EngineError::Catalog(format!(
                        "{}: empty int range for {:?}",
                        self.pattern_id, var.name
                    )));
                }
                VarSpec::Real { min, max, .. } if min > max => {
                    return Err(EngineError::Catalog(format!(
                        "{}: empty real range for {:?}",
                        self.pattern_id, var.name
                    )));
                }
                VarSpec::Choice { options } if options.is_empty() => {
                    return Err(EngineError::Catalog(format!(
                        "{}: empty choice list for {:?}",
                        self.pattern_id, var.name
                    )));
                }
                _ => {}
            }
            defined.insert(&var.name);
        }

        for text in self.rendered_strings() {
            for name in placeholders(text) {
                if !defined.contains(name.as_str()) {
                    return Err(EngineError::Catalog(format!(
                        "{}: placeholder {{{}}} has no matching variable",
                        self.pattern_id, name
                    )));
                }
            }
        }

        // `{b}**2` renders as `-3**2`, which is `-(3**2)`. Calculated
        // expressions are immune: they reference variables through the
        // binding, not by text substitution.
        for text in self.rendered_strings() {
            for name in find_unparenthesized_powers(text) {
                if self.variable_may_be_negative(&name) {
                    return Err(EngineError::Catalog(format!(
                        "{}: placeholder {{{}}} is raised to a power without parentheses",
                        self.pattern_id, name
                    )));
                }
            }
        }

        Ok(())
    }

    fn rendered_strings(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.text_template)
            .chain(self.solution_template.iter())
            .chain(std::iter::once(&self.answer_template))
            .chain(self.answer_text.iter())
            .chain(self.validation_rules.iter())
            .chain(self.hints.iter())
    }

    fn variable_may_be_negative(&self, name: &str) -> bool {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| match &v.spec {
                VarSpec::Int { min, .. } => *min < 0,
                VarSpec::Real { min, .. } => *min < 0.0,
                VarSpec::Choice { options } => options.iter().any(|o| *o < 0.0),
                VarSpec::Calculated { .. } => true,
            })
            .unwrap_or(true)
    }

    /// Substitute `{name}` placeholders with bound values.
    pub fn render(&self, text: &str, binding: &Binding) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            let name = &caps[1];
            out.push_str(&text[last..whole.start()]);
            let value = binding.get(name).ok_or_else(|| {
                EngineError::Catalog(format!(
                    "{}: no value for placeholder {{{}}}",
                    self.pattern_id, name
                ))
            })?;
            out.push_str(&value.to_string());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

/// All placeholder names appearing in a template string.
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use veda_sandbox::Value;

    fn template(variables: Vec<TemplateVar>, answer: &str) -> PatternTemplate {
        PatternTemplate {
            pattern_id: "t1".to_string(),
            concept: "test".to_string(),
            marks: 1,
            difficulty: 0.5,
            text_template: "Compute with {a}.".to_string(),
            variables,
            solution_template: vec![],
            answer_template: answer.to_string(),
            answer_text: None,
            validation_rules: vec![],
            hints: vec![],
        }
    }

    fn int_var(name: &str, min: i64, max: i64) -> TemplateVar {
        TemplateVar {
            name: name.to_string(),
            spec: VarSpec::Int { min, max },
        }
    }

    #[test]
    fn test_validate_ok() {
        let t = template(vec![int_var("a", 1, 5)], "{a}");
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_forward_reference() {
        let t = template(
            vec![
                TemplateVar {
                    name: "d".to_string(),
                    spec: VarSpec::Calculated {
                        expression: "x + 1".to_string(),
                    },
                },
                int_var("x", 1, 5),
            ],
            "{d}",
        );
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("before it is defined"));
    }

    #[test]
    fn test_validate_unknown_placeholder() {
        let t = template(vec![int_var("a", 1, 5)], "{missing}");
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("no matching variable"));
    }

    #[test]
    fn test_validate_unparenthesized_signed_power() {
        let mut t = template(vec![int_var("b", -10, 10)], "{b}");
        t.text_template = "The square is {b}**2.".to_string();
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("without parentheses"));
    }

    #[test]
    fn test_validate_parenthesized_power_ok() {
        let mut t = template(vec![int_var("b", -10, 10)], "{b}");
        t.text_template = "The square is ({b})**2.".to_string();
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_unsigned_power_ok() {
        // a >= 1 can never render a sign, no parentheses needed
        let mut t = template(vec![int_var("a", 1, 9)], "{a}");
        t.text_template = "The square is {a}**2.".to_string();
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_variable() {
        let t = template(vec![int_var("a", 1, 5), int_var("a", 1, 5)], "{a}");
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_empty_ranges() {
        assert!(template(vec![int_var("a", 5, 1)], "{a}").validate().is_err());
        let t = template(
            vec![TemplateVar {
                name: "a".to_string(),
                spec: VarSpec::Choice { options: vec![] },
            }],
            "{a}",
        );
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_render() {
        let t = template(vec![int_var("a", 1, 5)], "{a}");
        let mut binding = Binding::new();
        binding.insert("a".to_string(), Value::Int(-3));
        assert_eq!(t.render("value is {a}!", &binding).unwrap(), "value is -3!");
    }

    #[test]
    fn test_render_missing_value() {
        let t = template(vec![int_var("a", 1, 5)], "{a}");
        assert!(t.render("{a}", &Binding::new()).is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{a} + {b_2}"), vec!["a", "b_2"]);
        assert!(placeholders("none").is_empty());
    }

    #[test]
    fn test_var_spec_serde() {
        let raw = r#"{"name":"a","type":"int","min":1,"max":10}"#;
        let var: TemplateVar = serde_json::from_str(raw).unwrap();
        assert!(matches!(var.spec, VarSpec::Int { min: 1, max: 10 }));

        let raw = r#"{"name":"d","type":"calculated","expression":"(b)**2 - 4*a*c"}"#;
        let var: TemplateVar = serde_json::from_str(raw).unwrap();
        assert!(matches!(var.spec, VarSpec::Calculated { .. }));
    }
}
