//! Per-concept solver programs for the generative engine.
//!
//! Each supported concept owns a small sandbox program that computes the
//! authoritative answer from LLM-proposed variables, a domain predicate the
//! variables must satisfy, and a phrasing function for the final answer.
//! The LLM proposes numbers and words; it never computes.

use veda_sandbox::Value;

#[derive(Debug, Clone, Copy)]
pub struct ConceptSolver {
    pub concept: &'static str,
    /// Variables the LLM must supply: (name, description for the prompt).
    pub variables: &'static [(&'static str, &'static str)],
    /// Sandbox predicate the variables must satisfy.
    pub domain: &'static str,
    /// Sandbox program computing the answer from the variables.
    pub solver: &'static str,
    /// Phrase the computed value as the final answer.
    pub phrase: fn(&Value) -> String,
    /// Whether a diagram description call is worth making.
    pub wants_diagram: bool,
}

pub const SOLVERS: &[ConceptSolver] = &[
    ConceptSolver {
        concept: "quadratic_nature_of_roots",
        variables: &[
            ("a", "coefficient of x^2, a small non-zero integer"),
            ("b", "coefficient of x, an integer between -10 and 10"),
            ("c", "constant term, an integer between -10 and 10"),
        ],
        domain: "a != 0",
        solver: "d = (b)**2 - 4*a*c\nreturn d",
        phrase: phrase_discriminant,
        wants_diagram: false,
    },
    ConceptSolver {
        concept: "quadratic_roots",
        variables: &[
            ("a", "coefficient of x^2, a small positive integer"),
            ("b", "coefficient of x, an integer"),
            ("c", "constant term, an integer"),
        ],
        domain: "a != 0 and (b)**2 - 4*a*c >= 0",
        solver: "d = (b)**2 - 4*a*c\nr1 = (-(b) + sqrt(d)) / (2*a)\nr2 = (-(b) - sqrt(d)) / (2*a)\nreturn r1, r2",
        phrase: phrase_roots,
        wants_diagram: false,
    },
    ConceptSolver {
        concept: "arithmetic_progressions",
        variables: &[
            ("a", "first term of the AP, an integer"),
            ("d", "common difference, a non-zero integer"),
            ("n", "term index, an integer between 5 and 30"),
        ],
        domain: "d != 0 and n >= 1",
        solver: "t = a + (n - 1)*d\nreturn t",
        phrase: phrase_plain,
        wants_diagram: false,
    },
    ConceptSolver {
        concept: "probability_single_event",
        variables: &[
            ("favourable", "count of favourable outcomes, a positive integer"),
            ("total", "total outcomes, an integer larger than favourable"),
        ],
        domain: "0 < favourable and favourable < total",
        solver: "p = favourable / total\nreturn p",
        phrase: phrase_plain,
        wants_diagram: false,
    },
    ConceptSolver {
        concept: "triangles_pythagoras",
        variables: &[
            ("base", "horizontal distance in metres, a positive number"),
            ("height", "vertical height in metres, a positive number"),
        ],
        domain: "base > 0 and height > 0",
        solver: "hyp = sqrt((base)**2 + (height)**2)\nreturn hyp",
        phrase: phrase_metres,
        wants_diagram: true,
    },
    ConceptSolver {
        concept: "heights_and_distances",
        variables: &[
            ("distance", "distance from the foot of the object in metres"),
            ("angle", "angle of elevation in degrees, between 15 and 75"),
        ],
        domain: "distance > 0 and 0 < angle and angle < 90",
        solver: "h = distance * tan(radians(angle))\nreturn round(h, 2)",
        phrase: phrase_metres,
        wants_diagram: true,
    },
    ConceptSolver {
        concept: "areas_related_to_circles",
        variables: &[("r", "radius in centimetres, a positive number")],
        domain: "r > 0",
        solver: "area = round(pi * (r)**2, 2)\nreturn area",
        phrase: phrase_sq_cm,
        wants_diagram: true,
    },
];

pub fn solver_for(concept: &str) -> Option<&'static ConceptSolver> {
    SOLVERS.iter().find(|s| s.concept == concept)
}

pub fn supported_concepts() -> Vec<&'static str> {
    SOLVERS.iter().map(|s| s.concept).collect()
}

fn phrase_plain(value: &Value) -> String {
    value.to_string()
}

fn phrase_metres(value: &Value) -> String {
    format!("{} m", value)
}

fn phrase_sq_cm(value: &Value) -> String {
    format!("{} sq cm", value)
}

fn phrase_discriminant(value: &Value) -> String {
    let d = value.as_f64().unwrap_or(0.0);
    if d > 0.0 {
        format!("real and distinct (D = {})", value)
    } else if d == 0.0 {
        format!("real and equal (D = {})", value)
    } else {
        format!("no real roots (D = {})", value)
    }
}

fn phrase_roots(value: &Value) -> String {
    match value {
        Value::Tuple(items) if items.len() == 2 => {
            format!("x = {} or x = {}", items[0], items[1])
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veda_sandbox::{Binding, Sandbox};

    fn binding(pairs: &[(&str, Value)]) -> Binding {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_lookup() {
        assert!(solver_for("quadratic_nature_of_roots").is_some());
        assert!(solver_for("calculus").is_none());
        assert!(supported_concepts().len() >= 6);
    }

    #[test]
    fn test_every_solver_parses_and_validates() {
        for solver in SOLVERS {
            let b: Binding = solver
                .variables
                .iter()
                .map(|(name, _)| (name.to_string(), Value::Int(1)))
                .collect();

            let program = veda_sandbox::parser::parse_program(solver.solver)
                .unwrap_or_else(|e| panic!("{}: {}", solver.concept, e));
            veda_sandbox::validate::validate_program(&program, &b)
                .unwrap_or_else(|e| panic!("{}: {}", solver.concept, e));

            let predicate = veda_sandbox::parser::parse_expression(solver.domain)
                .unwrap_or_else(|e| panic!("{}: {}", solver.concept, e));
            veda_sandbox::validate::validate_expression(&predicate, &b)
                .unwrap_or_else(|e| panic!("{}: {}", solver.concept, e));
        }
    }

    #[test]
    fn test_discriminant_solver_and_phrasing() {
        let sandbox = Sandbox::new();
        let solver = solver_for("quadratic_nature_of_roots").unwrap();
        let b = binding(&[
            ("a", Value::Int(1)),
            ("b", Value::Int(10)),
            ("c", Value::Int(-7)),
        ]);
        assert!(sandbox.eval_predicate(solver.domain, &b).unwrap());
        let d = sandbox.eval_program(solver.solver, &b).unwrap();
        assert_eq!(d, Value::Int(128));
        assert_eq!((solver.phrase)(&d), "real and distinct (D = 128)");
    }

    #[test]
    fn test_discriminant_phrasing_variants() {
        assert_eq!(
            phrase_discriminant(&Value::Int(0)),
            "real and equal (D = 0)"
        );
        assert_eq!(
            phrase_discriminant(&Value::Int(-7)),
            "no real roots (D = -7)"
        );
    }

    #[test]
    fn test_roots_solver() {
        let sandbox = Sandbox::new();
        let solver = solver_for("quadratic_roots").unwrap();
        let b = binding(&[
            ("a", Value::Int(1)),
            ("b", Value::Int(-5)),
            ("c", Value::Int(6)),
        ]);
        let roots = sandbox.eval_program(solver.solver, &b).unwrap();
        assert_eq!((solver.phrase)(&roots), "x = 3 or x = 2");
    }

    #[test]
    fn test_domain_rejects_bad_variables() {
        let sandbox = Sandbox::new();
        let solver = solver_for("probability_single_event").unwrap();
        let bad = binding(&[
            ("favourable", Value::Int(12)),
            ("total", Value::Int(10)),
        ]);
        assert!(!sandbox.eval_predicate(solver.domain, &bad).unwrap());
    }

    #[test]
    fn test_pythagoras_solver() {
        let sandbox = Sandbox::new();
        let solver = solver_for("triangles_pythagoras").unwrap();
        let b = binding(&[
            ("base", Value::Float(9.0)),
            ("height", Value::Float(12.0)),
        ]);
        let hyp = sandbox.eval_program(solver.solver, &b).unwrap();
        assert_eq!((solver.phrase)(&hyp), "15 m");
    }
}
