//! The fixed whitelist of pure math functions and constants.

use crate::error::{Result, SandboxError};
use crate::value::Value;

pub const FUNCTION_NAMES: &[&str] = &[
    "abs", "round", "min", "max", "int", "float", "pow", "sum", "sqrt", "sin", "cos", "tan",
    "asin", "acos", "atan", "radians", "degrees", "gcd", "lcm",
];

pub const CONSTANT_NAMES: &[&str] = &["pi", "e"];

pub fn is_function(name: &str) -> bool {
    FUNCTION_NAMES.contains(&name)
}

pub fn constant(name: &str) -> Option<Value> {
    match name {
        "pi" => Some(Value::Float(std::f64::consts::PI)),
        "e" => Some(Value::Float(std::f64::consts::E)),
        _ => None,
    }
}

pub fn call(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "abs" => {
            let [x] = exact::<1>(name, args)?;
            match x {
                Value::Int(n) => Ok(Value::Int(n.abs())),
                _ => Ok(Value::Float(x.as_f64()?.abs())),
            }
        }
        "round" => match args {
            [x] => Ok(Value::Int(x.as_f64()?.round() as i64)),
            [x, digits] => {
                let places = digits.as_i64()?;
                let factor = 10f64.powi(places as i32);
                Ok(Value::Float((x.as_f64()? * factor).round() / factor))
            }
            _ => Err(arity(name, "1 or 2", args.len())),
        },
        "min" => fold_extremum(name, args, true),
        "max" => fold_extremum(name, args, false),
        "int" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::Int(x.as_f64()?.trunc() as i64))
        }
        "float" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::Float(x.as_f64()?))
        }
        "pow" => {
            let [base, exp] = exact::<2>(name, args)?;
            base.pow(exp)
        }
        "sum" => {
            let items = variadic_or_tuple(name, args)?;
            let mut acc = Value::Int(0);
            for item in items {
                acc = acc.add(item)?;
            }
            Ok(acc)
        }
        "sqrt" => {
            let [x] = exact::<1>(name, args)?;
            let x = x.as_f64()?;
            if x < 0.0 {
                return Err(SandboxError::DomainError(format!(
                    "sqrt of negative number {}",
                    x
                )));
            }
            Ok(Value::Float(x.sqrt()))
        }
        "sin" => unary_float(name, args, f64::sin),
        "cos" => unary_float(name, args, f64::cos),
        "tan" => unary_float(name, args, f64::tan),
        "asin" => inverse_trig(name, args, f64::asin),
        "acos" => inverse_trig(name, args, f64::acos),
        "atan" => unary_float(name, args, f64::atan),
        "radians" => unary_float(name, args, f64::to_radians),
        "degrees" => unary_float(name, args, f64::to_degrees),
        "gcd" => {
            let [a, b] = exact::<2>(name, args)?;
            Ok(Value::Int(gcd(a.as_i64()?.abs(), b.as_i64()?.abs())))
        }
        "lcm" => {
            let [a, b] = exact::<2>(name, args)?;
            let (a, b) = (a.as_i64()?.abs(), b.as_i64()?.abs());
            if a == 0 || b == 0 {
                return Ok(Value::Int(0));
            }
            Ok(Value::Int(a / gcd(a, b) * b))
        }
        _ => Err(SandboxError::SyntaxRejected(format!(
            "call to non-whitelisted function {:?}",
            name
        ))),
    }
}

fn exact<'a, const N: usize>(name: &str, args: &'a [Value]) -> Result<&'a [Value; N]> {
    args.try_into()
        .map_err(|_| arity(name, &N.to_string(), args.len()))
}

fn arity(name: &str, expected: &str, got: usize) -> SandboxError {
    SandboxError::DomainError(format!(
        "{}() takes {} argument(s), got {}",
        name, expected, got
    ))
}

fn unary_float(name: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value> {
    let [x] = exact::<1>(name, args)?;
    Ok(Value::Float(f(x.as_f64()?)))
}

fn inverse_trig(name: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value> {
    let [x] = exact::<1>(name, args)?;
    let x = x.as_f64()?;
    if !(-1.0..=1.0).contains(&x) {
        return Err(SandboxError::DomainError(format!(
            "{}({}) is outside [-1, 1]",
            name, x
        )));
    }
    Ok(Value::Float(f(x)))
}

// ties keep the earliest argument, and the winner keeps its own numeric kind
fn fold_extremum(name: &str, args: &[Value], take_smaller: bool) -> Result<Value> {
    let items = variadic_or_tuple(name, args)?;
    if items.is_empty() {
        return Err(arity(name, "at least 1", 0));
    }
    let mut best = items[0];
    for &item in &items[1..] {
        let candidate = item.as_f64()?;
        let current = best.as_f64()?;
        let replace = if take_smaller {
            candidate < current
        } else {
            candidate > current
        };
        if replace {
            best = item;
        }
    }
    Ok(best.clone())
}

fn variadic_or_tuple<'a>(name: &str, args: &'a [Value]) -> Result<Vec<&'a Value>> {
    match args {
        [Value::Tuple(items)] => Ok(items.iter().collect()),
        [] => Err(arity(name, "at least 1", 0)),
        _ => Ok(args.iter().collect()),
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
