//! Runtime values with Python-like numeric semantics.

use crate::error::{Result, SandboxError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Tuple(_) => Err(SandboxError::DomainError(
                "expected a number, found a tuple".to_string(),
            )),
        }
    }

    /// Integer view, accepting integral floats.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(*f as i64),
            Value::Float(f) => Err(SandboxError::DomainError(format!(
                "expected an integer, found {}",
                f
            ))),
            Value::Tuple(_) => Err(SandboxError::DomainError(
                "expected an integer, found a tuple".to_string(),
            )),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Tuple(items) => !items.is_empty(),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    pub fn add(&self, other: &Value) -> Result<Value> {
        int_pair(self, other, |a, b| a.checked_add(b), |a, b| a + b)
    }

    pub fn sub(&self, other: &Value) -> Result<Value> {
        int_pair(self, other, |a, b| a.checked_sub(b), |a, b| a - b)
    }

    pub fn mul(&self, other: &Value) -> Result<Value> {
        int_pair(self, other, |a, b| a.checked_mul(b), |a, b| a * b)
    }

    /// True division always yields a float.
    pub fn div(&self, other: &Value) -> Result<Value> {
        let denom = other.as_f64()?;
        if denom == 0.0 {
            return Err(SandboxError::DomainError("division by zero".to_string()));
        }
        Ok(Value::Float(self.as_f64()? / denom))
    }

    pub fn floor_div(&self, other: &Value) -> Result<Value> {
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            if *b == 0 {
                return Err(SandboxError::DomainError(
                    "integer division by zero".to_string(),
                ));
            }
            // floor toward negative infinity, matching // semantics
            let q = a / b;
            let q = if a % b != 0 && (*a < 0) != (*b < 0) { q - 1 } else { q };
            return Ok(Value::Int(q));
        }
        let denom = other.as_f64()?;
        if denom == 0.0 {
            return Err(SandboxError::DomainError(
                "integer division by zero".to_string(),
            ));
        }
        Ok(Value::Float((self.as_f64()? / denom).floor()))
    }

    /// Python modulo: result takes the sign of the divisor.
    pub fn modulo(&self, other: &Value) -> Result<Value> {
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            if *b == 0 {
                return Err(SandboxError::DomainError("modulo by zero".to_string()));
            }
            let r = a % b;
            let r = if r != 0 && (r < 0) != (*b < 0) { r + b } else { r };
            return Ok(Value::Int(r));
        }
        let b = other.as_f64()?;
        if b == 0.0 {
            return Err(SandboxError::DomainError("modulo by zero".to_string()));
        }
        let a = self.as_f64()?;
        let r = a - (a / b).floor() * b;
        Ok(Value::Float(r))
    }

    pub fn pow(&self, other: &Value) -> Result<Value> {
        if let (Value::Int(base), Value::Int(exp)) = (self, other) {
            if *exp >= 0 {
                if let Ok(exp_u32) = u32::try_from(*exp) {
                    if let Some(result) = base.checked_pow(exp_u32) {
                        return Ok(Value::Int(result));
                    }
                }
                // overflow falls through to floats
            }
        }
        let base = self.as_f64()?;
        let exp = other.as_f64()?;
        let result = base.powf(exp);
        if result.is_nan() && !base.is_nan() && !exp.is_nan() {
            return Err(SandboxError::DomainError(format!(
                "{} ** {} is undefined over the reals",
                base, exp
            )));
        }
        if result.is_infinite() && base.is_finite() && exp.is_finite() && base != 0.0 {
            return Ok(Value::Float(result));
        }
        if base == 0.0 && exp < 0.0 {
            return Err(SandboxError::DomainError(
                "zero to a negative power".to_string(),
            ));
        }
        Ok(Value::Float(result))
    }

    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| SandboxError::DomainError("integer overflow".to_string())),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Bool(b) => Ok(Value::Int(if *b { -1 } else { 0 })),
            Value::Tuple(_) => Err(SandboxError::DomainError(
                "cannot negate a tuple".to_string(),
            )),
        }
    }

    pub fn compare(&self, op: crate::ast::CmpOp, other: &Value) -> Result<bool> {
        use crate::ast::CmpOp;

        if let (Value::Tuple(a), Value::Tuple(b)) = (self, other) {
            match op {
                CmpOp::Eq => return Ok(a == b),
                CmpOp::NotEq => return Ok(a != b),
                _ => {
                    return Err(SandboxError::DomainError(
                        "tuples support only equality comparison".to_string(),
                    ))
                }
            }
        }

        if !self.is_numeric() || !other.is_numeric() {
            return Err(SandboxError::DomainError(
                "cannot compare these values".to_string(),
            ));
        }

        let a = self.as_f64()?;
        let b = other.as_f64()?;
        Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::NotEq => a != b,
            CmpOp::Lt => a < b,
            CmpOp::LtEq => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::GtEq => a >= b,
        })
    }
}

fn int_pair(
    left: &Value,
    right: &Value,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match int_op(*a, *b) {
            Some(n) => Ok(Value::Int(n)),
            None => Ok(Value::Float(float_op(*a as f64, *b as f64))),
        },
        _ => Ok(Value::Float(float_op(left.as_f64()?, right.as_f64()?))),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1.0e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}
