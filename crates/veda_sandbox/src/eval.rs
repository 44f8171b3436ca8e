//! Tree-walking evaluator. Runs only on programs that passed validation.

use std::collections::HashMap;
use std::time::Instant;

use crate::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use crate::error::{Result, SandboxError};
use crate::funcs;
use crate::value::Value;

pub type Binding = HashMap<String, Value>;

pub struct Evaluator<'a> {
    binding: &'a Binding,
    locals: Binding,
    deadline: Instant,
}

impl<'a> Evaluator<'a> {
    pub fn new(binding: &'a Binding, deadline: Instant) -> Self {
        Self {
            binding,
            locals: Binding::new(),
            deadline,
        }
    }

    pub fn eval_expression(&mut self, expr: &Expr) -> Result<Value> {
        self.eval(expr)
    }

    /// Runs assignments in order; the `return` value wins, otherwise the
    /// last assignment's value is returned.
    pub fn eval_program(&mut self, program: &Program) -> Result<Value> {
        let mut last = None;
        for stmt in &program.statements {
            match stmt {
                Stmt::Assign { name, value } => {
                    let value = self.eval(value)?;
                    self.locals.insert(name.clone(), value.clone());
                    last = Some(value);
                }
                Stmt::Return(expr) => return self.eval(expr),
            }
        }
        last.ok_or_else(|| SandboxError::SyntaxRejected("empty program".to_string()))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        if Instant::now() > self.deadline {
            return Err(SandboxError::Timeout);
        }

        match expr {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Name(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => value.neg(),
                    UnaryOp::Pos => {
                        // numeric identity; still rejects tuples
                        value.as_f64()?;
                        Ok(value)
                    }
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match op {
                    BinOp::Add => left.add(&right),
                    BinOp::Sub => left.sub(&right),
                    BinOp::Mul => left.mul(&right),
                    BinOp::Div => left.div(&right),
                    BinOp::FloorDiv => left.floor_div(&right),
                    BinOp::Mod => left.modulo(&right),
                    BinOp::Pow => left.pow(&right),
                }
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right_expr) in rest {
                    let right = self.eval(right_expr)?;
                    if !left.compare(*op, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::BoolAnd(items) => {
                let mut last = Value::Bool(true);
                for item in items {
                    last = self.eval(item)?;
                    if !last.is_truthy() {
                        return Ok(last);
                    }
                }
                Ok(last)
            }
            Expr::BoolOr(items) => {
                let mut last = Value::Bool(false);
                for item in items {
                    last = self.eval(item)?;
                    if last.is_truthy() {
                        return Ok(last);
                    }
                }
                Ok(last)
            }
            Expr::Conditional {
                value_if,
                condition,
                value_else,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(value_if)
                } else {
                    self.eval(value_else)
                }
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                funcs::call(function, &values)
            }
            Expr::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::Tuple(values))
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.binding.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = funcs::constant(name) {
            return Ok(value);
        }
        Err(SandboxError::NameUnbound(name.to_string()))
    }
}
