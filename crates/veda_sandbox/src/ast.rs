//! Abstract syntax for sandbox expressions and programs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Chained comparison, e.g. `0 <= p <= 1` keeps all three operands.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    BoolAnd(Vec<Expr>),
    BoolOr(Vec<Expr>),
    /// `value_if if condition else value_else`
    Conditional {
        value_if: Box<Expr>,
        condition: Box<Expr>,
        value_else: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
}

impl Expr {
    /// Visit every node, outermost first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Name(_) => {}
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Compare { first, rest } => {
                first.walk(visit);
                for (_, e) in rest {
                    e.walk(visit);
                }
            }
            Expr::BoolAnd(items) | Expr::BoolOr(items) | Expr::Tuple(items) => {
                for e in items {
                    e.walk(visit);
                }
            }
            Expr::Conditional {
                value_if,
                condition,
                value_else,
            } => {
                value_if.walk(visit);
                condition.walk(visit);
                value_else.walk(visit);
            }
            Expr::Call { args, .. } => {
                for e in args {
                    e.walk(visit);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { name: String, value: Expr },
    Return(Expr),
}

/// A parsed solver program: assignments followed by an optional return.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_all_names() {
        let expr = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(Expr::Name("a".to_string())),
            right: Box::new(Expr::Call {
                function: "sqrt".to_string(),
                args: vec![Expr::Name("b".to_string())],
            }),
        };

        let mut names = Vec::new();
        expr.walk(&mut |node| {
            if let Expr::Name(n) = node {
                names.push(n.clone());
            }
        });
        assert_eq!(names, vec!["a", "b"]);
    }
}
