//! Recursive-descent parser with Python-like precedence.
//!
//! Precedence, loosest first: conditional, `or`, `and`, `not`, comparison,
//! `+ -`, `* / // %`, unary `- +`, `**` (right-associative, binding tighter
//! than unary minus on its left).

use crate::ast::{BinOp, CmpOp, Expr, Program, Stmt, UnaryOp};
use crate::error::{Result, SandboxError};
use crate::token::{tokenize, Token};

const MAX_DEPTH: usize = 64;

pub fn parse_expression(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.contains(&Token::Newline) {
        return Err(SandboxError::SyntaxRejected(
            "expected a single expression".to_string(),
        ));
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.conditional(0)?;
    parser.expect_end()?;
    Ok(expr)
}

pub fn parse_program(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let mut statements = Vec::new();

    loop {
        parser.skip_newlines();
        if parser.at_end() {
            break;
        }
        let stmt = parser.statement()?;
        let is_return = matches!(stmt, Stmt::Return(_));
        statements.push(stmt);
        if is_return {
            parser.skip_newlines();
            if !parser.at_end() {
                return Err(SandboxError::SyntaxRejected(
                    "statements after return".to_string(),
                ));
            }
            break;
        }
        if !parser.at_end() {
            parser.expect(Token::Newline)?;
        }
    }

    if statements.is_empty() {
        return Err(SandboxError::SyntaxRejected("empty program".to_string()));
    }

    Ok(Program { statements })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == token => Ok(()),
            Some(t) => Err(SandboxError::SyntaxRejected(format!(
                "expected {:?}, found {:?}",
                token.describe(),
                t.describe()
            ))),
            None => Err(SandboxError::SyntaxRejected(format!(
                "expected {:?}, found end of input",
                token.describe()
            ))),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(SandboxError::SyntaxRejected(format!(
                "unexpected trailing {:?}",
                self.tokens[self.pos].describe()
            )))
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            Err(SandboxError::SyntaxRejected(
                "expression nested too deeply".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.peek() == Some(&Token::Return) {
            self.advance();
            let first = self.conditional(0)?;
            if self.peek() == Some(&Token::Comma) {
                let mut items = vec![first];
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    items.push(self.conditional(0)?);
                }
                return Ok(Stmt::Return(Expr::Tuple(items)));
            }
            return Ok(Stmt::Return(first));
        }

        // name = expression
        let name = match self.advance() {
            Some(Token::Ident(name)) => name,
            Some(t) => {
                return Err(SandboxError::SyntaxRejected(format!(
                    "expected assignment, found {:?}",
                    t.describe()
                )))
            }
            None => {
                return Err(SandboxError::SyntaxRejected(
                    "expected a statement".to_string(),
                ))
            }
        };
        self.expect(Token::Assign)?;
        let value = self.conditional(0)?;
        Ok(Stmt::Assign { name, value })
    }

    fn conditional(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let value_if = self.or_expr(depth + 1)?;
        if self.peek() == Some(&Token::If) {
            self.advance();
            let condition = self.or_expr(depth + 1)?;
            self.expect(Token::Else)?;
            let value_else = self.conditional(depth + 1)?;
            return Ok(Expr::Conditional {
                value_if: Box::new(value_if),
                condition: Box::new(condition),
                value_else: Box::new(value_else),
            });
        }
        Ok(value_if)
    }

    fn or_expr(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let first = self.and_expr(depth + 1)?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            items.push(self.and_expr(depth + 1)?);
        }
        Ok(Expr::BoolOr(items))
    }

    fn and_expr(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let first = self.not_expr(depth + 1)?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(&Token::And) {
            self.advance();
            items.push(self.not_expr(depth + 1)?);
        }
        Ok(Expr::BoolAnd(items))
    }

    fn not_expr(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let operand = self.not_expr(depth + 1)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison(depth + 1)
    }

    fn comparison(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let first = self.arith(depth + 1)?;
        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(cmp_op) {
            self.advance();
            rest.push((op, self.arith(depth + 1)?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn arith(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let mut left = self.term(depth + 1)?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term(depth + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let mut left = self.unary(depth + 1)?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary(depth + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // unary minus binds weaker than `**`: -3**2 parses as -(3**2)
    fn unary(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.unary(depth + 1)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Plus) => {
                self.advance();
                let operand = self.unary(depth + 1)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Pos,
                    operand: Box::new(operand),
                })
            }
            _ => self.power(depth + 1),
        }
    }

    fn power(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        let base = self.atom(depth + 1)?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.advance();
            // right operand may carry a sign: 2**-3
            let exponent = self.unary(depth + 1)?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn atom(&mut self, depth: usize) -> Result<Expr> {
        self.check_depth(depth)?;
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.conditional(depth + 1)?);
                            if self.peek() == Some(&Token::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.conditional(depth + 1)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(t) => Err(SandboxError::SyntaxRejected(format!(
                "unexpected {:?}",
                t.describe()
            ))),
            None => Err(SandboxError::SyntaxRejected(
                "unexpected end of input".to_string(),
            )),
        }
    }
}

fn cmp_op(token: &Token) -> Option<CmpOp> {
    match token {
        Token::Eq => Some(CmpOp::Eq),
        Token::NotEq => Some(CmpOp::NotEq),
        Token::Lt => Some(CmpOp::Lt),
        Token::LtEq => Some(CmpOp::LtEq),
        Token::Gt => Some(CmpOp::Gt),
        Token::GtEq => Some(CmpOp::GtEq),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_weaker_than_power() {
        // -3**2 must parse as -(3**2)
        let expr = parse_expression("-3**2").unwrap();
        match expr {
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => assert!(matches!(*operand, Expr::Binary { op: BinOp::Pow, .. })),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_negative_base() {
        let expr = parse_expression("(-3)**2").unwrap();
        match expr {
            Expr::Binary {
                op: BinOp::Pow,
                left,
                ..
            } => assert!(matches!(*left, Expr::Unary { op: UnaryOp::Neg, .. })),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_power_right_associative() {
        // 2**3**2 = 2**(3**2)
        let expr = parse_expression("2**3**2").unwrap();
        match expr {
            Expr::Binary {
                op: BinOp::Pow,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Pow, .. })),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_negative_exponent() {
        assert!(parse_expression("2**-1").is_ok());
    }

    #[test]
    fn test_conditional_expression() {
        let expr = parse_expression("a if x > 0 else b").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_expression("0 <= p <= 1").unwrap();
        match expr {
            Expr::Compare { rest, .. } => assert_eq!(rest.len(), 2),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_call_with_args() {
        let expr = parse_expression("round(x, 2)").unwrap();
        match expr {
            Expr::Call { function, args } => {
                assert_eq!(function, "round");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_program_with_return() {
        let program = parse_program("d = b**2 - 4*a*c\nreturn d").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[1], Stmt::Return(_)));
    }

    #[test]
    fn test_program_tuple_return() {
        let program = parse_program("return a, b").unwrap();
        match &program.statements[0] {
            Stmt::Return(Expr::Tuple(items)) => assert_eq!(items.len(), 2),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_program_rejects_statements_after_return() {
        assert!(parse_program("return 1\nx = 2").is_err());
    }

    #[test]
    fn test_rejects_empty_program() {
        assert!(parse_program("").is_err());
        assert!(parse_program("\n\n").is_err());
    }

    #[test]
    fn test_rejects_trailing_tokens() {
        assert!(parse_expression("1 + 2 3").is_err());
    }

    #[test]
    fn test_rejects_multiline_expression() {
        assert!(parse_expression("1\n2").is_err());
    }

    #[test]
    fn test_rejects_deep_nesting() {
        let source = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(parse_expression(&source).is_err());
    }

    #[test]
    fn test_rejects_assignment_in_expression() {
        assert!(parse_expression("a = 1").is_err());
    }
}
