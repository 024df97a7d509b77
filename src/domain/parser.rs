//! Strategy DSL parser.
//!
//! Recursive descent over the token stream. Precedence, lowest first:
//! `OR`, `AND`, `NOT`, comparisons and crosses (non-chaining), `+ -`, `* /`,
//! primaries. Names and argument types are validated while the tree is built,
//! so a successful parse never yields a tree the evaluator would reject for
//! its shape. The first error aborts the parse.

use tracing::debug;

use crate::domain::ast::{BinaryOp, ExprType, Function, Kind, Node, Strategy};
use crate::domain::error::{ParseError, ParseErrorKind};
use crate::domain::lexer::{Keyword, Token, TokenKind, tokenize};
use crate::domain::table::Series;
use crate::domain::vocabulary::{
    arity_description, function_names, match_signature, series_names, signatures, suggestion,
};

type Pos = (usize, usize);

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // tokenize() guarantees a trailing Eof, and advance() never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn position(&self) -> Pos {
        let token = self.peek();
        (token.line, token.column)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.check(&TokenKind::Keyword(keyword))
    }

    fn error(kind: ParseErrorKind, at: Pos, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, at.0, at.1)
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        Self::error(ParseErrorKind::Syntax, self.position(), message)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            return Ok(self.advance());
        }
        Err(self.syntax_error(format!("expected {}, found {}", kind, self.peek().kind)))
    }

    fn require_kind(node: &Node, at: Pos, kind: Kind, context: &str) -> Result<(), ParseError> {
        let actual = node.static_type();
        if actual.kind == kind {
            return Ok(());
        }
        let wanted = match kind {
            Kind::Boolean => "a boolean",
            Kind::Numeric => "a numeric",
        };
        Err(Self::error(
            ParseErrorKind::Validation,
            at,
            format!("{context} requires {wanted} operand, found {}", actual.describe()),
        ))
    }

    fn parse_strategy(&mut self) -> Result<Strategy, ParseError> {
        self.expect(TokenKind::Keyword(Keyword::Entry))?;
        self.expect(TokenKind::Colon)?;
        let at = self.position();
        let entry = self.parse_bool_expr()?;
        Self::require_kind(&entry, at, Kind::Boolean, "ENTRY")?;

        self.expect(TokenKind::Keyword(Keyword::Exit))?;
        self.expect(TokenKind::Colon)?;
        let at = self.position();
        let exit = self.parse_bool_expr()?;
        Self::require_kind(&exit, at, Kind::Boolean, "EXIT")?;

        if !self.check(&TokenKind::Eof) {
            return Err(self.syntax_error(format!(
                "unexpected {} after EXIT expression",
                self.peek().kind
            )));
        }
        Ok(Strategy { entry, exit })
    }

    fn parse_bool_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let at = self.position();
        let mut left = self.parse_and()?;
        while self.check_keyword(Keyword::Or) {
            Self::require_kind(&left, at, Kind::Boolean, "OR")?;
            self.advance();
            let right_at = self.position();
            let right = self.parse_and()?;
            Self::require_kind(&right, right_at, Kind::Boolean, "OR")?;
            left = Node::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let at = self.position();
        let mut left = self.parse_not()?;
        while self.check_keyword(Keyword::And) {
            Self::require_kind(&left, at, Kind::Boolean, "AND")?;
            self.advance();
            let right_at = self.position();
            let right = self.parse_not()?;
            Self::require_kind(&right, right_at, Kind::Boolean, "AND")?;
            left = Node::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node, ParseError> {
        if self.check_keyword(Keyword::Not) {
            self.advance();
            let at = self.position();
            let operand = self.parse_not()?;
            Self::require_kind(&operand, at, Kind::Boolean, "NOT")?;
            return Ok(Node::not(operand));
        }
        self.parse_comparison()
    }

    fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
        Some(match kind {
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Keyword(Keyword::CrossOver) => BinaryOp::CrossOver,
            TokenKind::Keyword(Keyword::CrossUnder) => BinaryOp::CrossUnder,
            _ => return None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let left_at = self.position();
        let left = self.parse_arith()?;
        let Some(op) = Self::comparison_op(&self.peek().kind) else {
            return Ok(left);
        };
        self.advance();
        let right_at = self.position();
        let right = self.parse_arith()?;
        if op.is_cross() {
            Self::require_kind(&left, left_at, Kind::Numeric, op.symbol())?;
            Self::require_kind(&right, right_at, Kind::Numeric, op.symbol())?;
        }
        if Self::comparison_op(&self.peek().kind).is_some() {
            return Err(self.syntax_error(format!(
                "comparisons cannot be chained: unexpected {} after comparison (combine with AND)",
                self.peek().kind
            )));
        }
        Ok(Node::binary(op, left, right))
    }

    fn parse_arith(&mut self) -> Result<Node, ParseError> {
        let at = self.position();
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            Self::require_kind(&left, at, Kind::Numeric, op.symbol())?;
            self.advance();
            let right_at = self.position();
            let right = self.parse_term()?;
            Self::require_kind(&right, right_at, Kind::Numeric, op.symbol())?;
            left = Node::binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let at = self.position();
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            Self::require_kind(&left, at, Kind::Numeric, op.symbol())?;
            self.advance();
            let right_at = self.position();
            let right = self.parse_factor()?;
            Self::require_kind(&right, right_at, Kind::Numeric, op.symbol())?;
            left = Node::binary(op, left, right);
        }
    }

    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        let token = self.peek().clone();
        let at = (token.line, token.column);
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Node::Literal(value))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Node::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Node::Bool(false))
            }
            TokenKind::Keyword(k @ (Keyword::CrossOver | Keyword::CrossUnder))
                if *self.peek_next() == TokenKind::LParen =>
            {
                self.advance();
                self.parse_cross_call(k, at)
            }
            TokenKind::Ident(name) if *self.peek_next() == TokenKind::LParen => {
                self.advance();
                self.parse_call(&name, at)
            }
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_series_ref(&name, at)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_bool_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Eof => Err(self.syntax_error("unexpected end of input, expected an expression")),
            other => Err(self.syntax_error(format!("unexpected {other}, expected an expression"))),
        }
    }

    /// Comma-separated arguments between parentheses, with each argument's position.
    fn parse_args(&mut self) -> Result<Vec<(Node, Pos)>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            let at = self.position();
            args.push((self.parse_bool_expr()?, at));
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(args);
        }
    }

    fn parse_cross_call(&mut self, keyword: Keyword, at: Pos) -> Result<Node, ParseError> {
        let op = match keyword {
            Keyword::CrossUnder => BinaryOp::CrossUnder,
            _ => BinaryOp::CrossOver,
        };
        let mut args = self.parse_args()?;
        if args.len() != 2 {
            return Err(Self::error(
                ParseErrorKind::Validation,
                at,
                format!("{} takes 2 arguments, got {}", op.symbol(), args.len()),
            ));
        }
        let (right, right_at) = args.remove(1);
        let (left, left_at) = args.remove(0);
        Self::require_kind(&left, left_at, Kind::Numeric, op.symbol())?;
        Self::require_kind(&right, right_at, Kind::Numeric, op.symbol())?;
        Ok(Node::binary(op, left, right))
    }

    fn parse_call(&mut self, name: &str, at: Pos) -> Result<Node, ParseError> {
        let Some(function) = Function::from_name(name) else {
            let message = if Series::from_name(name).is_some() {
                format!("'{}' is a series, not a function", name.to_ascii_lowercase())
            } else {
                format!(
                    "unknown function '{name}'{}; expected one of {}",
                    suggestion(name, &function_names()),
                    function_names().join(", ")
                )
            };
            return Err(Self::error(ParseErrorKind::Validation, at, message));
        };

        let args = self.parse_args()?;
        let types: Vec<ExprType> = args.iter().map(|(node, _)| node.static_type()).collect();
        if !signatures(function).iter().any(|sig| sig.len() == args.len()) {
            return Err(Self::error(
                ParseErrorKind::Validation,
                at,
                format!(
                    "{function} takes {} arguments, got {}",
                    arity_description(function),
                    args.len()
                ),
            ));
        }
        if match_signature(function, &types).is_none() {
            let expected: Vec<String> = signatures(function)
                .iter()
                .filter(|sig| sig.len() == args.len())
                .map(|sig| {
                    let params: Vec<&str> = sig.iter().map(|p| p.describe()).collect();
                    format!("({})", params.join(", "))
                })
                .collect();
            let found: Vec<&str> = types.iter().map(ExprType::describe).collect();
            return Err(Self::error(
                ParseErrorKind::Validation,
                at,
                format!(
                    "invalid arguments to {function}: expected {}, found ({})",
                    expected.join(" or "),
                    found.join(", ")
                ),
            ));
        }
        Ok(Node::call(
            function,
            args.into_iter().map(|(node, _)| node).collect(),
        ))
    }

    fn parse_series_ref(&mut self, name: &str, at: Pos) -> Result<Node, ParseError> {
        let Some(series) = Series::from_name(name) else {
            let message = if Function::from_name(name).is_some() {
                format!("'{name}' is a function; call it as {name}(...)")
            } else {
                format!(
                    "unknown series '{}'{}; expected one of {}",
                    name.to_ascii_lowercase(),
                    suggestion(name, &series_names()),
                    series_names().join(", ")
                )
            };
            return Err(Self::error(ParseErrorKind::Validation, at, message));
        };

        if !self.check(&TokenKind::LBracket) {
            return Ok(Node::series(series, 0));
        }
        self.advance();
        let lag = match self.peek().kind {
            TokenKind::Number(n) if n.fract() == 0.0 && n <= u32::MAX as f64 => n as usize,
            _ => {
                return Err(self.syntax_error(format!(
                    "expected a non-negative integer lag, found {}",
                    self.peek().kind
                )));
            }
        };
        self.advance();
        self.expect(TokenKind::RBracket)?;
        Ok(Node::series(series, lag))
    }
}

/// Parse a complete `ENTRY: ... EXIT: ...` strategy.
pub fn parse(input: &str) -> Result<Strategy, ParseError> {
    let mut parser = Parser::new(tokenize(input)?);
    let strategy = parser.parse_strategy()?;
    debug!(%strategy, "parsed strategy");
    Ok(strategy)
}

/// Parse a single expression with nothing after it.
pub fn parse_expression(input: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(tokenize(input)?);
    let node = parser.parse_bool_expr()?;
    if !parser.check(&TokenKind::Eof) {
        return Err(parser.syntax_error(format!(
            "unexpected {} after expression",
            parser.peek().kind
        )));
    }
    Ok(node)
}
