//! Strategy AST.
//!
//! The parser is the only producer of these nodes. A tree is immutable once
//! built and can be evaluated any number of times against different tables.
//! `Display` renders canonical DSL text that parses back to an equal tree.

use std::fmt;

use crate::domain::table::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
    CrossOver,
    CrossUnder,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::CrossOver => "CROSSOVER",
            BinaryOp::CrossUnder => "CROSSUNDER",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    /// `> < >= <= == !=`. The cross operators share their precedence but not
    /// their typing, see [`BinaryOp::is_cross`].
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Ge | BinaryOp::Le | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_cross(&self) -> bool {
        matches!(self, BinaryOp::CrossOver | BinaryOp::CrossUnder)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
            _ => 4,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

/// Built-in functions callable from the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sma,
    Ema,
    Rsi,
    Shift,
    Macd,
    MacdSignal,
    MacdHist,
    Bbands,
    BbUpper,
    BbLower,
}

impl Function {
    pub const ALL: [Function; 10] = [
        Function::Sma,
        Function::Ema,
        Function::Rsi,
        Function::Shift,
        Function::Macd,
        Function::MacdSignal,
        Function::MacdHist,
        Function::Bbands,
        Function::BbUpper,
        Function::BbLower,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sma => "SMA",
            Function::Ema => "EMA",
            Function::Rsi => "RSI",
            Function::Shift => "SHIFT",
            Function::Macd => "MACD",
            Function::MacdSignal => "MACD_SIGNAL",
            Function::MacdHist => "MACD_HIST",
            Function::Bbands => "BBANDS",
            Function::BbUpper => "BBUPPER",
            Function::BbLower => "BBLOWER",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(f64),
    Bool(bool),
    SeriesRef {
        series: Series,
        lag: usize,
    },
    FuncCall {
        function: Function,
        args: Vec<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Numeric,
    Boolean,
}

/// Static type of an expression, known without a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprType {
    pub shape: Shape,
    pub kind: Kind,
}

impl ExprType {
    pub const fn new(shape: Shape, kind: Kind) -> Self {
        Self { shape, kind }
    }

    pub fn describe(&self) -> &'static str {
        match (self.shape, self.kind) {
            (Shape::Scalar, Kind::Numeric) => "number",
            (Shape::Scalar, Kind::Boolean) => "boolean",
            (Shape::Sequence, Kind::Numeric) => "numeric series",
            (Shape::Sequence, Kind::Boolean) => "boolean series",
        }
    }
}

fn join(a: Shape, b: Shape) -> Shape {
    if a == Shape::Sequence || b == Shape::Sequence {
        Shape::Sequence
    } else {
        Shape::Scalar
    }
}

impl Node {
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Node) -> Node {
        Node::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn series(series: Series, lag: usize) -> Node {
        Node::SeriesRef { series, lag }
    }

    pub fn call(function: Function, args: Vec<Node>) -> Node {
        Node::FuncCall { function, args }
    }

    /// Result type of this expression. Assumes the tree passed validation.
    pub fn static_type(&self) -> ExprType {
        match self {
            Node::Literal(_) => ExprType::new(Shape::Scalar, Kind::Numeric),
            Node::Bool(_) => ExprType::new(Shape::Scalar, Kind::Boolean),
            Node::SeriesRef { .. } => ExprType::new(Shape::Sequence, Kind::Numeric),
            Node::FuncCall { function, args } => {
                let kind = match (function, args.first()) {
                    (Function::Shift, Some(arg)) => arg.static_type().kind,
                    _ => Kind::Numeric,
                };
                ExprType::new(Shape::Sequence, kind)
            }
            Node::Unary { operand, .. } => {
                ExprType::new(operand.static_type().shape, Kind::Boolean)
            }
            Node::Binary { op, left, right } => {
                let shape = join(left.static_type().shape, right.static_type().shape);
                if op.is_arithmetic() {
                    ExprType::new(shape, Kind::Numeric)
                } else if op.is_cross() {
                    ExprType::new(Shape::Sequence, Kind::Boolean)
                } else {
                    ExprType::new(shape, Kind::Boolean)
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Node::Binary { op, .. } => op.precedence(),
            Node::Unary { .. } => 3,
            _ => 7,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, needs_parens: bool) -> fmt::Result {
        if needs_parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(v) => write!(f, "{v}"),
            Node::Bool(true) => f.write_str("TRUE"),
            Node::Bool(false) => f.write_str("FALSE"),
            Node::SeriesRef { series, lag: 0 } => write!(f, "{series}"),
            Node::SeriesRef { series, lag } => write!(f, "{series}[{lag}]"),
            Node::FuncCall { function, args } => {
                write!(f, "{function}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Node::Unary { operand, .. } => {
                f.write_str("NOT ")?;
                operand.fmt_operand(f, operand.precedence() < 3)
            }
            Node::Binary { op, left, right } => {
                let p = op.precedence();
                // Comparisons do not chain, so neither side may be another comparison.
                let left_parens = if p == 4 {
                    left.precedence() <= p
                } else {
                    left.precedence() < p
                };
                left.fmt_operand(f, left_parens)?;
                write!(f, " {op} ")?;
                right.fmt_operand(f, right.precedence() <= p)
            }
        }
    }
}

/// Root of a parsed strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub entry: Node,
    pub exit: Node,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ENTRY: {} EXIT: {}", self.entry, self.exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close() -> Node {
        Node::series(Series::Close, 0)
    }

    #[test]
    fn display_function_call() {
        let node = Node::call(Function::Sma, vec![close(), Node::Literal(20.0)]);
        assert_eq!(node.to_string(), "SMA(close, 20)");
    }

    #[test]
    fn display_lagged_series() {
        assert_eq!(Node::series(Series::High, 1).to_string(), "high[1]");
    }

    #[test]
    fn display_parenthesizes_lower_precedence() {
        let sum = Node::binary(BinaryOp::Add, close(), Node::Literal(1.0));
        let product = Node::binary(BinaryOp::Mul, sum, Node::Literal(2.0));
        assert_eq!(product.to_string(), "(close + 1) * 2");
    }

    #[test]
    fn display_left_associative_subtraction() {
        let inner = Node::binary(BinaryOp::Sub, Node::Literal(5.0), Node::Literal(3.0));
        let right_nested = Node::binary(BinaryOp::Sub, Node::Literal(10.0), inner.clone());
        assert_eq!(right_nested.to_string(), "10 - (5 - 3)");
        let left_nested = Node::binary(BinaryOp::Sub, inner, Node::Literal(1.0));
        assert_eq!(left_nested.to_string(), "5 - 3 - 1");
    }

    #[test]
    fn display_not_and_or() {
        let cmp = Node::binary(BinaryOp::Eq, Node::Bool(false), Node::Bool(true));
        let node = Node::binary(
            BinaryOp::Or,
            Node::binary(BinaryOp::And, Node::not(cmp.clone()), cmp.clone()),
            cmp,
        );
        assert_eq!(
            node.to_string(),
            "NOT FALSE == TRUE AND FALSE == TRUE OR FALSE == TRUE"
        );
    }

    #[test]
    fn display_not_of_and_needs_parens() {
        let and = Node::binary(BinaryOp::And, Node::Bool(true), Node::Bool(false));
        assert_eq!(Node::not(and).to_string(), "NOT (TRUE AND FALSE)");
    }

    #[test]
    fn static_types() {
        let seq_num = ExprType::new(Shape::Sequence, Kind::Numeric);
        let seq_bool = ExprType::new(Shape::Sequence, Kind::Boolean);
        assert_eq!(close().static_type(), seq_num);
        assert_eq!(
            Node::binary(BinaryOp::Gt, close(), Node::Literal(1.0)).static_type(),
            seq_bool
        );
        assert_eq!(
            Node::binary(BinaryOp::CrossOver, Node::Literal(1.0), Node::Literal(2.0)).static_type(),
            seq_bool
        );
        assert_eq!(
            Node::binary(BinaryOp::Eq, Node::Bool(true), Node::Bool(true)).static_type(),
            ExprType::new(Shape::Scalar, Kind::Boolean)
        );
        let shifted = Node::call(
            Function::Shift,
            vec![Node::binary(BinaryOp::Gt, close(), Node::Literal(1.0)), Node::Literal(1.0)],
        );
        assert_eq!(shifted.static_type(), seq_bool);
    }

    #[test]
    fn function_lookup_is_case_insensitive() {
        assert_eq!(Function::from_name("macd_signal"), Some(Function::MacdSignal));
        assert_eq!(Function::from_name("BbLower"), Some(Function::BbLower));
        assert_eq!(Function::from_name("wma"), None);
    }

    #[test]
    fn strategy_display() {
        let strategy = Strategy {
            entry: Node::binary(BinaryOp::Gt, close(), Node::Literal(0.0)),
            exit: Node::Bool(false),
        };
        assert_eq!(strategy.to_string(), "ENTRY: close > 0 EXIT: FALSE");
    }
}
