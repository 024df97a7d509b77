//! Evaluator value type: a scalar or a row-aligned sequence, numeric or
//! boolean, with the broadcast rules applied at every operator boundary.

use std::borrow::Cow;

use crate::domain::ast::{ExprType, Kind, Shape};
use crate::domain::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    /// `None` marks an undefined row.
    Numbers(Vec<Option<f64>>),
    Booleans(Vec<bool>),
}

impl Value {
    pub fn expr_type(&self) -> ExprType {
        match self {
            Value::Number(_) => ExprType::new(Shape::Scalar, Kind::Numeric),
            Value::Boolean(_) => ExprType::new(Shape::Scalar, Kind::Boolean),
            Value::Numbers(_) => ExprType::new(Shape::Sequence, Kind::Numeric),
            Value::Booleans(_) => ExprType::new(Shape::Sequence, Kind::Boolean),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.expr_type().describe()
    }

    /// Row-aligned booleans of length `len`. Scalars are broadcast; numbers
    /// are true when defined and non-zero, so undefined rows become false.
    pub fn to_signal(&self, len: usize) -> Vec<bool> {
        match self {
            Value::Boolean(b) => vec![*b; len],
            Value::Number(n) => vec![n.is_finite() && *n != 0.0; len],
            Value::Booleans(v) => v.clone(),
            Value::Numbers(v) => v.iter().map(|x| x.is_some_and(|x| x != 0.0)).collect(),
        }
    }

    /// Sequence value from raw results, mapping non-finite numbers to undefined.
    pub fn numbers(values: impl IntoIterator<Item = Option<f64>>) -> Value {
        Value::Numbers(
            values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        )
    }
}

/// Numeric view of an operand: a broadcastable scalar or a borrowed sequence.
#[derive(Debug, Clone)]
pub(crate) enum NumView<'a> {
    Scalar(Option<f64>),
    Seq(Cow<'a, [Option<f64>]>),
}

impl NumView<'_> {
    pub(crate) fn at(&self, i: usize) -> Option<f64> {
        match self {
            NumView::Scalar(v) => *v,
            NumView::Seq(s) => s.get(i).copied().flatten(),
        }
    }

    pub(crate) fn is_scalar(&self) -> bool {
        matches!(self, NumView::Scalar(_))
    }
}

/// Boolean view of an operand.
#[derive(Debug, Clone)]
pub(crate) enum BoolView<'a> {
    Scalar(bool),
    Seq(&'a [bool]),
}

impl BoolView<'_> {
    pub(crate) fn at(&self, i: usize) -> bool {
        match self {
            BoolView::Scalar(b) => *b,
            BoolView::Seq(s) => s.get(i).copied().unwrap_or(false),
        }
    }

    pub(crate) fn is_scalar(&self) -> bool {
        matches!(self, BoolView::Scalar(_))
    }
}

fn mismatch(context: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: context.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Numeric operand. Booleans are admitted as 1/0 only when `allow_boolean`.
pub(crate) fn numeric<'a>(
    value: &'a Value,
    context: &str,
    allow_boolean: bool,
) -> Result<NumView<'a>, EvalError> {
    let as_number = |b: bool| if b { 1.0 } else { 0.0 };
    match value {
        Value::Number(n) => Ok(NumView::Scalar(n.is_finite().then_some(*n))),
        Value::Numbers(v) => Ok(NumView::Seq(Cow::Borrowed(v))),
        Value::Boolean(b) if allow_boolean => Ok(NumView::Scalar(Some(as_number(*b)))),
        Value::Booleans(v) if allow_boolean => Ok(NumView::Seq(Cow::Owned(
            v.iter().map(|b| Some(as_number(*b))).collect(),
        ))),
        other => Err(mismatch(context, "numeric operand", other)),
    }
}

pub(crate) fn boolean<'a>(value: &'a Value, context: &str) -> Result<BoolView<'a>, EvalError> {
    match value {
        Value::Boolean(b) => Ok(BoolView::Scalar(*b)),
        Value::Booleans(v) => Ok(BoolView::Seq(v)),
        other => Err(mismatch(context, "boolean operand", other)),
    }
}
