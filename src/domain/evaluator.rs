//! Tree-walking signal evaluator.
//!
//! # Evaluation Semantics
//!
//! - Children are evaluated before parents; the table is never mutated.
//! - `name[lag]` and `SHIFT(x, lag)` see row `i - lag` at row `i`. Rows before
//!   the shift horizon are undefined (numeric) or false (boolean).
//! - Arithmetic and comparisons broadcast scalars against sequences. Any
//!   comparison touching an undefined value is false. `==`/`!=` use an
//!   absolute tolerance of 1e-9.
//! - `CROSSOVER(a, b)` is true at row `i` iff `a[i] > b[i]` and
//!   `a[i-1] <= b[i-1]`. Row 0 and rows with an undefined operand are false.
//! - Argument arity and types are checked again here even though the parser
//!   already rejects bad calls, so hand-built trees fail with a typed error.

use std::borrow::Cow;

use tracing::debug;

use crate::domain::ast::{BinaryOp, Function, Node, Strategy, UnaryOp};
use crate::domain::error::{EvalError, InputError};
use crate::domain::indicator::{self, bollinger, macd, rsi};
use crate::domain::table::{PriceTable, RowKey, Series};
use crate::domain::value::{BoolView, NumView, Value, boolean, numeric};
use crate::domain::vocabulary::{arity_description, signatures};

const EPSILON: f64 = 1e-9;

/// Entry and exit signals aligned with the table's row keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub keys: Vec<RowKey>,
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl Signals {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Evaluate both sides of a strategy and coerce each to one boolean per row.
/// Undefined values become false.
pub fn generate_signals(strategy: &Strategy, table: &PriceTable) -> Result<Signals, EvalError> {
    let len = table.len();
    let entry = evaluate(&strategy.entry, table)?.to_signal(len);
    let exit = evaluate(&strategy.exit, table)?.to_signal(len);
    debug!(
        rows = len,
        entries = entry.iter().filter(|b| **b).count(),
        exits = exit.iter().filter(|b| **b).count(),
        "generated signals"
    );
    Ok(Signals {
        keys: table.keys().to_vec(),
        entry,
        exit,
    })
}

pub fn evaluate(node: &Node, table: &PriceTable) -> Result<Value, EvalError> {
    match node {
        Node::Literal(v) => Ok(Value::Number(*v)),
        Node::Bool(b) => Ok(Value::Boolean(*b)),
        Node::SeriesRef { series, lag } => {
            Ok(Value::Numbers(shift(&table.series(*series), *lag, None)))
        }
        Node::FuncCall { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, table))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &values, table)
        }
        Node::Unary {
            op: UnaryOp::Not,
            operand,
        } => {
            let value = evaluate(operand, table)?;
            Ok(match boolean(&value, "NOT")? {
                BoolView::Scalar(b) => Value::Boolean(!b),
                BoolView::Seq(v) => {
                    Value::Booleans(v.iter().map(|b| !b).collect())
                }
            })
        }
        Node::Binary { op, left, right } => {
            let left = evaluate(left, table)?;
            let right = evaluate(right, table)?;
            binary(*op, &left, &right, table.len())
        }
    }
}

fn shift<T: Clone>(values: &[T], lag: usize, fill: T) -> Vec<T> {
    let lag = lag.min(values.len());
    let mut out = vec![fill; lag];
    out.extend_from_slice(&values[..values.len() - lag]);
    out
}

fn binary(op: BinaryOp, left: &Value, right: &Value, len: usize) -> Result<Value, EvalError> {
    let context = op.symbol();
    if op.is_logical() {
        let (l, r) = (boolean(left, context)?, boolean(right, context)?);
        let apply = |a: bool, b: bool| match op {
            BinaryOp::And => a && b,
            _ => a || b,
        };
        if l.is_scalar() && r.is_scalar() {
            return Ok(Value::Boolean(apply(l.at(0), r.at(0))));
        }
        return Ok(Value::Booleans((0..len).map(|i| apply(l.at(i), r.at(i))).collect()));
    }

    if op.is_cross() {
        let (l, r) = (numeric(left, context, false)?, numeric(right, context, false)?);
        return Ok(Value::Booleans(cross(op, &l, &r, len)));
    }

    if op.is_arithmetic() {
        let (l, r) = (numeric(left, context, false)?, numeric(right, context, false)?);
        let apply = |a: f64, b: f64| match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            _ => a / b,
        };
        if l.is_scalar() && r.is_scalar() {
            let result = l.at(0).zip(r.at(0)).map(|(a, b)| apply(a, b));
            // Stays scalar even when undefined; NaN reads back as undefined.
            return Ok(Value::Number(result.unwrap_or(f64::NAN)));
        }
        return Ok(Value::numbers(
            (0..len).map(|i| Some(apply(l.at(i)?, r.at(i)?))),
        ));
    }

    let (l, r) = (numeric(left, context, true)?, numeric(right, context, true)?);
    let compare = |a: Option<f64>, b: Option<f64>| -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return false;
        };
        match op {
            BinaryOp::Gt => a > b,
            BinaryOp::Lt => a < b,
            BinaryOp::Ge => a >= b,
            BinaryOp::Le => a <= b,
            BinaryOp::Eq => (a - b).abs() < EPSILON,
            _ => (a - b).abs() >= EPSILON,
        }
    };
    if l.is_scalar() && r.is_scalar() {
        return Ok(Value::Boolean(compare(l.at(0), r.at(0))));
    }
    Ok(Value::Booleans(
        (0..len).map(|i| compare(l.at(i), r.at(i))).collect(),
    ))
}

fn cross(op: BinaryOp, l: &NumView<'_>, r: &NumView<'_>, len: usize) -> Vec<bool> {
    (0..len)
        .map(|i| {
            if i == 0 {
                return false;
            }
            let (Some(a), Some(b), Some(pa), Some(pb)) =
                (l.at(i), r.at(i), l.at(i - 1), r.at(i - 1))
            else {
                return false;
            };
            match op {
                BinaryOp::CrossUnder => a < b && pa >= pb,
                _ => a > b && pa <= pb,
            }
        })
        .collect()
}

fn scalar(function: Function, what: &str, value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::TypeMismatch {
            context: format!("{function} {what}"),
            expected: "number",
            found: other.type_name(),
        }),
    }
}

fn integer(function: Function, what: &str, value: &Value) -> Result<f64, EvalError> {
    let n = scalar(function, what, value)?;
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(EvalError::InvalidArgument {
            function: function.name().to_string(),
            reason: format!("{what} must be an integer, got {n}"),
        });
    }
    Ok(n)
}

/// Positive integer window; zero and negatives are input errors.
fn window(function: Function, what: &str, value: &Value) -> Result<usize, EvalError> {
    let n = integer(function, what, value)?;
    if n <= 0.0 {
        return Err(InputError::NonPositiveWindow { window: n as i64 }.into());
    }
    Ok(n as usize)
}

fn source<'a>(function: Function, value: &'a Value) -> Result<&'a [Option<f64>], EvalError> {
    match value {
        Value::Numbers(v) => Ok(v),
        other => Err(EvalError::TypeMismatch {
            context: format!("{function} input"),
            expected: "numeric series",
            found: other.type_name(),
        }),
    }
}

/// Input series and optional window for SMA, EMA and RSI. A lone scalar
/// argument is a window applied to `close`.
fn series_and_window<'a>(
    function: Function,
    args: &'a [Value],
    table: &PriceTable,
) -> Result<(Cow<'a, [Option<f64>]>, Option<usize>), EvalError> {
    match args {
        [Value::Number(_)] => Ok((
            Cow::Owned(table.series(Series::Close)),
            Some(window(function, "window", &args[0])?),
        )),
        [input] => Ok((Cow::Borrowed(source(function, input)?), None)),
        [input, w] => Ok((
            Cow::Borrowed(source(function, input)?),
            Some(window(function, "window", w)?),
        )),
        _ => Err(EvalError::Arity {
            function: function.name().to_string(),
            expected: arity_description(function),
            actual: args.len(),
        }),
    }
}

fn call(function: Function, args: &[Value], table: &PriceTable) -> Result<Value, EvalError> {
    if !signatures(function).iter().any(|sig| sig.len() == args.len()) {
        return Err(EvalError::Arity {
            function: function.name().to_string(),
            expected: arity_description(function),
            actual: args.len(),
        });
    }

    match function {
        Function::Sma | Function::Ema => {
            let (input, w) = series_and_window(function, args, table)?;
            let Some(w) = w else {
                return Err(EvalError::TypeMismatch {
                    context: format!("{function} window"),
                    expected: "number",
                    found: "nothing",
                });
            };
            let out = if function == Function::Sma {
                indicator::sma(&input, w)?
            } else {
                indicator::ema(&input, w)?
            };
            Ok(Value::Numbers(out))
        }
        Function::Rsi => {
            let (input, w) = series_and_window(function, args, table)?;
            Ok(Value::Numbers(indicator::rsi(&input, w.unwrap_or(rsi::DEFAULT_WINDOW))?))
        }
        Function::Shift => {
            let lag = integer(function, "lag", &args[1])?;
            if lag < 0.0 {
                return Err(EvalError::InvalidArgument {
                    function: function.name().to_string(),
                    reason: format!("lag must be non-negative, got {lag} (negative lag looks ahead)"),
                });
            }
            let lag = lag as usize;
            match &args[0] {
                Value::Numbers(v) => Ok(Value::Numbers(shift(v, lag, None))),
                Value::Booleans(v) => Ok(Value::Booleans(shift(v, lag, false))),
                other => Err(EvalError::TypeMismatch {
                    context: "SHIFT input".to_string(),
                    expected: "series",
                    found: other.type_name(),
                }),
            }
        }
        Function::Macd | Function::MacdSignal | Function::MacdHist => {
            let input = source(function, &args[0])?;
            let (fast, slow, signal) = if args.len() == 4 {
                (
                    window(function, "fast period", &args[1])?,
                    window(function, "slow period", &args[2])?,
                    window(function, "signal period", &args[3])?,
                )
            } else {
                (macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL)
            };
            let out = indicator::macd(input, fast, slow, signal)?;
            Ok(Value::Numbers(match function {
                Function::Macd => out.line,
                Function::MacdSignal => out.signal,
                _ => out.histogram,
            }))
        }
        Function::Bbands | Function::BbUpper | Function::BbLower => {
            let input = source(function, &args[0])?;
            let period = match args.get(1) {
                Some(v) => window(function, "period", v)?,
                None => bollinger::DEFAULT_PERIOD,
            };
            let std_mult = match args.get(2) {
                Some(v) => scalar(function, "standard deviation multiplier", v)?,
                None => bollinger::DEFAULT_STD_MULT,
            };
            let bands = indicator::bbands(input, period, std_mult)?;
            Ok(Value::numbers(match function {
                Function::Bbands => bands.middle,
                Function::BbUpper => bands.upper,
                _ => bands.lower,
            }))
        }
    }
}
