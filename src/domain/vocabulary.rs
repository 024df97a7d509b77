//! Fixed DSL vocabulary: allowed series, function signatures and
//! closest-name suggestions for misspellings.

use crate::domain::ast::{ExprType, Function, Kind, Shape};
use crate::domain::table::Series;

/// One formal parameter of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Numeric sequence.
    Numbers,
    /// Sequence of either kind.
    AnySequence,
    /// Numeric scalar (window, period, multiplier, lag).
    Number,
}

impl Param {
    pub fn accepts(&self, ty: ExprType) -> bool {
        match self {
            Param::Numbers => ty.shape == Shape::Sequence && ty.kind == Kind::Numeric,
            Param::AnySequence => ty.shape == Shape::Sequence,
            Param::Number => ty.shape == Shape::Scalar && ty.kind == Kind::Numeric,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Param::Numbers => "numeric series",
            Param::AnySequence => "series",
            Param::Number => "number",
        }
    }
}

use Param::{AnySequence, Number, Numbers};

const MOVING_AVERAGE: &[&[Param]] = &[&[Numbers, Number], &[Number]];
const RSI: &[&[Param]] = &[&[Numbers, Number], &[Numbers], &[Number]];
const SHIFT: &[&[Param]] = &[&[AnySequence, Number]];
const MACD: &[&[Param]] = &[&[Numbers], &[Numbers, Number, Number, Number]];
const BANDS: &[&[Param]] = &[&[Numbers], &[Numbers, Number], &[Numbers, Number, Number]];

/// Accepted parameter lists, in the order they are tried.
pub fn signatures(function: Function) -> &'static [&'static [Param]] {
    match function {
        Function::Sma | Function::Ema => MOVING_AVERAGE,
        Function::Rsi => RSI,
        Function::Shift => SHIFT,
        Function::Macd | Function::MacdSignal | Function::MacdHist => MACD,
        Function::Bbands | Function::BbUpper | Function::BbLower => BANDS,
    }
}

/// Accepted argument counts, e.g. `"1 or 2"`.
pub fn arity_description(function: Function) -> String {
    let mut counts: Vec<usize> = signatures(function).iter().map(|s| s.len()).collect();
    counts.sort_unstable();
    counts.dedup();
    let parts: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::from("0"),
    }
}

/// Signature matching `args`, if any.
pub fn match_signature(function: Function, args: &[ExprType]) -> Option<&'static [Param]> {
    signatures(function).iter().copied().find(|sig| {
        sig.len() == args.len() && sig.iter().zip(args).all(|(p, a)| p.accepts(*a))
    })
}

pub fn series_names() -> Vec<&'static str> {
    Series::ALL.iter().map(|s| s.name()).collect()
}

pub fn function_names() -> Vec<&'static str> {
    Function::ALL.iter().map(|f| f.name()).collect()
}

/// Edit distance between two strings, compared case-insensitively.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_ascii_lowercase().chars().collect();
    let b: Vec<char> = b.to_ascii_lowercase().chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max(1, len/3)` edits of `name`.
pub fn closest<'a>(name: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let limit = (name.chars().count() / 3).max(1);
    candidates
        .iter()
        .map(|c| (levenshtein(name, c), *c))
        .filter(|(d, _)| *d <= limit)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c)
}

/// `" (did you mean 'x'?)"` or an empty string.
pub fn suggestion(name: &str, candidates: &[&str]) -> String {
    closest(name, candidates)
        .map(|c| format!(" (did you mean '{c}'?)"))
        .unwrap_or_default()
}
