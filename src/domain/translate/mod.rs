//! Natural language to DSL translation.
//!
//! A [`Translator`] turns free English text into a [`StructuredStrategy`]
//! (ordered entry and exit clauses) and from there into DSL source via
//! [`structured_to_dsl`]. Two implementations share one clause lexicon and
//! differ only in how they split the text into entry and exit conditions.
//! The implementation is picked up front through [`TranslatorKind`].

pub mod heuristic;
pub mod lexicon;
pub mod sentence;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::domain::error::TranslateError;

pub use heuristic::HeuristicTranslator;
pub use sentence::SentenceTranslator;

/// How a clause joins the clause before it. Ignored on the first clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl Connective {
    pub fn keyword(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClauseOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "CROSSOVER")]
    CrossOver,
    #[serde(rename = "CROSSUNDER")]
    CrossUnder,
}

impl ClauseOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ClauseOp::Gt => ">",
            ClauseOp::Lt => "<",
            ClauseOp::CrossOver => "CROSSOVER",
            ClauseOp::CrossUnder => "CROSSUNDER",
        }
    }
}

/// One atomic comparison, with both operands already in DSL syntax.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    pub left: String,
    pub operator: ClauseOp,
    pub right: String,
    pub connective: Connective,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator.symbol(), self.right)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredStrategy {
    pub entry: Vec<Clause>,
    pub exit: Vec<Clause>,
}

impl StructuredStrategy {
    pub fn is_empty(&self) -> bool {
        self.entry.is_empty() && self.exit.is_empty()
    }
}

pub trait Translator {
    fn name(&self) -> &'static str;

    fn structure(&self, text: &str) -> Result<StructuredStrategy, TranslateError>;

    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let structured = self.structure(text)?;
        let dsl = structured_to_dsl(&structured);
        debug!(translator = self.name(), %dsl, "translated natural language rules");
        Ok(dsl)
    }
}

/// Render clauses left to right with their connectives, so AND binds
/// tighter than OR exactly as the DSL reads. An empty side becomes `FALSE`.
pub fn structured_to_dsl(structured: &StructuredStrategy) -> String {
    format!(
        "ENTRY: {}\nEXIT: {}",
        side_to_dsl(&structured.entry),
        side_to_dsl(&structured.exit)
    )
}

fn side_to_dsl(clauses: &[Clause]) -> String {
    let mut out = String::new();
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(clause.connective.keyword());
            out.push(' ');
        }
        out.push_str(&clause.to_string());
    }
    if out.is_empty() {
        out.push_str("FALSE");
    }
    out
}

/// Which translator to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslatorKind {
    #[default]
    Heuristic,
    Sentence,
}

impl TranslatorKind {
    pub fn build(self) -> Box<dyn Translator> {
        match self {
            TranslatorKind::Heuristic => Box::new(HeuristicTranslator),
            TranslatorKind::Sentence => Box::new(SentenceTranslator),
        }
    }
}

impl fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslatorKind::Heuristic => write!(f, "heuristic"),
            TranslatorKind::Sentence => write!(f, "sentence"),
        }
    }
}

impl FromStr for TranslatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "regex" => Ok(TranslatorKind::Heuristic),
            "sentence" | "sentences" => Ok(TranslatorKind::Sentence),
            other => Err(format!(
                "unknown translator '{other}', expected 'heuristic' or 'sentence'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(left: &str, operator: ClauseOp, right: &str, connective: Connective) -> Clause {
        Clause {
            left: left.into(),
            operator,
            right: right.into(),
            connective,
        }
    }

    #[test]
    fn dsl_keeps_connectives_in_order() {
        let structured = StructuredStrategy {
            entry: vec![
                clause("close", ClauseOp::Gt, "10", Connective::And),
                clause("volume", ClauseOp::Gt, "1000", Connective::Or),
                clause("RSI(close, 14)", ClauseOp::Lt, "30", Connective::And),
            ],
            exit: vec![],
        };
        assert_eq!(
            structured_to_dsl(&structured),
            "ENTRY: close > 10 OR volume > 1000 AND RSI(close, 14) < 30\nEXIT: FALSE"
        );
    }

    #[test]
    fn empty_sides_become_false() {
        let dsl = structured_to_dsl(&StructuredStrategy::default());
        assert_eq!(dsl, "ENTRY: FALSE\nEXIT: FALSE");
        assert!(crate::domain::parser::parse(&dsl).is_ok());
    }

    #[test]
    fn structured_serializes_to_json() {
        let structured = StructuredStrategy {
            entry: vec![clause("close", ClauseOp::CrossOver, "SHIFT(high, 1)", Connective::And)],
            exit: vec![],
        };
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["entry"][0]["operator"], "CROSSOVER");
        assert_eq!(json["entry"][0]["connective"], "AND");
        assert_eq!(json["entry"][0]["right"], "SHIFT(high, 1)");
    }

    #[test]
    fn kind_parses_and_builds() {
        assert_eq!("Sentence".parse::<TranslatorKind>(), Ok(TranslatorKind::Sentence));
        assert_eq!("heuristic".parse::<TranslatorKind>(), Ok(TranslatorKind::Heuristic));
        assert!("spacy".parse::<TranslatorKind>().is_err());
        assert_eq!(TranslatorKind::Sentence.build().name(), "sentence");
        assert_eq!(TranslatorKind::default().to_string(), "heuristic");
    }
}
