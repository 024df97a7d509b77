//! Sentence-driven translator.
//!
//! Splits the text into sentences (and splits again where a sentence turns
//! to a new verb, as in "... and sell when ..."), then classifies each piece
//! by its leading verb. Pieces without one count as entry conditions, so
//! "When RSI drops below 30, buy." still reads as an entry rule.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::lexicon::{self, Side};
use super::{StructuredStrategy, Translator};
use crate::domain::error::TranslateError;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?;]+(?:\s+|$)").unwrap());

static VERB_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",?\s+(?:and|but|then)\s+(?:then\s+)?(buy|enter|go long|sell|exit|go flat)\b").unwrap()
});

static LEADING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(buy|enter|go long|trigger entry|sell|exit|close the position|go flat)\b").unwrap()
});

static CONDITION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:when|if|once|whenever)\s+").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceTranslator;

fn sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    for sentence in SENTENCE_END.split(text) {
        let mut start = 0;
        for caps in VERB_BREAK.captures_iter(sentence) {
            if let (Some(whole), Some(verb)) = (caps.get(0), caps.get(1)) {
                pieces.push(&sentence[start..whole.start()]);
                start = verb.start();
            }
        }
        pieces.push(&sentence[start..]);
    }
    pieces.retain(|p| !p.trim().is_empty());
    pieces
}

fn classify(sentence: &str) -> Side {
    match LEADING_VERB.captures(sentence).and_then(|c| c.get(1)) {
        Some(verb) => Side::from_verb(verb.as_str()),
        None => Side::Entry,
    }
}

fn condition(sentence: &str) -> &str {
    if let Some(m) = CONDITION_START.find(sentence) {
        return &sentence[m.end()..];
    }
    match LEADING_VERB.find(sentence) {
        Some(m) => &sentence[m.end()..],
        None => sentence,
    }
}

impl Translator for SentenceTranslator {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn structure(&self, text: &str) -> Result<StructuredStrategy, TranslateError> {
        let normalized = lexicon::normalize(text);
        let mut structured = StructuredStrategy::default();

        for sentence in sentences(&normalized) {
            let side = classify(sentence);
            let clauses = lexicon::conditions(condition(sentence));
            trace!(sentence, ?side, clauses = clauses.len(), "classified sentence");
            match side {
                Side::Entry => structured.entry.extend(clauses),
                Side::Exit => structured.exit.extend(clauses),
            }
        }

        if structured.is_empty() {
            return Err(TranslateError::NoClauses {
                text: text.trim().to_string(),
            });
        }
        debug!(
            entry = structured.entry.len(),
            exit = structured.exit.len(),
            "structured natural language rules"
        );
        Ok(structured)
    }
}
