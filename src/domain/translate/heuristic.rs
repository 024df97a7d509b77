//! Marker-driven translator.
//!
//! Finds "buy when", "sell if", "exit once" style markers anywhere in the
//! text. Each marker opens a segment that runs to the end of its sentence
//! or to the next marker. Text with no marker at all is read as entry
//! conditions.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::lexicon::{self, Side};
use super::{StructuredStrategy, Translator};
use crate::domain::error::TranslateError;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(buy|enter|go long|trigger entry|sell|exit|close the position|go flat)\s+(?:when|if|once|whenever)\s+",
    )
    .unwrap()
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?;](?:\s|$)").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTranslator;

struct Marker {
    side: Side,
    start: usize,
    body: usize,
}

fn first_sentence(text: &str) -> &str {
    match SENTENCE_END.find(text) {
        Some(end) => &text[..end.start()],
        None => text,
    }
}

impl Translator for HeuristicTranslator {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn structure(&self, text: &str) -> Result<StructuredStrategy, TranslateError> {
        let normalized = lexicon::normalize(text);
        let markers: Vec<Marker> = MARKER
            .captures_iter(&normalized)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Marker {
                    side: Side::from_verb(caps.get(1)?.as_str()),
                    start: whole.start(),
                    body: whole.end(),
                })
            })
            .collect();

        let mut structured = StructuredStrategy::default();
        if markers.is_empty() {
            debug!("no entry or exit marker, reading the whole text as entry conditions");
            structured.entry = lexicon::conditions(&normalized);
        }
        for (n, marker) in markers.iter().enumerate() {
            let end = markers.get(n + 1).map_or(normalized.len(), |next| next.start);
            let clauses = lexicon::conditions(first_sentence(&normalized[marker.body..end]));
            match marker.side {
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
