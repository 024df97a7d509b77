//! Clause lexicon shared by the translators.
//!
//! Maps one atomic English condition ("the close is above the 20-day moving
//! average") onto a DSL comparison. Input is expected to be normalized with
//! [`normalize`] first. Recognizers are tried in order and the first match
//! wins, so the more specific phrasings come first.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use super::{Clause, ClauseOp, Connective};
use crate::domain::indicator::rsi::DEFAULT_WINDOW as RSI_WINDOW;

/// Bars standing in for "last week" and "last month".
const WEEK_BARS: usize = 5;
const MONTH_BARS: usize = 21;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static CONNECTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+(and|or)\s+").unwrap());

static TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[\s,;.!?]+(?:and|or|then))?[\s,;.!?]*$").unwrap());

static CROSS_UP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cross(?:es|ed|ing)?|breaks?|broke)\s+(?:out\s+)?(?:above|over)\b|\bcrossover\b")
        .unwrap()
});

static CROSS_DOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cross(?:es|ed|ing)?|breaks?|broke)\s+(?:down\s+)?(?:below|under)\b|\bcrossunder\b")
        .unwrap()
});

static ABOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:above|over|greater than|higher than|more than|exceeds?)\b").unwrap()
});

static BELOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:below|under|less than|lower than)\b").unwrap());

static THRESHOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:above|over|greater than|higher than|more than|exceeds?|below|under|less than|lower than)\s+(?:the\s+)?\$?((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)\s*(k|m|million|thousand)?\b",
    )
    .unwrap()
});

static SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(volume|close|closing price|closes|price)\b").unwrap());

static MOVING_AVERAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+)[\s-]*(?:day|period|bar)?[\s-]*(exponential moving average|simple moving average|moving average|sma|ema|average)\b",
    )
    .unwrap()
});

static RSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b(\d+)[\s-]*(?:day|period)?[\s-]*)?\brsi\b(?:\s*\(\s*(\d+)\s*\))?").unwrap()
});

static HISTOGRAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bhist(?:ogram)?\b").unwrap());

static BOLLINGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:bollinger|bands?)\b").unwrap());

static BAND_SIDE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(upper|lower)\b").unwrap());

static BAND_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d+)\s*(?:,\s*(\d+(?:\.\d+)?)\s*)?\)").unwrap()
});

static PRIOR_BAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:yesterday(?:'s)?|(?:the\s+)?(?:previous|prior|last)\s+(?:day|bar|session)(?:'s)?)\s+(high|low|close|open)\b",
    )
    .unwrap()
});

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:percent|%)").unwrap());

static LOOKBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:last|previous|prior|the past)\s+(week|month)\b").unwrap());

static DECREASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:decreas|drop|fall|fell|declin)").unwrap());

/// Which side of the strategy a piece of text describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Entry,
    Exit,
}

impl Side {
    /// Side named by a leading verb such as "buy" or "sell".
    pub fn from_verb(verb: &str) -> Side {
        match verb {
            "sell" | "exit" | "close the position" | "go flat" => Side::Exit,
            _ => Side::Entry,
        }
    }
}

/// Lower-case, straighten apostrophes and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
    WHITESPACE.replace_all(&lowered, " ").into_owned()
}

/// Split a condition list on "and"/"or" and recognize each part. Parts the
/// lexicon does not know are skipped; the connective before them carries
/// over to the next recognized clause.
pub fn conditions(text: &str) -> Vec<Clause> {
    let text = TRAILING.replace(text.trim(), "");
    let mut clauses = Vec::new();
    let mut connective = Connective::And;
    let mut start = 0;

    for caps in CONNECTIVE.captures_iter(&text) {
        let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_clause(&text[start..whole.start()], connective, &mut clauses);
        connective = if word.as_str() == "or" {
            Connective::Or
        } else {
            Connective::And
        };
        start = whole.end();
    }
    push_clause(&text[start..], connective, &mut clauses);
    clauses
}

fn push_clause(part: &str, connective: Connective, clauses: &mut Vec<Clause>) {
    match recognize(part) {
        Some(mut clause) => {
            clause.connective = connective;
            trace!(part, clause = %clause, "recognized clause");
            clauses.push(clause);
        }
        None => trace!(part, "no clause recognized"),
    }
}

type Comparison = (String, ClauseOp, String);

const RECOGNIZERS: &[fn(&str) -> Option<Comparison>] = &[
    moving_average_cross,
    macd,
    bollinger,
    prior_bar,
    volume_versus_average,
    rsi,
    price_versus_moving_average,
    volume_threshold,
    price_threshold,
];

/// Recognize a single atomic condition.
pub fn recognize(text: &str) -> Option<Clause> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    RECOGNIZERS
        .iter()
        .find_map(|recognizer| recognizer(text))
        .map(|(left, operator, right)| Clause {
            left,
            operator,
            right,
            connective: Connective::And,
        })
}

/// Crossing verbs win over plain comparisons; otherwise the earlier of
/// "above"/"below" phrasing decides.
fn operator(text: &str) -> Option<ClauseOp> {
    if CROSS_UP.is_match(text) {
        return Some(ClauseOp::CrossOver);
    }
    if CROSS_DOWN.is_match(text) {
        return Some(ClauseOp::CrossUnder);
    }
    let above = ABOVE.find(text).map(|m| m.start());
    let below = BELOW.find(text).map(|m| m.start());
    match (above, below) {
        (Some(a), Some(b)) if b < a => Some(ClauseOp::Lt),
        (Some(_), _) => Some(ClauseOp::Gt),
        (None, Some(_)) => Some(ClauseOp::Lt),
        (None, None) => None,
    }
}

fn is_upward(op: ClauseOp) -> bool {
    matches!(op, ClauseOp::Gt | ClauseOp::CrossOver)
}

/// Number following a comparison phrase, with k/m/thousand/million applied.
fn threshold(text: &str) -> Option<f64> {
    let caps = THRESHOLD.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("k" | "thousand") => 1e3,
        Some("m" | "million") => 1e6,
        _ => 1.0,
    };
    Some(tidy(value * multiplier))
}

/// Drop float noise such as 1100000.0000000002.
fn tidy(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn number(value: f64) -> String {
    format!("{value}")
}

/// Series the condition talks about, if it names one.
fn subject(text: &str) -> Option<&'static str> {
    let caps = SUBJECT.captures(text)?;
    match caps.get(1)?.as_str() {
        "volume" => Some("volume"),
        _ => Some("close"),
    }
}

fn moving_average(caps: &Captures<'_>, source: &str) -> Option<String> {
    let window: usize = caps.get(1)?.as_str().parse().ok()?;
    let kind = caps.get(2)?.as_str();
    let function = if kind == "ema" || kind.starts_with("exponential") {
        "EMA"
    } else {
        "SMA"
    };
    Some(format!("{function}({source}, {window})"))
}

fn moving_average_cross(text: &str) -> Option<Comparison> {
    let mut averages = MOVING_AVERAGE.captures_iter(text);
    let fast = averages.next()?;
    let slow = averages.next()?;
    Some((
        moving_average(&fast, "close")?,
        operator(text)?,
        moving_average(&slow, "close")?,
    ))
}

fn macd(text: &str) -> Option<Comparison> {
    if !text.contains("macd") {
        return None;
    }
    let op = operator(text)?;
    let level = || threshold(text).map_or_else(|| "0".to_string(), number);
    if HISTOGRAM.is_match(text) {
        return Some(("MACD_HIST(close)".to_string(), op, level()));
    }
    let right = if text.contains("signal") {
        "MACD_SIGNAL(close)".to_string()
    } else {
        level()
    };
    Some(("MACD(close)".to_string(), op, right))
}

fn bollinger(text: &str) -> Option<Comparison> {
    if !BOLLINGER.is_match(text) {
        return None;
    }
    let op = operator(text)?;
    let upper = match BAND_SIDE.captures(text).and_then(|c| c.get(1)) {
        Some(side) => side.as_str() == "upper",
        None => is_upward(op),
    };
    let function = if upper { "BBUPPER" } else { "BBLOWER" };
    let args = match BAND_PARAMS.captures(text) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(period), Some(mult)) => format!("close, {}, {}", period.as_str(), mult.as_str()),
            (Some(period), None) => format!("close, {}", period.as_str()),
            _ => "close".to_string(),
        },
        None => "close".to_string(),
    };
    Some(("close".to_string(), op, format!("{function}({args})")))
}

/// "crosses above yesterday's high" and the like.
fn prior_bar(text: &str) -> Option<Comparison> {
    let series = PRIOR_BAR.captures(text)?.get(1)?.as_str();
    let source = subject(text).unwrap_or("close");
    Some((source.to_string(), operator(text)?, format!("SHIFT({series}, 1)")))
}

/// "volume increases by more than 25 percent compared to last week".
fn volume_versus_average(text: &str) -> Option<Comparison> {
    if !text.contains("volume") {
        return None;
    }
    let pct: f64 = PERCENT.captures(text)?.get(1)?.as_str().parse().ok()?;
    let window = match LOOKBACK.captures(text)?.get(1)?.as_str() {
        "week" => WEEK_BARS,
        _ => MONTH_BARS,
    };
    let (op, factor) = if DECREASE.is_match(text) {
        (ClauseOp::Lt, 1.0 - pct / 100.0)
    } else {
        (ClauseOp::Gt, 1.0 + pct / 100.0)
    };
    Some((
        "volume".to_string(),
        op,
        format!("SMA(volume, {window}) * {}", number(tidy(factor))),
    ))
}

fn rsi(text: &str) -> Option<Comparison> {
    let caps = RSI.captures(text)?;
    let window = match caps.get(2).or_else(|| caps.get(1)) {
        Some(m) => m.as_str().parse().ok()?,
        None => RSI_WINDOW,
    };
    Some((
        format!("RSI(close, {window})"),
        operator(text)?,
        number(threshold(text)?),
    ))
}

fn price_versus_moving_average(text: &str) -> Option<Comparison> {
    let caps = MOVING_AVERAGE.captures(text)?;
    let source = subject(text).unwrap_or("close");
    Some((
        source.to_string(),
        operator(text)?,
        moving_average(&caps, source)?,
    ))
}

fn volume_threshold(text: &str) -> Option<Comparison> {
    if subject(text)? != "volume" {
        return None;
    }
    Some(("volume".to_string(), operator(text)?, number(threshold(text)?)))
}

fn price_threshold(text: &str) -> Option<Comparison> {
    if subject(text)? != "close" {
        return None;
    }
    Some(("close".to_string(), operator(text)?, number(threshold(text)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsl(text: &str) -> Option<String> {
        recognize(&normalize(text)).map(|c| c.to_string())
    }

    #[test]
    fn moving_averages() {
        assert_eq!(
            dsl("the close price is above the 20-day moving average").as_deref(),
            Some("close > SMA(close, 20)")
        );
        assert_eq!(
            dsl("price is below the 50 day EMA").as_deref(),
            Some("close < EMA(close, 50)")
        );
        assert_eq!(
            dsl("volume is above its 10-day average").as_deref(),
            Some("volume > SMA(volume, 10)")
        );
        assert_eq!(
            dsl("the 50-day SMA crosses above the 200-day SMA").as_deref(),
            Some("SMA(close, 50) CROSSOVER SMA(close, 200)")
        );
    }

    #[test]
    fn thresholds_with_suffixes() {
        assert_eq!(dsl("volume is above 1 million").as_deref(), Some("volume > 1000000"));
        assert_eq!(dsl("volume is above 1k").as_deref(), Some("volume > 1000"));
        assert_eq!(dsl("volume is below 1.1m").as_deref(), Some("volume < 1100000"));
        assert_eq!(dsl("close is above 1,250.5").as_deref(), Some("close > 1250.5"));
    }

    #[test]
    fn rsi_window_and_level() {
        assert_eq!(dsl("RSI(14) is below 30").as_deref(), Some("RSI(close, 14) < 30"));
        assert_eq!(dsl("RSI is above 70").as_deref(), Some("RSI(close, 14) > 70"));
        assert_eq!(dsl("the 7-day RSI exceeds 80").as_deref(), Some("RSI(close, 7) > 80"));
    }

    #[test]
    fn crosses_of_the_prior_bar() {
        assert_eq!(
            dsl("the price crosses above yesterday's high").as_deref(),
            Some("close CROSSOVER SHIFT(high, 1)")
        );
        assert_eq!(
            dsl("breaks below yesterday\u{2019}s low").as_deref(),
            Some("close CROSSUNDER SHIFT(low, 1)")
        );
    }

    #[test]
    fn macd_and_bands() {
        assert_eq!(
            dsl("MACD is above the signal").as_deref(),
            Some("MACD(close) > MACD_SIGNAL(close)")
        );
        assert_eq!(
            dsl("MACD histogram is below 0").as_deref(),
            Some("MACD_HIST(close) < 0")
        );
        assert_eq!(
            dsl("price is above upper Bollinger Band (20, 2)").as_deref(),
            Some("close > BBUPPER(close, 20, 2)")
        );
        assert_eq!(
            dsl("price is below lower Bollinger Band").as_deref(),
            Some("close < BBLOWER(close)")
        );
    }

    #[test]
    fn volume_against_last_week() {
        assert_eq!(
            dsl("volume increases by more than 25 percent compared to last week").as_deref(),
            Some("volume > SMA(volume, 5) * 1.25")
        );
        assert_eq!(
            dsl("volume drops 20% below last month").as_deref(),
            Some("volume < SMA(volume, 21) * 0.8")
        );
    }

    #[test]
    fn unknown_phrases_are_skipped() {
        assert_eq!(dsl("the moon is full"), None);
        assert_eq!(dsl(""), None);
    }

    #[test]
    fn conditions_track_connectives() {
        let clauses = conditions("close is above 10 or volume is above 1k and rsi(14) is below 30.");
        let connectives: Vec<Connective> = clauses.iter().map(|c| c.connective).collect();
        assert_eq!(
            connectives,
            vec![Connective::And, Connective::Or, Connective::And]
        );
    }

    #[test]
    fn trailing_connective_is_dropped() {
        let clauses = conditions("price is above upper bollinger band (20, 2) and ");
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].right, "BBUPPER(close, 20, 2)");
    }
}
