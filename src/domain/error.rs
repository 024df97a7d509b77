//! Domain error types.

use std::fmt;

/// Which front-end stage rejected the DSL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unrecognized character.
    Lex,
    /// Grammar violation, unexpected token or end of input, trailing input.
    Syntax,
    /// Unknown series or function name, wrong argument count or type.
    Validation,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseErrorKind::Lex => "lexical",
            ParseErrorKind::Syntax => "syntax",
            ParseErrorKind::Validation => "validation",
        })
    }
}

/// A DSL front-end error. The first error aborts the parse; no partial AST is
/// ever returned alongside it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} error: {message}{}", location_suffix(.line, .column))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// 1-based line of the offending token, when derivable.
    pub line: Option<usize>,
    /// 1-based column (in characters) of the offending token, when derivable.
    pub column: Option<usize>,
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" (line {l}, col {c})"),
        (Some(l), None) => format!(" (line {l})"),
        _ => String::new(),
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    /// Format the error under the offending source line with a caret at the column.
    pub fn display_with_context(&self, input: &str) -> String {
        let (Some(line), Some(column)) = (self.line, self.column) else {
            return self.to_string();
        };
        let source_line = input.lines().nth(line.saturating_sub(1)).unwrap_or("");
        let caret = " ".repeat(column.saturating_sub(1)) + "^";
        format!("{source_line}\n{caret}\n{self}")
    }
}

/// Problems with the data handed to the core: the table itself or indicator
/// parameters derived from it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("indicator window must be positive, got {window}")]
    NonPositiveWindow { window: i64 },

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} does not have a strictly increasing key")]
    NonIncreasingIndex { row: usize },

    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("{side} signals have {actual} rows, table has {expected}")]
    SignalLength {
        side: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while walking a parsed strategy over a table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{function} takes {expected} arguments, got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error(transparent)]
    Input(#[from] InputError),
}

/// The natural-language collaborator could not produce any DSL.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("no recognizable trading condition in: '{text}'")]
    NoClauses { text: String },
}

/// Top-level error type for stratlang.
#[derive(Debug, thiserror::Error)]
pub enum StratlangError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Translation(#[from] TranslateError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratlangError> for std::process::ExitCode {
    fn from(err: &StratlangError) -> Self {
        let code: u8 = match err {
            StratlangError::Io(_) | StratlangError::Csv(_) | StratlangError::Json(_) => 1,
            StratlangError::ConfigParse { .. }
            | StratlangError::ConfigMissing { .. }
            | StratlangError::ConfigInvalid { .. } => 2,
            StratlangError::Translation(_) => 3,
            StratlangError::RuleParse(_) => 4,
            StratlangError::Evaluation(_) => 5,
            StratlangError::Input(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
