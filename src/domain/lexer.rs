//! DSL tokenizer.
//!
//! Maximal-munch scanner over the DSL text. Identifiers are case-folded to
//! upper case and keywords recognized after folding. Whitespace (newlines
//! included) only separates tokens. Every token records the 1-based line and
//! column of its first character; the stream always ends with [`TokenKind::Eof`].

use std::fmt;

use tracing::trace;

use crate::domain::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Entry,
    Exit,
    And,
    Or,
    Not,
    True,
    False,
    CrossOver,
    CrossUnder,
}

impl Keyword {
    fn from_upper(word: &str) -> Option<Keyword> {
        Some(match word {
            "ENTRY" => Keyword::Entry,
            "EXIT" => Keyword::Exit,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "CROSSOVER" => Keyword::CrossOver,
            "CROSSUNDER" => Keyword::CrossUnder,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Entry => "ENTRY",
            Keyword::Exit => "EXIT",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::CrossOver => "CROSSOVER",
            Keyword::CrossUnder => "CROSSUNDER",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Keyword(Keyword),
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Keyword(k) => write!(f, "'{}'", k.as_str()),
            TokenKind::Gt => f.write_str("'>'"),
            TokenKind::Lt => f.write_str("'<'"),
            TokenKind::Ge => f.write_str("'>='"),
            TokenKind::Le => f.write_str("'<='"),
            TokenKind::EqEq => f.write_str("'=='"),
            TokenKind::Ne => f.write_str("'!='"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error(&self, message: String, line: usize, column: usize) -> ParseError {
        ParseError::new(ParseErrorKind::Lex, message, line, column)
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '_' && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                text.push(ch);
                self.advance();
            }
        }
        let mut value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("invalid number '{text}'"), line, column))?;

        let multiplier = match self.peek() {
            Some('k' | 'K') => 1e3,
            Some('m' | 'M') => 1e6,
            _ => 1.0,
        };
        if multiplier != 1.0 && !self.peek_second().is_some_and(is_ident_char) {
            self.advance();
            value *= multiplier;
        }
        Ok(TokenKind::Number(value))
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.advance();
        }
        let word = self.input[start..self.pos].to_ascii_uppercase();
        match Keyword::from_upper(&word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(word),
        }
    }

    fn lex_symbol(&mut self, ch: char) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        let next = self.peek_second();
        let (kind, width) = match (ch, next) {
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::Ne, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('=', _) => {
                return Err(self.error(
                    "unexpected character '=' (use '==' for equality)".to_string(),
                    line,
                    column,
                ));
            }
            _ => {
                return Err(self.error(format!("unexpected character '{ch}'"), line, column));
            }
        };
        for _ in 0..width {
            self.advance();
        }
        Ok(kind)
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let (line, column) = (self.line, self.column);
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(ch) if ch.is_ascii_digit() => self.lex_number()?,
            Some(ch) if is_ident_start(ch) => self.lex_word(),
            Some(ch) => self.lex_symbol(ch)?,
        };
        Ok(Token { kind, line, column })
    }
}

/// Tokenize DSL text. The returned stream always ends with an `Eof` token
/// positioned just past the input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    trace!(count = tokens.len(), "tokenized DSL input");
    Ok(tokens)
}
