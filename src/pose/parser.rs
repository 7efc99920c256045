//! Recursive-descent parser for the textual pose telemetry format.
//!
//! The grammar is positional: callers drive the parser through a fixed
//! sequence of `match_token` and value calls. Tokens are separated by runs of
//! ASCII whitespace; vector components are separated by commas with optional
//! whitespace around each comma.

use std::fmt;
use thiserror::Error;

use super::{Quaternion, Vector3};

/// Literal category for [`ParseError::InvalidLiteral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Decimal,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralKind::Integer => write!(f, "integer"),
            LiteralKind::Decimal => write!(f, "decimal"),
        }
    }
}

/// Pose text syntax errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A keyword other than the expected one was found in its position.
    #[error("token mismatch: expected '{expected}', found '{found}'")]
    TokenMismatch { expected: String, found: String },

    #[error("expected '{expected}' at byte {position}, found {}", describe(.found))]
    CharacterMismatch { expected: char, found: Option<char>, position: usize },

    #[error("invalid {kind} literal '{literal}' at byte {position}")]
    InvalidLiteral { kind: LiteralKind, literal: String, position: usize },
}

fn describe(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    }
}

fn is_identifier(b: u8) -> bool {
    b.is_ascii_lowercase() || b == b'_'
}

fn is_integer(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-' || b == b'+'
}

fn is_decimal(b: u8) -> bool {
    is_integer(b) || matches!(b, b'.' | b'e' | b'E')
}

/// Cursor over one pose record.
#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input: input.as_bytes(), position: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether only whitespace remains.
    pub fn is_exhausted(&self) -> bool {
        self.input[self.position..].iter().all(u8::is_ascii_whitespace)
    }

    fn lookup(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn skip_white(&mut self) {
        while self.lookup().is_some_and(|b| b.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    /// Consume the longest run of bytes matching `class`, then trailing whitespace.
    fn take_while(&mut self, class: fn(u8) -> bool) -> &'a str {
        let start = self.position;
        while self.lookup().is_some_and(class) {
            self.position += 1;
        }
        let input: &'a [u8] = self.input;
        let run = &input[start..self.position];
        self.skip_white();
        // Every class is ASCII-only, so the run is valid UTF-8.
        std::str::from_utf8(run).unwrap_or_default()
    }

    fn match_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_white();
        match self.lookup() {
            Some(b) if char::from(b) == expected => {
                self.position += 1;
                self.skip_white();
                Ok(())
            }
            found => Err(ParseError::CharacterMismatch {
                expected,
                found: found.map(char::from),
                position: self.position,
            }),
        }
    }

    /// Consume an identifier made of lowercase letters and underscores.
    pub fn parse_token(&mut self) -> &'a str {
        self.take_while(is_identifier)
    }

    /// Consume an identifier and require it to equal `expected`.
    pub fn match_token(&mut self, expected: &str) -> Result<(), ParseError> {
        let found = self.parse_token();
        if found != expected {
            return Err(ParseError::TokenMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    pub fn parse_integer(&mut self) -> Result<i64, ParseError> {
        let position = self.position;
        let literal = self.take_while(is_integer);
        literal.parse().map_err(|_| ParseError::InvalidLiteral {
            kind: LiteralKind::Integer,
            literal: literal.to_string(),
            position,
        })
    }

    /// `1` is true; any other integer is false.
    pub fn parse_bool(&mut self) -> Result<bool, ParseError> {
        Ok(self.parse_integer()? == 1)
    }

    pub fn parse_double(&mut self) -> Result<f64, ParseError> {
        let position = self.position;
        let literal = self.take_while(is_decimal);
        literal.parse().map_err(|_| ParseError::InvalidLiteral {
            kind: LiteralKind::Decimal,
            literal: literal.to_string(),
            position,
        })
    }

    pub fn parse_vector3(&mut self) -> Result<Vector3, ParseError> {
        let x = self.parse_double()?;
        self.match_char(',')?;
        let y = self.parse_double()?;
        self.match_char(',')?;
        let z = self.parse_double()?;
        Ok(Vector3 { x, y, z })
    }

    pub fn parse_quaternion(&mut self) -> Result<Quaternion, ParseError> {
        let x = self.parse_double()?;
        self.match_char(',')?;
        let y = self.parse_double()?;
        self.match_char(',')?;
        let z = self.parse_double()?;
        self.match_char(',')?;
        let w = self.parse_double()?;
        Ok(Quaternion { x, y, z, w })
    }
}
