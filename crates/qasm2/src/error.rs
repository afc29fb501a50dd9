// This code is part of Qiskit.
//
// (C) Copyright IBM 2023
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use thiserror::Error;

use crate::ast::CapacityError;
use crate::lex::Token;

/// A location in some OpenQASM 2 source.  Lines are numbered from 1 and columns from 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub filename: String,
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(filename: &str, line: usize, col: usize) -> Self {
        Self {
            filename: filename.to_owned(),
            line,
            col,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{},{}", self.filename, self.line, self.col)
    }
}

/// Create an error message that includes span data from the given [position][Position], if there
/// is one.  The base of the message is `message`.
pub fn message_generic(position: Option<&Position>, message: &str) -> String {
    if let Some(position) = position {
        format!("{}: {}", position, message)
    } else {
        message.to_owned()
    }
}

/// Shorthand form for the body of an error message when a particular type of token was required,
/// but something else was `received`.
pub fn message_incorrect_requirement(required: &str, received: &Token) -> String {
    format!(
        "needed {}, but instead saw {}",
        required,
        received.ttype.describe()
    )
}

/// Shorthand form for the body of an error message when a particular type of token was required,
/// but the input ended unexpectedly.
pub fn message_bad_eof(required: &str) -> String {
    format!("unexpected end-of-file when expecting to see {}", required)
}

/// An error raised by the lexer while turning bytes into tokens.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}", message_generic(Some(.position), .message))]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// The broad category of a [ParseError].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The byte stream could not be split into tokens.
    Lexical,
    /// The token stream does not match the grammar.
    Syntax,
    /// An `include` statement could not be resolved.
    Include,
    /// Nesting or storage limits were exceeded.
    ResourceExhausted,
}

/// The single terminal error of a parse.  There is no recovery; the first error stops the parse.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}", message_generic(.position.as_ref(), .message))]
pub struct ParseError {
    kind: ErrorKind,
    position: Option<Position>,
    message: String,
}

impl ParseError {
    pub fn new(kind: ErrorKind, position: Option<Position>, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
        }
    }

    pub fn syntax(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, Some(position), message)
    }

    /// A particular type of token was required, but the `received` token was something else.
    pub fn incorrect_requirement(required: &str, received: &Token, filename: &str) -> Self {
        Self::syntax(
            Position::new(filename, received.line, received.col),
            message_incorrect_requirement(required, received),
        )
    }

    /// A particular type of token was required, but the input ended.  The `position` should point
    /// at the token that caused the requirement.
    pub fn bad_eof(position: Position, required: &str) -> Self {
        Self::syntax(position, message_bad_eof(required))
    }

    pub fn exhausted(position: Option<Position>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ResourceExhausted,
            position,
            format!("memory exhausted: {}", message.into()),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// The line the error was detected on, or 0 if the error is not tied to any source location.
    pub fn line(&self) -> usize {
        self.position.as_ref().map_or(0, |position| position.line)
    }

    /// The message without any location prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self::new(ErrorKind::Lexical, Some(err.position), err.message)
    }
}

impl From<CapacityError> for ParseError {
    fn from(err: CapacityError) -> Self {
        Self::exhausted(None, err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn position_displays_as_file_line_col() {
        let position = Position::new("main.qasm", 3, 14);
        assert_eq!(position.to_string(), "main.qasm:3,14");
    }

    #[test]
    fn rendered_message_carries_position() {
        let err = ParseError::syntax(Position::new("<input>", 2, 0), "bad thing");
        assert_eq!(err.to_string(), "<input>:2,0: bad thing");
        assert_eq!(err.line(), 2);
        assert_eq!(err.message(), "bad thing");
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn lexer_errors_become_lexical() {
        let lex = LexError::new(Position::new("<input>", 1, 4), "nope");
        assert_eq!(lex.to_string(), "<input>:1,4: nope");
        let err = ParseError::from(lex);
        assert_eq!(err.kind(), ErrorKind::Lexical);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn capacity_errors_are_exhaustion() {
        let err = ParseError::from(CapacityError { limit: 4 });
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(err.line(), 0);
        assert!(err.message().starts_with("memory exhausted"));
    }
}
