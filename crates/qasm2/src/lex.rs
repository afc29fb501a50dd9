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

//! Lexing of OpenQASM 2 source into [Token]s.  A [TokenStream] reads its source one line at a
//! time and hands out one token per call, with a single token of lookahead for the parser.
//! Symbols are decided with at most one byte of lookahead; words and numbers are read to their end
//! and then classified.
//!
//! Straight after an `OPENQASM` keyword the stream reads numbers as [TokenType::Version] rather
//! than as reals, so forms like `200.0e-2` are never accepted as a version.
//!
//! The text of identifiers, numbers, filenames and versions is stored once in a [TokenContext]
//! shared by every stream of a parse, and tokens only carry an index into it.  Values are read
//! out of that text on request, and reading one can fail with a [TokenValueError].

use std::io::BufRead;
use std::path::Path;

use hashbrown::HashMap;
use num_bigint::BigUint;
use thiserror::Error;

use crate::error::{LexError, Position};

/// The `<major>[.<minor>]` version number of an `OPENQASM` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: usize,
    pub minor: Option<usize>,
}

/// Owns the text behind the variable-text [Token]s of every stream that lexes into it.  Included
/// files lex into the same context as the program that includes them.
#[derive(Clone, Debug, Default)]
pub struct TokenContext {
    text: Vec<String>,
    lookup: HashMap<Vec<u8>, usize>,
}

impl TokenContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` (unless the same bytes are already stored) and return their index.
    fn store(&mut self, bytes: &[u8]) -> usize {
        if let Some(index) = self.lookup.get(bytes) {
            return *index;
        }
        let index = self.text.len();
        // The reader rejects everything outside ASCII, so this never replaces anything.
        self.text.push(String::from_utf8_lossy(bytes).into_owned());
        self.lookup.insert(bytes.to_vec(), index);
        index
    }
}

/// The kinds of [Token].  Tokens whose text varies keep it in the [TokenContext], so this stays a
/// plain fieldless enum that the parser can compare and pass around by value.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TokenType {
    // Keywords
    OpenQASM,
    Barrier,
    Cos,
    Creg,
    Exp,
    Gate,
    If,
    Include,
    Ln,
    Measure,
    Opaque,
    Qreg,
    Reset,
    Sin,
    Sqrt,
    Tan,
    Pi,
    // Builtin gates
    U,
    CX,
    // Symbols
    Plus,
    Minus,
    Arrow,
    Asterisk,
    Equals,
    Slash,
    Caret,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    // Content
    Id,
    Real,
    Integer,
    Filename,
    Version,
}

impl TokenType {
    /// Whether tokens of this type keep their source text in the [TokenContext].
    pub fn has_text(&self) -> bool {
        matches!(
            self,
            TokenType::Id
                | TokenType::Real
                | TokenType::Integer
                | TokenType::Filename
                | TokenType::Version
        )
    }

    /// A short human-readable name for the type, for use in error messages.  Fixed tokens are
    /// described by their spelling.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenType::OpenQASM => "OPENQASM",
            TokenType::Barrier => "barrier",
            TokenType::Cos => "cos",
            TokenType::Creg => "creg",
            TokenType::Exp => "exp",
            TokenType::Gate => "gate",
            TokenType::If => "if",
            TokenType::Include => "include",
            TokenType::Ln => "ln",
            TokenType::Measure => "measure",
            TokenType::Opaque => "opaque",
            TokenType::Qreg => "qreg",
            TokenType::Reset => "reset",
            TokenType::Sin => "sin",
            TokenType::Sqrt => "sqrt",
            TokenType::Tan => "tan",
            TokenType::Pi => "pi",
            TokenType::U => "U",
            TokenType::CX => "CX",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Arrow => "->",
            TokenType::Asterisk => "*",
            TokenType::Equals => "==",
            TokenType::Slash => "/",
            TokenType::Caret => "^",
            TokenType::Semicolon => ";",
            TokenType::Comma => ",",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBracket => "[",
            TokenType::RBracket => "]",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
            TokenType::Id => "an identifier",
            TokenType::Real => "a real number",
            TokenType::Integer => "an integer",
            TokenType::Filename => "a filename string",
            TokenType::Version => "a '<major>.<minor>' version",
        }
    }
}

/// The lowercase keywords.  Anything else made of word bytes is an identifier.
fn keyword(word: &[u8]) -> Option<TokenType> {
    let ttype = match word {
        b"barrier" => TokenType::Barrier,
        b"cos" => TokenType::Cos,
        b"creg" => TokenType::Creg,
        b"exp" => TokenType::Exp,
        b"gate" => TokenType::Gate,
        b"if" => TokenType::If,
        b"include" => TokenType::Include,
        b"ln" => TokenType::Ln,
        b"measure" => TokenType::Measure,
        b"opaque" => TokenType::Opaque,
        b"qreg" => TokenType::Qreg,
        b"reset" => TokenType::Reset,
        b"sin" => TokenType::Sin,
        b"sqrt" => TokenType::Sqrt,
        b"tan" => TokenType::Tan,
        b"pi" => TokenType::Pi,
        _ => return None,
    };
    Some(ttype)
}

fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

/// The text of a token could not be read as the value that was asked of it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenValueError {
    #[error("needed {expected}, but the token is {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{text}' cannot be read as {what}")]
    Malformed { what: &'static str, text: String },
}

/// One lexed token: its type, where it starts, and (for variable-text types) where its text is
/// stored.  Tokens never span lines.
#[derive(Clone, Copy, Debug)]
pub struct Token {
    pub ttype: TokenType,
    /// Line of the first byte, counted from 1.
    pub line: usize,
    /// Column of the first byte, counted from 0.
    pub col: usize,
    text: Option<usize>,
}

impl Token {
    /// The source text of the token.  Fixed tokens give their spelling.
    pub fn text<'a>(&self, context: &'a TokenContext) -> &'a str {
        match self.text {
            Some(index) => &context.text[index],
            None => self.ttype.describe(),
        }
    }

    fn text_of<'a>(
        &self,
        context: &'a TokenContext,
        expected: TokenType,
    ) -> Result<&'a str, TokenValueError> {
        match self.text {
            Some(index) if self.ttype == expected => Ok(&context.text[index]),
            _ => Err(TokenValueError::WrongType {
                expected: expected.describe(),
                found: self.ttype.describe(),
            }),
        }
    }

    pub fn real(&self, context: &TokenContext) -> Result<f64, TokenValueError> {
        let text = self.text_of(context, TokenType::Real)?;
        text.parse().map_err(|_| TokenValueError::Malformed {
            what: "a real number",
            text: text.to_owned(),
        })
    }

    /// The value of an integer literal.  Integer literals are unbounded.
    pub fn int(&self, context: &TokenContext) -> Result<BigUint, TokenValueError> {
        let text = self.text_of(context, TokenType::Integer)?;
        text.parse().map_err(|_| TokenValueError::Malformed {
            what: "an integer",
            text: text.to_owned(),
        })
    }

    /// The path inside a filename string, without its quotes.
    pub fn filename(&self, context: &TokenContext) -> Result<String, TokenValueError> {
        let text = self.text_of(context, TokenType::Filename)?;
        // Both quote marks are single bytes.
        Ok(text[1..text.len() - 1].to_owned())
    }

    /// The version of an `OPENQASM` header.  Fails if either part does not fit in a `usize`.
    pub fn version(&self, context: &TokenContext) -> Result<Version, TokenValueError> {
        let text = self.text_of(context, TokenType::Version)?;
        let number = |part: &str| {
            part.parse::<usize>()
                .map_err(|_| TokenValueError::Malformed {
                    what: "a version number",
                    text: text.to_owned(),
                })
        };
        match text.split_once('.') {
            Some((major, minor)) => Ok(Version {
                major: number(major)?,
                minor: Some(number(minor)?),
            }),
            None => Ok(Version {
                major: number(text)?,
                minor: None,
            }),
        }
    }
}

/// Line-buffered access to the bytes of one source.  `col` is the offset of the next unread byte
/// in the buffered line.
struct Reader {
    filename: String,
    source: Box<dyn BufRead + Send>,
    buffer: Vec<u8>,
    /// Number of the buffered line; 0 until the first line is read.
    line: usize,
    col: usize,
    exhausted: bool,
}

impl Reader {
    fn fault(&self, col: usize, message: impl Into<String>) -> LexError {
        LexError::new(Position::new(&self.filename, self.line, col), message)
    }

    fn next_line(&mut self) -> Result<(), LexError> {
        self.line += 1;
        self.col = 0;
        self.buffer.clear();
        match self.source.read_until(b'\n', &mut self.buffer) {
            Ok(_) => {
                // A line without its terminator can only be the last one.
                if self.buffer.last() != Some(&b'\n') {
                    self.exhausted = true;
                }
                Ok(())
            }
            Err(err) => {
                self.exhausted = true;
                Err(self.fault(0, format!("failed to read the source: {}", err)))
            }
        }
    }

    /// The next unread byte, reading further lines as needed.  `None` at the end of the source.
    fn peek(&mut self) -> Result<Option<u8>, LexError> {
        while self.col >= self.buffer.len() {
            if self.exhausted {
                return Ok(None);
            }
            self.next_line()?;
        }
        match self.buffer[self.col] {
            byte if byte.is_ascii() => Ok(Some(byte)),
            byte => {
                self.exhausted = true;
                Err(self.fault(
                    self.col,
                    format!("encountered a non-ASCII byte: {:02X?}", byte),
                ))
            }
        }
    }

    fn bump(&mut self) -> Result<Option<u8>, LexError> {
        let out = self.peek()?;
        if out.is_some() {
            self.col += 1;
        }
        Ok(out)
    }

    /// Consume the next byte if it satisfies `accept`.
    fn eat(&mut self, accept: impl Fn(u8) -> bool) -> Result<bool, LexError> {
        match self.peek()? {
            Some(byte) if accept(byte) => {
                self.col += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Consume bytes for as long as they satisfy `accept`, returning how many were taken.
    fn eat_while(&mut self, accept: impl Fn(u8) -> bool + Copy) -> Result<usize, LexError> {
        let mut count = 0;
        while self.eat(accept)? {
            count += 1;
        }
        Ok(count)
    }

    fn skip_line(&mut self) {
        self.col = self.buffer.len();
    }
}

/// A lazily lexed stream of tokens from one source, with one token of lookahead.  The
/// [TokenContext] is passed to every call rather than owned, so the streams of included files can
/// share the context of the program that includes them.
pub struct TokenStream {
    reader: Reader,
    strict: bool,
    /// Set straight after an `OPENQASM` token, so the next number is read as a version.
    expect_version: bool,
    lookahead: Option<Option<Token>>,
}

impl TokenStream {
    fn new(source: Box<dyn BufRead + Send>, filename: String, strict: bool) -> Self {
        TokenStream {
            reader: Reader {
                filename,
                source,
                buffer: Vec::with_capacity(80),
                line: 0,
                col: 0,
                exhausted: false,
            },
            strict,
            expect_version: false,
            lookahead: None,
        }
    }

    /// A stream over a program held in memory, named `<input>` in error positions.
    pub fn from_string(string: String, strict: bool) -> Self {
        TokenStream::from_named_string(string, "<input>".to_owned(), strict)
    }

    /// A stream over text loaded from the named resource, such as an included file.
    pub fn from_named_string(string: String, filename: String, strict: bool) -> Self {
        TokenStream::new(Box::new(std::io::Cursor::new(string)), filename, strict)
    }

    /// A stream over the file at `path`, named by its final component.
    pub fn from_path<P: AsRef<Path>>(path: P, strict: bool) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let filename = path
            .file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .into_owned();
        Ok(TokenStream::new(
            Box::new(std::io::BufReader::new(file)),
            filename,
            strict,
        ))
    }

    /// The name of the source, used in error positions.
    pub fn filename(&self) -> &str {
        &self.reader.filename
    }

    fn error(&self, col: usize, message: impl Into<String>) -> LexError {
        self.reader.fault(col, message)
    }

    /// Fail if the token that started at `start` runs straight into a word byte.
    fn require_boundary(&mut self, what: &str, start: usize) -> Result<(), LexError> {
        match self.reader.peek()? {
            Some(byte) if is_word(byte) => Err(self.error(
                start,
                format!(
                    "expected a word boundary after {}, but saw '{}'",
                    what, byte as char
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Read the optional exponent of a real whose mantissa has been consumed.
    fn scan_exponent(&mut self, start: usize) -> Result<TokenType, LexError> {
        if self.reader.eat(|byte| matches!(byte, b'e' | b'E'))? {
            self.reader.eat(|byte| matches!(byte, b'+' | b'-'))?;
            if self.reader.eat_while(is_digit)? == 0 {
                return Err(self.error(start, "needed to see an integer exponent for this float"));
            }
        }
        self.require_boundary("a float", start)?;
        Ok(TokenType::Real)
    }

    /// Read a number whose `first` byte (a digit or a decimal point) has been consumed.  The
    /// result is an integer, a real, or a version if the previous token was `OPENQASM`.
    fn scan_number(&mut self, first: u8, start: usize) -> Result<TokenType, LexError> {
        if first == b'.' {
            if self.reader.eat_while(is_digit)? == 0 {
                return Err(self.error(
                    start,
                    "expected a numeric fractional part after the bare decimal point",
                ));
            }
            return self.scan_exponent(start);
        }
        let digits = 1 + self.reader.eat_while(is_digit)?;
        match self.reader.peek()? {
            Some(b'.') => {
                self.reader.bump()?;
                let fraction = self.reader.eat_while(is_digit)?;
                let exponent = matches!(self.reader.peek()?, Some(b'e' | b'E'));
                if self.expect_version && fraction > 0 && !exponent {
                    self.require_boundary("a version identifier", start)?;
                    Ok(TokenType::Version)
                } else {
                    self.scan_exponent(start)
                }
            }
            Some(b'e' | b'E') if self.strict => {
                Err(self.error(start, "[strict] all floats must include a decimal point"))
            }
            // Not valid OpenQASM 2, but float formatters commonly write `5e-5`.
            Some(b'e' | b'E') => self.scan_exponent(start),
            _ if first == b'0' && digits > 1 => {
                Err(self.error(start, "integers cannot have leading zeroes"))
            }
            _ if self.expect_version => {
                self.require_boundary("a version identifier", start)?;
                Ok(TokenType::Version)
            }
            _ => {
                self.require_boundary("an integer", start)?;
                Ok(TokenType::Integer)
            }
        }
    }

    /// Read a keyword or identifier whose `first` byte has been consumed.  Only `OPENQASM` and
    /// the builtin gates may start with a capital letter.
    fn scan_word(&mut self, first: u8, start: usize) -> Result<TokenType, LexError> {
        self.reader.eat_while(is_word)?;
        let word = &self.reader.buffer[start..self.reader.col];
        if !first.is_ascii_uppercase() {
            return Ok(keyword(word).unwrap_or(TokenType::Id));
        }
        match word {
            b"OPENQASM" => Ok(TokenType::OpenQASM),
            b"U" => Ok(TokenType::U),
            b"CX" => Ok(TokenType::CX),
            _ => Err(self.error(
                start,
                "identifiers cannot start with capital letters except for the builtins 'U' and \
                 'CX'",
            )),
        }
    }

    /// Read a filename string opened by `quote`, which must also close it on the same line.
    fn scan_filename(&mut self, quote: u8, start: usize) -> Result<TokenType, LexError> {
        if self.strict && quote != b'"' {
            return Err(self.error(start, "[strict] paths must be in double quotes (\"\")"));
        }
        loop {
            match self.reader.bump()? {
                Some(byte) if byte == quote => return Ok(TokenType::Filename),
                Some(b'\n' | b'\r') => {
                    return Err(self.error(start, "unexpected line break while lexing string literal"))
                }
                Some(_) => (),
                None => {
                    return Err(self.error(start, "unexpected end-of-file while lexing string literal"))
                }
            }
        }
    }

    /// Lex the next token, skipping whitespace and comments.  `None` once the source is used up.
    fn scan(&mut self, context: &mut TokenContext) -> Result<Option<Token>, LexError> {
        loop {
            self.reader
                .eat_while(|byte| matches!(byte, b' ' | b'\t' | b'\r' | b'\n'))?;
            let start = self.reader.col;
            let Some(first) = self.reader.bump()? else {
                return Ok(None);
            };
            let ttype = match first {
                b'/' if self.reader.peek()? == Some(b'/') => {
                    self.reader.skip_line();
                    continue;
                }
                b'/' => TokenType::Slash,
                b'+' => TokenType::Plus,
                b'*' => TokenType::Asterisk,
                b'^' => TokenType::Caret,
                b';' => TokenType::Semicolon,
                b',' => TokenType::Comma,
                b'(' => TokenType::LParen,
                b')' => TokenType::RParen,
                b'[' => TokenType::LBracket,
                b']' => TokenType::RBracket,
                b'{' => TokenType::LBrace,
                b'}' => TokenType::RBrace,
                b'-' if self.reader.eat(|byte| byte == b'>')? => TokenType::Arrow,
                b'-' => TokenType::Minus,
                b'=' if self.reader.eat(|byte| byte == b'=')? => TokenType::Equals,
                b'=' => return Err(self.error(start, "single equals '=' is never valid")),
                b'0'..=b'9' | b'.' => self.scan_number(first, start)?,
                b'a'..=b'z' | b'A'..=b'Z' => self.scan_word(first, start)?,
                b'"' | b'\'' => self.scan_filename(first, start)?,
                other => {
                    return Err(self.error(
                        start,
                        format!(
                            "encountered '{}', which doesn't match any valid tokens",
                            other as char
                        ),
                    ))
                }
            };
            self.expect_version = ttype == TokenType::OpenQASM;
            let text = ttype
                .has_text()
                .then(|| context.store(&self.reader.buffer[start..self.reader.col]));
            return Ok(Some(Token {
                ttype,
                line: self.reader.line,
                col: start,
                text,
            }));
        }
    }

    /// The next token, without consuming it.
    pub fn peek(&mut self, context: &mut TokenContext) -> Result<Option<&Token>, LexError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.scan(context)?);
        }
        Ok(self.lookahead.as_ref().and_then(Option::as_ref))
    }

    /// Consume and return the next token, or `None` once the stream is exhausted.
    pub fn next(&mut self, context: &mut TokenContext) -> Result<Option<Token>, LexError> {
        self.lookahead
            .take()
            .map_or_else(|| self.scan(context), Ok)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lex_all(source: &str, strict: bool) -> Result<(Vec<Token>, TokenContext), LexError> {
        let mut context = TokenContext::new();
        let mut stream = TokenStream::from_string(source.to_owned(), strict);
        let mut tokens = vec![];
        while let Some(token) = stream.next(&mut context)? {
            tokens.push(token);
        }
        Ok((tokens, context))
    }

    fn types(source: &str) -> Vec<TokenType> {
        lex_all(source, false)
            .unwrap()
            .0
            .iter()
            .map(|token| token.ttype)
            .collect()
    }

    #[test]
    fn builtins_have_their_own_tokens() {
        assert_eq!(
            types("U(0,0,0) q; CX a,b;"),
            vec![
                TokenType::U,
                TokenType::LParen,
                TokenType::Integer,
                TokenType::Comma,
                TokenType::Integer,
                TokenType::Comma,
                TokenType::Integer,
                TokenType::RParen,
                TokenType::Id,
                TokenType::Semicolon,
                TokenType::CX,
                TokenType::Id,
                TokenType::Comma,
                TokenType::Id,
                TokenType::Semicolon,
            ]
        );
    }

    #[test]
    fn version_only_follows_openqasm() {
        assert_eq!(
            types("OPENQASM 2.0; 2.0"),
            vec![
                TokenType::OpenQASM,
                TokenType::Version,
                TokenType::Semicolon,
                TokenType::Real
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            types("qreg // a comment\nq"),
            vec![TokenType::Qreg, TokenType::Id]
        );
        assert_eq!(types("// only a comment"), vec![]);
    }

    #[test]
    fn arrows_and_equals() {
        assert_eq!(
            types("-> == - / *"),
            vec![
                TokenType::Arrow,
                TokenType::Equals,
                TokenType::Minus,
                TokenType::Slash,
                TokenType::Asterisk
            ]
        );
    }

    #[test]
    fn positions_are_one_based_lines_zero_based_columns() {
        let (tokens, _) = lex_all("qreg q[2];\n  creg c[2];", false).unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 0));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 5));
        assert_eq!((tokens[6].line, tokens[6].col), (2, 2));
    }

    #[test]
    fn token_values() {
        let (tokens, context) =
            lex_all("18446744073709551616 1.5e3 \"qelib1.inc\" abc", false).unwrap();
        assert_eq!(
            tokens[0].int(&context),
            Ok("18446744073709551616".parse::<BigUint>().unwrap())
        );
        assert_eq!(tokens[1].real(&context), Ok(1500.0));
        assert_eq!(tokens[2].filename(&context).unwrap(), "qelib1.inc");
        assert_eq!(tokens[3].text(&context), "abc");
    }

    #[test]
    fn values_of_the_wrong_type_are_errors() {
        let (tokens, context) = lex_all("abc ;", false).unwrap();
        assert_eq!(
            tokens[0].int(&context),
            Err(TokenValueError::WrongType {
                expected: "an integer",
                found: "an identifier"
            })
        );
        assert!(tokens[1].real(&context).is_err());
        assert_eq!(tokens[1].text(&context), ";");
    }

    #[test]
    fn versions() {
        let (tokens, context) = lex_all("OPENQASM 2.0; OPENQASM 3;", false).unwrap();
        assert_eq!(
            tokens[1].version(&context),
            Ok(Version {
                major: 2,
                minor: Some(0)
            })
        );
        assert_eq!(
            tokens[4].version(&context),
            Ok(Version {
                major: 3,
                minor: None
            })
        );
    }

    #[test]
    fn oversized_versions_are_malformed() {
        let (tokens, context) = lex_all("OPENQASM 99999999999999999999999.0;", false).unwrap();
        assert_eq!(tokens[1].ttype, TokenType::Version);
        assert!(matches!(
            tokens[1].version(&context),
            Err(TokenValueError::Malformed { .. })
        ));
    }

    #[test]
    fn interning_shares_text() {
        let (tokens, _) = lex_all("abc abc abd", false).unwrap();
        assert_eq!(tokens[0].text, tokens[1].text);
        assert_ne!(tokens[0].text, tokens[2].text);
    }

    #[test]
    fn capital_identifiers_are_rejected() {
        let err = lex_all("Foo", false).unwrap_err();
        assert_eq!(err.position, Position::new("<input>", 1, 0));
    }

    #[test]
    fn single_equals_is_an_error() {
        let err = lex_all("c = 1", false).unwrap_err();
        assert_eq!(err.position, Position::new("<input>", 1, 2));
    }

    #[test]
    fn strict_mode_rejects_lenient_forms() {
        assert!(lex_all("1e5", false).is_ok());
        assert!(lex_all("1e5", true).is_err());
        assert!(lex_all("'file.inc'", false).is_ok());
        assert!(lex_all("'file.inc'", true).is_err());
    }

    #[test]
    fn unterminated_filenames() {
        assert!(lex_all("\"file.inc", false).is_err());
        assert!(lex_all("\"file\n.inc\"", false).is_err());
    }

    #[test]
    fn number_forms() {
        assert_eq!(
            types(".5 1. 0 2e-3 3.5E+2"),
            vec![
                TokenType::Real,
                TokenType::Real,
                TokenType::Integer,
                TokenType::Real,
                TokenType::Real
            ]
        );
        assert!(lex_all("007", false).is_err());
        assert!(lex_all(".", false).is_err());
        assert!(lex_all("1.5e", false).is_err());
        assert!(lex_all("12abc", false).is_err());
    }

    #[test]
    fn non_ascii_is_an_error() {
        let err = lex_all("qreg \u{e9};", false).unwrap_err();
        assert_eq!(err.position.line, 1);
    }
}
