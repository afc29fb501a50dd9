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

//! The statement-level grammar of OpenQASM 2.  This is a recursive-descent parser with a single
//! token of lookahead; every production is one `parse_*` method on [State], and the expression
//! grammar is handed off to the operator-precedence parser in [crate::expr].
//!
//! Nodes are created bottom-up: a production only asks the [AstBuilder] for its node once every
//! child handle exists.  Sequences are accumulated left to right into [ListKind] chains.  Nothing
//! here resolves symbols; a name is only ever checked to be a syntactically valid identifier.

use crate::ast::{AstBuilder, ListKind, NodeId};
use crate::error::{ErrorKind, ParseError, Position};
use crate::expr::ExprParser;
use crate::include::IncludeResolver;
use crate::lex::{Token, TokenContext, TokenStream, TokenType, TokenValueError, Version};
use crate::ParserOptions;

/// Statements read so far from one included file, counting those of files it includes in turn.
struct Splice {
    include: NodeId,
    statements: usize,
}

/// The state of the parser (but not its output, which lives in the builder).  The token streams
/// form a stack; the bottom is the main program, and each `include` pushes the stream of the
/// included text on top until it is exhausted.
pub struct State<'a> {
    tokens: Vec<TokenStream>,
    /// One entry per token stream; `None` for the main program.
    splices: Vec<Option<Splice>>,
    /// The context object that owns all the text strings that back the tokens seen so far.  This
    /// needs to be given as a read-only reference to the [Token] methods that extract information
    /// based on the text they came from.
    pub(crate) context: TokenContext,
    pub(crate) builder: &'a mut dyn AstBuilder,
    includes: &'a mut dyn IncludeResolver,
    /// Whether a version statement is allowed in this position.
    allow_version: bool,
    /// Whether we're in strict mode or (the default) more permissive parse.
    strict: bool,
    pub(crate) max_depth: usize,
    max_include_depth: usize,
    /// Line and column of the most recently consumed token, for errors that happen at end-of-file.
    last_seen: (usize, usize),
}

impl<'a> State<'a> {
    /// Create and initialise a state for the parser.
    pub fn new(
        tokens: TokenStream,
        builder: &'a mut dyn AstBuilder,
        includes: &'a mut dyn IncludeResolver,
        options: &ParserOptions,
    ) -> Self {
        State {
            tokens: vec![tokens],
            splices: vec![None],
            context: TokenContext::new(),
            builder,
            includes,
            allow_version: false,
            strict: options.strict,
            max_depth: options.max_depth,
            max_include_depth: options.max_include_depth,
            last_seen: (0, 0),
        }
    }

    /// Get the next token available in the stack of token streams.  Complete streams above the
    /// one that supplies the token are removed; if every stream is exhausted, the stack is left
    /// alone so that an end-of-file error is still reported against the innermost file.  Will
    /// only return `None` once all streams are exhausted.
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        let pointer = self.active_stream()?;
        let out = self.tokens[pointer].next(&mut self.context)?;
        if let Some(token) = out {
            self.close_streams_above(pointer);
            self.last_seen = (token.line, token.col);
        }
        Ok(out)
    }

    /// Peek the next token in the stack of token streams.  This does not remove any complete
    /// streams yet.  Will only return `None` once all streams are exhausted.
    pub(crate) fn peek_token(&mut self) -> Result<Option<&Token>, ParseError> {
        let pointer = self.active_stream()?;
        Ok(self.tokens[pointer].peek(&mut self.context)?)
    }

    /// The index of the highest token stream that still has a token, or of the main program if
    /// every stream is exhausted.
    fn active_stream(&mut self) -> Result<usize, ParseError> {
        let mut pointer = self.tokens.len() - 1;
        while pointer > 0 && self.tokens[pointer].peek(&mut self.context)?.is_none() {
            pointer -= 1;
        }
        Ok(pointer)
    }

    /// Drop every token stream above `pointer`, telling the builder how many statements each
    /// included file supplied.
    fn close_streams_above(&mut self, pointer: usize) {
        while self.tokens.len() > pointer + 1 {
            self.tokens.pop();
            if let Some(Some(splice)) = self.splices.pop() {
                self.builder.note_spliced(splice.include, splice.statements);
            }
        }
    }

    /// Get the filename associated with the currently active token stream.
    pub(crate) fn current_filename(&self) -> &str {
        self.tokens[self.tokens.len() - 1].filename()
    }

    /// Turn a failure to read the value of `token` into a syntax error at that token.
    pub(crate) fn value_of<T>(
        &self,
        token: &Token,
        value: Result<T, TokenValueError>,
    ) -> Result<T, ParseError> {
        value.map_err(|err| ParseError::syntax(self.position(token), err.to_string()))
    }

    pub(crate) fn position(&self, token: &Token) -> Position {
        Position::new(self.current_filename(), token.line, token.col)
    }

    fn last_position(&self) -> Position {
        Position::new(self.current_filename(), self.last_seen.0, self.last_seen.1)
    }

    /// Take a token from the stream that is known to be present and correct, generally because it
    /// has already been peeked.
    fn expect_known(&mut self, expected: TokenType) -> Result<Token, ParseError> {
        match self.next_token()? {
            Some(token) if token.ttype == expected => Ok(token),
            Some(token) => Err(ParseError::incorrect_requirement(
                expected.describe(),
                &token,
                self.current_filename(),
            )),
            None => Err(ParseError::bad_eof(
                self.last_position(),
                expected.describe(),
            )),
        }
    }

    /// Take the next token from the stream, expecting that it is of a particular type because it
    /// is required to be in order for the input program to be valid OpenQASM 2.  This returns the
    /// token if successful, and a suitable error message if the token type is incorrect, or the
    /// end of the file is reached.
    pub(crate) fn expect(
        &mut self,
        expected: TokenType,
        required: &str,
        cause: &Token,
    ) -> Result<Token, ParseError> {
        let token = match self.next_token()? {
            None => return Err(ParseError::bad_eof(self.position(cause), required)),
            Some(token) => token,
        };
        if token.ttype == expected {
            Ok(token)
        } else {
            Err(ParseError::incorrect_requirement(
                required,
                &token,
                self.current_filename(),
            ))
        }
    }

    /// Take the next token from the stream, if it is of the correct type.  Returns `None` and
    /// leaves the next token in the underlying iterator if it does not match.
    pub(crate) fn accept(&mut self, expected: TokenType) -> Result<Option<Token>, ParseError> {
        if self.next_is(expected)? {
            self.next_token()
        } else {
            Ok(None)
        }
    }

    /// True if the next token in the stream matches the given type, and false if it doesn't.
    pub(crate) fn next_is(&mut self, expected: TokenType) -> Result<bool, ParseError> {
        Ok(self
            .peek_token()?
            .is_some_and(|token| token.ttype == expected))
    }

    fn peek_type(&mut self) -> Result<Option<TokenType>, ParseError> {
        Ok(self.peek_token()?.map(|token| token.ttype))
    }

    /// Build the error for when the next token is not something that satisfies `required`.  This
    /// consumes the offending token; if there isn't one, the error points at the `cause`.
    pub(crate) fn unexpected(&mut self, required: &str, cause: &Token) -> ParseError {
        match self.next_token() {
            Ok(Some(token)) => {
                ParseError::incorrect_requirement(required, &token, self.current_filename())
            }
            Ok(None) => ParseError::bad_eof(self.position(cause), required),
            Err(err) => err,
        }
    }

    /// If in `strict` mode, and we have a trailing comma, emit a suitable error message.
    pub(crate) fn check_trailing_comma(&self, comma: Option<&Token>) -> Result<(), ParseError> {
        match (self.strict, comma) {
            (true, Some(token)) => Err(ParseError::syntax(
                self.position(token),
                "[strict] trailing commas in parameter and qubit lists are forbidden",
            )),
            _ => Ok(()),
        }
    }

    /// Create an [Id][crate::ast::Node::Id] node from an identifier token.
    pub(crate) fn make_id(&mut self, token: &Token) -> Result<NodeId, ParseError> {
        let name = self.builder.intern(token.text(&self.context));
        Ok(self.builder.create_id(name, token.line)?)
    }

    pub(crate) fn make_int(&mut self, token: &Token) -> Result<NodeId, ParseError> {
        let value = self.value_of(token, token.int(&self.context))?;
        Ok(self.builder.create_int(value)?)
    }

    fn append(
        &mut self,
        kind: ListKind,
        list: Option<NodeId>,
        item: NodeId,
    ) -> Result<NodeId, ParseError> {
        Ok(match list {
            None => self.builder.create_list(kind, item)?,
            Some(list) => self.builder.create_list_cons(kind, list, item)?,
        })
    }

    /// Take a complete primary (an identifier, optionally followed by an index) from the token
    /// stream, if the next token is an identifier.  `Ok(None)` is returned if the next token in
    /// the stream cannot start a primary.
    fn accept_primary(&mut self) -> Result<Option<NodeId>, ParseError> {
        let Some(name_token) = self.accept(TokenType::Id)? else {
            return Ok(None);
        };
        let id = self.make_id(&name_token)?;
        let Some(lbracket_token) = self.accept(TokenType::LBracket)? else {
            return Ok(Some(id));
        };
        let index_token = self.expect(TokenType::Integer, "an integer index", &lbracket_token)?;
        self.expect(TokenType::RBracket, "a closing bracket", &lbracket_token)?;
        let index = self.make_int(&index_token)?;
        Ok(Some(self.builder.create_indexed_id(id, index)?))
    }

    /// Take a complete primary from the stream, failing if the next token cannot start one.  The
    /// `instruction` token is used for the error message if the input ends.
    fn require_primary(
        &mut self,
        instruction: &Token,
        required: &str,
    ) -> Result<NodeId, ParseError> {
        match self.accept_primary()? {
            Some(primary) => Ok(primary),
            None => Err(self.unexpected(required, instruction)),
        }
    }

    /// Parse a non-empty comma-separated list of primaries.
    fn parse_primary_list(&mut self, instruction: &Token) -> Result<NodeId, ParseError> {
        let first = self.require_primary(instruction, "a quantum argument")?;
        let mut list = self.builder.create_list(ListKind::Primaries, first)?;
        let mut comma;
        loop {
            comma = self.accept(TokenType::Comma)?;
            if comma.is_none() {
                break;
            }
            match self.accept_primary()? {
                Some(primary) => {
                    list = self
                        .builder
                        .create_list_cons(ListKind::Primaries, list, primary)?
                }
                None => break,
            }
        }
        self.check_trailing_comma(comma.as_ref())?;
        Ok(list)
    }

    /// Parse a possibly empty comma-separated list of bare identifiers.  `Ok(None)` is returned if
    /// the list is empty.
    fn parse_id_list(&mut self) -> Result<Option<NodeId>, ParseError> {
        let mut list = None;
        let mut comma = None;
        while let Some(token) = self.accept(TokenType::Id)? {
            let id = self.make_id(&token)?;
            list = Some(self.append(ListKind::Ids, list, id)?);
            comma = self.accept(TokenType::Comma)?;
            if comma.is_none() {
                break;
            }
        }
        self.check_trailing_comma(comma.as_ref())?;
        Ok(list)
    }

    /// Parse a non-empty list of bare identifiers, such as the qubit arguments of a gate.
    fn require_id_list(&mut self, cause: &Token, required: &str) -> Result<NodeId, ParseError> {
        match self.parse_id_list()? {
            Some(list) => Ok(list),
            None => Err(self.unexpected(required, cause)),
        }
    }

    /// Parse a non-empty comma-separated list of expressions, up to (but not including) the
    /// closing parenthesis.  The `lparen` token is the opening parenthesis.
    fn parse_expression_list(&mut self, lparen: &Token) -> Result<NodeId, ParseError> {
        let first = ExprParser::new(self).parse_expression(lparen)?;
        let mut list = self.builder.create_list(ListKind::Expressions, first)?;
        let mut comma;
        loop {
            comma = self.accept(TokenType::Comma)?;
            if comma.is_none() || self.next_is(TokenType::RParen)? {
                break;
            }
            let expr = ExprParser::new(self).parse_expression(lparen)?;
            list = self
                .builder
                .create_list_cons(ListKind::Expressions, list, expr)?;
        }
        self.check_trailing_comma(comma.as_ref())?;
        Ok(list)
    }

    /// Parse the optional parenthesised argument list of a gate application.  Both a missing list
    /// and an empty `()` give `None`.
    fn parse_optional_arguments(&mut self) -> Result<Option<NodeId>, ParseError> {
        let Some(lparen_token) = self.accept(TokenType::LParen)? else {
            return Ok(None);
        };
        if self.accept(TokenType::RParen)?.is_some() {
            return Ok(None);
        }
        let args = self.parse_expression_list(&lparen_token)?;
        self.expect(TokenType::RParen, "a closing parenthesis", &lparen_token)?;
        Ok(Some(args))
    }

    /// Parse the optional parenthesised parameter list of a gate or opaque declaration.
    fn parse_optional_parameters(&mut self) -> Result<Option<NodeId>, ParseError> {
        let Some(lparen_token) = self.accept(TokenType::LParen)? else {
            return Ok(None);
        };
        let params = self.parse_id_list()?;
        self.expect(TokenType::RParen, "a closing parenthesis", &lparen_token)?;
        Ok(params)
    }

    /// Consume an `OPENQASM <version>;` statement, checking the version.  Returns the version
    /// token and its value.  This assumes that the `OPENQASM` token is still in the stream.
    fn parse_version(&mut self) -> Result<(Token, Version), ParseError> {
        let openqasm_token = self.expect_known(TokenType::OpenQASM)?;
        let version_token = self.expect(TokenType::Version, "version number", &openqasm_token)?;
        let version = self.value_of(&version_token, version_token.version(&self.context))?;
        if !matches!(
            version,
            Version {
                major: 2,
                minor: Some(0) | None,
            }
        ) {
            return Err(ParseError::syntax(
                self.position(&version_token),
                format!(
                    "can only handle OpenQASM 2.0, but given {}",
                    version_token.text(&self.context),
                ),
            ));
        }
        self.expect(TokenType::Semicolon, "';'", &openqasm_token)?;
        Ok((version_token, version))
    }

    /// Parse the version marker at the top of the program into a [Magic][crate::ast::Node::Magic]
    /// node.
    fn parse_magic(&mut self) -> Result<NodeId, ParseError> {
        let (_, version) = self.parse_version()?;
        let version = self.builder.create_real(version.major as f64)?;
        Ok(self.builder.create_magic(version)?)
    }

    /// Parse an `include` statement, create its node, and push the included token stream so that
    /// parsing continues with the included text.  This assumes the `include` token is still in the
    /// stream.
    fn parse_include(&mut self) -> Result<NodeId, ParseError> {
        let include_token = self.expect_known(TokenType::Include)?;
        let filename_token =
            self.expect(TokenType::Filename, "a filename string", &include_token)?;
        self.expect(TokenType::Semicolon, "';'", &include_token)?;
        let filename = self.value_of(&filename_token, filename_token.filename(&self.context))?;
        let interned = self.builder.intern(&filename);
        let node = self.builder.create_include(interned)?;
        if self.tokens.len() > self.max_include_depth {
            return Err(ParseError::exhausted(
                Some(self.position(&filename_token)),
                format!(
                    "includes are nested more than {} levels deep",
                    self.max_include_depth
                ),
            ));
        }
        let text = self.includes.resolve(&filename).map_err(|err| {
            tracing::debug!(filename = %filename, error = %err, "include resolution failed");
            ParseError::new(
                ErrorKind::Include,
                Some(self.position(&filename_token)),
                format!("unable to include '{}': {}", filename, err),
            )
        })?;
        tracing::debug!(
            filename = %filename,
            depth = self.tokens.len(),
            bytes = text.len(),
            "splicing included file"
        );
        self.tokens
            .push(TokenStream::from_named_string(text, filename, self.strict));
        self.splices.push(Some(Splice {
            include: node,
            statements: 0,
        }));
        self.allow_version = true;
        Ok(node)
    }

    /// Parse a `qreg` or `creg` declaration.  This assumes the keyword is still in the stream.
    fn parse_register(&mut self, keyword: TokenType) -> Result<NodeId, ParseError> {
        let register_token = self.expect_known(keyword)?;
        let name_token = self.expect(TokenType::Id, "a valid identifier", &register_token)?;
        let lbracket_token = self.expect(TokenType::LBracket, "'['", &register_token)?;
        let size_token = self.expect(TokenType::Integer, "an integer", &lbracket_token)?;
        self.expect(TokenType::RBracket, "']'", &lbracket_token)?;
        self.expect(TokenType::Semicolon, "';'", &register_token)?;
        let id = self.make_id(&name_token)?;
        let size = self.make_int(&size_token)?;
        let indexed = self.builder.create_indexed_id(id, size)?;
        Ok(match keyword {
            TokenType::Qreg => self.builder.create_qreg(indexed)?,
            _ => self.builder.create_creg(indexed)?,
        })
    }

    /// Parse a complete gate definition (including the body of the definition).  This assumes that
    /// the `gate` token is still in the stream.
    fn parse_gate_definition(&mut self) -> Result<NodeId, ParseError> {
        let gate_token = self.expect_known(TokenType::Gate)?;
        let name_token = self.expect(TokenType::Id, "an identifier", &gate_token)?;
        let name = self.make_id(&name_token)?;
        let params = self.parse_optional_parameters()?;
        let qubits = self.require_id_list(&gate_token, "a qubit argument")?;
        let lbrace_token = self.expect(TokenType::LBrace, "a gate body", &gate_token)?;
        let mut ops = None;
        loop {
            let op = match self.peek_type()? {
                Some(TokenType::RBrace) => {
                    self.expect_known(TokenType::RBrace)?;
                    break;
                }
                Some(TokenType::U) => self.parse_gate_universal()?,
                Some(TokenType::CX) => self.parse_gate_cx()?,
                Some(TokenType::Id) => self.parse_gate_custom()?,
                Some(TokenType::Barrier) => self.parse_gate_barrier()?,
                Some(_) => {
                    return Err(self.unexpected(
                        "a gate application or barrier within a 'gate' body",
                        &lbrace_token,
                    ))
                }
                None => {
                    return Err(ParseError::bad_eof(
                        self.position(&lbrace_token),
                        "a closing brace '}' of the gate body",
                    ))
                }
            };
            ops = Some(self.append(ListKind::GateOps, ops, op)?);
        }
        let body = self.builder.create_gate_body(ops)?;
        Ok(self.builder.create_gate(name, params, qubits, body)?)
    }

    fn parse_gate_universal(&mut self) -> Result<NodeId, ParseError> {
        let u_token = self.expect_known(TokenType::U)?;
        let lparen_token = self.expect(TokenType::LParen, "'('", &u_token)?;
        let args = self.parse_expression_list(&lparen_token)?;
        self.expect(TokenType::RParen, "a closing parenthesis", &lparen_token)?;
        let target_token = self.expect(TokenType::Id, "a qubit argument", &u_token)?;
        self.expect(TokenType::Semicolon, "';'", &u_token)?;
        let target = self.make_id(&target_token)?;
        Ok(self.builder.create_universal_unitary(args, target)?)
    }

    fn parse_gate_cx(&mut self) -> Result<NodeId, ParseError> {
        let cx_token = self.expect_known(TokenType::CX)?;
        let control_token = self.expect(TokenType::Id, "a qubit argument", &cx_token)?;
        self.expect(TokenType::Comma, "','", &cx_token)?;
        let target_token = self.expect(TokenType::Id, "a qubit argument", &cx_token)?;
        self.expect(TokenType::Semicolon, "';'", &cx_token)?;
        let control = self.make_id(&control_token)?;
        let target = self.make_id(&target_token)?;
        Ok(self.builder.create_cx(control, target)?)
    }

    fn parse_gate_custom(&mut self) -> Result<NodeId, ParseError> {
        let name_token = self.expect_known(TokenType::Id)?;
        let name = self.make_id(&name_token)?;
        let args = self.parse_optional_arguments()?;
        let targets = self.require_id_list(&name_token, "a qubit argument")?;
        self.expect(TokenType::Semicolon, "';'", &name_token)?;
        Ok(self.builder.create_custom_unitary(name, args, targets)?)
    }

    fn parse_gate_barrier(&mut self) -> Result<NodeId, ParseError> {
        let barrier_token = self.expect_known(TokenType::Barrier)?;
        let targets = self.require_id_list(&barrier_token, "a qubit argument")?;
        self.expect(TokenType::Semicolon, "';'", &barrier_token)?;
        Ok(self.builder.create_barrier(targets)?)
    }

    /// Parse an `opaque` declaration, not including its terminating semicolon.
    fn parse_opaque_definition(&mut self) -> Result<NodeId, ParseError> {
        let opaque_token = self.expect_known(TokenType::Opaque)?;
        let name_token = self.expect(TokenType::Id, "an identifier", &opaque_token)?;
        let name = self.make_id(&name_token)?;
        let params = self.parse_optional_parameters()?;
        let qubits = self.require_id_list(&opaque_token, "a qubit argument")?;
        Ok(self.builder.create_opaque(name, params, qubits)?)
    }

    /// Parse one non-conditional quantum operation, not including its terminating semicolon.  The
    /// `cause` token is used for the error message if the input ends before any operation starts.
    fn parse_quantum_op(&mut self, cause: &Token) -> Result<NodeId, ParseError> {
        match self.peek_type()? {
            Some(TokenType::U) => self.parse_universal_unitary(),
            Some(TokenType::CX) => self.parse_cx(),
            Some(TokenType::Id) => self.parse_custom_unitary(),
            Some(TokenType::Measure) => self.parse_measure(),
            Some(TokenType::Reset) => self.parse_reset(),
            Some(TokenType::Barrier) => self.parse_barrier(),
            _ => Err(self.unexpected(
                "a gate application, measurement, reset or barrier",
                cause,
            )),
        }
    }

    fn parse_universal_unitary(&mut self) -> Result<NodeId, ParseError> {
        let u_token = self.expect_known(TokenType::U)?;
        let lparen_token = self.expect(TokenType::LParen, "'('", &u_token)?;
        let args = self.parse_expression_list(&lparen_token)?;
        self.expect(TokenType::RParen, "a closing parenthesis", &lparen_token)?;
        let target = self.require_primary(&u_token, "a quantum argument")?;
        Ok(self.builder.create_universal_unitary(args, target)?)
    }

    fn parse_cx(&mut self) -> Result<NodeId, ParseError> {
        let cx_token = self.expect_known(TokenType::CX)?;
        let control = self.require_primary(&cx_token, "a quantum argument")?;
        self.expect(TokenType::Comma, "','", &cx_token)?;
        let target = self.require_primary(&cx_token, "a quantum argument")?;
        Ok(self.builder.create_cx(control, target)?)
    }

    fn parse_custom_unitary(&mut self) -> Result<NodeId, ParseError> {
        let name_token = self.expect_known(TokenType::Id)?;
        let name = self.make_id(&name_token)?;
        let args = self.parse_optional_arguments()?;
        let targets = self.parse_primary_list(&name_token)?;
        Ok(self.builder.create_custom_unitary(name, args, targets)?)
    }

    /// Parse a measurement.  The source and target are separated by `->`; a plain comma is also
    /// accepted outside strict mode.
    fn parse_measure(&mut self) -> Result<NodeId, ParseError> {
        let measure_token = self.expect_known(TokenType::Measure)?;
        let qubit = self.require_primary(&measure_token, "a quantum argument")?;
        if self.accept(TokenType::Arrow)?.is_none() {
            match self.accept(TokenType::Comma)? {
                Some(comma_token) if self.strict => {
                    return Err(ParseError::syntax(
                        self.position(&comma_token),
                        "[strict] measurement targets must be separated by '->'",
                    ))
                }
                Some(_) => (),
                None => return Err(self.unexpected("'->'", &measure_token)),
            }
        }
        let clbit = self.require_primary(&measure_token, "a classical argument")?;
        Ok(self.builder.create_measure(qubit, clbit)?)
    }

    fn parse_reset(&mut self) -> Result<NodeId, ParseError> {
        let reset_token = self.expect_known(TokenType::Reset)?;
        let target = self.require_primary(&reset_token, "a quantum argument")?;
        Ok(self.builder.create_reset(target)?)
    }

    fn parse_barrier(&mut self) -> Result<NodeId, ParseError> {
        let barrier_token = self.expect_known(TokenType::Barrier)?;
        let targets = self.parse_primary_list(&barrier_token)?;
        Ok(self.builder.create_barrier(targets)?)
    }

    /// Parse an `if (creg == value) <operation>` statement, not including the terminating
    /// semicolon of the wrapped operation.  Conditions do not nest.
    fn parse_conditional(&mut self) -> Result<NodeId, ParseError> {
        let if_token = self.expect_known(TokenType::If)?;
        let lparen_token = self.expect(TokenType::LParen, "'('", &if_token)?;
        let name_token = self.expect(TokenType::Id, "a classical register", &if_token)?;
        self.expect(TokenType::Equals, "'=='", &if_token)?;
        let value_token = self.expect(TokenType::Integer, "an integer", &if_token)?;
        self.expect(TokenType::RParen, "')'", &lparen_token)?;
        let creg = self.make_id(&name_token)?;
        let value = self.make_int(&value_token)?;
        let op = self.parse_quantum_op(&if_token)?;
        Ok(self.builder.create_if(creg, value, op)?)
    }

    /// Parse a single OpenQASM 2 statement into its node.  A return of `None` signals that all
    /// the token streams are exhausted.
    pub fn parse_statement(&mut self) -> Result<Option<NodeId>, ParseError> {
        loop {
            let allow_version = self.allow_version;
            self.allow_version = false;
            let Some(first) = self.peek_token()?.copied() else {
                return Ok(None);
            };
            let stream = self.active_stream()?;
            let ttype = first.ttype;
            let statement = match ttype {
                TokenType::Qreg | TokenType::Creg => self.parse_register(ttype)?,
                TokenType::Gate => self.parse_gate_definition()?,
                TokenType::Include => self.parse_include()?,
                TokenType::Opaque => {
                    let node = self.parse_opaque_definition()?;
                    self.expect(TokenType::Semicolon, "';'", &first)?;
                    node
                }
                TokenType::U
                | TokenType::CX
                | TokenType::Id
                | TokenType::Measure
                | TokenType::Reset
                | TokenType::Barrier
                | TokenType::If => {
                    let node = if ttype == TokenType::If {
                        self.parse_conditional()?
                    } else {
                        self.parse_quantum_op(&first)?
                    };
                    self.expect(TokenType::Semicolon, "';'", &first)?;
                    node
                }
                TokenType::OpenQASM => {
                    if allow_version {
                        let (version_token, _) = self.parse_version()?;
                        tracing::debug!(
                            filename = self.current_filename(),
                            version = version_token.text(&self.context),
                            "skipping version marker of included file"
                        );
                        continue;
                    }
                    let token = self.expect_known(TokenType::OpenQASM)?;
                    return Err(ParseError::syntax(
                        self.position(&token),
                        "only the first statement may be a version declaration",
                    ));
                }
                TokenType::Semicolon => {
                    let token = self.expect_known(TokenType::Semicolon)?;
                    if self.strict {
                        return Err(ParseError::syntax(
                            self.position(&token),
                            "[strict] empty statements and/or extra semicolons are forbidden",
                        ));
                    }
                    continue;
                }
                _ => {
                    let token = self.expect_known(ttype)?;
                    return Err(ParseError::syntax(
                        self.position(&token),
                        format!(
                            "needed a start-of-statement token, but instead got {}",
                            token.text(&self.context)
                        ),
                    ));
                }
            };
            // The statement counts towards every include that is open around its first token.
            for splice in self.splices.iter_mut().take(stream + 1).flatten() {
                splice.statements += 1;
            }
            return Ok(Some(statement));
        }
    }

    /// Parse a complete program: the optional version marker, an optional leading include, and
    /// then every statement until all token streams are exhausted.  Returns the handle of the
    /// [MainProgram][crate::ast::Node::MainProgram] node.
    pub fn parse_main_program(&mut self) -> Result<NodeId, ParseError> {
        let magic = match self.peek_token()?.copied() {
            Some(token) if token.ttype == TokenType::OpenQASM => Some(self.parse_magic()?),
            Some(token) if self.strict => {
                return Err(ParseError::syntax(
                    self.position(&token),
                    "[strict] the first statement must be 'OPENQASM 2.0;'",
                ))
            }
            None if self.strict => {
                return Err(ParseError::new(
                    ErrorKind::Syntax,
                    None,
                    "[strict] saw an empty token stream, but needed a version statement",
                ))
            }
            _ => None,
        };
        let include = if self.next_is(TokenType::Include)? {
            Some(self.parse_include()?)
        } else {
            None
        };
        let mut program = None;
        while let Some(statement) = self.parse_statement()? {
            program = Some(self.append(ListKind::Program, program, statement)?);
        }
        let Some(program) = program else {
            return Err(ParseError::bad_eof(self.last_position(), "a statement"));
        };
        self.close_streams_above(0);
        Ok(self.builder.create_main_program(magic, include, program)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Ast, Node, NodeKind};
    use crate::include::NoIncludes;
    use hashbrown::HashMap;

    fn parse_with(source: &str, strict: bool) -> Result<(Ast, NodeId), ParseError> {
        parse_with_includes(source, strict, &mut NoIncludes)
    }

    fn parse_with_includes(
        source: &str,
        strict: bool,
        includes: &mut dyn IncludeResolver,
    ) -> Result<(Ast, NodeId), ParseError> {
        let mut ast = Ast::new();
        let options = ParserOptions::default().with_strict(strict);
        let tokens = TokenStream::from_string(source.to_owned(), strict);
        let root = State::new(tokens, &mut ast, includes, &options).parse_main_program()?;
        Ok((ast, root))
    }

    fn statements(ast: &Ast, root: NodeId) -> Vec<NodeId> {
        match ast.node(root) {
            Node::MainProgram { program, .. } => ast.list_items(*program),
            other => panic!("not a program: {:?}", other),
        }
    }

    #[test]
    fn conditional_wraps_one_operation() {
        let (ast, root) =
            parse_with("qreg q[2]; creg c[2]; if (c==1) cx q[0],q[1];", false).unwrap();
        let statements = statements(&ast, root);
        assert_eq!(statements.len(), 3);
        let Node::If { creg, value, op } = ast.node(statements[2]) else {
            panic!("expected a conditional");
        };
        assert_eq!(ast.id_name(*creg), Some("c"));
        assert_eq!(ast.node(*value), &Node::Int(1u32.into()));
        let Node::CustomUnitary { name, targets, .. } = ast.node(*op) else {
            panic!("expected a gate application");
        };
        assert_eq!(ast.id_name(*name), Some("cx"));
        assert_eq!(ast.list_items(*targets).len(), 2);
    }

    #[test]
    fn conditionals_do_not_nest() {
        let err = parse_with("creg c[1]; qreg q[1]; if (c==1) if (c==0) x q;", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn gate_bodies_hold_builtins_and_barriers() {
        let source = "gate g(a) p, q { U(a, 0, pi) p; CX p, q; barrier p, q; h q; }";
        let (ast, root) = parse_with(source, false).unwrap();
        let statements = statements(&ast, root);
        let Node::Gate {
            name,
            params,
            qubits,
            body,
        } = ast.node(statements[0])
        else {
            panic!("expected a gate definition");
        };
        assert_eq!(ast.id_name(*name), Some("g"));
        assert_eq!(params.map(|params| ast.list_items(params).len()), Some(1));
        assert_eq!(ast.list_items(*qubits).len(), 2);
        let Node::GateBody { ops: Some(ops) } = ast.node(*body) else {
            panic!("expected a non-empty gate body");
        };
        let kinds = ast
            .list_items(*ops)
            .into_iter()
            .map(|op| ast.kind(op))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                NodeKind::UniversalUnitary,
                NodeKind::Cx,
                NodeKind::Barrier,
                NodeKind::CustomUnitary
            ]
        );
    }

    #[test]
    fn empty_gate_body_and_empty_arguments() {
        let (ast, root) = parse_with("gate g q {} qreg r[1]; g() r[0];", false).unwrap();
        let statements = statements(&ast, root);
        let Node::Gate { params, body, .. } = ast.node(statements[0]) else {
            panic!("expected a gate definition");
        };
        assert_eq!(*params, None);
        assert_eq!(ast.node(*body), &Node::GateBody { ops: None });
        let Node::CustomUnitary { args, .. } = ast.node(statements[2]) else {
            panic!("expected a gate application");
        };
        assert_eq!(*args, None);
    }

    #[test]
    fn indexed_operands_are_not_allowed_in_gate_bodies() {
        let err = parse_with("gate g q { h q[0]; }", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn unterminated_gate_body() {
        let err = parse_with("gate foo(a) q {", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), 1);
        assert!(err.message().contains("end-of-file"));
    }

    #[test]
    fn opaque_declarations() {
        let (ast, root) = parse_with("opaque magic(a, b) q, r;", false).unwrap();
        let statements = statements(&ast, root);
        let Node::Opaque { name, params, .. } = ast.node(statements[0]) else {
            panic!("expected an opaque declaration");
        };
        assert_eq!(ast.id_name(*name), Some("magic"));
        assert_eq!(params.map(|params| ast.list_items(params).len()), Some(2));
    }

    #[test]
    fn measurement_separators() {
        let source = "qreg q[1]; creg c[1]; measure q[0], c[0];";
        assert!(parse_with(source, false).is_ok());
        let err = parse_with(&format!("OPENQASM 2.0; {}", source), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.message().contains("[strict]"));
    }

    #[test]
    fn version_marker_is_optional_outside_strict_mode() {
        let (ast, root) = parse_with("qreg q[1];", false).unwrap();
        let Node::MainProgram { magic, .. } = ast.node(root) else {
            panic!("expected a program");
        };
        assert_eq!(*magic, None);

        let (ast, root) = parse_with("OPENQASM 2.0; qreg q[1];", false).unwrap();
        let Node::MainProgram {
            magic: Some(magic), ..
        } = ast.node(root)
        else {
            panic!("expected a version marker");
        };
        let Node::Magic { version } = ast.node(*magic) else {
            panic!("expected a version marker");
        };
        assert_eq!(ast.node(*version), &Node::Real(2.0));

        let err = parse_with("qreg q[1];", true).unwrap_err();
        assert!(err.message().contains("OPENQASM 2.0"));
    }

    #[test]
    fn version_marker_only_comes_first() {
        let err = parse_with("qreg q[1]; OPENQASM 2.0;", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.message().contains("first statement"));
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let err = parse_with("OPENQASM 3.0; qreg q[1];", false).unwrap_err();
        assert!(err.message().contains("OpenQASM 2.0"));
    }

    #[test]
    fn oversized_versions_are_rejected() {
        let err = parse_with("OPENQASM 99999999999999999999999.0; qreg q[1];", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), 1);
        assert!(err.message().contains("version number"));
    }

    #[test]
    fn empty_statements() {
        assert!(parse_with("qreg q[1];;", false).is_ok());
        let err = parse_with("OPENQASM 2.0; qreg q[1];;", true).unwrap_err();
        assert!(err.message().contains("[strict]"));
    }

    #[test]
    fn trailing_commas() {
        assert!(parse_with("qreg q[2]; barrier q[0], q[1],;", false).is_ok());
        let err = parse_with("OPENQASM 2.0; qreg q[2]; barrier q[0], q[1],;", true).unwrap_err();
        assert!(err.message().contains("trailing comma"));
    }

    #[test]
    fn empty_program_is_an_error() {
        let err = parse_with("", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        let err = parse_with("OPENQASM 2.0;", false).unwrap_err();
        assert!(err.message().contains("a statement"));
    }

    #[test]
    fn missing_semicolon_points_at_the_next_token() {
        let err = parse_with("qreg q[1];\nreset q[0]\nreset q[0];", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn includes_fail_without_a_resolver() {
        let err = parse_with("include \"qelib1.inc\";", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Include);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn included_statements_are_counted_per_include() {
        let mut includes = [
            ("outer.inc", "qreg a[1]; include \"inner.inc\"; creg b[1];"),
            ("inner.inc", "OPENQASM 2.0; qreg c[1]; qreg d[1];"),
        ]
        .into_iter()
        .map(|(name, text)| (name.to_owned(), text.to_owned()))
        .collect::<HashMap<_, _>>();
        let source = "qreg q[1];\ninclude \"outer.inc\";\nreset q[0];";
        let (ast, root) = parse_with_includes(source, false, &mut includes).unwrap();
        let statements = statements(&ast, root);
        // q, outer include, a, inner include, c, d, b, reset.
        assert_eq!(statements.len(), 8);
        assert_eq!(ast.kind(statements[1]), NodeKind::Include);
        assert_eq!(ast.kind(statements[3]), NodeKind::Include);
        assert_eq!(ast.spliced_statements(statements[1]), 5);
        assert_eq!(ast.spliced_statements(statements[3]), 2);
        assert_eq!(ast.spliced_statements(statements[0]), 0);
    }

    #[test]
    fn includes_at_the_end_of_the_program_are_counted() {
        let mut includes = HashMap::new();
        includes.insert("tail.inc".to_owned(), "qreg t[1];".to_owned());
        let (ast, root) =
            parse_with_includes("qreg q[1]; include \"tail.inc\";", false, &mut includes).unwrap();
        let statements = statements(&ast, root);
        assert_eq!(statements.len(), 3);
        assert_eq!(ast.spliced_statements(statements[1]), 1);
    }
}
