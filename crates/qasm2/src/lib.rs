// This code is part of Qiskit.
//
// (C) Copyright IBM 2023
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at https://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

//! A parser for OpenQASM 2 that builds an abstract syntax tree through a pluggable
//! [AstBuilder].  The main entry point is [parse], which takes a token stream and a [Host]
//! bundling the builder, the include resolver and an optional outcome observer.  [parse_string]
//! and [parse_file] are conveniences that build into the default arena [Ast].

use std::path::{Path, PathBuf};

pub mod ast;
pub mod emit;
pub mod error;
pub mod eval;
mod expr;
pub mod host;
pub mod include;
pub mod lex;
mod parse;

pub use self::ast::{Ast, AstBuilder, ListKind, Node, NodeId, NodeKind, StringId, StringInterner};
pub use self::error::{ErrorKind, ParseError, Position};
pub use self::host::{Host, ParseObserver};
pub use self::include::{IncludeError, IncludeResolver, NoIncludes, SearchPath};
pub use self::lex::TokenStream;

/// Configuration of a single parse.
#[derive(Clone, Debug)]
pub struct ParserOptions {
    /// Whether to reject the relaxations that the permissive (default) mode allows.
    pub strict: bool,
    /// Directories searched, in order, for included files.
    pub include_path: Vec<PathBuf>,
    /// Deepest nesting of expressions (parentheses, prefix operators and the like) before the
    /// parse fails as resource exhaustion.
    pub max_depth: usize,
    /// Deepest nesting of `include` statements before the parse fails as resource exhaustion.
    pub max_include_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strict: false,
            include_path: Vec::new(),
            max_depth: 1000,
            max_include_depth: 64,
        }
    }
}

impl ParserOptions {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_include_path(mut self, include_path: Vec<PathBuf>) -> Self {
        self.include_path = include_path;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_include_depth(mut self, max_include_depth: usize) -> Self {
        self.max_include_depth = max_include_depth;
        self
    }
}

/// Parse a complete program from `tokens`, building nodes through the host's builder.  The
/// outcome is also reported to the host's observer, if it has one.  Returns the handle of the
/// `MainProgram` node.
#[tracing::instrument(level = "debug", skip_all, fields(filename = %tokens.filename()))]
pub fn parse(
    tokens: TokenStream,
    host: Host<'_>,
    options: &ParserOptions,
) -> Result<NodeId, ParseError> {
    let Host {
        builder,
        includes,
        observer,
    } = host;
    let outcome = parse::State::new(tokens, builder, includes, options).parse_main_program();
    match &outcome {
        Ok(root) => {
            tracing::debug!(root = root.index(), "parse succeeded");
        }
        Err(err) => {
            tracing::debug!(kind = ?err.kind(), line = err.line(), "parse failed: {}", err);
        }
    }
    if let Some(observer) = observer {
        match &outcome {
            Ok(root) => observer.on_success(*root),
            Err(err) => observer.on_failure(err.line(), err.message()),
        }
    }
    outcome
}

/// A syntax tree together with the handle of its root.
#[derive(Clone, Debug)]
pub struct Parsed {
    pub ast: Ast,
    pub root: NodeId,
}

impl Parsed {
    /// The top-level statements of the program, in source order.
    pub fn statements(&self) -> Vec<NodeId> {
        match self.ast.node(self.root) {
            Node::MainProgram { program, .. } => self.ast.list_items(*program),
            _ => Vec::new(),
        }
    }
}

/// Parse a string containing an OpenQASM 2 program into a fresh [Ast], resolving includes from
/// the configured include path.
pub fn parse_string(
    source: impl Into<String>,
    options: &ParserOptions,
) -> Result<Parsed, ParseError> {
    let tokens = TokenStream::from_string(source.into(), options.strict);
    parse_into_new_ast(tokens, options)
}

/// Parse the file at `path` into a fresh [Ast], resolving includes from the configured include
/// path.
pub fn parse_file(path: impl AsRef<Path>, options: &ParserOptions) -> Result<Parsed, ParseError> {
    let path = path.as_ref();
    let tokens = TokenStream::from_path(path, options.strict).map_err(|err| {
        ParseError::new(
            ErrorKind::Lexical,
            None,
            format!(
                "failed to read a token stream from file '{}': {}",
                path.display(),
                err
            ),
        )
    })?;
    parse_into_new_ast(tokens, options)
}

fn parse_into_new_ast(tokens: TokenStream, options: &ParserOptions) -> Result<Parsed, ParseError> {
    let mut ast = Ast::new();
    let mut includes = SearchPath::new(options.include_path.clone());
    let root = parse(tokens, Host::new(&mut ast, &mut includes), options)?;
    Ok(Parsed { ast, root })
}
