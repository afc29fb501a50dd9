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

//! An operator-precedence subparser used by the main parser for handling parameter expressions.
//! Instances of this subparser are intended to only live for as long as it takes to parse a single
//! parameter.
//!
//! The precedence levels of OpenQASM 2 expressions are unusual: from tightest to loosest they are
//! prefix `+`/`-`, then infix `+`/`-`, then `*`/`/`, and finally `^`.  All infix operators are
//! left-associative, so `1+2*3` is `(1+2)*3` and `2*3^2` is `(2*3)^2`.  These levels are encoded
//! entirely in [prefix_power] and [binary_power].

use crate::ast::{BinaryOp, NodeId, PrefixOp};
use crate::error::{ParseError, Position};
use crate::lex::{Token, TokenType};
use crate::parse::State;

/// Enum representation of the builtin OpenQASM 2 functions.  This enum is essentially just a
/// subset of the [TokenType] enum, to allow for better pattern-match checking in the Rust
/// compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Cos,
    Exp,
    Ln,
    Sin,
    Sqrt,
    Tan,
}

impl Function {
    /// The name the function is written with, which is also the name the builder interns.
    pub fn name(&self) -> &'static str {
        match self {
            Function::Cos => "cos",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Sin => "sin",
            Function::Sqrt => "sqrt",
            Function::Tan => "tan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cos" => Some(Function::Cos),
            "exp" => Some(Function::Exp),
            "ln" => Some(Function::Ln),
            "sin" => Some(Function::Sin),
            "sqrt" => Some(Function::Sqrt),
            "tan" => Some(Function::Tan),
            _ => None,
        }
    }

    fn from_token(value: TokenType) -> Option<Self> {
        match value {
            TokenType::Cos => Some(Function::Cos),
            TokenType::Exp => Some(Function::Exp),
            TokenType::Ln => Some(Function::Ln),
            TokenType::Sin => Some(Function::Sin),
            TokenType::Sqrt => Some(Function::Sqrt),
            TokenType::Tan => Some(Function::Tan),
            _ => None,
        }
    }
}

/// An operator symbol used in the expression parsing.  This is essentially just a subset of the
/// [TokenType] enum (albeit with resolved names) to allow for better pattern-match semantics in
/// the Rust compiler.
#[derive(Clone, Copy)]
enum Op {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
}

impl Op {
    fn text(&self) -> &'static str {
        self.infix().text()
    }

    fn infix(&self) -> BinaryOp {
        match self {
            Op::Plus => BinaryOp::Plus,
            Op::Minus => BinaryOp::Minus,
            Op::Multiply => BinaryOp::Multiply,
            Op::Divide => BinaryOp::Divide,
            Op::Power => BinaryOp::Power,
        }
    }

    fn prefix(&self) -> Option<PrefixOp> {
        match self {
            Op::Plus => Some(PrefixOp::Plus),
            Op::Minus => Some(PrefixOp::Minus),
            _ => None,
        }
    }
}

/// An atom of the operator-precedence expression parsing.  This is a stripped-down version of the
/// [Token] and [TokenType] used in the main parser; the literal atoms keep hold of their token so
/// the value can be pulled out of the token context once we know we need a node for it.
enum Atom {
    LParen,
    RParen,
    Function(Function),
    Op(Op),
    Integer,
    Real,
    Pi,
    Id,
}

impl Atom {
    /// Not all [Token]s have a corresponding [Atom]; if this is the case, the return value is
    /// `None`.
    fn from_token(token: &Token) -> Option<Self> {
        match token.ttype {
            TokenType::LParen => Some(Atom::LParen),
            TokenType::RParen => Some(Atom::RParen),
            TokenType::Plus => Some(Atom::Op(Op::Plus)),
            TokenType::Minus => Some(Atom::Op(Op::Minus)),
            TokenType::Asterisk => Some(Atom::Op(Op::Multiply)),
            TokenType::Slash => Some(Atom::Op(Op::Divide)),
            TokenType::Caret => Some(Atom::Op(Op::Power)),
            TokenType::Real => Some(Atom::Real),
            TokenType::Integer => Some(Atom::Integer),
            TokenType::Pi => Some(Atom::Pi),
            TokenType::Id => Some(Atom::Id),
            ttype => Function::from_token(ttype).map(Atom::Function),
        }
    }
}

/// Calculate the binding power of an [Op] when used in a prefix position.  Returns [None] if the
/// operation cannot be used in the prefix position.  The binding power is on the same scale as
/// those returned by [binary_power].
fn prefix_power(op: Op) -> Option<u8> {
    match op {
        Op::Plus | Op::Minus => Some(7),
        _ => None,
    }
}

/// Calculate the binding power of an [Op] when used in an infix position.  The differences between
/// left- and right-binding powers represent the associativity of the operation.
fn binary_power(op: Op) -> (u8, u8) {
    // For new binding powers, use the odd number as the "base" and the even number one larger than
    // it to represent the associativity.  Every operator here is left-associative, so each binds
    // more strongly to the operand on its right.
    //
    // All powers should be greater than zero; we need zero free to be the base case in the
    // entry-point to the precedence parser.
    match op {
        Op::Power => (1, 2),
        Op::Multiply | Op::Divide => (3, 4),
        Op::Plus | Op::Minus => (5, 6),
    }
}

/// The operator-precedence parser for one expression.  It borrows the token streams and the
/// builder of the main parser for as long as it lives.
pub struct ExprParser<'s, 'a> {
    state: &'s mut State<'a>,
    /// Current recursion depth of [Self::eval_expression].
    depth: usize,
}

impl<'s, 'a> ExprParser<'s, 'a> {
    pub fn new(state: &'s mut State<'a>) -> Self {
        Self { state, depth: 0 }
    }

    fn position(&self, token: &Token) -> Position {
        self.state.position(token)
    }

    /// Peek at the next [Atom] (and backing [Token]) if the next token exists and can be converted
    /// into a valid [Atom].  If it can't, or if we are at the end of the input, the `None` variant
    /// is returned.
    fn peek_atom(&mut self) -> Result<Option<(Atom, Token)>, ParseError> {
        Ok(self
            .state
            .peek_token()?
            .and_then(|token| Atom::from_token(token).map(|atom| (atom, *token))))
    }

    /// Build the node for a function application.  The function name is interned so that the
    /// builder does not need to know the closed set of builtins.
    fn apply_function(&mut self, func: Function, operand: NodeId) -> Result<NodeId, ParseError> {
        let name = self.state.builder.intern(func.name());
        Ok(self.state.builder.create_external(operand, name)?)
    }

    /// The main recursive worker routine of the operator-precedence parser.  This parses a series
    /// of binary infix operators that have binding powers greater than the input `power_min`, and
    /// unary prefixes on the left-hand operand.  For example, if `power_min` starts out at `4`
    /// (such as it would when parsing the right-hand side of a binary `*` operator), then we will
    /// consume infix `+` and `-` but stop at a following `*` or `^`, leaving them for the caller.
    /// The entry point to the recursion, [Self::parse_expression], uses a `power_min` of zero.
    ///
    /// Alongside the node, this returns the height of the tree it roots, counting a lone value as
    /// one.  No tree may be taller than the maximum depth, so that everything walking the tree
    /// later recurses at most that deep, however the operators were chained in the source.
    fn eval_expression(
        &mut self,
        power_min: u8,
        cause: &Token,
    ) -> Result<(NodeId, usize), ParseError> {
        if self.depth >= self.state.max_depth {
            return Err(self.too_deep(cause));
        }
        self.depth += 1;
        let out = self.eval_expression_inner(power_min, cause);
        self.depth -= 1;
        out
    }

    fn too_deep(&self, cause: &Token) -> ParseError {
        ParseError::exhausted(
            Some(self.position(cause)),
            format!(
                "expressions are nested more than {} levels deep",
                self.state.max_depth
            ),
        )
    }

    /// The height of a new node whose tallest child has height `child`.
    fn grow(&self, child: usize, cause: &Token) -> Result<usize, ParseError> {
        if child >= self.state.max_depth {
            Err(self.too_deep(cause))
        } else {
            Ok(child + 1)
        }
    }

    fn eval_expression_inner(
        &mut self,
        power_min: u8,
        cause: &Token,
    ) -> Result<(NodeId, usize), ParseError> {
        let required = if power_min == 0 {
            "an expression"
        } else {
            "a missing operand"
        };
        let token = match self.state.next_token()? {
            Some(token) => token,
            None => return Err(ParseError::bad_eof(self.position(cause), required)),
        };
        let atom = match Atom::from_token(&token) {
            Some(atom) => atom,
            None => {
                return Err(ParseError::incorrect_requirement(
                    required,
                    &token,
                    self.state.current_filename(),
                ))
            }
        };
        // First parse the "left-hand side" of a (potential) sequence of binary infix operators.
        // This might be a simple value, a unary operator acting on a value, or a bracketed
        // expression (either the operand of a function, or just plain parentheses).  This can also
        // invoke a recursive call; the parenthesis components feel naturally recursive, and the
        // unary operator component introduces a new precedence level that requires a recursive
        // call to parse.
        let (mut lhs, mut height) = match atom {
            Atom::LParen => {
                let out = self.eval_expression(0, &token)?;
                self.state
                    .expect(TokenType::RParen, "a closing parenthesis", &token)?;
                out
            }
            Atom::RParen => {
                return Err(ParseError::syntax(
                    self.position(&token),
                    if power_min == 0 {
                        "did not find an expected expression"
                    } else {
                        "the parenthesis closed, but there was a missing operand"
                    },
                ))
            }
            Atom::Function(func) => {
                let lparen_token =
                    self.state
                        .expect(TokenType::LParen, "an opening parenthesis", &token)?;
                let (argument, height) = self.eval_expression(0, &token)?;
                self.state
                    .expect(TokenType::RParen, "a closing parenthesis", &lparen_token)?;
                let height = self.grow(height, &token)?;
                (self.apply_function(func, argument)?, height)
            }
            Atom::Op(op) => match (prefix_power(op), op.prefix()) {
                (Some(power), Some(prefix)) => {
                    let (operand, height) = self.eval_expression(power, &token)?;
                    let height = self.grow(height, &token)?;
                    (self.state.builder.create_prefix_op(prefix, operand)?, height)
                }
                _ => {
                    return Err(ParseError::syntax(
                        self.position(&token),
                        format!("'{}' is not a valid unary operator", op.text()),
                    ))
                }
            },
            Atom::Integer => (self.state.make_int(&token)?, 1),
            Atom::Real => {
                let value = self
                    .state
                    .value_of(&token, token.real(&self.state.context))?;
                (self.state.builder.create_real(value)?, 1)
            }
            Atom::Pi => (self.state.builder.create_pi()?, 1),
            Atom::Id => (self.state.make_id(&token)?, 1),
        };
        // Now loop over a series of infix operators.  We can continue as long as we're just
        // looking at operators that bind more tightly than the `power_min` passed to this
        // function.  Once they're the same power or less, we have to return, because the calling
        // parser needs to bind its operator before we move on to the next infix operator.
        while let Some((Atom::Op(op), peeked_token)) = self.peek_atom()? {
            let (power_l, power_r) = binary_power(op);
            if power_l < power_min {
                break;
            }
            self.state.next_token()?; // Skip peeked operator.
            let (rhs, rhs_height) = self.eval_expression(power_r, &peeked_token)?;
            height = self.grow(height.max(rhs_height), &peeked_token)?;
            lhs = self.state.builder.create_binary_op(op.infix(), lhs, rhs)?;
        }
        Ok((lhs, height))
    }

    /// Entry point to the operator-precedence parser.  Parses one complete expression, stopping
    /// at the first token that cannot continue it (such as a comma or closing parenthesis), and
    /// returns the handle of its root node.
    pub fn parse_expression(&mut self, cause: &Token) -> Result<NodeId, ParseError> {
        Ok(self.eval_expression(0, cause)?.0)
    }
}
