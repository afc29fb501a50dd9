// This code is part of Qiskit.
//
// (C) Copyright IBM 2026
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

//! Numeric evaluation of parameter expressions.
//!
//! Gate parameters are bound by name to expression nodes from the call site.  When a gate body is
//! expanded inside another gate body, the bound expressions themselves refer to the parameters of
//! the enclosing gate, so evaluation takes a stack of [Scope]s: an identifier is looked up in the
//! innermost scope, and the expression it is bound to is evaluated against the scopes outside it.

use hashbrown::HashMap;
use num_traits::ToPrimitive;
use thiserror::Error;

use crate::ast::{Ast, BinaryOp, Node, NodeId, NodeKind, PrefixOp};
use crate::expr::Function;

/// Parameter names bound to expression nodes.
pub type Scope = HashMap<String, NodeId>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("'{0}' is not bound in the current scope")]
    Unbound(String),
    #[error("a {0:?} node is not an expression")]
    NotAnExpression(NodeKind),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("the logarithm of {0} is undefined")]
    LogDomain(f64),
    #[error("the square root of {0} is undefined")]
    SqrtDomain(f64),
    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluate the expression rooted at `node`.  `scopes` runs from outermost to innermost.
///
/// This recurses once per level of the tree.  The parser never builds an expression taller than
/// [ParserOptions::max_depth][crate::ParserOptions::max_depth].
pub fn real(ast: &Ast, node: NodeId, scopes: &[Scope]) -> Result<f64, EvalError> {
    match ast.node(node) {
        // Integer literals are unbounded, so very wide ones round to the nearest float.
        Node::Int(value) => Ok(value.to_f64().unwrap_or(f64::INFINITY)),
        Node::Real(value) => Ok(*value),
        Node::Pi => Ok(std::f64::consts::PI),
        Node::Id { name, .. } => {
            let name = ast.string(*name);
            let (scope, outer) = scopes
                .split_last()
                .ok_or_else(|| EvalError::Unbound(name.to_owned()))?;
            let bound = scope
                .get(name)
                .ok_or_else(|| EvalError::Unbound(name.to_owned()))?;
            real(ast, *bound, outer)
        }
        Node::PrefixOp { op, operand } => {
            let value = real(ast, *operand, scopes)?;
            Ok(match op {
                PrefixOp::Plus => value,
                PrefixOp::Minus => -value,
            })
        }
        Node::BinaryOp { op, left, right } => {
            let left = real(ast, *left, scopes)?;
            let right = real(ast, *right, scopes)?;
            match op {
                BinaryOp::Plus => Ok(left + right),
                BinaryOp::Minus => Ok(left - right),
                BinaryOp::Multiply => Ok(left * right),
                BinaryOp::Divide if right == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Divide => Ok(left / right),
                BinaryOp::Power => Ok(left.powf(right)),
            }
        }
        Node::External { operand, function } => {
            let name = ast.string(*function);
            let function =
                Function::from_name(name).ok_or_else(|| EvalError::UnknownFunction(name.into()))?;
            let value = real(ast, *operand, scopes)?;
            match function {
                Function::Cos => Ok(value.cos()),
                Function::Exp => Ok(value.exp()),
                Function::Ln if value <= 0.0 => Err(EvalError::LogDomain(value)),
                Function::Ln => Ok(value.ln()),
                Function::Sin => Ok(value.sin()),
                Function::Sqrt if value < 0.0 => Err(EvalError::SqrtDomain(value)),
                Function::Sqrt => Ok(value.sqrt()),
                Function::Tan => Ok(value.tan()),
            }
        }
        other => Err(EvalError::NotAnExpression(other.kind())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{AstBuilder, StringInterner};
    use num_bigint::BigUint;

    #[test]
    fn literals_and_operators() {
        let mut ast = Ast::new();
        let two = ast.create_int(BigUint::from(2u32)).unwrap();
        let half = ast.create_real(0.5).unwrap();
        let pi = ast.create_pi().unwrap();
        let product = ast.create_binary_op(BinaryOp::Multiply, two, half).unwrap();
        let power = ast.create_binary_op(BinaryOp::Power, two, two).unwrap();
        let neg = ast.create_prefix_op(PrefixOp::Minus, pi).unwrap();
        assert_eq!(real(&ast, product, &[]), Ok(1.0));
        assert_eq!(real(&ast, power, &[]), Ok(4.0));
        assert_eq!(real(&ast, neg, &[]), Ok(-std::f64::consts::PI));
    }

    #[test]
    fn identifiers_resolve_through_enclosing_scopes() {
        let mut ast = Ast::new();
        let theta = ast.intern("theta");
        let lambda = ast.intern("lambda");
        // Outer gate: theta = 3.  Inner gate: lambda = theta / 2.
        let three = ast.create_real(3.0).unwrap();
        let theta_ref = ast.create_id(theta, 1).unwrap();
        let two = ast.create_real(2.0).unwrap();
        let bound = ast
            .create_binary_op(BinaryOp::Divide, theta_ref, two)
            .unwrap();
        let lambda_ref = ast.create_id(lambda, 2).unwrap();

        let outer = Scope::from_iter([("theta".to_owned(), three)]);
        let inner = Scope::from_iter([("lambda".to_owned(), bound)]);
        assert_eq!(
            real(&ast, lambda_ref, &[outer.clone(), inner.clone()]),
            Ok(1.5)
        );
        // Only the innermost scope is visible to the identifier itself.
        assert_eq!(
            real(&ast, theta_ref, &[outer, inner]),
            Err(EvalError::Unbound("theta".to_owned()))
        );
        assert_eq!(
            real(&ast, lambda_ref, &[]),
            Err(EvalError::Unbound("lambda".to_owned()))
        );
    }

    #[test]
    fn domain_errors() {
        let mut ast = Ast::new();
        let zero = ast.create_real(0.0).unwrap();
        let one = ast.create_real(1.0).unwrap();
        let minus_one = ast.create_prefix_op(PrefixOp::Minus, one).unwrap();
        let sqrt = ast.intern("sqrt");
        let ln = ast.intern("ln");
        let bad_sqrt = ast.create_external(minus_one, sqrt).unwrap();
        let bad_ln = ast.create_external(zero, ln).unwrap();
        let bad_div = ast.create_binary_op(BinaryOp::Divide, one, zero).unwrap();
        assert_eq!(real(&ast, bad_sqrt, &[]), Err(EvalError::SqrtDomain(-1.0)));
        assert_eq!(real(&ast, bad_ln, &[]), Err(EvalError::LogDomain(0.0)));
        assert_eq!(real(&ast, bad_div, &[]), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn statements_are_not_expressions() {
        let mut ast = Ast::new();
        let name = ast.intern("q");
        let id = ast.create_id(name, 1).unwrap();
        let reset = ast.create_reset(id).unwrap();
        assert_eq!(
            real(&ast, reset, &[]),
            Err(EvalError::NotAnExpression(NodeKind::Reset))
        );
    }
}
