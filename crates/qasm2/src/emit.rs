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

//! Rendering nodes back into OpenQASM 2 source.  Statements include their terminating semicolon.
//! Parentheses are only written where they are needed to make the output parse back into the same
//! tree under the OpenQASM 2 precedence levels.
//!
//! Included files are spliced into the program as ordinary statements.  When the tree was built by
//! an [Ast], it knows how many statements each `include` brought in, and those are left out of the
//! output so the `include` line brings them back in when the text is parsed again.

use std::fmt::Write;

use crate::ast::{Ast, BinaryOp, ListKind, Node, NodeId};

/// Render the node to source, printing reals in their shortest round-trip form.
pub fn qasm(ast: &Ast, node: NodeId) -> String {
    Emitter {
        ast,
        precision: None,
    }
    .render(node)
}

/// Render the node to source, printing reals with a fixed number of decimal places.
pub fn qasm_with_precision(ast: &Ast, node: NodeId, precision: usize) -> String {
    Emitter {
        ast,
        precision: Some(precision),
    }
    .render(node)
}

/// Binding level of an infix operator; a larger level binds more tightly.
fn level(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Power => 0,
        BinaryOp::Multiply | BinaryOp::Divide => 1,
        BinaryOp::Plus | BinaryOp::Minus => 2,
    }
}

struct Emitter<'a> {
    ast: &'a Ast,
    precision: Option<usize>,
}

impl Emitter<'_> {
    fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write(&mut out, node);
        out
    }

    fn join(&self, out: &mut String, list: NodeId, separator: &str) {
        for (i, item) in self.ast.list_items(list).into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            self.write(out, item);
        }
    }

    /// Write top-level statements one per line, dropping the ones that a written `include` brings
    /// back in.  The first `skip` statements came from a leading include.
    fn write_program(&self, out: &mut String, list: NodeId, mut skip: usize) {
        for statement in self.ast.list_items(list) {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            self.write(out, statement);
            out.push('\n');
            if let Node::Include { .. } = self.ast.node(statement) {
                skip = self.ast.spliced_statements(statement);
            }
        }
    }

    fn write_real(&self, out: &mut String, value: f64) {
        match self.precision {
            Some(precision) => {
                let _ = write!(out, "{:.*}", precision, value);
            }
            None => {
                let text = value.to_string();
                out.push_str(&text);
                // A bare integer would read back as an `Int`.
                if value.is_finite() && !text.contains('.') {
                    out.push_str(".0");
                }
            }
        }
    }

    /// Write an operand of an infix operator at `parent` level, parenthesising it if it binds
    /// more loosely than the operator (or equally, on the right-hand side).
    fn write_operand(&self, out: &mut String, operand: NodeId, parent: BinaryOp, right: bool) {
        let wrap = match self.ast.node(operand) {
            Node::BinaryOp { op, .. } => {
                level(*op) < level(parent) || (right && level(*op) == level(parent))
            }
            _ => false,
        };
        if wrap {
            out.push('(');
            self.write(out, operand);
            out.push(')');
        } else {
            self.write(out, operand);
        }
    }

    fn write(&self, out: &mut String, node: NodeId) {
        match self.ast.node(node) {
            Node::MainProgram {
                magic,
                include,
                program,
            } => {
                let mut skip = 0;
                if let Some(magic) = magic {
                    self.write(out, *magic);
                    out.push('\n');
                }
                if let Some(include) = include {
                    self.write(out, *include);
                    out.push('\n');
                    skip = self.ast.spliced_statements(*include);
                }
                self.write_program(out, *program, skip);
            }
            Node::Magic { version } => {
                out.push_str("OPENQASM ");
                self.write(out, *version);
                out.push(';');
            }
            Node::Include { filename } => {
                let _ = write!(out, "include \"{}\";", self.ast.string(*filename));
            }
            Node::QReg { id } => {
                out.push_str("qreg ");
                self.write(out, *id);
                out.push(';');
            }
            Node::CReg { id } => {
                out.push_str("creg ");
                self.write(out, *id);
                out.push(';');
            }
            Node::Gate {
                name,
                params,
                qubits,
                body,
            } => {
                out.push_str("gate ");
                self.write(out, *name);
                if let Some(params) = params {
                    out.push('(');
                    self.join(out, *params, ",");
                    out.push(')');
                }
                out.push(' ');
                self.join(out, *qubits, ",");
                out.push(' ');
                self.write(out, *body);
            }
            Node::GateBody { ops } => {
                out.push('{');
                if let Some(ops) = ops {
                    out.push('\n');
                    for op in self.ast.list_items(*ops) {
                        out.push_str("  ");
                        self.write(out, op);
                        out.push('\n');
                    }
                }
                out.push('}');
            }
            Node::UniversalUnitary { args, target } => {
                out.push_str("U(");
                self.join(out, *args, ",");
                out.push_str(") ");
                self.write(out, *target);
                out.push(';');
            }
            Node::Cx { control, target } => {
                out.push_str("CX ");
                self.write(out, *control);
                out.push(',');
                self.write(out, *target);
                out.push(';');
            }
            Node::CustomUnitary {
                name,
                args,
                targets,
            } => {
                self.write(out, *name);
                if let Some(args) = args {
                    out.push('(');
                    self.join(out, *args, ",");
                    out.push(')');
                }
                out.push(' ');
                self.join(out, *targets, ",");
                out.push(';');
            }
            Node::Opaque {
                name,
                params,
                qubits,
            } => {
                out.push_str("opaque ");
                self.write(out, *name);
                if let Some(params) = params {
                    out.push('(');
                    self.join(out, *params, ",");
                    out.push(')');
                }
                out.push(' ');
                self.join(out, *qubits, ",");
                out.push(';');
            }
            Node::Measure { qubit, clbit } => {
                out.push_str("measure ");
                self.write(out, *qubit);
                out.push_str(" -> ");
                self.write(out, *clbit);
                out.push(';');
            }
            Node::Reset { target } => {
                out.push_str("reset ");
                self.write(out, *target);
                out.push(';');
            }
            Node::Barrier { targets } => {
                out.push_str("barrier ");
                self.join(out, *targets, ",");
                out.push(';');
            }
            Node::If { creg, value, op } => {
                out.push_str("if(");
                self.write(out, *creg);
                out.push_str("==");
                self.write(out, *value);
                out.push_str(") ");
                self.write(out, *op);
            }
            Node::IndexedId { id, index } => {
                self.write(out, *id);
                out.push('[');
                self.write(out, *index);
                out.push(']');
            }
            Node::Id { name, .. } => out.push_str(self.ast.string(*name)),
            Node::BinaryOp { op, left, right } => {
                self.write_operand(out, *left, *op, false);
                out.push_str(op.text());
                self.write_operand(out, *right, *op, true);
            }
            Node::PrefixOp { op, operand } => {
                out.push_str(op.text());
                let wrap = matches!(self.ast.node(*operand), Node::BinaryOp { .. });
                if wrap {
                    out.push('(');
                }
                self.write(out, *operand);
                if wrap {
                    out.push(')');
                }
            }
            Node::Int(value) => {
                let _ = write!(out, "{}", value);
            }
            Node::Real(value) => self.write_real(out, *value),
            Node::Pi => out.push_str("pi"),
            Node::External { operand, function } => {
                out.push_str(self.ast.string(*function));
                out.push('(');
                self.write(out, *operand);
                out.push(')');
            }
            Node::List {
                kind: ListKind::Program,
                ..
            } => self.write_program(out, node, 0),
            Node::List { kind, .. } => {
                let separator = match kind {
                    ListKind::GateOps => "\n",
                    _ => ",",
                };
                self.join(out, node, separator);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{AstBuilder, PrefixOp, StringInterner};

    #[test]
    fn reals_keep_a_decimal_point() {
        let mut ast = Ast::new();
        let two = ast.create_real(2.0).unwrap();
        let small = ast.create_real(0.125).unwrap();
        let third = ast.create_real(1.0 / 3.0).unwrap();
        assert_eq!(qasm(&ast, two), "2.0");
        assert_eq!(qasm(&ast, small), "0.125");
        assert_eq!(qasm_with_precision(&ast, small, 4), "0.1250");
        assert_eq!(qasm_with_precision(&ast, third, 2), "0.33");
    }

    #[test]
    fn operands_are_parenthesised_only_when_needed() {
        let mut ast = Ast::new();
        let a = ast.intern("a");
        let b = ast.intern("b");
        let a = ast.create_id(a, 1).unwrap();
        let b = ast.create_id(b, 1).unwrap();
        let pi = ast.create_pi().unwrap();
        // (a*b)^pi needs no parentheses: `^` is the loosest level.
        let product = ast.create_binary_op(BinaryOp::Multiply, a, b).unwrap();
        let power = ast.create_binary_op(BinaryOp::Power, product, pi).unwrap();
        assert_eq!(qasm(&ast, power), "a*b^pi");
        // Neither does a^(b*pi), since `*` binds more tightly than `^`.
        let product = ast.create_binary_op(BinaryOp::Multiply, b, pi).unwrap();
        let power = ast.create_binary_op(BinaryOp::Power, a, product).unwrap();
        assert_eq!(qasm(&ast, power), "a^b*pi");
        // A power on either side of a product does.
        let power = ast.create_binary_op(BinaryOp::Power, b, pi).unwrap();
        let right = ast.create_binary_op(BinaryOp::Multiply, a, power).unwrap();
        let left = ast.create_binary_op(BinaryOp::Multiply, power, a).unwrap();
        assert_eq!(qasm(&ast, right), "a*(b^pi)");
        assert_eq!(qasm(&ast, left), "(b^pi)*a");
        // Left-associativity: a-(b-pi) keeps its parentheses.
        let diff = ast.create_binary_op(BinaryOp::Minus, b, pi).unwrap();
        let outer = ast.create_binary_op(BinaryOp::Minus, a, diff).unwrap();
        assert_eq!(qasm(&ast, outer), "a-(b-pi)");
        let neg = ast.create_prefix_op(PrefixOp::Minus, diff).unwrap();
        assert_eq!(qasm(&ast, neg), "-(b-pi)");
    }
}
