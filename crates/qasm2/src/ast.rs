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

//! The node-construction contract between the grammar engine and whatever stores the syntax
//! tree, along with [Ast], the default arena-backed store.
//!
//! The parser never holds a reference to a node; it only ever sees opaque [NodeId] and [StringId]
//! handles returned by an [AstBuilder].  Every node is created exactly once, after all of its
//! children, and is never modified afterwards.  Sequences (the program body, argument lists and so
//! on) are built as a chain of [Node::List] links, each pointing back to the list built so far, so
//! the builder never has to deal with variable-arity nodes.

use hashbrown::HashMap;
use num_bigint::BigUint;
use thiserror::Error;

macro_rules! newtype_id {
    ($id:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $id(usize);

        impl $id {
            pub fn new(value: usize) -> Self {
                Self(value)
            }

            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

newtype_id!(NodeId);
newtype_id!(StringId);

/// The builder ran out of space for new nodes.  This is the only way a create call may fail.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("the AST store cannot hold more than {limit} nodes")]
pub struct CapacityError {
    pub limit: usize,
}

pub type BuildResult = Result<NodeId, CapacityError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
}

impl BinaryOp {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Power => "^",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Plus,
    Minus,
}

impl PrefixOp {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

/// What a chain of [Node::List] links holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Top-level statements.
    Program,
    /// Operations inside a gate body.
    GateOps,
    /// Bare identifiers: gate parameters, gate qubits and operands inside a gate body.
    Ids,
    /// Identifiers or indexed identifiers at the top level.
    Primaries,
    /// Parameter expressions.
    Expressions,
}

/// A single node of the syntax tree.  Child handles always refer to nodes that were created before
/// this one.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    MainProgram {
        magic: Option<NodeId>,
        include: Option<NodeId>,
        program: NodeId,
    },
    /// The `OPENQASM <version>;` marker.  The version is held as a [Node::Real].
    Magic {
        version: NodeId,
    },
    Include {
        filename: StringId,
    },
    QReg {
        id: NodeId,
    },
    CReg {
        id: NodeId,
    },
    Gate {
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
        body: NodeId,
    },
    GateBody {
        ops: Option<NodeId>,
    },
    /// The builtin `U(theta, phi, lambda) target`.
    UniversalUnitary {
        args: NodeId,
        target: NodeId,
    },
    /// The builtin `CX control, target`.
    Cx {
        control: NodeId,
        target: NodeId,
    },
    CustomUnitary {
        name: NodeId,
        args: Option<NodeId>,
        targets: NodeId,
    },
    Opaque {
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
    },
    Measure {
        qubit: NodeId,
        clbit: NodeId,
    },
    Reset {
        target: NodeId,
    },
    Barrier {
        targets: NodeId,
    },
    If {
        creg: NodeId,
        value: NodeId,
        op: NodeId,
    },
    IndexedId {
        id: NodeId,
        index: NodeId,
    },
    Id {
        name: StringId,
        line: usize,
    },
    BinaryOp {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    PrefixOp {
        op: PrefixOp,
        operand: NodeId,
    },
    Int(BigUint),
    Real(f64),
    Pi,
    /// One of the builtin functions `sin`, `cos`, `tan`, `exp`, `ln` or `sqrt`.
    External {
        operand: NodeId,
        function: StringId,
    },
    /// One link of a sequence.  `previous` is the list built so far, or `None` for the first item.
    List {
        kind: ListKind,
        previous: Option<NodeId>,
        item: NodeId,
    },
}

/// The kind tag of a [Node], without any of its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    MainProgram,
    Magic,
    Include,
    QReg,
    CReg,
    Gate,
    GateBody,
    UniversalUnitary,
    Cx,
    CustomUnitary,
    Opaque,
    Measure,
    Reset,
    Barrier,
    If,
    IndexedId,
    Id,
    BinaryOp,
    PrefixOp,
    Int,
    Real,
    Pi,
    External,
    List(ListKind),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::MainProgram { .. } => NodeKind::MainProgram,
            Node::Magic { .. } => NodeKind::Magic,
            Node::Include { .. } => NodeKind::Include,
            Node::QReg { .. } => NodeKind::QReg,
            Node::CReg { .. } => NodeKind::CReg,
            Node::Gate { .. } => NodeKind::Gate,
            Node::GateBody { .. } => NodeKind::GateBody,
            Node::UniversalUnitary { .. } => NodeKind::UniversalUnitary,
            Node::Cx { .. } => NodeKind::Cx,
            Node::CustomUnitary { .. } => NodeKind::CustomUnitary,
            Node::Opaque { .. } => NodeKind::Opaque,
            Node::Measure { .. } => NodeKind::Measure,
            Node::Reset { .. } => NodeKind::Reset,
            Node::Barrier { .. } => NodeKind::Barrier,
            Node::If { .. } => NodeKind::If,
            Node::IndexedId { .. } => NodeKind::IndexedId,
            Node::Id { .. } => NodeKind::Id,
            Node::BinaryOp { .. } => NodeKind::BinaryOp,
            Node::PrefixOp { .. } => NodeKind::PrefixOp,
            Node::Int(_) => NodeKind::Int,
            Node::Real(_) => NodeKind::Real,
            Node::Pi => NodeKind::Pi,
            Node::External { .. } => NodeKind::External,
            Node::List { kind, .. } => NodeKind::List(*kind),
        }
    }

    /// The node handles this node refers to, in source order.  Interned strings are not included.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::MainProgram {
                magic,
                include,
                program,
            } => magic.iter().chain(include).copied().chain([*program]).collect(),
            Node::Magic { version } => vec![*version],
            Node::QReg { id } | Node::CReg { id } => vec![*id],
            Node::Gate {
                name,
                params,
                qubits,
                body,
            } => std::iter::once(*name)
                .chain(*params)
                .chain([*qubits, *body])
                .collect(),
            Node::GateBody { ops } => ops.iter().copied().collect(),
            Node::UniversalUnitary { args, target } => vec![*args, *target],
            Node::Cx { control, target } => vec![*control, *target],
            Node::CustomUnitary {
                name,
                args: params,
                targets: qubits,
            }
            | Node::Opaque {
                name,
                params,
                qubits,
            } => std::iter::once(*name)
                .chain(*params)
                .chain([*qubits])
                .collect(),
            Node::Measure { qubit, clbit } => vec![*qubit, *clbit],
            Node::Reset { target } => vec![*target],
            Node::Barrier { targets } => vec![*targets],
            Node::If { creg, value, op } => vec![*creg, *value, *op],
            Node::IndexedId { id, index } => vec![*id, *index],
            Node::BinaryOp { left, right, .. } => vec![*left, *right],
            Node::PrefixOp { operand, .. } => vec![*operand],
            Node::External { operand, .. } => vec![*operand],
            Node::List { previous, item, .. } => previous.iter().copied().chain([*item]).collect(),
            Node::Include { .. } | Node::Id { .. } | Node::Int(_) | Node::Real(_) | Node::Pi => {
                vec![]
            }
        }
    }
}

/// Turns byte content into stable handles.  Interning the same text twice within one store must
/// return the same handle.
pub trait StringInterner {
    fn intern(&mut self, text: &str) -> StringId;
}

/// The node-creation contract.  There is one create operation per node kind; each takes exactly
/// the children of its production, returns a fresh handle, and may only fail by running out of
/// space.
pub trait AstBuilder: StringInterner {
    fn create_main_program(
        &mut self,
        magic: Option<NodeId>,
        include: Option<NodeId>,
        program: NodeId,
    ) -> BuildResult;
    fn create_magic(&mut self, version: NodeId) -> BuildResult;
    fn create_include(&mut self, filename: StringId) -> BuildResult;
    fn create_qreg(&mut self, id: NodeId) -> BuildResult;
    fn create_creg(&mut self, id: NodeId) -> BuildResult;
    fn create_gate(
        &mut self,
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
        body: NodeId,
    ) -> BuildResult;
    fn create_gate_body(&mut self, ops: Option<NodeId>) -> BuildResult;
    fn create_universal_unitary(&mut self, args: NodeId, target: NodeId) -> BuildResult;
    fn create_cx(&mut self, control: NodeId, target: NodeId) -> BuildResult;
    fn create_custom_unitary(
        &mut self,
        name: NodeId,
        args: Option<NodeId>,
        targets: NodeId,
    ) -> BuildResult;
    fn create_opaque(
        &mut self,
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
    ) -> BuildResult;
    fn create_measure(&mut self, qubit: NodeId, clbit: NodeId) -> BuildResult;
    fn create_reset(&mut self, target: NodeId) -> BuildResult;
    fn create_barrier(&mut self, targets: NodeId) -> BuildResult;
    fn create_if(&mut self, creg: NodeId, value: NodeId, op: NodeId) -> BuildResult;
    fn create_indexed_id(&mut self, id: NodeId, index: NodeId) -> BuildResult;
    fn create_id(&mut self, name: StringId, line: usize) -> BuildResult;
    fn create_binary_op(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> BuildResult;
    fn create_prefix_op(&mut self, op: PrefixOp, operand: NodeId) -> BuildResult;
    fn create_int(&mut self, value: BigUint) -> BuildResult;
    fn create_real(&mut self, value: f64) -> BuildResult;
    fn create_pi(&mut self) -> BuildResult;
    fn create_external(&mut self, operand: NodeId, function: StringId) -> BuildResult;
    /// Start a new list holding only `item`.
    fn create_list(&mut self, kind: ListKind, item: NodeId) -> BuildResult;
    /// Extend `list` with `item` at the end.
    fn create_list_cons(&mut self, kind: ListKind, list: NodeId, item: NodeId) -> BuildResult;
    /// Note that the `statements` program statements straight after `include` came from its file,
    /// counting those of nested includes.  Called once the included file has been read to its end.
    fn note_spliced(&mut self, _include: NodeId, _statements: usize) {}
}

/// Interned text, owned by an [Ast].
#[derive(Clone, Debug, Default)]
struct StringTable {
    text: Vec<String>,
    lookup: HashMap<String, StringId>,
}

impl StringTable {
    fn intern(&mut self, text: &str) -> StringId {
        match self.lookup.get(text) {
            Some(id) => *id,
            None => {
                let id = StringId::new(self.text.len());
                self.text.push(text.to_owned());
                self.lookup.insert(text.to_owned(), id);
                id
            }
        }
    }
}

/// The default arena-backed syntax tree.  Handles are indices into the arena, so they are only
/// meaningful for the store that issued them; looking up a foreign handle may panic.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    strings: StringTable,
    node_limit: Option<usize>,
    spliced: HashMap<NodeId, usize>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses to hold more than `limit` nodes.
    pub fn with_node_limit(limit: usize) -> Self {
        Self {
            node_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    /// The text behind an interned handle.
    pub fn string(&self, id: StringId) -> &str {
        &self.strings.text[id.0]
    }

    /// Look up the handle of already-interned text, without interning it.
    pub fn lookup(&self, text: &str) -> Option<StringId> {
        self.strings.lookup.get(text).copied()
    }

    /// The name of an [Node::Id], or `None` if the node is something else.
    pub fn id_name(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Node::Id { name, .. } => Some(self.string(*name)),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children()
    }

    /// How many program statements following the [Node::Include] `include` were read from its
    /// file.  Zero for anything else.
    pub fn spliced_statements(&self, include: NodeId) -> usize {
        self.spliced.get(&include).copied().unwrap_or(0)
    }

    /// Flatten a chain of [Node::List] links into its items, in source order.  If `list` is not a
    /// list node, it is treated as a list of one.
    pub fn list_items(&self, list: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = Some(list);
        while let Some(link) = cursor {
            match self.node(link) {
                Node::List { previous, item, .. } => {
                    out.push(*item);
                    cursor = *previous;
                }
                _ => {
                    out.push(link);
                    cursor = None;
                }
            }
        }
        out.reverse();
        out
    }

    /// Every node reachable from `root`, parents before children and children in source order.
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    fn push(&mut self, node: Node) -> BuildResult {
        if let Some(limit) = self.node_limit {
            if self.nodes.len() >= limit {
                return Err(CapacityError { limit });
            }
        }
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }
}

impl StringInterner for Ast {
    fn intern(&mut self, text: &str) -> StringId {
        self.strings.intern(text)
    }
}

impl AstBuilder for Ast {
    fn create_main_program(
        &mut self,
        magic: Option<NodeId>,
        include: Option<NodeId>,
        program: NodeId,
    ) -> BuildResult {
        self.push(Node::MainProgram {
            magic,
            include,
            program,
        })
    }

    fn create_magic(&mut self, version: NodeId) -> BuildResult {
        self.push(Node::Magic { version })
    }

    fn create_include(&mut self, filename: StringId) -> BuildResult {
        self.push(Node::Include { filename })
    }

    fn create_qreg(&mut self, id: NodeId) -> BuildResult {
        self.push(Node::QReg { id })
    }

    fn create_creg(&mut self, id: NodeId) -> BuildResult {
        self.push(Node::CReg { id })
    }

    fn create_gate(
        &mut self,
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
        body: NodeId,
    ) -> BuildResult {
        self.push(Node::Gate {
            name,
            params,
            qubits,
            body,
        })
    }

    fn create_gate_body(&mut self, ops: Option<NodeId>) -> BuildResult {
        self.push(Node::GateBody { ops })
    }

    fn create_universal_unitary(&mut self, args: NodeId, target: NodeId) -> BuildResult {
        self.push(Node::UniversalUnitary { args, target })
    }

    fn create_cx(&mut self, control: NodeId, target: NodeId) -> BuildResult {
        self.push(Node::Cx { control, target })
    }

    fn create_custom_unitary(
        &mut self,
        name: NodeId,
        args: Option<NodeId>,
        targets: NodeId,
    ) -> BuildResult {
        self.push(Node::CustomUnitary {
            name,
            args,
            targets,
        })
    }

    fn create_opaque(
        &mut self,
        name: NodeId,
        params: Option<NodeId>,
        qubits: NodeId,
    ) -> BuildResult {
        self.push(Node::Opaque {
            name,
            params,
            qubits,
        })
    }

    fn create_measure(&mut self, qubit: NodeId, clbit: NodeId) -> BuildResult {
        self.push(Node::Measure { qubit, clbit })
    }

    fn create_reset(&mut self, target: NodeId) -> BuildResult {
        self.push(Node::Reset { target })
    }

    fn create_barrier(&mut self, targets: NodeId) -> BuildResult {
        self.push(Node::Barrier { targets })
    }

    fn create_if(&mut self, creg: NodeId, value: NodeId, op: NodeId) -> BuildResult {
        self.push(Node::If { creg, value, op })
    }

    fn create_indexed_id(&mut self, id: NodeId, index: NodeId) -> BuildResult {
        self.push(Node::IndexedId { id, index })
    }

    fn create_id(&mut self, name: StringId, line: usize) -> BuildResult {
        self.push(Node::Id { name, line })
    }

    fn create_binary_op(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> BuildResult {
        self.push(Node::BinaryOp { op, left, right })
    }

    fn create_prefix_op(&mut self, op: PrefixOp, operand: NodeId) -> BuildResult {
        self.push(Node::PrefixOp { op, operand })
    }

    fn create_int(&mut self, value: BigUint) -> BuildResult {
        self.push(Node::Int(value))
    }

    fn create_real(&mut self, value: f64) -> BuildResult {
        self.push(Node::Real(value))
    }

    fn create_pi(&mut self) -> BuildResult {
        self.push(Node::Pi)
    }

    fn create_external(&mut self, operand: NodeId, function: StringId) -> BuildResult {
        self.push(Node::External { operand, function })
    }

    fn create_list(&mut self, kind: ListKind, item: NodeId) -> BuildResult {
        self.push(Node::List {
            kind,
            previous: None,
            item,
        })
    }

    fn create_list_cons(&mut self, kind: ListKind, list: NodeId, item: NodeId) -> BuildResult {
        self.push(Node::List {
            kind,
            previous: Some(list),
            item,
        })
    }

    fn note_spliced(&mut self, include: NodeId, statements: usize) {
        self.spliced.insert(include, statements);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut ast = Ast::new();
        let a = ast.intern("q");
        let b = ast.intern("c");
        assert_eq!(ast.intern("q"), a);
        assert_ne!(a, b);
        assert_eq!(ast.string(a), "q");
        assert_eq!(ast.lookup("c"), Some(b));
        assert_eq!(ast.lookup("nothing"), None);
    }

    #[test]
    fn handles_are_issued_in_creation_order() {
        let mut ast = Ast::new();
        let first = ast.create_pi().unwrap();
        let second = ast.create_real(0.5).unwrap();
        assert!(first < second);
        assert_eq!(ast.len(), 2);
        assert_eq!(ast.node(second), &Node::Real(0.5));
    }

    #[test]
    fn list_items_are_in_source_order() {
        let mut ast = Ast::new();
        let items = (0..4u32)
            .map(|i| ast.create_int(BigUint::from(i)).unwrap())
            .collect::<Vec<_>>();
        let mut list = ast.create_list(ListKind::Expressions, items[0]).unwrap();
        for item in &items[1..] {
            list = ast
                .create_list_cons(ListKind::Expressions, list, *item)
                .unwrap();
        }
        assert_eq!(ast.list_items(list), items);
        assert_eq!(ast.kind(list), NodeKind::List(ListKind::Expressions));
    }

    #[test]
    fn preorder_visits_parents_first() {
        let mut ast = Ast::new();
        let name = ast.intern("a");
        let left = ast.create_id(name, 1).unwrap();
        let right = ast.create_pi().unwrap();
        let op = ast.create_binary_op(BinaryOp::Plus, left, right).unwrap();
        let neg = ast.create_prefix_op(PrefixOp::Minus, op).unwrap();
        assert_eq!(ast.preorder(neg), vec![neg, op, left, right]);
    }

    #[test]
    fn node_limit_is_enforced() {
        let mut ast = Ast::with_node_limit(2);
        ast.create_pi().unwrap();
        ast.create_pi().unwrap();
        assert_eq!(ast.create_pi(), Err(CapacityError { limit: 2 }));
        assert_eq!(ast.len(), 2);
    }

    #[test]
    fn spliced_counts_belong_to_their_include() {
        let mut ast = Ast::new();
        let name = ast.intern("qelib1.inc");
        let include = ast.create_include(name).unwrap();
        let pi = ast.create_pi().unwrap();
        assert_eq!(ast.spliced_statements(include), 0);
        ast.note_spliced(include, 23);
        assert_eq!(ast.spliced_statements(include), 23);
        assert_eq!(ast.spliced_statements(pi), 0);
    }
}
