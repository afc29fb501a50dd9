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

use crate::ast::{AstBuilder, NodeId};
use crate::include::IncludeResolver;

/// Receives the single outcome of a parse.  Exactly one of the two methods is called, once, and
/// no builder calls happen after it.
pub trait ParseObserver {
    fn on_success(&mut self, _root: NodeId) {}

    /// `line` is 0 if the failure has no source location.
    fn on_failure(&mut self, _line: usize, _message: &str) {}
}

/// The observer that ignores both outcomes.
impl ParseObserver for () {}

/// Everything a parse needs from its surroundings.  A host bundles these up once per parse instead
/// of configuring any process-wide state, so independent parses never interfere.
pub struct Host<'a> {
    pub builder: &'a mut dyn AstBuilder,
    pub includes: &'a mut dyn IncludeResolver,
    pub observer: Option<&'a mut dyn ParseObserver>,
}

impl<'a> Host<'a> {
    pub fn new(builder: &'a mut dyn AstBuilder, includes: &'a mut dyn IncludeResolver) -> Self {
        Self {
            builder,
            includes,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ParseObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}
