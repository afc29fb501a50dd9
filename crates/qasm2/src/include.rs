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

//! Ways of turning the path in an `include "...";` statement into source text.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use thiserror::Error;

/// The standard gate library that every OpenQASM 2 program conventionally starts by including.
/// This is served when `qelib1.inc` is not found on disk.
pub const QELIB1_INC: &str = r#"// Quantum Experience (QE) Standard Header
// file: qelib1.inc

// --- QE Hardware primitives ---

// 3-parameter 2-pulse single qubit gate
gate u3(theta,phi,lambda) q { U(theta,phi,lambda) q; }
// 2-parameter 1-pulse single qubit gate
gate u2(phi,lambda) q { U(pi/2,phi,lambda) q; }
// 1-parameter 0-pulse single qubit gate
gate u1(lambda) q { U(0,0,lambda) q; }
// controlled-NOT
gate cx c,t { CX c,t; }
// idle gate (identity)
gate id a { U(0,0,0) a; }

// --- QE Standard Gates ---

// Pauli gate: bit-flip
gate x a { u3(pi,0,pi) a; }
// Pauli gate: bit and phase flip
gate y a { u3(pi,pi/2,pi/2) a; }
// Pauli gate: phase flip
gate z a { u1(pi) a; }
// Clifford gate: Hadamard
gate h a { u2(0,pi) a; }
// Clifford gate: sqrt(Z) phase gate
gate s a { u1(pi/2) a; }
// Clifford gate: conjugate of sqrt(Z)
gate sdg a { u1(-pi/2) a; }
// C3 gate: sqrt(S) phase gate
gate t a { u1(pi/4) a; }
// C3 gate: conjugate of sqrt(S)
gate tdg a { u1(-pi/4) a; }

// --- Standard rotations ---
// Rotation around X-axis
gate rx(theta) a { u3(theta,-pi/2,pi/2) a; }
// rotation around Y-axis
gate ry(theta) a { u3(theta,0,0) a; }
// rotation around Z axis
gate rz(phi) a { u1(phi) a; }

// --- QE Standard User-Defined Gates  ---

// controlled-Phase
gate cz a,b { h b; cx a,b; h b; }
// controlled-Y
gate cy a,b { sdg b; cx a,b; s b; }
// controlled-H
gate ch a,b {
h b; sdg b;
cx a,b;
h b; t b;
cx a,b;
t b; h b; s b; x b; s a;
}
// C3 gate: Toffoli
gate ccx a,b,c
{
  h c;
  cx b,c; tdg c;
  cx a,c; t c;
  cx b,c; tdg c;
  cx a,c; t b; t c; h c;
  cx a,b; t a; tdg b;
  cx a,b;
}
// controlled rz rotation
gate crz(lambda) a,b
{
  u1(lambda/2) b;
  cx a,b;
  u1(-lambda/2) b;
  cx a,b;
}
// controlled phase rotation
gate cu1(lambda) a,b
{
  u1(lambda/2) a;
  cx a,b;
  u1(lambda/2) b;
  cx a,b;
  u1(-lambda/2) b;
}
// controlled-U
gate cu3(theta,phi,lambda) c, t
{
  // implements controlled-U(theta,phi,lambda) with  target t and control c
  u1((lambda-phi)/2) t;
  cx c,t;
  u3(-theta/2,0,-(phi+lambda)/2) t;
  cx c,t;
  u3(theta/2,phi,0) t;
}
"#;

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("'{0}' was not found on the include path")]
    NotFound(String),
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("includes are disabled")]
    Disabled,
    /// A host-defined failure, such as a cancelled parse.
    #[error("{0}")]
    Other(String),
}

/// Fetches the text named by an `include` statement.  The parser blocks on this call, so hosts
/// that want to cancel a parse can do so here by returning an error.
pub trait IncludeResolver {
    fn resolve(&mut self, path: &str) -> Result<String, IncludeError>;
}

/// Adapts a closure into an [IncludeResolver].  Made with [from_fn].
#[derive(Clone, Copy, Debug)]
pub struct FromFn<F>(F);

/// Resolve includes by calling `resolve` with the path written in the source.
pub fn from_fn<F>(resolve: F) -> FromFn<F>
where
    F: FnMut(&str) -> Result<String, IncludeError>,
{
    FromFn(resolve)
}

impl<F> IncludeResolver for FromFn<F>
where
    F: FnMut(&str) -> Result<String, IncludeError>,
{
    fn resolve(&mut self, path: &str) -> Result<String, IncludeError> {
        (self.0)(path)
    }
}

/// Serves includes from memory, keyed by the exact path written in the source.
impl IncludeResolver for HashMap<String, String> {
    fn resolve(&mut self, path: &str) -> Result<String, IncludeError> {
        self.get(path)
            .cloned()
            .ok_or_else(|| IncludeError::NotFound(path.to_owned()))
    }
}

/// Refuses every include.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&mut self, _path: &str) -> Result<String, IncludeError> {
        Err(IncludeError::Disabled)
    }
}

/// Searches an ordered list of directories for included files.  If nothing on the path matches
/// and the requested file is `qelib1.inc`, the embedded copy [QELIB1_INC] is used.
#[derive(Clone, Debug, Default)]
pub struct SearchPath {
    directories: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

impl IncludeResolver for SearchPath {
    fn resolve(&mut self, path: &str) -> Result<String, IncludeError> {
        match find_include_path(Path::new(path), &self.directories) {
            Some(found) => std::fs::read_to_string(&found).map_err(|source| IncludeError::Io {
                path: found.display().to_string(),
                source,
            }),
            None if path == "qelib1.inc" => Ok(QELIB1_INC.to_owned()),
            None => Err(IncludeError::NotFound(path.to_owned())),
        }
    }
}

/// Find the first existing file that matches `filename` in the search `path`.  An absolute
/// `filename` is used as-is.
fn find_include_path(filename: &Path, path: &[PathBuf]) -> Option<PathBuf> {
    if filename.is_absolute() {
        return filename.is_file().then(|| filename.to_path_buf());
    }
    for directory in path.iter() {
        let mut absolute_path = directory.clone();
        absolute_path.push(filename);
        if absolute_path.is_file() {
            return Some(absolute_path);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn qelib1_falls_back_to_embedded_copy() {
        let mut resolver = SearchPath::default();
        assert_eq!(resolver.resolve("qelib1.inc").unwrap(), QELIB1_INC);
        assert!(matches!(
            resolver.resolve("missing.inc"),
            Err(IncludeError::NotFound(path)) if path == "missing.inc"
        ));
    }

    #[test]
    fn search_path_reads_from_directories_in_order() {
        let base = std::env::temp_dir().join(format!("qasm2-ast-include-{}", std::process::id()));
        let first = base.join("first");
        let second = base.join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(first.join("a.inc"), "qreg first[1];").unwrap();
        std::fs::write(second.join("a.inc"), "qreg second[1];").unwrap();
        std::fs::write(second.join("qelib1.inc"), "qreg local[1];").unwrap();

        let mut resolver = SearchPath::new(vec![first, second]);
        assert_eq!(resolver.resolve("a.inc").unwrap(), "qreg first[1];");
        assert_eq!(resolver.resolve("qelib1.inc").unwrap(), "qreg local[1];");
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn map_and_closure_resolvers() {
        let mut map = HashMap::new();
        map.insert("gates.inc".to_owned(), "opaque g q;".to_owned());
        assert_eq!(map.resolve("gates.inc").unwrap(), "opaque g q;");
        assert!(map.resolve("other.inc").is_err());

        let mut calls = 0;
        let mut closure = from_fn(|path: &str| {
            calls += 1;
            Err(IncludeError::Other(format!("cancelled before {}", path)))
        });
        assert_eq!(
            closure.resolve("x.inc").unwrap_err().to_string(),
            "cancelled before x.inc"
        );
        drop(closure);
        assert_eq!(calls, 1);
    }

    #[test]
    fn no_includes_refuses() {
        assert!(matches!(
            NoIncludes.resolve("qelib1.inc"),
            Err(IncludeError::Disabled)
        ));
    }
}
