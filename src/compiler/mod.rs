//! The definition-file compiler.
//!
//! ## Architecture
//!
//!   DSL source
//! → `frontend` (line parser) → unbound grammar (targets are names)
//! → `binder` (name resolution + no-eat chain compression) → [`Syntax`]
//! → `runtime` (execute)
//!
//! Compilation is best-effort: a malformed line never aborts the build.
//! Every problem is recorded as a [`Diagnostic`] (and mirrored to the `log`
//! facade), and the affected piece is patched up: unknown colors get
//! [`Attr::ERROR`](crate::attr::Attr::ERROR), unresolvable or missing
//! transitions get routed through a designated error state. The result is
//! always a usable automaton.
//! The only hard failure is being unable to read the source at all.

pub mod color;

pub(crate) mod binder;
pub(crate) mod frontend;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::syntax::Syntax;

/// Compiles a definition from a UTF-8 string.
///
/// Returns the bound automaton together with every diagnostic collected
/// during parsing and binding. A fully specified definition whose names all
/// resolve produces an empty diagnostic list.
pub fn compile(src: &str) -> (Syntax, Vec<Diagnostic>) {
    compile_bytes(src.as_bytes())
}

/// Compiles a definition from raw bytes. The format is byte-oriented; any
/// ASCII-compatible encoding works.
pub fn compile_bytes(src: &[u8]) -> (Syntax, Vec<Diagnostic>) {
    let mut diags = Diagnostics::default();
    let grammar = frontend::parse(src, &mut diags);
    let syntax = binder::bind(grammar, &mut diags);
    (syntax, diags.into_vec())
}

/// Reads and compiles a definition file.
pub fn compile_file(path: &Path) -> Result<(Syntax, Vec<Diagnostic>), CompileFileError> {
    let src = std::fs::read(path)
        .map_err(|source| CompileFileError::Read { path: path.to_path_buf(), source })?;
    Ok(compile_bytes(&src))
}

#[derive(Debug, Error)]
pub enum CompileFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single compile-time problem, tied to a source line when one is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line, `None` for problems found during binding.
    pub line: Option<u32>,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("unknown color '{0}'")]
    UnknownColor(String),
    #[error("unknown state '{0}'")]
    UnknownState(String),
    #[error("unknown state '{state}' for keyword '{word}'")]
    UnknownWordState { state: String, word: String },
    #[error("in state '{state}', no transition for byte {byte}")]
    UnpopulatedSlot { state: String, byte: u8 },
    #[error("in state '{state}', zero-width transition cycle for byte {byte}")]
    NoeatCycle { state: String, byte: u8 },
    #[error("transition line before any state declaration")]
    OrphanRule,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("bad recolor count in '{0}'")]
    BadRecolor(String),
    #[error("unterminated character class")]
    UnterminatedClass,
}

/// Collects diagnostics and mirrors them to the `log` facade as they occur.
#[derive(Default)]
pub(crate) struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn report(&mut self, line: Option<u32>, kind: DiagnosticKind) {
        let d = Diagnostic { line, kind };
        log::warn!(target: "jsf", "{d}");
        self.list.push(d);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.list
    }
}

/// Converts a token from the definition file for use in a message.
pub(crate) fn lossy(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}
