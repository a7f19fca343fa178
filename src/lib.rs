//! Compiler and execution engine for JOE-style `.jsf` syntax definitions.
//!
//! A definition file declares colors, states, and per-byte transition
//! rules. [`compile`] turns one into a [`Syntax`]: a dense automaton with
//! one rule slot per state per byte value, bound and checked so that every
//! lookup succeeds at runtime. [`apply`] then drives the automaton over a
//! byte stream and reports attribute runs through a [`RecolorSink`].
//!
//! The pipeline, in module order:
//!
//! * [`compiler::frontend`](compiler) parses the line-oriented format into
//!   an unbound grammar, names intact.
//! * The binder resolves names to arena indices, appends an error state
//!   that absorbs anything unresolvable, and compresses zero-width
//!   transition chains so the engine always makes progress.
//! * [`runtime`] holds the per-stream cursor and the apply loop.
//!
//! Compilation never fails: problems surface as [`Diagnostic`]s next to a
//! usable automaton, so a half-broken definition still highlights the
//! parts it describes.
//!
//! ```
//! use jsf::{apply, compile, ApplyState, Attr, RecolorSink};
//!
//! struct Count(u32);
//! impl RecolorSink for Count {
//!     fn recolor(&mut self, _distance: u32, _len: u32, _attr: Attr) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let (syntax, diags) = compile("=c 07\n:start c\n * start recolor=1\n");
//! assert!(diags.is_empty());
//!
//! let mut cur = ApplyState::new(&syntax);
//! let mut sink = Count(0);
//! apply(&syntax, &mut cur, &mut b"hi".iter().copied(), &mut sink);
//! assert_eq!(sink.0, 2);
//! ```

pub mod attr;
pub mod compiler;
pub mod runtime;
pub mod syntax;
pub mod table;

pub use attr::{Attr, Styles};
pub use compiler::{
    compile, compile_bytes, compile_file, CompileFileError, Diagnostic, DiagnosticKind,
};
pub use runtime::{apply, ApplyState, ByteSource, RecolorSink};
pub use syntax::{State, StateId, Syntax};
