//! Compiler front and middle end for the Runa language: lexes and parses
//! source into an AST, lowers each function body to a control flow graph,
//! runs type inference/specialization/escape analysis/destructor insertion
//! over it, and emits textual SSA IR.
//!
//! Grounded on `original_source/runac/__init__.py`'s package layout: one
//! module per pass, wired together by [`driver`].

pub mod idx;
pub mod diagnostics;
pub mod symbol;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod types;
pub mod cfg;
pub mod liveness;
pub mod typeck;
pub mod specialize;
pub mod escape;
pub mod destruct;
pub mod llir;
pub mod module;
pub mod driver;
