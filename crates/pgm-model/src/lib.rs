//! The in-memory parse tree for the BUGS-like model language (§6) and its compiler. The
//! textual parser is external (§6: "the core consumes a parse tree and emits a graph"); this
//! crate only defines the tree shape a parser would build and turns it into a [pgm_graph::Graph].

pub mod ast;
pub mod compiler;
pub mod data;

pub use ast::{Expr, IndexExpr, Model, Stmt, Target};
pub use compiler::{Compiled, compile};
pub use data::{MISSING, ModelData, is_missing};
