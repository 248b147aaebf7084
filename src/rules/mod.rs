//! The rule DSL: parser, AST, safety-validating compiler, the
//! indexed-variable value algebra, and the tree-walking evaluator.

pub mod ast;
pub mod compiler;
pub mod evaluator;
pub mod parser;
pub mod value;

pub use compiler::{compile, CompiledRule};
pub use evaluator::{EvalContext, EvalOutcome};
pub use value::{IndexedVariable, Value};
