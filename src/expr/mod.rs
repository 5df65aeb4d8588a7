//! Arithmetic expression mini-language embedded in the instruction stream.
//!
//! Source text compiles through a shunting-yard pass into postfix bytecode
//! with a proven maximum stack depth; the evaluator executes that bytecode
//! against runtime field values, and the decompiler replays it through a
//! visitor to reconstruct a readable form.

pub mod bytecode;
pub mod compiler;
pub mod decompile;
pub mod error;
pub mod eval;
pub mod token;

pub use bytecode::{BinaryOp, CompiledExpr, ExprOp, FieldRef, Operator, UnaryOp};
pub use compiler::{compile, FieldLookup, FieldResolver, FieldTable};
pub use decompile::{decompile, render_infix, ExprVisitor, InfixRenderer, Ref};
pub use error::{ExprError, ExprErrorKind};
pub use eval::{evaluate, Bindings, ValueProvider};
