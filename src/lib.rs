//! Library entrypoint for `bitform`.
//!
//! The crate exposes the arithmetic expression engine, the compiled
//! instruction-stream IR, and the runtime field-access contracts.

pub mod expr;
pub mod ir;
pub mod runtime;
