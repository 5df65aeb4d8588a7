//! Expression error contracts.

use std::fmt;

/// Stable expression error categories.
///
/// Compile-time kinds carry the offending source text and, where it exists,
/// a byte offset into it. Evaluation kinds surface to the caller of `eval`;
/// `MalformedBytecode` marks an internal compiler/evaluator bug rather than
/// bad user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprErrorKind {
    /// A numeric literal is malformed or overflows 32 bits.
    MalformedLiteral,
    /// An identifier does not resolve to any visible named field.
    UnknownField,
    /// An expression references an array-typed field.
    ArrayFieldReference,
    /// A bracket has no matching partner.
    UnbalancedBracket,
    /// A unary operator has no operand.
    DanglingUnary,
    /// An operator other than `+ - ~` appeared in unary position.
    InvalidUnaryOperator,
    /// The expression source contains no tokens.
    EmptyExpression,
    /// The static stack-depth proof failed.
    StackProofFailure,
    /// Integer division or modulo by zero during evaluation.
    DivisionByZero,
    /// An external name was not supplied at evaluation time.
    UnresolvedExternal,
    /// The compiled bytecode stream is malformed or truncated.
    MalformedBytecode,
}

impl fmt::Display for ExprErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedLiteral => "malformed numeric literal",
            Self::UnknownField => "unknown field reference",
            Self::ArrayFieldReference => "array field reference",
            Self::UnbalancedBracket => "unbalanced bracket",
            Self::DanglingUnary => "dangling unary operator",
            Self::InvalidUnaryOperator => "invalid unary operator",
            Self::EmptyExpression => "empty expression",
            Self::StackProofFailure => "stack depth proof failure",
            Self::DivisionByZero => "division by zero",
            Self::UnresolvedExternal => "unresolved external value",
            Self::MalformedBytecode => "malformed expression bytecode",
        };
        f.write_str(text)
    }
}

/// Expression error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    /// Error category.
    pub kind: ExprErrorKind,
    /// Byte offset into the expression source, when applicable.
    pub offset: Option<usize>,
    /// Human-readable error summary.
    pub message: String,
    /// Optional additional detail (usually the offending source text).
    pub detail: Option<String>,
}

impl ExprError {
    /// Creates an expression error.
    pub fn new(
        kind: ExprErrorKind,
        offset: Option<usize>,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            kind,
            offset,
            message: message.into(),
            detail,
        }
    }

    /// Creates a compile error annotated with the offending source.
    pub fn compile(
        kind: ExprErrorKind,
        offset: usize,
        message: impl Into<String>,
        source: &str,
    ) -> Self {
        Self::new(
            kind,
            Some(offset),
            message,
            Some(format!("in '{source}' at offset {offset}")),
        )
    }

    /// Creates an `EmptyExpression` error.
    pub fn empty_expression(source: &str) -> Self {
        Self::new(
            ExprErrorKind::EmptyExpression,
            None,
            "expression contains no tokens",
            Some(format!("source '{source}'")),
        )
    }

    /// Creates a `StackProofFailure` error.
    pub fn stack_proof(message: impl Into<String>, source: &str) -> Self {
        Self::new(
            ExprErrorKind::StackProofFailure,
            None,
            message,
            Some(format!("in '{source}'")),
        )
    }

    /// Creates a `DivisionByZero` error.
    pub fn division_by_zero(operator: &str) -> Self {
        Self::new(
            ExprErrorKind::DivisionByZero,
            None,
            format!("right operand of '{operator}' is zero"),
            None,
        )
    }

    /// Creates an `UnresolvedExternal` error.
    pub fn unresolved_external(name: &str) -> Self {
        Self::new(
            ExprErrorKind::UnresolvedExternal,
            None,
            "external value was not supplied",
            Some(format!("name '{name}'")),
        )
    }

    /// Creates a `MalformedBytecode` error.
    pub fn malformed_bytecode(detail: impl Into<String>) -> Self {
        Self::new(
            ExprErrorKind::MalformedBytecode,
            None,
            "compiled expression bytecode is malformed",
            Some(detail.into()),
        )
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExprError {}
