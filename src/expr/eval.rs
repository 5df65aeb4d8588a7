//! Expression evaluator: fixed-stack execution of postfix bytecode.
//!
//! Arithmetic matches native fixed-width 32-bit signed semantics: wrapping
//! `+ - *`, truncating `/ %` with an explicit division-by-zero failure,
//! shift counts masked to five bits, `>>` arithmetic and `>>>` logical.

use std::collections::HashMap;

use crate::expr::bytecode::{BinaryOp, CompiledExpr, ExprOp, FieldRef, OpReader, UnaryOp};
use crate::expr::error::{ExprError, ExprErrorKind};
use crate::runtime::NumericValue;

/// Runtime value source for one evaluation.
///
/// `field` resolves a compiled named-field reference against already-parsed
/// values; `external` resolves caller-supplied named values. The external
/// name `"$"` never reaches `external`: it resolves to `stream_counter`.
pub trait ValueProvider {
    /// Resolves a named-field reference to its runtime value.
    fn field(&self, field: &FieldRef) -> Result<&dyn NumericValue, ExprError>;

    /// Resolves an externally supplied named value.
    fn external(&self, name: &str) -> Result<i32, ExprError>;

    /// Current bit/byte position counter of the stream being parsed.
    fn stream_counter(&self) -> i32;
}

/// Map-backed provider for producers and tests.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    fields: HashMap<String, i32>,
    externals: HashMap<String, i32>,
    counter: i32,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a field path to a value.
    pub fn field(&mut self, path: &str, value: i32) -> &mut Self {
        self.fields.insert(path.to_ascii_lowercase(), value);
        self
    }

    /// Binds an external name to a value.
    pub fn external(&mut self, name: &str, value: i32) -> &mut Self {
        self.externals.insert(name.to_ascii_lowercase(), value);
        self
    }

    /// Sets the stream position counter.
    pub fn counter(&mut self, value: i32) -> &mut Self {
        self.counter = value;
        self
    }
}

impl ValueProvider for Bindings {
    fn field(&self, field: &FieldRef) -> Result<&dyn NumericValue, ExprError> {
        self.fields
            .get(&field.path)
            .map(|value| value as &dyn NumericValue)
            .ok_or_else(|| {
                ExprError::new(
                    ExprErrorKind::UnknownField,
                    None,
                    "no value bound for field",
                    Some(format!("path '{}'", field.path)),
                )
            })
    }

    fn external(&self, name: &str) -> Result<i32, ExprError> {
        self.externals
            .get(name)
            .copied()
            .ok_or_else(|| ExprError::unresolved_external(name))
    }

    fn stream_counter(&self) -> i32 {
        self.counter
    }
}

/// Evaluates compiled bytecode against a value provider.
pub fn evaluate(expr: &CompiledExpr, provider: &dyn ValueProvider) -> Result<i32, ExprError> {
    // The compile-time proof sized this exactly; no growth happens below.
    let mut stack: Vec<i32> = Vec::with_capacity(expr.max_depth);

    for item in OpReader::new(expr) {
        match item? {
            ExprOp::Const(value) => stack.push(value),
            ExprOp::Field(index) => {
                let field = &expr.fields[index as usize];
                stack.push(provider.field(field)?.as_int());
            }
            ExprOp::External(index) => {
                let name = &expr.externals[index as usize];
                let value = if name == "$" {
                    provider.stream_counter()
                } else {
                    provider.external(name)?
                };
                stack.push(value);
            }
            ExprOp::Unary(unary) => {
                let value = pop(&mut stack)?;
                stack.push(apply_unary(unary, value));
            }
            ExprOp::Binary(binary) => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                stack.push(apply_binary(binary, lhs, rhs)?);
            }
        }
    }

    let result = pop(&mut stack)?;
    if !stack.is_empty() {
        return Err(ExprError::malformed_bytecode(format!(
            "{} values left on the stack after evaluation",
            stack.len() + 1
        )));
    }
    Ok(result)
}

fn pop(stack: &mut Vec<i32>) -> Result<i32, ExprError> {
    stack
        .pop()
        .ok_or_else(|| ExprError::malformed_bytecode("operand stack underflow"))
}

fn apply_unary(unary: UnaryOp, value: i32) -> i32 {
    match unary {
        UnaryOp::Neg => value.wrapping_neg(),
        UnaryOp::Not => !value,
    }
}

fn apply_binary(binary: BinaryOp, lhs: i32, rhs: i32) -> Result<i32, ExprError> {
    let value = match binary {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => {
            if rhs == 0 {
                return Err(ExprError::division_by_zero("/"));
            }
            lhs.wrapping_div(rhs)
        }
        BinaryOp::Mod => {
            if rhs == 0 {
                return Err(ExprError::division_by_zero("%"));
            }
            lhs.wrapping_rem(rhs)
        }
        BinaryOp::And => lhs & rhs,
        BinaryOp::Or => lhs | rhs,
        BinaryOp::Xor => lhs ^ rhs,
        // wrapping_sh* mask the count to the bit width, i.e. count & 31.
        BinaryOp::Shl => lhs.wrapping_shl(rhs as u32),
        BinaryOp::Shr => lhs.wrapping_shr(rhs as u32),
        BinaryOp::ShrU => (lhs as u32).wrapping_shr(rhs as u32) as i32,
    };
    Ok(value)
}
