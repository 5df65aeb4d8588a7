//! Postfix bytecode contracts shared by the compiler, evaluator, and
//! decompiler.
//!
//! The encoding is private to this crate: operand opcodes carry one varint
//! (constant value, field index, or external-name index), operator opcodes
//! carry nothing. Order is purely post-order; there are no brackets.

use crate::expr::error::ExprError;
use crate::ir::varint::{read_varint, write_varint};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

mod op {
    pub const CONST: u8 = 0x00;
    pub const VAR: u8 = 0x01;
    pub const EXTVAR: u8 = 0x02;
    pub const ADD: u8 = 0x10;
    pub const SUB: u8 = 0x11;
    pub const MUL: u8 = 0x12;
    pub const DIV: u8 = 0x13;
    pub const MOD: u8 = 0x14;
    pub const AND: u8 = 0x15;
    pub const OR: u8 = 0x16;
    pub const XOR: u8 = 0x17;
    pub const SHL: u8 = 0x18;
    pub const SHR: u8 = 0x19;
    pub const SHRU: u8 = 0x1A;
    pub const NEG: u8 = 0x1B;
    pub const NOT: u8 = 0x1C;
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Priority of unary operators; higher than every binary class.
pub const UNARY_PRIORITY: u8 = 250;
/// Priority assigned to leaf operands by the infix renderer.
pub const LEAF_PRIORITY: u8 = 255;

/// Binary operator of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Truncating division.
    Div,
    /// Truncating remainder.
    Mod,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Left shift, count masked to 5 bits.
    Shl,
    /// Arithmetic right shift, count masked to 5 bits.
    Shr,
    /// Logical right shift, count masked to 5 bits.
    ShrU,
}

impl BinaryOp {
    /// Fixed priority table: `* / %` over `+ -` over shifts over `&` over
    /// `^` over `|`. All classes are left-associative.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Mod => 200,
            Self::Add | Self::Sub => 150,
            Self::Shl | Self::Shr | Self::ShrU => 100,
            Self::And => 75,
            Self::Xor => 50,
            Self::Or => 25,
        }
    }

    /// Source-level spelling.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::ShrU => ">>>",
        }
    }

    const fn opcode(self) -> u8 {
        match self {
            Self::Add => op::ADD,
            Self::Sub => op::SUB,
            Self::Mul => op::MUL,
            Self::Div => op::DIV,
            Self::Mod => op::MOD,
            Self::And => op::AND,
            Self::Or => op::OR,
            Self::Xor => op::XOR,
            Self::Shl => op::SHL,
            Self::Shr => op::SHR,
            Self::ShrU => op::SHRU,
        }
    }
}

/// Unary operator of the expression language.
///
/// Unary plus never reaches the bytecode; negation of a literal folds into
/// the constant at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
}

impl UnaryOp {
    /// Source-level spelling.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "~",
        }
    }

    const fn opcode(self) -> u8 {
        match self {
            Self::Neg => op::NEG,
            Self::Not => op::NOT,
        }
    }
}

/// Operator event reported to decompilation visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// One-operand operator.
    Unary(UnaryOp),
    /// Two-operand operator.
    Binary(BinaryOp),
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// Resolved reference to a named field of the enclosing instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Index into the stream's named-field table.
    pub index: u32,
    /// Normalized dotted path the reference resolved through.
    pub path: String,
}

/// A compiled expression: postfix bytecode plus its resolution tables and
/// the proven maximum operand-stack depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpr {
    /// Postfix bytecode.
    pub code: Vec<u8>,
    /// Field references, addressed by `VAR` operands.
    pub fields: Vec<FieldRef>,
    /// External names, addressed by `EXTVAR` operands. The name `"$"`
    /// denotes the stream position counter.
    pub externals: Vec<String>,
    /// Exact maximum operand-stack depth, proven at compile time.
    pub max_depth: usize,
    /// Original source text, kept for diagnostics.
    pub source: String,
}

/// One decoded postfix operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprOp {
    /// Pushes an immediate constant.
    Const(i32),
    /// Pushes a named-field value by `fields` index.
    Field(u32),
    /// Pushes an external value by `externals` index.
    External(u32),
    /// Applies a unary operator to the stack top.
    Unary(UnaryOp),
    /// Applies a binary operator to the two topmost values.
    Binary(BinaryOp),
}

/// Serializes a postfix operation list into bytecode.
pub fn encode_ops(ops: &[ExprOp]) -> Vec<u8> {
    let mut code = Vec::new();
    for item in ops {
        match *item {
            ExprOp::Const(value) => {
                code.push(op::CONST);
                write_varint(&mut code, value);
            }
            ExprOp::Field(index) => {
                code.push(op::VAR);
                write_varint(&mut code, index as i32);
            }
            ExprOp::External(index) => {
                code.push(op::EXTVAR);
                write_varint(&mut code, index as i32);
            }
            ExprOp::Unary(unary) => code.push(unary.opcode()),
            ExprOp::Binary(binary) => code.push(binary.opcode()),
        }
    }
    code
}

// ---------------------------------------------------------------------------
// OpReader
// ---------------------------------------------------------------------------

/// Forward reader over compiled bytecode.
///
/// Any defect found here (truncation, unknown opcode, out-of-range operand
/// index) is a compiler bug, not user input, and is reported as
/// [`crate::expr::error::ExprErrorKind::MalformedBytecode`].
pub struct OpReader<'a> {
    expr: &'a CompiledExpr,
    pos: usize,
}

impl<'a> OpReader<'a> {
    /// Creates a reader positioned at the start of the bytecode.
    pub fn new(expr: &'a CompiledExpr) -> Self {
        Self { expr, pos: 0 }
    }

    fn read_index(&mut self, table_len: usize, table: &str) -> Result<u32, ExprError> {
        let (value, next) = read_varint(&self.expr.code, self.pos)
            .map_err(|err| ExprError::malformed_bytecode(err.to_string()))?;
        self.pos = next;
        if value < 0 || value as usize >= table_len {
            return Err(ExprError::malformed_bytecode(format!(
                "{table} index {value} out of range (table length {table_len})"
            )));
        }
        Ok(value as u32)
    }
}

impl Iterator for OpReader<'_> {
    type Item = Result<ExprOp, ExprError>;

    fn next(&mut self) -> Option<Self::Item> {
        let opcode = *self.expr.code.get(self.pos)?;
        self.pos += 1;
        let item = match opcode {
            op::CONST => match read_varint(&self.expr.code, self.pos) {
                Ok((value, next)) => {
                    self.pos = next;
                    Ok(ExprOp::Const(value))
                }
                Err(err) => Err(ExprError::malformed_bytecode(err.to_string())),
            },
            op::VAR => self
                .read_index(self.expr.fields.len(), "field")
                .map(ExprOp::Field),
            op::EXTVAR => self
                .read_index(self.expr.externals.len(), "external")
                .map(ExprOp::External),
            op::ADD => Ok(ExprOp::Binary(BinaryOp::Add)),
            op::SUB => Ok(ExprOp::Binary(BinaryOp::Sub)),
            op::MUL => Ok(ExprOp::Binary(BinaryOp::Mul)),
            op::DIV => Ok(ExprOp::Binary(BinaryOp::Div)),
            op::MOD => Ok(ExprOp::Binary(BinaryOp::Mod)),
            op::AND => Ok(ExprOp::Binary(BinaryOp::And)),
            op::OR => Ok(ExprOp::Binary(BinaryOp::Or)),
            op::XOR => Ok(ExprOp::Binary(BinaryOp::Xor)),
            op::SHL => Ok(ExprOp::Binary(BinaryOp::Shl)),
            op::SHR => Ok(ExprOp::Binary(BinaryOp::Shr)),
            op::SHRU => Ok(ExprOp::Binary(BinaryOp::ShrU)),
            op::NEG => Ok(ExprOp::Unary(UnaryOp::Neg)),
            op::NOT => Ok(ExprOp::Unary(UnaryOp::Not)),
            other => Err(ExprError::malformed_bytecode(format!(
                "unknown opcode 0x{other:02X} at offset {}",
                self.pos - 1
            ))),
        };
        Some(item)
    }
}
