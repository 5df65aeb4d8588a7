//! Instruction-stream data model: the compiled IR bytes and their three
//! side-tables.
//!
//! A stream is immutable once built and safe to share across any number of
//! concurrent walks; all mutable state during a walk lives in the walker's
//! cursors.

use crate::expr::decompile::{decompile, ExprVisitor};
use crate::expr::eval::{evaluate, ValueProvider};
use crate::expr::{CompiledExpr, ExprError};

/// Byte order of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Most significant byte first.
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// Short display name used by the dump backend.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BigEndian => "be",
            Self::LittleEndian => "le",
        }
    }
}

/// Descriptor of one named field, created once by the producer.
///
/// No two descriptors in one stream may share a path; the builder rejects
/// duplicates at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedFieldDescriptor {
    /// Bare field name.
    pub field_name: String,
    /// Dotted structural path, normalized to lowercase.
    pub field_path: String,
    /// Byte offset of the declaration in the source schema.
    pub offset: u32,
}

impl NamedFieldDescriptor {
    /// Creates a descriptor, normalizing the path.
    pub fn new(field_name: impl Into<String>, field_path: impl Into<String>, offset: u32) -> Self {
        Self {
            field_name: field_name.into(),
            field_path: field_path.into().trim().to_ascii_lowercase(),
            offset,
        }
    }
}

/// Descriptor of one registered custom field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomTypeDescriptor {
    /// Byte order for fields of this type.
    pub byte_order: ByteOrder,
    /// Registered type name.
    pub type_name: String,
    /// Optional extra text attached at the declaration site.
    pub extra: Option<String>,
}

/// Dynamic-quantity source: an inline constant or a compiled expression.
///
/// One shared ordered side-table carries both auxiliary values and array
/// sizes; the walker consumes it with a single cursor, auxiliary value
/// first within one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluator {
    /// A fixed value known at schema-compile time.
    Constant(i32),
    /// A compiled arithmetic expression over parsed field values.
    Expression(CompiledExpr),
}

impl Evaluator {
    /// Resolves the quantity against runtime field values.
    pub fn eval(&self, provider: &dyn ValueProvider) -> Result<i32, ExprError> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Expression(expr) => evaluate(expr, provider),
        }
    }

    /// Replays the quantity through a decompilation visitor.
    pub fn decompile(&self, visitor: &mut dyn ExprVisitor) -> Result<(), ExprError> {
        match self {
            Self::Constant(value) => {
                visitor.begin();
                visitor.constant(*value);
                visitor.end();
                Ok(())
            }
            Self::Expression(expr) => decompile(expr, visitor),
        }
    }
}

/// A compiled instruction stream: opcode bytes plus the three side-tables
/// consumed in strict encounter order during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstructionStream {
    /// Linear opcode/operand bytes.
    pub bytes: Vec<u8>,
    /// Named-field descriptors, popped when the named bit is set.
    pub named_fields: Vec<NamedFieldDescriptor>,
    /// Shared auxiliary-value / array-size evaluators, popped when the
    /// matching extension bits are set.
    pub length_evaluators: Vec<Evaluator>,
    /// Custom type descriptors, addressed by index from custom-field
    /// instructions.
    pub custom_types: Vec<CustomTypeDescriptor>,
}
