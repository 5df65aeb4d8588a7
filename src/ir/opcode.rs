//! Instruction opcode bit layout and the field-kind enumeration.
//!
//! Each instruction starts with one opcode byte. When the wide bit is set a
//! second extension byte follows and the two form a 16-bit code
//! `(ext << 8) | opcode`. The low four bits of the opcode byte select the
//! field kind.
//!
//! Inline operands follow the opcode (and extension) byte in a fixed order:
//!
//! 1. the fixed array size varint when the array bit is set without the
//!    expression-or-wholestream bit;
//! 2. the auxiliary varint (skip/align count, bit width, var/custom extra
//!    value, or the struct-end reserved marker) when the kind carries one and
//!    the extra-as-expression bit is clear;
//! 3. the custom-type table index varint (custom kind only).

use crate::ir::error::IrError;

// ---------------------------------------------------------------------------
// Opcode byte flags
// ---------------------------------------------------------------------------

/// Mask selecting the field kind in the opcode byte.
pub const KIND_MASK: u8 = 0x0F;
/// The instruction pops the next named-field descriptor.
pub const FLAG_NAMED: u8 = 0x10;
/// The field is read/written little-endian.
pub const FLAG_LITTLE_ENDIAN: u8 = 0x20;
/// The field is an array; size determination also involves
/// [`EXT_EXPR_OR_WHOLESTREAM`].
pub const FLAG_ARRAY: u8 = 0x40;
/// An extension byte follows the opcode byte.
pub const FLAG_WIDE: u8 = 0x80;

// ---------------------------------------------------------------------------
// Extension byte flags (meaningful only when FLAG_WIDE is set)
// ---------------------------------------------------------------------------

/// Reinterprets the field type: int becomes float, long becomes double,
/// bool becomes string, and skip becomes a named computed-value field.
pub const EXT_ALT_TYPE: u8 = 0x01;
/// The auxiliary numeric argument comes from the evaluator side-table
/// instead of an inline varint.
pub const EXT_EXTRA_AS_EXPR: u8 = 0x02;
/// Array-size modifier: alone it marks a whole-remaining-stream array,
/// together with [`FLAG_ARRAY`] the size comes from the evaluator table.
pub const EXT_EXPR_OR_WHOLESTREAM: u8 = 0x04;

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// Field kind selected by the low four bits of the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Resets the stream position counter.
    ResetCounter = 0,
    /// Skips a number of bytes (or, with the alternate-type bit, stores a
    /// named computed value).
    Skip = 1,
    /// Aligns the stream to a byte boundary.
    Align = 2,
    /// Bit field with a dynamic or inline width.
    Bit = 3,
    /// Boolean byte (string with the alternate-type bit).
    Bool = 4,
    /// Signed byte.
    Byte = 5,
    /// Unsigned byte.
    UByte = 6,
    /// Signed 16-bit integer.
    Short = 7,
    /// Unsigned 16-bit integer.
    UShort = 8,
    /// Signed 32-bit integer (float with the alternate-type bit).
    Int = 9,
    /// Signed 64-bit integer (double with the alternate-type bit).
    Long = 10,
    /// Opens a structure.
    StructStart = 11,
    /// Closes a structure; consumes one reserved varint for position
    /// symmetry with the opening instruction.
    StructEnd = 12,
    /// Externally handled variable-format field.
    Var = 13,
    /// Field handled by a registered custom type descriptor.
    Custom = 14,
}

impl FieldKind {
    /// Decodes the kind from a 16-bit instruction code.
    pub fn from_code(code: u16, offset: usize) -> Result<Self, IrError> {
        let kind = match (code as u8) & KIND_MASK {
            0 => Self::ResetCounter,
            1 => Self::Skip,
            2 => Self::Align,
            3 => Self::Bit,
            4 => Self::Bool,
            5 => Self::Byte,
            6 => Self::UByte,
            7 => Self::Short,
            8 => Self::UShort,
            9 => Self::Int,
            10 => Self::Long,
            11 => Self::StructStart,
            12 => Self::StructEnd,
            13 => Self::Var,
            14 => Self::Custom,
            _ => return Err(IrError::unknown_field_kind(offset, code)),
        };
        Ok(kind)
    }

    /// Returns the low opcode bits for this kind.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Primitive types
// ---------------------------------------------------------------------------

/// Resolved primitive field type, alternate reinterpretations included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// One-byte boolean.
    Bool,
    /// Signed byte.
    Byte,
    /// Unsigned byte.
    UByte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UShort,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// 32-bit float (alternate of [`PrimitiveType::Int`]).
    Float,
    /// 64-bit float (alternate of [`PrimitiveType::Long`]).
    Double,
    /// String (alternate of [`PrimitiveType::Bool`]).
    String,
}

impl PrimitiveType {
    /// Resolves a primitive kind plus alternate-type bit into a type.
    pub fn resolve(kind: FieldKind, alt: bool, offset: usize) -> Result<Self, IrError> {
        let ty = match (kind, alt) {
            (FieldKind::Bool, false) => Self::Bool,
            (FieldKind::Bool, true) => Self::String,
            (FieldKind::Byte, false) => Self::Byte,
            (FieldKind::UByte, false) => Self::UByte,
            (FieldKind::Short, false) => Self::Short,
            (FieldKind::UShort, false) => Self::UShort,
            (FieldKind::Int, false) => Self::Int,
            (FieldKind::Int, true) => Self::Float,
            (FieldKind::Long, false) => Self::Long,
            (FieldKind::Long, true) => Self::Double,
            (kind, true) => {
                return Err(IrError::invalid_alt_type(
                    offset,
                    format!("kind {kind:?} has no alternate type"),
                ));
            }
            (kind, false) => {
                return Err(IrError::internal_invariant(
                    "non-primitive kind passed to primitive resolution",
                    format!("kind {kind:?}"),
                ));
            }
        };
        Ok(ty)
    }

    /// Splits the type back into its base kind and alternate-type bit.
    pub const fn encode(self) -> (FieldKind, bool) {
        match self {
            Self::Bool => (FieldKind::Bool, false),
            Self::String => (FieldKind::Bool, true),
            Self::Byte => (FieldKind::Byte, false),
            Self::UByte => (FieldKind::UByte, false),
            Self::Short => (FieldKind::Short, false),
            Self::UShort => (FieldKind::UShort, false),
            Self::Int => (FieldKind::Int, false),
            Self::Float => (FieldKind::Int, true),
            Self::Long => (FieldKind::Long, false),
            Self::Double => (FieldKind::Long, true),
        }
    }

    /// Lowercase display name used by the dump backend.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::UByte => "ubyte",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }
}
