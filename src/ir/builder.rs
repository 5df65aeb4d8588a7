//! Programmatic instruction-stream assembler.
//!
//! The schema front end (out of scope here) sits on this builder; the test
//! suite uses it to construct fixture streams. It owns the encode side of
//! the opcode layout: flag computation, the inline varint order (array size
//! before the auxiliary value), the side-table enqueue order (auxiliary
//! evaluator before the array-size evaluator), and the field-path
//! uniqueness check.

use std::collections::HashSet;

use crate::ir::error::IrError;
use crate::ir::opcode::{
    FieldKind, PrimitiveType, EXT_ALT_TYPE, EXT_EXPR_OR_WHOLESTREAM, EXT_EXTRA_AS_EXPR,
    FLAG_ARRAY, FLAG_LITTLE_ENDIAN, FLAG_NAMED, FLAG_WIDE,
};
use crate::ir::stream::{
    ByteOrder, CustomTypeDescriptor, Evaluator, InstructionStream, NamedFieldDescriptor,
};
use crate::ir::varint::write_varint;

/// Auxiliary-argument source for one instruction.
#[derive(Debug, Clone)]
pub enum ArgSpec {
    /// Inline constant, written as a varint.
    Literal(i32),
    /// Evaluator enqueued on the shared side-table.
    Expr(Evaluator),
}

/// Array-size source for one instruction.
#[derive(Debug, Clone, Default)]
pub enum ArraySpec {
    /// Not an array.
    #[default]
    None,
    /// Fixed element count, written as a varint.
    Fixed(i32),
    /// Whole remaining stream.
    WholeStream,
    /// Evaluator enqueued on the shared side-table.
    Expr(Evaluator),
}

/// Builds an [`InstructionStream`] one instruction at a time.
#[derive(Debug, Default)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
    named_fields: Vec<NamedFieldDescriptor>,
    length_evaluators: Vec<Evaluator>,
    custom_types: Vec<CustomTypeDescriptor>,
    seen_paths: HashSet<String>,
}

impl StreamBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a reset-counter action.
    pub fn reset_counter(&mut self) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::ResetCounter,
            false,
            None,
            ByteOrder::BigEndian,
            ArraySpec::None,
            None,
            None,
        )
    }

    /// Emits a skip action over `count` bytes.
    pub fn skip(&mut self, count: ArgSpec) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::Skip,
            false,
            None,
            ByteOrder::BigEndian,
            ArraySpec::None,
            Some(count),
            None,
        )
    }

    /// Emits an align action to a `boundary`-byte boundary.
    pub fn align(&mut self, boundary: ArgSpec) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::Align,
            false,
            None,
            ByteOrder::BigEndian,
            ArraySpec::None,
            Some(boundary),
            None,
        )
    }

    /// Emits a named computed-value field (the skip opcode with the
    /// alternate-type bit, preserved bit-for-bit).
    pub fn computed_value(
        &mut self,
        name: NamedFieldDescriptor,
        byte_order: ByteOrder,
        value: ArgSpec,
    ) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::Skip,
            true,
            Some(name),
            byte_order,
            ArraySpec::None,
            Some(value),
            None,
        )
    }

    /// Emits a bit field.
    pub fn bit_field(
        &mut self,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        width: ArgSpec,
        array: ArraySpec,
    ) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::Bit,
            false,
            name,
            byte_order,
            array,
            Some(width),
            None,
        )
    }

    /// Emits a primitive field; float, double, and string types encode as
    /// their base kind plus the alternate-type bit.
    pub fn primitive(
        &mut self,
        ty: PrimitiveType,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        array: ArraySpec,
    ) -> Result<&mut Self, IrError> {
        let (kind, alt) = ty.encode();
        self.instruction(kind, alt, name, byte_order, array, None, None)
    }

    /// Opens a structure.
    pub fn struct_start(
        &mut self,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        array: ArraySpec,
    ) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::StructStart,
            false,
            name,
            byte_order,
            array,
            None,
            None,
        )
    }

    /// Closes a structure, writing the reserved length marker.
    pub fn struct_end(
        &mut self,
        name: Option<NamedFieldDescriptor>,
    ) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::StructEnd,
            false,
            name,
            ByteOrder::BigEndian,
            ArraySpec::None,
            None,
            Some(0),
        )
    }

    /// Emits a variable-format field.
    pub fn var_field(
        &mut self,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        array: ArraySpec,
        extra: ArgSpec,
    ) -> Result<&mut Self, IrError> {
        self.instruction(
            FieldKind::Var,
            false,
            name,
            byte_order,
            array,
            Some(extra),
            None,
        )
    }

    /// Emits a custom-type field, registering (or reusing) the descriptor.
    pub fn custom_field(
        &mut self,
        ty: CustomTypeDescriptor,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        array: ArraySpec,
        extra: ArgSpec,
    ) -> Result<&mut Self, IrError> {
        let index = match self.custom_types.iter().position(|entry| *entry == ty) {
            Some(index) => index,
            None => {
                self.custom_types.push(ty);
                self.custom_types.len() - 1
            }
        };
        self.instruction(
            FieldKind::Custom,
            false,
            name,
            byte_order,
            array,
            Some(extra),
            Some(index as i32),
        )
    }

    /// Finishes the stream.
    pub fn finish(self) -> InstructionStream {
        InstructionStream {
            bytes: self.bytes,
            named_fields: self.named_fields,
            length_evaluators: self.length_evaluators,
            custom_types: self.custom_types,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn instruction(
        &mut self,
        kind: FieldKind,
        alt: bool,
        name: Option<NamedFieldDescriptor>,
        byte_order: ByteOrder,
        array: ArraySpec,
        aux: Option<ArgSpec>,
        trailing: Option<i32>,
    ) -> Result<&mut Self, IrError> {
        let mut ext = 0u8;
        if alt {
            ext |= EXT_ALT_TYPE;
        }
        if matches!(aux, Some(ArgSpec::Expr(_))) {
            ext |= EXT_EXTRA_AS_EXPR;
        }
        if matches!(array, ArraySpec::WholeStream | ArraySpec::Expr(_)) {
            ext |= EXT_EXPR_OR_WHOLESTREAM;
        }

        let mut opcode = kind.code();
        if name.is_some() {
            opcode |= FLAG_NAMED;
        }
        if byte_order == ByteOrder::LittleEndian {
            opcode |= FLAG_LITTLE_ENDIAN;
        }
        if matches!(array, ArraySpec::Fixed(_) | ArraySpec::Expr(_)) {
            opcode |= FLAG_ARRAY;
        }
        if ext != 0 {
            opcode |= FLAG_WIDE;
        }

        self.bytes.push(opcode);
        if ext != 0 {
            self.bytes.push(ext);
        }

        if let Some(descriptor) = name {
            if !self.seen_paths.insert(descriptor.field_path.clone()) {
                return Err(IrError::duplicate_field_path(&descriptor.field_path));
            }
            self.named_fields.push(descriptor);
        }

        // Auxiliary evaluator is enqueued before any array-size evaluator;
        // the walker pops in the same order.
        let aux_literal = match aux {
            Some(ArgSpec::Literal(value)) => Some(value),
            Some(ArgSpec::Expr(evaluator)) => {
                self.length_evaluators.push(evaluator);
                None
            }
            None => None,
        };
        let array_literal = match array {
            ArraySpec::None | ArraySpec::WholeStream => None,
            ArraySpec::Fixed(count) => Some(count),
            ArraySpec::Expr(evaluator) => {
                self.length_evaluators.push(evaluator);
                None
            }
        };

        if let Some(count) = array_literal {
            write_varint(&mut self.bytes, count);
        }
        if let Some(value) = aux_literal {
            write_varint(&mut self.bytes, value);
        }
        if let Some(value) = trailing {
            write_varint(&mut self.bytes, value);
        }
        Ok(self)
    }
}
