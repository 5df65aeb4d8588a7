//! Instruction-stream walker: the single decoder/dispatcher every backend
//! shares.
//!
//! One forward pass over the opcode bytes with three cursors (byte
//! position, named-field index, evaluator index) re-derives the exact field
//! sequence the producer encoded and hands each field to an [`EventSink`].
//! The walker performs no I/O and holds no field values, which is what lets
//! one IR back any number of independent consumers.

use crate::ir::error::IrError;
use crate::ir::opcode::{
    FieldKind, PrimitiveType, EXT_ALT_TYPE, EXT_EXPR_OR_WHOLESTREAM, EXT_EXTRA_AS_EXPR,
    FLAG_ARRAY, FLAG_LITTLE_ENDIAN, FLAG_NAMED, FLAG_WIDE,
};
use crate::ir::stream::{
    ByteOrder, CustomTypeDescriptor, Evaluator, InstructionStream, NamedFieldDescriptor,
};
use crate::ir::varint::read_varint;

// ---------------------------------------------------------------------------
// Field events
// ---------------------------------------------------------------------------

/// Auxiliary numeric argument of one instruction.
#[derive(Debug, Clone, Copy)]
pub enum ArgValue<'a> {
    /// Inline constant from the opcode bytes.
    Literal(i32),
    /// Popped evaluator from the shared side-table.
    Expr(&'a Evaluator),
}

/// Array-size determination of one instruction.
#[derive(Debug, Clone, Copy, Default)]
pub enum ArrayLen<'a> {
    /// Not an array.
    #[default]
    None,
    /// Fixed element count, inline in the opcode bytes.
    Fixed(i32),
    /// Consumes the whole remaining stream.
    WholeStream,
    /// Element count from a popped evaluator.
    Expr(&'a Evaluator),
}

/// Non-field action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Resets the stream position counter.
    ResetCounter,
    /// Skips a number of bytes.
    Skip,
    /// Aligns to a byte boundary.
    Align,
}

/// Stream action: reset-counter, skip, or align.
#[derive(Debug, Clone, Copy)]
pub struct ActionItem<'a> {
    /// Action kind.
    pub kind: ActionKind,
    /// Byte count or alignment boundary; absent for reset-counter.
    pub arg: Option<ArgValue<'a>>,
}

/// Named computed value stored as a field (the skip opcode reused with the
/// alternate-type bit).
#[derive(Debug, Clone, Copy)]
pub struct ComputedValue<'a> {
    /// Field byte order.
    pub byte_order: ByteOrder,
    /// Field descriptor; always present.
    pub name: &'a NamedFieldDescriptor,
    /// Value source.
    pub value: ArgValue<'a>,
}

/// Fixed-width primitive field.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveField<'a> {
    /// Resolved type, alternate reinterpretations applied.
    pub ty: PrimitiveType,
    /// Field descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
    /// Field byte order.
    pub byte_order: ByteOrder,
    /// Array-size determination.
    pub array: ArrayLen<'a>,
}

/// Bit field with a dynamic or inline width.
#[derive(Debug, Clone, Copy)]
pub struct BitField<'a> {
    /// Field descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
    /// Field byte order.
    pub byte_order: ByteOrder,
    /// Width in bits.
    pub width: ArgValue<'a>,
    /// Array-size determination.
    pub array: ArrayLen<'a>,
}

/// Structure opening.
#[derive(Debug, Clone, Copy)]
pub struct StructStart<'a> {
    /// Structure descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
    /// Default byte order inside the structure.
    pub byte_order: ByteOrder,
    /// Array-size determination.
    pub array: ArrayLen<'a>,
}

/// Structure closing.
#[derive(Debug, Clone, Copy)]
pub struct StructEnd<'a> {
    /// Structure descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
}

/// Externally handled variable-format field.
#[derive(Debug, Clone, Copy)]
pub struct VarField<'a> {
    /// Field descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
    /// Field byte order.
    pub byte_order: ByteOrder,
    /// Array-size determination.
    pub array: ArrayLen<'a>,
    /// Extra value passed to the handler.
    pub extra: ArgValue<'a>,
}

/// Field handled by a registered custom type.
#[derive(Debug, Clone, Copy)]
pub struct CustomField<'a> {
    /// Custom type descriptor from the side-table.
    pub ty: &'a CustomTypeDescriptor,
    /// Field descriptor, when named.
    pub name: Option<&'a NamedFieldDescriptor>,
    /// Field byte order.
    pub byte_order: ByteOrder,
    /// Array-size determination.
    pub array: ArrayLen<'a>,
    /// Extra value passed to the handler.
    pub extra: ArgValue<'a>,
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Backend contract: one callback per field-event kind.
///
/// Events are ephemeral borrows into the stream; a sink that needs them
/// later must copy what it keeps. Walker-detected format errors convert
/// into the sink's error type through `From<IrError>`.
pub trait EventSink {
    /// Sink-specific error type.
    type Error: From<IrError>;

    /// Stream action (reset-counter, skip, align).
    fn action(&mut self, event: ActionItem<'_>) -> Result<(), Self::Error>;

    /// Named computed value.
    fn computed_value(&mut self, event: ComputedValue<'_>) -> Result<(), Self::Error>;

    /// Fixed-width primitive field.
    fn primitive(&mut self, event: PrimitiveField<'_>) -> Result<(), Self::Error>;

    /// Bit field.
    fn bit_field(&mut self, event: BitField<'_>) -> Result<(), Self::Error>;

    /// Structure opening.
    fn struct_start(&mut self, event: StructStart<'_>) -> Result<(), Self::Error>;

    /// Structure closing.
    fn struct_end(&mut self, event: StructEnd<'_>) -> Result<(), Self::Error>;

    /// Variable-format field.
    fn var_field(&mut self, event: VarField<'_>) -> Result<(), Self::Error>;

    /// Custom-type field.
    fn custom_field(&mut self, event: CustomField<'_>) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Walks a stream front to back, dispatching every instruction to `sink`.
///
/// On success all three cursors sit exactly at their table ends; a stream
/// that finishes with side-table residue (or exhausts a table early) is
/// corrupt and fails without recovery.
pub fn walk_stream<S: EventSink>(
    stream: &InstructionStream,
    sink: &mut S,
) -> Result<(), S::Error> {
    let mut walker = Walker {
        stream,
        pos: 0,
        named_cursor: 0,
        eval_cursor: 0,
    };
    while walker.pos < stream.bytes.len() {
        walker.step(sink)?;
    }
    walker.check_exhausted()?;
    Ok(())
}

struct Walker<'a> {
    stream: &'a InstructionStream,
    pos: usize,
    named_cursor: usize,
    eval_cursor: usize,
}

impl<'a> Walker<'a> {
    fn read_varint(&mut self) -> Result<i32, IrError> {
        let (value, next) = read_varint(&self.stream.bytes, self.pos)?;
        self.pos = next;
        Ok(value)
    }

    fn pop_name(&mut self) -> Result<&'a NamedFieldDescriptor, IrError> {
        let descriptor = self
            .stream
            .named_fields
            .get(self.named_cursor)
            .ok_or_else(|| IrError::side_table_exhausted(self.pos, "named field"))?;
        self.named_cursor += 1;
        Ok(descriptor)
    }

    fn pop_evaluator(&mut self) -> Result<&'a Evaluator, IrError> {
        let evaluator = self
            .stream
            .length_evaluators
            .get(self.eval_cursor)
            .ok_or_else(|| IrError::side_table_exhausted(self.pos, "evaluator"))?;
        self.eval_cursor += 1;
        Ok(evaluator)
    }

    fn check_exhausted(&self) -> Result<(), IrError> {
        if self.named_cursor != self.stream.named_fields.len() {
            return Err(IrError::side_table_residue(
                "named field",
                self.named_cursor,
                self.stream.named_fields.len(),
            ));
        }
        if self.eval_cursor != self.stream.length_evaluators.len() {
            return Err(IrError::side_table_residue(
                "evaluator",
                self.eval_cursor,
                self.stream.length_evaluators.len(),
            ));
        }
        Ok(())
    }

    /// True for kinds carrying an auxiliary numeric argument.
    fn has_aux(kind: FieldKind) -> bool {
        matches!(
            kind,
            FieldKind::Skip | FieldKind::Align | FieldKind::Bit | FieldKind::Var | FieldKind::Custom
        )
    }

    fn step<S: EventSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let at = self.pos;
        let opcode = self.stream.bytes[self.pos];
        self.pos += 1;

        let ext = if opcode & FLAG_WIDE != 0 {
            let byte = *self
                .stream
                .bytes
                .get(self.pos)
                .ok_or_else(|| IrError::unexpected_end(self.pos, "extension byte expected"))?;
            self.pos += 1;
            byte
        } else {
            0
        };
        let code = (ext as u16) << 8 | opcode as u16;
        let kind = FieldKind::from_code(code, at)?;

        let alt = ext & EXT_ALT_TYPE != 0;
        let extra_is_expr = ext & EXT_EXTRA_AS_EXPR != 0;
        let byte_order = if opcode & FLAG_LITTLE_ENDIAN != 0 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };

        let name = if opcode & FLAG_NAMED != 0 {
            Some(self.pop_name()?)
        } else {
            None
        };

        // The auxiliary-expression pop always precedes an array-size pop for
        // the same instruction; producers enqueue evaluators in that order.
        let aux_expr = if Self::has_aux(kind) && extra_is_expr {
            Some(self.pop_evaluator()?)
        } else {
            None
        };

        let array = match (opcode & FLAG_ARRAY != 0, ext & EXT_EXPR_OR_WHOLESTREAM != 0) {
            (false, false) => ArrayLen::None,
            (true, false) => ArrayLen::Fixed(self.read_varint()?),
            (false, true) => ArrayLen::WholeStream,
            (true, true) => ArrayLen::Expr(self.pop_evaluator()?),
        };

        let aux = if let Some(evaluator) = aux_expr {
            Some(ArgValue::Expr(evaluator))
        } else if Self::has_aux(kind) {
            Some(ArgValue::Literal(self.read_varint()?))
        } else {
            None
        };

        match kind {
            FieldKind::ResetCounter => sink.action(ActionItem {
                kind: ActionKind::ResetCounter,
                arg: None,
            }),
            FieldKind::Skip if alt => {
                // Deliberate opcode reuse: skip plus the alternate-type bit
                // stores a named computed value instead of skipping.
                let name = name
                    .ok_or_else(|| IrError::missing_field_name(at, "computed value field"))?;
                let value =
                    aux.ok_or_else(|| IrError::internal_invariant(
                        "computed value without an argument",
                        format!("offset {at}"),
                    ))?;
                sink.computed_value(ComputedValue {
                    byte_order,
                    name,
                    value,
                })
            }
            FieldKind::Skip | FieldKind::Align => sink.action(ActionItem {
                kind: if kind == FieldKind::Skip {
                    ActionKind::Skip
                } else {
                    ActionKind::Align
                },
                arg: aux,
            }),
            FieldKind::Bit => {
                let width = aux.ok_or_else(|| {
                    IrError::internal_invariant("bit field without a width", format!("offset {at}"))
                })?;
                sink.bit_field(BitField {
                    name,
                    byte_order,
                    width,
                    array,
                })
            }
            FieldKind::Bool
            | FieldKind::Byte
            | FieldKind::UByte
            | FieldKind::Short
            | FieldKind::UShort
            | FieldKind::Int
            | FieldKind::Long => {
                let ty = PrimitiveType::resolve(kind, alt, at)?;
                sink.primitive(PrimitiveField {
                    ty,
                    name,
                    byte_order,
                    array,
                })
            }
            FieldKind::StructStart => sink.struct_start(StructStart {
                name,
                byte_order,
                array,
            }),
            FieldKind::StructEnd => {
                // Reserved length marker, present purely for stream-position
                // symmetry with the opening instruction.
                let _ = self.read_varint()?;
                sink.struct_end(StructEnd { name })
            }
            FieldKind::Var => {
                let extra = aux.ok_or_else(|| {
                    IrError::internal_invariant(
                        "var field without an extra value",
                        format!("offset {at}"),
                    )
                })?;
                sink.var_field(VarField {
                    name,
                    byte_order,
                    array,
                    extra,
                })
            }
            FieldKind::Custom => {
                let extra = aux.ok_or_else(|| {
                    IrError::internal_invariant(
                        "custom field without an extra value",
                        format!("offset {at}"),
                    )
                })?;
                let index = self.read_varint()?;
                let ty = if index < 0 {
                    None
                } else {
                    self.stream.custom_types.get(index as usize)
                }
                .ok_or_else(|| {
                    IrError::custom_type_out_of_bounds(at, index, self.stream.custom_types.len())
                })?;
                sink.custom_field(CustomField {
                    ty,
                    name,
                    byte_order,
                    array,
                    extra,
                })
            }
        }
    }
}
