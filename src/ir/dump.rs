//! Text dump backend: renders every instruction of a stream as one line.
//!
//! The output is deterministic for a given stream, which makes it the
//! cheapest way to assert that two streams decode identically. Expression
//! arguments render through the infix decompiler.

use crate::expr::decompile::render_infix;
use crate::ir::error::IrError;
use crate::ir::stream::{Evaluator, InstructionStream};
use crate::ir::walker::{
    walk_stream, ActionItem, ActionKind, ArgValue, ArrayLen, BitField, ComputedValue, CustomField,
    EventSink, PrimitiveField, StructEnd, StructStart, VarField,
};

/// Event sink that collects one formatted line per instruction.
#[derive(Debug, Default)]
pub struct StreamDumper {
    lines: Vec<String>,
}

impl StreamDumper {
    /// Creates an empty dumper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the dumper, returning the collected lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn arg_text(arg: ArgValue<'_>) -> Result<String, IrError> {
        match arg {
            ArgValue::Literal(value) => Ok(value.to_string()),
            ArgValue::Expr(evaluator) => Self::evaluator_text(evaluator),
        }
    }

    fn evaluator_text(evaluator: &Evaluator) -> Result<String, IrError> {
        match evaluator {
            Evaluator::Constant(value) => Ok(value.to_string()),
            Evaluator::Expression(expr) => render_infix(expr).map_err(|err| {
                IrError::internal_invariant("undecompilable evaluator", err.to_string())
            }),
        }
    }

    fn array_text(array: ArrayLen<'_>) -> Result<String, IrError> {
        Ok(match array {
            ArrayLen::None => String::new(),
            ArrayLen::Fixed(count) => format!(" [{count}]"),
            ArrayLen::WholeStream => " [*]".to_string(),
            ArrayLen::Expr(evaluator) => format!(" [{}]", Self::evaluator_text(evaluator)?),
        })
    }

    fn name_text(name: Option<&crate::ir::stream::NamedFieldDescriptor>) -> String {
        match name {
            Some(descriptor) => format!(" '{}'", descriptor.field_path),
            None => String::new(),
        }
    }
}

impl EventSink for StreamDumper {
    type Error = IrError;

    fn action(&mut self, event: ActionItem<'_>) -> Result<(), IrError> {
        let line = match (event.kind, event.arg) {
            (ActionKind::ResetCounter, _) => "reset".to_string(),
            (ActionKind::Skip, Some(arg)) => format!("skip {}", Self::arg_text(arg)?),
            (ActionKind::Align, Some(arg)) => format!("align {}", Self::arg_text(arg)?),
            (kind, None) => {
                return Err(IrError::internal_invariant(
                    "action event without an argument",
                    format!("{kind:?}"),
                ));
            }
        };
        self.lines.push(line);
        Ok(())
    }

    fn computed_value(&mut self, event: ComputedValue<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "val {} '{}' = {}",
            event.byte_order.name(),
            event.name.field_path,
            Self::arg_text(event.value)?,
        ));
        Ok(())
    }

    fn primitive(&mut self, event: PrimitiveField<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "{} {}{}{}",
            event.ty.name(),
            event.byte_order.name(),
            Self::array_text(event.array)?,
            Self::name_text(event.name),
        ));
        Ok(())
    }

    fn bit_field(&mut self, event: BitField<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "bit({}) {}{}{}",
            Self::arg_text(event.width)?,
            event.byte_order.name(),
            Self::array_text(event.array)?,
            Self::name_text(event.name),
        ));
        Ok(())
    }

    fn struct_start(&mut self, event: StructStart<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "struct {}{}{}",
            event.byte_order.name(),
            Self::array_text(event.array)?,
            Self::name_text(event.name),
        ));
        Ok(())
    }

    fn struct_end(&mut self, event: StructEnd<'_>) -> Result<(), IrError> {
        self.lines.push(format!("end{}", Self::name_text(event.name)));
        Ok(())
    }

    fn var_field(&mut self, event: VarField<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "var({}) {}{}{}",
            Self::arg_text(event.extra)?,
            event.byte_order.name(),
            Self::array_text(event.array)?,
            Self::name_text(event.name),
        ));
        Ok(())
    }

    fn custom_field(&mut self, event: CustomField<'_>) -> Result<(), IrError> {
        self.lines.push(format!(
            "custom<{}>({}) {}{}{}",
            event.ty.type_name,
            Self::arg_text(event.extra)?,
            event.byte_order.name(),
            Self::array_text(event.array)?,
            Self::name_text(event.name),
        ));
        Ok(())
    }
}

/// Walks `stream` and returns one formatted line per instruction.
pub fn dump_stream(stream: &InstructionStream) -> Result<Vec<String>, IrError> {
    let mut dumper = StreamDumper::new();
    walk_stream(stream, &mut dumper)?;
    Ok(dumper.into_lines())
}
