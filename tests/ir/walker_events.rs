//! Event-sequence checks: the walker re-derives exactly what the builder
//! encoded, through a recording sink.

use bitform::expr::compiler::{compile, FieldTable};
use bitform::ir::builder::{ArgSpec, ArraySpec, StreamBuilder};
use bitform::ir::error::IrError;
use bitform::ir::opcode::PrimitiveType;
use bitform::ir::stream::{ByteOrder, CustomTypeDescriptor, Evaluator, NamedFieldDescriptor};
use bitform::ir::walker::{
    walk_stream, ActionItem, ActionKind, ArgValue, ArrayLen, BitField, ComputedValue, CustomField,
    EventSink, PrimitiveField, StructEnd, StructStart, VarField,
};

fn name(path: &str) -> NamedFieldDescriptor {
    NamedFieldDescriptor::new(path, path, 0)
}

fn arg(value: ArgValue<'_>) -> String {
    match value {
        ArgValue::Literal(value) => format!("lit {value}"),
        ArgValue::Expr(Evaluator::Constant(value)) => format!("const {value}"),
        ArgValue::Expr(Evaluator::Expression(expr)) => format!("expr {}", expr.source),
    }
}

fn array(len: ArrayLen<'_>) -> String {
    match len {
        ArrayLen::None => "none".to_string(),
        ArrayLen::Fixed(count) => format!("fixed {count}"),
        ArrayLen::WholeStream => "whole".to_string(),
        ArrayLen::Expr(Evaluator::Constant(value)) => format!("const {value}"),
        ArrayLen::Expr(Evaluator::Expression(expr)) => format!("expr {}", expr.source),
    }
}

/// Sink that flattens every event into one comparable string.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl EventSink for Recorder {
    type Error = IrError;

    fn action(&mut self, event: ActionItem<'_>) -> Result<(), IrError> {
        let text = match event.arg {
            Some(value) => format!("action {:?} {}", event.kind, arg(value)),
            None => format!("action {:?}", event.kind),
        };
        self.events.push(text);
        Ok(())
    }

    fn computed_value(&mut self, event: ComputedValue<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "computed {} = {}",
            event.name.field_path,
            arg(event.value)
        ));
        Ok(())
    }

    fn primitive(&mut self, event: PrimitiveField<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "primitive {} {} {} {}",
            event.ty.name(),
            event.byte_order.name(),
            array(event.array),
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }

    fn bit_field(&mut self, event: BitField<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "bit {} {} {}",
            arg(event.width),
            array(event.array),
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }

    fn struct_start(&mut self, event: StructStart<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "open {} {}",
            array(event.array),
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }

    fn struct_end(&mut self, event: StructEnd<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "close {}",
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }

    fn var_field(&mut self, event: VarField<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "var {} {} {}",
            arg(event.extra),
            array(event.array),
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }

    fn custom_field(&mut self, event: CustomField<'_>) -> Result<(), IrError> {
        self.events.push(format!(
            "custom {} {} {} {}",
            event.ty.type_name,
            arg(event.extra),
            array(event.array),
            event.name.map_or("_", |n| n.field_path.as_str()),
        ));
        Ok(())
    }
}

fn record(stream: &bitform::ir::stream::InstructionStream) -> Vec<String> {
    let mut recorder = Recorder::default();
    walk_stream(stream, &mut recorder).expect("stream walks cleanly");
    recorder.events
}

#[test]
fn mixed_stream_replays_in_order() {
    let mut b = StreamBuilder::new();
    b.struct_start(Some(name("header")), ByteOrder::BigEndian, ArraySpec::None)
        .unwrap()
        .primitive(
            PrimitiveType::UShort,
            Some(name("header.size")),
            ByteOrder::LittleEndian,
            ArraySpec::None,
        )
        .unwrap()
        .skip(ArgSpec::Literal(2))
        .unwrap()
        .primitive(
            PrimitiveType::Byte,
            Some(name("header.body")),
            ByteOrder::BigEndian,
            ArraySpec::WholeStream,
        )
        .unwrap()
        .struct_end(Some(name("header.end")))
        .unwrap();
    let stream = b.finish();

    assert_eq!(
        record(&stream),
        vec![
            "open none header",
            "primitive ushort le none header.size",
            "action Skip lit 2",
            "primitive byte be whole header.body",
            "close header.end",
        ]
    );
}

#[test]
fn auxiliary_evaluator_pops_before_the_array_evaluator() {
    let mut b = StreamBuilder::new();
    b.var_field(
        None,
        ByteOrder::BigEndian,
        ArraySpec::Expr(Evaluator::Constant(22)),
        ArgSpec::Expr(Evaluator::Constant(11)),
    )
    .unwrap();
    let stream = b.finish();
    assert_eq!(record(&stream), vec!["var const 11 const 22 _"]);
}

#[test]
fn expression_evaluators_surface_through_events() {
    let mut table = FieldTable::new();
    table.add("width", false);
    let expr = compile("width*2+1", &table).expect("compiles");

    let mut b = StreamBuilder::new();
    b.primitive(
        PrimitiveType::Int,
        Some(name("width")),
        ByteOrder::BigEndian,
        ArraySpec::None,
    )
    .unwrap()
    .primitive(
        PrimitiveType::UByte,
        Some(name("payload")),
        ByteOrder::BigEndian,
        ArraySpec::Expr(Evaluator::Expression(expr)),
    )
    .unwrap();
    let stream = b.finish();

    assert_eq!(
        record(&stream),
        vec![
            "primitive int be none width",
            "primitive ubyte be expr width*2+1 payload",
        ]
    );
}

#[test]
fn custom_fields_resolve_their_descriptor() {
    let ty = CustomTypeDescriptor {
        byte_order: ByteOrder::LittleEndian,
        type_name: "uint48".to_string(),
        extra: Some("mac".to_string()),
    };
    let mut b = StreamBuilder::new();
    b.custom_field(
        ty,
        Some(name("mac")),
        ByteOrder::LittleEndian,
        ArraySpec::Fixed(6),
        ArgSpec::Literal(0),
    )
    .unwrap();
    let stream = b.finish();
    assert_eq!(record(&stream), vec!["custom uint48 lit 0 fixed 6 mac"]);
}

#[test]
fn computed_values_dispatch_separately_from_skip() {
    let mut b = StreamBuilder::new();
    b.skip(ArgSpec::Literal(3))
        .unwrap()
        .computed_value(name("total"), ByteOrder::BigEndian, ArgSpec::Literal(40))
        .unwrap()
        .reset_counter()
        .unwrap()
        .align(ArgSpec::Literal(8))
        .unwrap();
    let stream = b.finish();
    assert_eq!(
        record(&stream),
        vec![
            "action Skip lit 3",
            "computed total = lit 40",
            "action ResetCounter",
            "action Align lit 8",
        ]
    );
}

#[test]
fn walking_is_repeatable_over_a_shared_stream() {
    let mut b = StreamBuilder::new();
    b.primitive(
        PrimitiveType::Long,
        Some(name("a")),
        ByteOrder::BigEndian,
        ArraySpec::Fixed(4),
    )
    .unwrap()
    .bit_field(None, ByteOrder::BigEndian, ArgSpec::Literal(5), ArraySpec::None)
    .unwrap();
    let stream = b.finish();
    assert_eq!(record(&stream), record(&stream));
}
