//! Exact-output tests for the text dump backend.

use bitform::expr::compiler::{compile, FieldTable};
use bitform::ir::builder::{ArgSpec, ArraySpec, StreamBuilder};
use bitform::ir::dump::dump_stream;
use bitform::ir::opcode::PrimitiveType;
use bitform::ir::stream::{ByteOrder, CustomTypeDescriptor, Evaluator, NamedFieldDescriptor};

fn name(path: &str) -> NamedFieldDescriptor {
    NamedFieldDescriptor::new(path, path, 0)
}

#[test]
fn one_line_per_instruction() {
    let mut table = FieldTable::new();
    table.add("len", false);
    let len_expr = compile("len*8", &table).expect("compiles");

    let mut b = StreamBuilder::new();
    b.reset_counter()
        .unwrap()
        .struct_start(Some(name("packet")), ByteOrder::BigEndian, ArraySpec::None)
        .unwrap()
        .primitive(
            PrimitiveType::UShort,
            Some(name("packet.len")),
            ByteOrder::LittleEndian,
            ArraySpec::None,
        )
        .unwrap()
        .skip(ArgSpec::Literal(2))
        .unwrap()
        .bit_field(
            Some(name("packet.flags")),
            ByteOrder::BigEndian,
            ArgSpec::Literal(3),
            ArraySpec::None,
        )
        .unwrap()
        .primitive(
            PrimitiveType::Byte,
            Some(name("packet.body")),
            ByteOrder::BigEndian,
            ArraySpec::Expr(Evaluator::Expression(len_expr)),
        )
        .unwrap()
        .computed_value(
            name("packet.total"),
            ByteOrder::BigEndian,
            ArgSpec::Expr(Evaluator::Constant(12)),
        )
        .unwrap()
        .struct_end(Some(name("packet.end")))
        .unwrap()
        .primitive(
            PrimitiveType::String,
            Some(name("trailer")),
            ByteOrder::BigEndian,
            ArraySpec::WholeStream,
        )
        .unwrap();
    let stream = b.finish();

    assert_eq!(
        dump_stream(&stream).expect("stream dumps"),
        vec![
            "reset",
            "struct be 'packet'",
            "ushort le 'packet.len'",
            "skip 2",
            "bit(3) be 'packet.flags'",
            "byte be [len*8] 'packet.body'",
            "val be 'packet.total' = 12",
            "end 'packet.end'",
            "string be [*] 'trailer'",
        ]
    );
}

#[test]
fn expression_arguments_render_bracketed_infix() {
    let mut table = FieldTable::new();
    table.add("a", false).add("b", false);
    let expr = compile("(a+b)*2", &table).expect("compiles");

    let mut b = StreamBuilder::new();
    b.primitive(PrimitiveType::Int, Some(name("a")), ByteOrder::BigEndian, ArraySpec::None)
        .unwrap()
        .primitive(PrimitiveType::Int, Some(name("b")), ByteOrder::BigEndian, ArraySpec::None)
        .unwrap()
        .var_field(
            Some(name("blob")),
            ByteOrder::BigEndian,
            ArraySpec::None,
            ArgSpec::Expr(Evaluator::Expression(expr)),
        )
        .unwrap();
    let stream = b.finish();

    assert_eq!(
        dump_stream(&stream).expect("stream dumps"),
        vec!["int be 'a'", "int be 'b'", "var((a+b)*2) be 'blob'"]
    );
}

#[test]
fn custom_fields_name_their_type() {
    let ty = CustomTypeDescriptor {
        byte_order: ByteOrder::LittleEndian,
        type_name: "uint48".to_string(),
        extra: None,
    };
    let mut b = StreamBuilder::new();
    b.custom_field(
        ty,
        Some(name("mac")),
        ByteOrder::LittleEndian,
        ArraySpec::Fixed(2),
        ArgSpec::Literal(0),
    )
    .unwrap();
    let stream = b.finish();
    assert_eq!(
        dump_stream(&stream).expect("stream dumps"),
        vec!["custom<uint48>(0) le [2] 'mac'"]
    );
}

#[test]
fn dumps_are_deterministic() {
    let build = || {
        let mut b = StreamBuilder::new();
        b.align(ArgSpec::Literal(4))
            .unwrap()
            .primitive(
                PrimitiveType::Double,
                Some(name("x")),
                ByteOrder::BigEndian,
                ArraySpec::Fixed(3),
            )
            .unwrap();
        b.finish()
    };
    assert_eq!(
        dump_stream(&build()).expect("stream dumps"),
        dump_stream(&build()).expect("stream dumps"),
    );
}
