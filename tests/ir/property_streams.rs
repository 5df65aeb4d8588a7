//! Property-based tests over the varint codec and builder/walker agreement
//! using `proptest`.

use bitform::ir::builder::{ArgSpec, ArraySpec, StreamBuilder};
use bitform::ir::dump::dump_stream;
use bitform::ir::opcode::PrimitiveType;
use bitform::ir::stream::{ByteOrder, Evaluator, NamedFieldDescriptor};
use bitform::ir::varint::{read_varint, varint_len, write_varint};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One buildable instruction, parameterized on small argument values.
#[derive(Debug, Clone)]
enum Op {
    Reset,
    Skip(i32),
    Align(i32),
    PlainInt,
    NamedShort,
    FixedArray(i32),
    WholeStreamBytes,
    ExprArray(i32),
    Computed(i32),
    BitWidth(i32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Reset),
        (0..100_000i32).prop_map(Op::Skip),
        (1..64i32).prop_map(Op::Align),
        Just(Op::PlainInt),
        Just(Op::NamedShort),
        (0..100_000i32).prop_map(Op::FixedArray),
        Just(Op::WholeStreamBytes),
        any::<i32>().prop_map(Op::ExprArray),
        any::<i32>().prop_map(Op::Computed),
        (1..32i32).prop_map(Op::BitWidth),
    ]
}

fn build(ops: &[Op]) -> bitform::ir::stream::InstructionStream {
    let mut b = StreamBuilder::new();
    for (i, op) in ops.iter().enumerate() {
        // Paths carry the instruction index so they never collide.
        let named = |tag: &str| NamedFieldDescriptor::new(tag, format!("{tag}.f{i}"), i as u32);
        match *op {
            Op::Reset => b.reset_counter().unwrap(),
            Op::Skip(count) => b.skip(ArgSpec::Literal(count)).unwrap(),
            Op::Align(boundary) => b.align(ArgSpec::Literal(boundary)).unwrap(),
            Op::PlainInt => b
                .primitive(PrimitiveType::Int, None, ByteOrder::BigEndian, ArraySpec::None)
                .unwrap(),
            Op::NamedShort => b
                .primitive(
                    PrimitiveType::Short,
                    Some(named("s")),
                    ByteOrder::LittleEndian,
                    ArraySpec::None,
                )
                .unwrap(),
            Op::FixedArray(count) => b
                .primitive(
                    PrimitiveType::UByte,
                    Some(named("a")),
                    ByteOrder::BigEndian,
                    ArraySpec::Fixed(count),
                )
                .unwrap(),
            Op::WholeStreamBytes => b
                .primitive(PrimitiveType::Byte, None, ByteOrder::BigEndian, ArraySpec::WholeStream)
                .unwrap(),
            Op::ExprArray(value) => b
                .primitive(
                    PrimitiveType::Long,
                    None,
                    ByteOrder::BigEndian,
                    ArraySpec::Expr(Evaluator::Constant(value)),
                )
                .unwrap(),
            Op::Computed(value) => b
                .computed_value(named("c"), ByteOrder::BigEndian, ArgSpec::Literal(value))
                .unwrap(),
            Op::BitWidth(width) => b
                .bit_field(None, ByteOrder::BigEndian, ArgSpec::Literal(width), ArraySpec::None)
                .unwrap(),
        };
    }
    b.finish()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn varint_round_trips_any_value(value in any::<i32>()) {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        prop_assert_eq!(buf.len(), varint_len(value));
        let (decoded, next) = read_varint(&buf, 0).expect("encoded varint decodes");
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(next, buf.len());
    }

    #[test]
    fn varint_decodes_at_any_offset(value in any::<i32>(), prefix in 0usize..8) {
        let mut buf = vec![0u8; prefix];
        write_varint(&mut buf, value);
        let (decoded, next) = read_varint(&buf, prefix).expect("encoded varint decodes");
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(next, buf.len());
    }

    #[test]
    fn built_streams_always_walk_cleanly(ops in prop::collection::vec(arb_op(), 0..64)) {
        let stream = build(&ops);
        let lines = dump_stream(&stream).expect("built stream walks");
        // Every instruction produces exactly one line.
        prop_assert_eq!(lines.len(), ops.len());
    }

    #[test]
    fn walks_over_one_stream_are_identical(ops in prop::collection::vec(arb_op(), 1..32)) {
        let stream = build(&ops);
        let first = dump_stream(&stream).expect("built stream walks");
        let second = dump_stream(&stream).expect("built stream walks");
        prop_assert_eq!(first, second);
    }
}
