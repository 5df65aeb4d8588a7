//! Decompiled output must recompile to a value-equivalent expression.

use bitform::expr::compiler::{compile, FieldTable};
use bitform::expr::decompile::{decompile, render_infix, ExprVisitor, Ref};
use bitform::expr::eval::{evaluate, Bindings};
use bitform::expr::Operator;

fn table() -> FieldTable {
    let mut table = FieldTable::new();
    table.add("width", false).add("header.size", false);
    table
}

fn bindings() -> Bindings {
    let mut bindings = Bindings::new();
    bindings
        .field("width", 37)
        .field("header.size", -6)
        .external("count", 19)
        .counter(512);
    bindings
}

fn assert_round_trips(source: &str) {
    let resolver = table();
    let values = bindings();
    let expr = compile(source, &resolver).expect("compiles");
    let rendered = render_infix(&expr).expect("renders");
    let again = compile(&rendered, &resolver).expect("rendered form recompiles");
    assert_eq!(
        evaluate(&expr, &values).unwrap(),
        evaluate(&again, &values).unwrap(),
        "'{source}' rendered as '{rendered}'",
    );
}

#[test]
fn corpus_round_trips() {
    for source in [
        "1",
        "-1",
        "width",
        "$count",
        "$",
        "11*(+8-7)%13+(-13-1)/2",
        "(3 * (5 * 7)) / 11",
        "1234>>3<<2>>>1",
        "60|7-~17%1",
        "width*header.size+$count",
        "~(width|3)^$",
        "1+2*3-4/2",
        "((((5))))",
        "-width- -3",
        "$count<<2>>>width&7",
    ] {
        assert_round_trips(source);
    }
}

#[test]
fn shift_chains_never_render_flat() {
    let expr = compile("1<<(2>>3)", &table()).expect("compiles");
    let rendered = render_infix(&expr).expect("renders");
    assert_eq!(rendered, "1<<(2>>3)");

    let expr = compile("1<<2>>3", &table()).expect("compiles");
    let rendered = render_infix(&expr).expect("renders");
    assert_eq!(rendered, "(1<<2)>>3");
}

#[test]
fn visitor_sees_exact_postfix_order() {
    #[derive(Default)]
    struct Trace(Vec<String>);

    impl ExprVisitor for Trace {
        fn begin(&mut self) {
            self.0.push("begin".to_string());
        }
        fn special_value(&mut self) {
            self.0.push("$".to_string());
        }
        fn field_ref(&mut self, reference: Ref<'_>) {
            match reference {
                Ref::Field(field) => self.0.push(format!("field {}", field.path)),
                Ref::External(name) => self.0.push(format!("ext {name}")),
            }
        }
        fn operator(&mut self, operator: Operator) {
            match operator {
                Operator::Unary(unary) => self.0.push(format!("un {}", unary.symbol())),
                Operator::Binary(binary) => self.0.push(format!("bin {}", binary.symbol())),
            }
        }
        fn constant(&mut self, value: i32) {
            self.0.push(format!("const {value}"));
        }
        fn end(&mut self) {
            self.0.push("end".to_string());
        }
    }

    let expr = compile("width+$count*$", &table()).expect("compiles");
    let mut trace = Trace::default();
    decompile(&expr, &mut trace).expect("decompiles");
    assert_eq!(
        trace.0,
        vec!["begin", "field width", "ext count", "$", "bin *", "bin +", "end"]
    );
}
