//! Evaluation against bound field values, external values, and the stream
//! position counter.

use bitform::expr::compiler::{compile, FieldTable};
use bitform::expr::error::ExprErrorKind;
use bitform::expr::eval::{evaluate, Bindings};

fn table() -> FieldTable {
    let mut table = FieldTable::new();
    table
        .add("header.size", false)
        .add("width", false)
        .add("depth", false);
    table
}

#[test]
fn field_values_resolve_by_normalized_path() {
    // Mixed case in the source normalizes to the bound path.
    let expr = compile("Header.Size * Width", &table()).expect("compiles");
    let mut bindings = Bindings::new();
    bindings.field("header.size", 6).field("width", 7);
    assert_eq!(evaluate(&expr, &bindings).unwrap(), 42);
}

#[test]
fn missing_field_value_fails() {
    let expr = compile("width+1", &table()).expect("compiles");
    let err = evaluate(&expr, &Bindings::new()).unwrap_err();
    assert_eq!(err.kind, ExprErrorKind::UnknownField);
}

#[test]
fn externals_resolve_case_insensitively() {
    let expr = compile("$Total-$total", &table()).expect("compiles");
    let mut bindings = Bindings::new();
    bindings.external("total", 9);
    assert_eq!(evaluate(&expr, &bindings).unwrap(), 0);
}

#[test]
fn counter_mixes_with_fields_and_externals() {
    let expr = compile("$ + width*$pad", &table()).expect("compiles");
    let mut bindings = Bindings::new();
    bindings.field("width", 3).external("pad", 4).counter(100);
    assert_eq!(evaluate(&expr, &bindings).unwrap(), 112);
}

#[test]
fn one_binding_serves_repeated_references() {
    let expr = compile("width+width+width", &table()).expect("compiles");
    assert_eq!(expr.fields.len(), 1);
    let mut bindings = Bindings::new();
    bindings.field("width", 5);
    assert_eq!(evaluate(&expr, &bindings).unwrap(), 15);
}

#[test]
fn division_by_a_zero_field_fails_at_eval_time() {
    let expr = compile("10/depth", &table()).expect("compiles");
    let mut bindings = Bindings::new();
    bindings.field("depth", 0);
    let err = evaluate(&expr, &bindings).unwrap_err();
    assert_eq!(err.kind, ExprErrorKind::DivisionByZero);
}
