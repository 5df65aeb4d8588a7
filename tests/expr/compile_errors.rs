//! Compile-time rejection paths of the expression language.

use bitform::expr::compiler::{compile, FieldTable};
use bitform::expr::error::ExprErrorKind;

fn table() -> FieldTable {
    let mut table = FieldTable::new();
    table.add("width", false).add("rows", true);
    table
}

fn fail(source: &str) -> ExprErrorKind {
    compile(source, &table()).unwrap_err().kind
}

#[test]
fn digits_running_into_letters_are_malformed() {
    assert_eq!(fail("12a3"), ExprErrorKind::MalformedLiteral);
}

#[test]
fn literal_overflow_is_malformed() {
    assert_eq!(fail("2147483648"), ExprErrorKind::MalformedLiteral);
    // The most negative value has no positive literal spelling either.
    assert_eq!(fail("-2147483648"), ExprErrorKind::MalformedLiteral);
}

#[test]
fn unknown_fields_fail_with_an_offset() {
    let err = compile("width+depth", &table()).unwrap_err();
    assert_eq!(err.kind, ExprErrorKind::UnknownField);
    assert_eq!(err.offset, Some(6));
}

#[test]
fn array_fields_have_no_scalar_value() {
    assert_eq!(fail("rows"), ExprErrorKind::ArrayFieldReference);
    assert_eq!(fail("1+rows*2"), ExprErrorKind::ArrayFieldReference);
}

#[test]
fn unbalanced_brackets() {
    assert_eq!(fail("(width"), ExprErrorKind::UnbalancedBracket);
    assert_eq!(fail("width)"), ExprErrorKind::UnbalancedBracket);
    assert_eq!(fail("((1+2)"), ExprErrorKind::UnbalancedBracket);
}

#[test]
fn dangling_unary_operators() {
    assert_eq!(fail("~"), ExprErrorKind::DanglingUnary);
    assert_eq!(fail("1+-"), ExprErrorKind::DanglingUnary);
    assert_eq!(fail("(2*-)"), ExprErrorKind::DanglingUnary);
}

#[test]
fn only_plus_minus_tilde_may_be_unary() {
    assert_eq!(fail("*5"), ExprErrorKind::InvalidUnaryOperator);
    assert_eq!(fail("1+/2"), ExprErrorKind::InvalidUnaryOperator);
    assert_eq!(fail("<<3"), ExprErrorKind::InvalidUnaryOperator);
}

#[test]
fn empty_sources() {
    assert_eq!(fail(""), ExprErrorKind::EmptyExpression);
    assert_eq!(fail("   "), ExprErrorKind::EmptyExpression);
    assert_eq!(fail("()"), ExprErrorKind::EmptyExpression);
}

#[test]
fn adjacent_operands_fail_the_depth_proof() {
    assert_eq!(fail("1 2"), ExprErrorKind::StackProofFailure);
    assert_eq!(fail("width width"), ExprErrorKind::StackProofFailure);
}

#[test]
fn errors_carry_the_source_text() {
    let err = compile("12a3", &table()).unwrap_err();
    assert!(err.detail.as_deref().unwrap_or("").contains("12a3") || err.message.contains("12a3"));
}
