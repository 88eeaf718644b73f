use test_case::test_case;

use crate::ops;
use crate::{Error, Value, ValueKind};

#[test_case("add", &[Value::Int(2), Value::Int(3)], Value::Int(5))]
#[test_case("add", &[Value::Int(2), Value::Float(0.5)], Value::Float(2.5))]
#[test_case("sub", &[Value::Int(2), Value::Int(3)], Value::Int(-1))]
#[test_case("mul", &[Value::Float(2.0), Value::Float(3.0)], Value::Float(6.0))]
#[test_case("div", &[Value::Int(7), Value::Int(2)], Value::Int(3))]
#[test_case("rem", &[Value::Int(7), Value::Int(2)], Value::Int(1))]
#[test_case("neg", &[Value::Int(7)], Value::Int(-7))]
#[test_case("eq", &[Value::Int(1), Value::Float(1.0)], Value::Bool(true))]
#[test_case("ne", &[Value::Int(1), Value::Str("a".into())], Value::Bool(true))]
#[test_case("lt", &[Value::Int(1), Value::Int(2)], Value::Bool(true))]
#[test_case("ge", &[Value::Float(2.0), Value::Int(2)], Value::Bool(true))]
fn builtin_results(name: &str, args: &[Value], expected: Value) {
    let f = ops::builtins()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
        .unwrap();
    assert_eq!(f(args).unwrap(), expected);
}

#[test]
fn add_concatenates_strings_and_lists() {
    let s = ops::add(&[Value::from("ab"), Value::from("cd")]).unwrap();
    assert_eq!(s, Value::from("abcd"));

    let l = ops::add(&[
        Value::List(vec![Value::Int(1)]),
        Value::List(vec![Value::Int(2)]),
    ])
    .unwrap();
    assert_eq!(l, Value::List(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn division_by_zero_is_an_error() {
    let err = ops::div(&[Value::Int(1), Value::Int(0)]).unwrap_err();
    assert!(matches!(err, Error::DivisionByZero));
}

#[test]
fn getitem_supports_negative_indices() {
    let list = Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
    assert_eq!(ops::getitem(&[list.clone(), Value::Int(-1)]).unwrap(), Value::Int(30));
    let err = ops::getitem(&[list, Value::Int(3)]).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfBounds { index: 3, len: 3 }));
}

#[test]
fn len_works_on_lists_and_strings() {
    assert_eq!(ops::len(&[Value::from("abc")]).unwrap(), Value::Int(3));
    assert_eq!(
        ops::len(&[Value::List(vec![Value::Int(1), Value::Int(2)])]).unwrap(),
        Value::Int(2)
    );
    let err = ops::len(&[Value::Int(1)]).unwrap_err();
    assert!(matches!(err, Error::NoLength { kind: ValueKind::Int }));
}

#[test]
fn type_mismatch_reports_both_kinds() {
    let err = ops::mul(&[Value::Bool(true), Value::Int(1)]).unwrap_err();
    assert!(matches!(
        err,
        Error::TypeMismatch { lhs: ValueKind::Bool, rhs: ValueKind::Int, .. }
    ));
}

#[test]
fn tuple_collects_arguments() {
    let t = ops::tuple(&[Value::Int(1), Value::from("a")]).unwrap();
    assert_eq!(t, Value::List(vec![Value::Int(1), Value::from("a")]));
}
