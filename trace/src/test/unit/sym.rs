use std::collections::BTreeMap;

use test_case::test_case;
use weft_value::Value;

use crate::error::Error;
use crate::sym::{Sym, call};

#[test_case(2, 3, 5 ; "small")]
#[test_case(-1, 1, 0 ; "cancel")]
fn concrete_add_computes(a: i64, b: i64, expected: i64) {
    let out = Sym::lit(a).add(&Sym::lit(b)).unwrap();
    assert_eq!(out.value(), Some(&Value::Int(expected)));
    assert!(!out.is_traced());
}

#[test]
fn concrete_comparison_chain() {
    let lt = Sym::lit(2).lt(&Sym::lit(3)).unwrap();
    assert_eq!(lt.value(), Some(&Value::Bool(true)));
    assert!(lt.as_bool().unwrap());

    let ge = Sym::lit(2.5).ge(&Sym::lit(7.0)).unwrap();
    assert!(!ge.as_bool().unwrap());
}

#[test]
fn concrete_length_and_getitem() {
    let list = Sym::lit(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
    assert_eq!(list.length().unwrap().value(), Some(&Value::Int(3)));

    let item = list.getitem(&Sym::lit(-1)).unwrap();
    assert_eq!(item.value(), Some(&Value::Int(30)));
}

#[test]
fn concrete_method_with_kwargs() {
    let mut kwargs = BTreeMap::new();
    kwargs.insert("min".to_owned(), Sym::lit(0));
    kwargs.insert("max".to_owned(), Sym::lit(10));
    let out = Sym::lit(42).call_method_kw("clamp", &[], &kwargs).unwrap();
    assert_eq!(out.value(), Some(&Value::Int(10)));
}

#[test]
fn free_call_outside_trace_executes() {
    let out = call("mul", &[Sym::lit(6), Sym::lit(7)]).unwrap();
    assert_eq!(out.value(), Some(&Value::Int(42)));
}

#[test]
fn unknown_function_is_reported() {
    let err = call("no_such_fn", &[Sym::lit(1)]).unwrap_err();
    assert!(matches!(err, Error::UnknownFunction { name } if name == "no_such_fn"));
}

#[test]
fn native_path_rejects_kwargs() {
    let mut kwargs = BTreeMap::new();
    kwargs.insert("rhs".to_owned(), Sym::lit(1));
    let err = Sym::apply_function("add", &[Sym::lit(1)], &kwargs).unwrap_err();
    assert!(matches!(err, Error::FunctionKwargs { .. }));
}

#[test]
fn division_error_surfaces_through_sym() {
    let err = Sym::lit(1).div(&Sym::lit(0)).unwrap_err();
    assert!(matches!(err, Error::Value { .. }));
}

#[test]
fn debug_is_not_recursive() {
    let s = Sym::lit(3.5);
    assert_eq!(format!("{s:?}"), "Sym(3.5)");
}
