use std::collections::BTreeMap;

use test_case::test_case;
use weft_value::{Value, ValueKind};

use crate::{Arg, Error, Graph, Opcode, Target};

/// x + y, returned through an output node.
fn add_graph() -> Graph {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let y = g.placeholder("y", None).unwrap();
    let add = g
        .call_function("add", vec![Arg::Node(x), Arg::Node(y)], BTreeMap::new())
        .unwrap();
    g.output(Arg::Node(add)).unwrap();
    g
}

#[test]
fn insertion_maintains_user_sets() {
    let g = add_graph();
    let x = g.find("x").unwrap();
    let add = g.find("add").unwrap();
    let out = g.output_node().unwrap();

    assert_eq!(g[x].users().iter().copied().collect::<Vec<_>>(), vec![add]);
    assert_eq!(g[add].users().iter().copied().collect::<Vec<_>>(), vec![out]);
    assert!(g.lint().is_ok());
}

#[test_case("weight", "weight" ; "already clean")]
#[test_case("net.0", "net_0" ; "dots become underscores")]
#[test_case("1st", "_1st" ; "leading digit gets a prefix")]
#[test_case("a b", "a_b" ; "spaces become underscores")]
fn name_hints_are_sanitized(hint: &str, expected: &str) {
    let mut g = Graph::new();
    let id = g.placeholder(hint, None).unwrap();
    assert_eq!(g[id].name(), expected);
}

#[test]
fn names_are_uniquified() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let a = g.call_function("add", vec![Arg::Node(x), Arg::Lit(Value::Int(1))], BTreeMap::new()).unwrap();
    let b = g.call_function("add", vec![Arg::Node(a), Arg::Lit(Value::Int(2))], BTreeMap::new()).unwrap();
    assert_eq!(g[a].name(), "add");
    assert_eq!(g[b].name(), "add_1");
}

#[test]
fn erased_names_become_reusable() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let a = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    g.erase_node(a).unwrap();
    let b = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    assert_eq!(g[b].name(), "neg");
}

#[test]
fn erase_with_live_users_fails() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let err = g.erase_node(x).unwrap_err();
    assert!(matches!(err, Error::EraseWithUsers { .. }));
    // The node is untouched.
    assert!(g.get(x).is_some());
}

#[test]
fn second_output_is_rejected() {
    let mut g = add_graph();
    let err = g.output(Arg::Lit(Value::Unit)).unwrap_err();
    assert!(matches!(err, Error::DuplicateOutput { .. }));
}

#[test]
fn insertions_at_end_stay_before_output() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let neg = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    let out = g.output_node().unwrap();
    assert!(g.position(neg).unwrap() < g.position(out).unwrap());
    assert!(g.lint().is_ok());
}

#[test]
fn cursor_guard_restores_on_drop() {
    let mut g = add_graph();
    let add = g.find("add").unwrap();
    {
        let mut guard = g.inserting_before(add).unwrap();
        let x = guard.find("x").unwrap();
        let neg = guard
            .call_function("neg", vec![Arg::Node(x)], BTreeMap::new())
            .unwrap();
        assert!(guard.position(neg).unwrap() < guard.position(add).unwrap());
    }
    // Cursor reverted: new nodes land at the end again (before output).
    let y = g.find("y").unwrap();
    let tail = g.call_function("neg", vec![Arg::Node(y)], BTreeMap::new()).unwrap();
    let out = g.output_node().unwrap();
    assert_eq!(g.position(tail).unwrap() + 1, g.position(out).unwrap());
}

#[test]
fn inserting_after_keeps_source_order() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let (a, b) = {
        let mut guard = g.inserting_after(x).unwrap();
        let a = guard.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
        let b = guard.call_function("neg", vec![Arg::Node(a)], BTreeMap::new()).unwrap();
        (a, b)
    };
    assert_eq!(g.position(a).unwrap() + 1, g.position(b).unwrap());
    assert!(g.lint().is_ok());
}

#[test]
fn output_added_inside_a_guard_does_not_capture_the_cursor() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let late;
    {
        let mut guard = g.inserting_after(x).unwrap();
        let neg = guard.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
        guard.output(Arg::Node(neg)).unwrap();
        late = guard.call_function("neg", vec![Arg::Node(neg)], BTreeMap::new()).unwrap();
    }
    let out = g.output_node().unwrap();
    assert!(g.position(late).unwrap() < g.position(out).unwrap());
    assert!(g.lint().is_ok());
}

#[test]
fn use_before_def_is_rejected_at_insertion() {
    let mut g = add_graph();
    let add = g.find("add").unwrap();
    let x = g.find("x").unwrap();
    let mut guard = g.inserting_before(x).unwrap();
    let err = guard
        .call_function("neg", vec![Arg::Node(add)], BTreeMap::new())
        .unwrap_err();
    assert!(matches!(err, Error::UseBeforeDef { .. }));
}

#[test]
fn replace_all_uses_rewires_consumers() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let y = g.find("y").unwrap();
    let add = g.find("add").unwrap();

    let rewired = g.replace_all_uses_with(x, y).unwrap();
    assert_eq!(rewired, vec![add]);
    assert_eq!(g[add].args(), &[Arg::Node(y), Arg::Node(y)]);
    assert!(g[x].users().is_empty());
    assert!(g[y].users().contains(&add));

    // Now dead, so erasable; afterwards no reference to x remains.
    g.erase_node(x).unwrap();
    assert!(g.nodes().all(|(_, n)| n.input_nodes().all(|d| g.get(d).is_some())));
    assert!(g.lint().is_ok());
}

#[test]
fn replace_with_no_consumers_is_a_noop() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let y = g.placeholder("y", None).unwrap();
    assert_eq!(g.replace_all_uses_with(x, y).unwrap(), Vec::new());
}

#[test]
fn replace_with_self_is_an_error() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    assert!(matches!(g.replace_all_uses_with(x, x), Err(Error::SelfReplacement { .. })));
}

#[test]
fn set_target_changes_only_that_node() {
    let mut g = add_graph();
    let add = g.find("add").unwrap();
    let x = g.find("x").unwrap();
    let users_before: Vec<_> = g[x].users().iter().copied().collect();
    let args_before = g[add].args().to_vec();

    g.set_target(add, Target::Function("mul".into())).unwrap();

    assert_eq!(g[add].target(), &Target::Function("mul".into()));
    assert_eq!(g[add].args(), args_before.as_slice());
    assert_eq!(g[x].users().iter().copied().collect::<Vec<_>>(), users_before);
    assert!(g.lint().is_ok());
}

#[test]
fn set_args_rederives_user_sets() {
    let mut g = add_graph();
    let add = g.find("add").unwrap();
    let x = g.find("x").unwrap();
    let y = g.find("y").unwrap();

    g.set_args(add, vec![Arg::Node(x), Arg::Lit(Value::Int(3))]).unwrap();
    assert!(g[x].users().contains(&add));
    assert!(g[y].users().is_empty());
    assert!(g.lint().is_ok());
}

#[test]
fn lint_detects_manual_ordering_violation() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let a = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    let b = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    // Point an earlier node at a later one behind the lint's back.
    g.set_args(a, vec![Arg::Node(b)]).unwrap();
    assert!(matches!(g.lint(), Err(Error::UseBeforeDef { .. })));
}

#[test]
fn eliminate_dead_code_removes_unused_chains() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let dead1 = g.call_function("neg", vec![Arg::Node(x)], BTreeMap::new()).unwrap();
    let _dead2 = g.call_function("neg", vec![Arg::Node(dead1)], BTreeMap::new()).unwrap();

    assert_eq!(g.eliminate_dead_code(), 2);
    // Placeholders and the live add/output chain survive.
    assert_eq!(g.len(), 4);
    assert!(g.lint().is_ok());
}

#[test]
fn type_annotations_are_preserved() {
    let mut g = Graph::new();
    let x = g.placeholder("x", Some(ValueKind::Int)).unwrap();
    assert_eq!(g[x].ty(), Some(ValueKind::Int));
    assert_eq!(g[x].opcode(), Opcode::Placeholder);
}
