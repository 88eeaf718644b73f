use std::collections::BTreeMap;

use weft_value::Value;

use crate::{Arg, Graph, Target, replace_pattern};

fn call1(g: &mut Graph, f: &str, a: Arg) -> Arg {
    Arg::Node(g.call_function(f, vec![a], BTreeMap::new()).unwrap())
}

fn call2(g: &mut Graph, f: &str, a: Arg, b: Arg) -> Arg {
    Arg::Node(g.call_function(f, vec![a, b], BTreeMap::new()).unwrap())
}

/// Pattern: neg(neg(p0)) -> p0.
fn double_neg_pattern() -> (Graph, Graph) {
    let mut pattern = Graph::new();
    let p = pattern.placeholder("p0", None).unwrap();
    let inner = call1(&mut pattern, "neg", Arg::Node(p));
    let outer = call1(&mut pattern, "neg", inner);
    pattern.output(outer).unwrap();

    let mut replacement = Graph::new();
    let r = replacement.placeholder("p0", None).unwrap();
    replacement.output(Arg::Node(r)).unwrap();
    (pattern, replacement)
}

#[test]
fn match_and_splice_double_negation() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let n1 = call1(&mut g, "neg", Arg::Node(x));
    let n2 = call1(&mut g, "neg", n1);
    let add = call2(&mut g, "add", n2, Arg::Lit(Value::Int(1)));
    g.output(add).unwrap();

    let (pattern, replacement) = double_neg_pattern();
    let matches = replace_pattern(&mut g, &pattern, &replacement).unwrap();

    assert_eq!(matches.len(), 1);
    // Both negations were erased; add now consumes x directly.
    assert_eq!(g.len(), 3);
    let add = g.find("add").unwrap();
    assert_eq!(g[add].args()[0], Arg::Node(x));
    assert!(g.lint().is_ok());
}

#[test]
fn no_match_returns_empty_set() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let neg = call1(&mut g, "neg", Arg::Node(x));
    g.output(neg).unwrap();

    let (pattern, replacement) = double_neg_pattern();
    let before = g.to_string();
    let matches = replace_pattern(&mut g, &pattern, &replacement).unwrap();
    assert!(matches.is_empty());
    assert_eq!(g.to_string(), before);
}

#[test]
fn interior_nodes_with_external_users_block_the_match() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let n1 = call1(&mut g, "neg", Arg::Node(x));
    let n2 = call1(&mut g, "neg", n1.clone());
    // The inner negation escapes the would-be match.
    let add = call2(&mut g, "add", n2, n1);
    g.output(add).unwrap();

    let (pattern, replacement) = double_neg_pattern();
    let matches = replace_pattern(&mut g, &pattern, &replacement).unwrap();
    assert!(matches.is_empty());
}

#[test]
fn replacement_body_is_spliced_in_place() {
    // Rewrite add(p0, p1) into mul(p0, p1).
    let mut pattern = Graph::new();
    let p0 = pattern.placeholder("p0", None).unwrap();
    let p1 = pattern.placeholder("p1", None).unwrap();
    let add = call2(&mut pattern, "add", Arg::Node(p0), Arg::Node(p1));
    pattern.output(add).unwrap();

    let mut replacement = Graph::new();
    let r0 = replacement.placeholder("p0", None).unwrap();
    let r1 = replacement.placeholder("p1", None).unwrap();
    let mul = call2(&mut replacement, "mul", Arg::Node(r0), Arg::Node(r1));
    replacement.output(mul).unwrap();

    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let y = g.placeholder("y", None).unwrap();
    let a1 = call2(&mut g, "add", Arg::Node(x), Arg::Node(y));
    let a2 = call2(&mut g, "add", a1, Arg::Node(y));
    g.output(a2).unwrap();

    let matches = replace_pattern(&mut g, &pattern, &replacement).unwrap();
    assert_eq!(matches.len(), 2);

    // Every add became a mul wired to the same inputs.
    let muls: Vec<_> = g
        .nodes()
        .filter(|(_, n)| n.target() == &Target::Function("mul".into()))
        .collect();
    assert_eq!(muls.len(), 2);
    assert!(g.nodes().all(|(_, n)| n.target() != &Target::Function("add".into())));
    assert!(g.lint().is_ok());
}

#[test]
fn literal_pattern_args_must_match_exactly() {
    // Pattern: add(p0, 1).
    let mut pattern = Graph::new();
    let p0 = pattern.placeholder("p0", None).unwrap();
    let add = call2(&mut pattern, "add", Arg::Node(p0), Arg::Lit(Value::Int(1)));
    pattern.output(add).unwrap();

    let mut replacement = Graph::new();
    let r0 = replacement.placeholder("p0", None).unwrap();
    let inc = call1(&mut replacement, "increment", Arg::Node(r0));
    replacement.output(inc).unwrap();

    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let hit = call2(&mut g, "add", Arg::Node(x), Arg::Lit(Value::Int(1)));
    let miss = call2(&mut g, "add", hit, Arg::Lit(Value::Int(2)));
    g.output(miss).unwrap();

    let matches = replace_pattern(&mut g, &pattern, &replacement).unwrap();
    assert_eq!(matches.len(), 1);
    let inc = g.find("increment").unwrap();
    assert_eq!(g[inc].args(), &[Arg::Node(x)]);
}
