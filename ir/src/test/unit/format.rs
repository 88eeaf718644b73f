use std::collections::BTreeMap;

use weft_value::Value;

use crate::{Arg, Graph};

fn clamp_graph() -> Graph {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    let w = g.get_attr("weight").unwrap();
    let add = g
        .call_function("add", vec![Arg::Node(x), Arg::Node(w)], BTreeMap::new())
        .unwrap();
    let lin = g.call_module("linear", vec![Arg::Node(add)], BTreeMap::new()).unwrap();
    let mut kwargs = BTreeMap::new();
    kwargs.insert("max".to_owned(), Arg::Lit(Value::Float(1.0)));
    kwargs.insert("min".to_owned(), Arg::Lit(Value::Float(0.0)));
    let clamp = g.call_method("clamp", vec![Arg::Node(lin)], kwargs).unwrap();
    g.output(Arg::Node(clamp)).unwrap();
    g
}

#[test]
fn display_is_one_line_per_node_in_program_order() {
    let g = clamp_graph();
    let rendered = g.to_string();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(
        lines,
        vec![
            "placeholder x ()",
            "get_attr weight weight()",
            "call_function add add(%x, %weight)",
            "call_module linear linear(%add)",
            "call_method clamp clamp(%linear) {max: 1.0, min: 0.0}",
            "output output (%clamp)",
        ]
    );
}

#[test]
fn literals_render_with_their_value_display() {
    let mut g = Graph::new();
    let x = g.placeholder("x", None).unwrap();
    g.call_function("add", vec![Arg::Node(x), Arg::Lit(Value::Int(3))], BTreeMap::new()).unwrap();
    g.call_function("add", vec![Arg::Node(x), Arg::Lit(Value::from("s"))], BTreeMap::new()).unwrap();
    let text = g.to_string();
    assert!(text.contains("add(%x, 3)"));
    assert!(text.contains("add_1(%x, \"s\")"));
}

#[test]
fn tabular_dump_has_header_and_all_rows() {
    let g = clamp_graph();
    let dump = g.print_tabular();
    let lines: Vec<&str> = dump.lines().collect();
    // Header, separator, one row per node.
    assert_eq!(lines.len(), 2 + g.len());
    assert!(lines[0].starts_with("opcode"));
    assert!(lines[0].contains("name"));
    assert!(lines[0].contains("kwargs"));
    assert!(dump.contains("call_module"));
    assert!(dump.contains("(%add)"));
}
