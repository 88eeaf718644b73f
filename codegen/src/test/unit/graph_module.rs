use std::collections::BTreeMap;
use std::sync::Arc;

use weft_ir::{Arg, Graph, Target};
use weft_trace::{Module, Sym, Tracer};
use weft_value::Value;

use crate::compile::render_code;
use crate::graph_module::{GraphModule, symbolic_trace_with};
use crate::test::fixtures::{Net, Passthrough, registry};

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
fn traced_net_runs_compiled() {
    let gm = symbolic_trace_with(Arc::new(Net::example()), registry()).unwrap();
    // layer(x) + x with weight 3, bias 1
    assert_eq!(gm.call(&[Value::Int(4)]).unwrap(), Value::Int(17));
    assert!(gm.code().contains("call_module(\"layer\""));
}

#[test]
fn print_readable_is_the_code_text() {
    let gm = symbolic_trace_with(Arc::new(Net::example()), registry()).unwrap();
    assert_eq!(gm.print_readable(), gm.code());
}

#[test]
fn interpretation_matches_compiled_execution() {
    let gm = symbolic_trace_with(Arc::new(Net::example()), registry()).unwrap();
    let compiled = gm.call(&[Value::Int(7)]).unwrap();
    let interpreted = gm.interpret(&[Sym::lit(7)]).unwrap();
    assert_eq!(interpreted.value(), Some(&compiled));
}

#[test]
fn edits_take_effect_only_after_recompile() {
    let mut gm = GraphModule::new(Arc::new(Passthrough), add_graph(), registry()).unwrap();
    assert_eq!(gm.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));

    let add = gm.graph().find("add").unwrap();
    gm.graph_mut().set_target(add, Target::Function("mul".to_owned())).unwrap();

    // Compiled form and code text are stale until an explicit recompile;
    // interpretation follows the edited graph immediately.
    assert_eq!(gm.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
    let interpreted = gm.interpret(&[Sym::lit(2), Sym::lit(3)]).unwrap();
    assert_eq!(interpreted.value(), Some(&Value::Int(6)));

    gm.recompile().unwrap();
    assert_eq!(gm.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(6));
    assert!(gm.code().contains("let add = mul(x, y);"));

    // Retargeting changes only the target; the node keeps its name.
    assert_eq!(gm.graph()[add].name(), "add");
}

#[test]
fn graph_module_retraces_to_the_same_code() {
    let gm = symbolic_trace_with(Arc::new(Net::example()), registry()).unwrap();
    let tracer = Tracer::with_registry(gm.registry().clone());
    let retraced = tracer.trace(&gm, &gm.param_specs()).unwrap();
    assert_eq!(render_code(&retraced).unwrap(), gm.code());
}

#[test]
fn param_specs_come_from_placeholders() {
    let gm = GraphModule::new(Arc::new(Passthrough), add_graph(), registry()).unwrap();
    let names: Vec<String> = gm.param_specs().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert!(!gm.is_leaf());
}

#[test]
fn dead_code_elimination_then_recompile() {
    let mut g = add_graph();
    let x = g.find("x").unwrap();
    let y = g.find("y").unwrap();
    let out = g.output_node().unwrap();
    {
        let mut guard = g.inserting_before(out).unwrap();
        guard
            .call_function("sub", vec![Arg::Node(x), Arg::Node(y)], BTreeMap::new())
            .unwrap();
    }

    let mut gm = GraphModule::new(Arc::new(Passthrough), g, registry()).unwrap();
    assert!(gm.code().contains("sub"));

    assert_eq!(gm.graph_mut().eliminate_dead_code(), 1);
    gm.recompile().unwrap();
    assert!(!gm.code().contains("sub"));
    assert_eq!(gm.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
}
