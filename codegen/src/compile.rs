//! Compilation of a linted graph into a slot-allocated instruction list.
//!
//! A [`CompiledGraph`] is the executable form of a graph: one instruction
//! per operation node, operands resolved to value slots or literals, and
//! free-function targets resolved against the registry up front. Slot
//! disposal follows last-use analysis so intermediate values are released
//! as soon as nothing downstream reads them.

use std::collections::HashMap;

use snafu::ensure;
use weft_ir::{Arg, Graph, NodeId, Opcode, Target};
use weft_trace::{Ctx, Module, Registry, Sym, resolve_attr, resolve_child};
use weft_value::{Kwargs, NativeFn, Value};

use crate::error::{self, Result};

#[derive(Debug, Clone)]
enum Operand {
    Slot(usize),
    Lit(Value),
}

#[derive(Debug, Clone)]
enum InstrKind {
    Call(NativeFn),
    Method(String),
    Attr(String),
    Module(String),
}

#[derive(Debug, Clone)]
struct Instr {
    name: String,
    kind: InstrKind,
    args: Vec<Operand>,
    kwargs: Vec<(String, Operand)>,
    out: usize,
    dispose: Vec<usize>,
}

/// Executable form of a graph. Produced by [`compile`]; stale against
/// later graph edits until the owner compiles again.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    params: Vec<(String, usize)>,
    entry_dispose: Vec<usize>,
    instrs: Vec<Instr>,
    ret: Operand,
    n_slots: usize,
}

/// Lower `graph` to instructions, resolving free-function names against
/// `registry`.
pub fn compile(graph: &Graph, registry: &Registry) -> Result<CompiledGraph> {
    graph.lint()?;
    let out_id = graph.output_node().ok_or_else(|| error::MissingOutputSnafu.build())?;

    let mut slot_of: HashMap<NodeId, usize> = HashMap::new();
    let mut params = Vec::new();
    let mut n_slots = 0usize;
    for (id, node) in graph.nodes() {
        if node.opcode() == Opcode::Output {
            continue;
        }
        slot_of.insert(id, n_slots);
        if node.opcode() == Opcode::Placeholder {
            params.push((node.name().to_owned(), n_slots));
        }
        n_slots += 1;
    }

    let slot = |id: NodeId| -> Result<usize> {
        slot_of.get(&id).copied().ok_or_else(|| {
            let name = graph.get(id).map(|n| n.name().to_owned()).unwrap_or_default();
            error::UndefinedSnafu { name }.build()
        })
    };
    let operand = |arg: &Arg| -> Result<Operand> {
        Ok(match arg {
            Arg::Node(id) => Operand::Slot(slot(*id)?),
            Arg::Lit(v) => Operand::Lit(v.clone()),
        })
    };

    // Instruction index of the last read of each slot. The output's arg
    // is read by `execute` itself and never disposed.
    let mut kept = None;
    let mut last_read: HashMap<usize, usize> = HashMap::new();
    let mut index = 0usize;
    for (id, node) in graph.nodes() {
        if id == out_id {
            if let Some(Arg::Node(ret)) = node.args().first() {
                kept = Some(slot(*ret)?);
            }
            continue;
        }
        if node.opcode() == Opcode::Placeholder {
            continue;
        }
        for input in node.input_nodes() {
            last_read.insert(slot(input)?, index);
        }
        index += 1;
    }

    let mut instrs = Vec::new();
    for (id, node) in graph.nodes() {
        let kind = match (node.opcode(), node.target()) {
            (Opcode::Placeholder, _) | (Opcode::Output, _) => continue,
            (Opcode::GetAttr, Target::Attr(path)) => InstrKind::Attr(path.clone()),
            (Opcode::CallFunction, Target::Function(name)) => {
                ensure!(node.kwargs().is_empty(), error::FunctionKwargsSnafu { name });
                let f = registry
                    .get(name)
                    .ok_or_else(|| error::UnknownFunctionSnafu { name }.build())?;
                InstrKind::Call(f)
            }
            (Opcode::CallMethod, Target::Method(name)) => {
                ensure!(
                    !node.args().is_empty(),
                    error::MethodWithoutReceiverSnafu { name: node.name() }
                );
                InstrKind::Method(name.clone())
            }
            (Opcode::CallModule, Target::Module(path)) => {
                ensure!(node.kwargs().is_empty(), error::FunctionKwargsSnafu { name: path });
                InstrKind::Module(path.clone())
            }
            (opcode, _) => {
                return error::BadTargetSnafu { name: node.name(), opcode }.fail();
            }
        };
        let args = node.args().iter().map(&operand).collect::<Result<Vec<_>>>()?;
        let kwargs = node
            .kwargs()
            .iter()
            .map(|(k, a)| Ok((k.clone(), operand(a)?)))
            .collect::<Result<Vec<_>>>()?;
        instrs.push(Instr {
            name: node.name().to_owned(),
            kind,
            args,
            kwargs,
            out: slot(id)?,
            dispose: Vec::new(),
        });
    }

    // Attach disposal: a slot dies after its last read, immediately after
    // its own instruction when nothing reads it, or at entry for an
    // unused parameter.
    let mut entry_dispose = Vec::new();
    for (&s, &at) in &last_read {
        if Some(s) != kept {
            instrs[at].dispose.push(s);
        }
    }
    for instr_index in 0..instrs.len() {
        let s = instrs[instr_index].out;
        if Some(s) != kept && !last_read.contains_key(&s) {
            instrs[instr_index].dispose.push(s);
        }
    }
    for (_, s) in &params {
        if Some(*s) != kept && !last_read.contains_key(s) {
            entry_dispose.push(*s);
        }
    }

    let ret = match graph[out_id].args().first() {
        Some(arg) => operand(arg)?,
        None => return error::MissingOutputSnafu.fail(),
    };

    tracing::debug!(instrs = instrs.len(), slots = n_slots, "graph compiled");
    Ok(CompiledGraph { params, entry_dispose, instrs, ret, n_slots })
}

impl CompiledGraph {
    /// Parameter names in call order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Run the instruction list on concrete arguments. Attribute reads
    /// and nested-module calls resolve against `root`.
    pub fn execute(&self, root: &dyn Module, args: &[Value]) -> Result<Value> {
        ensure!(
            args.len() == self.params.len(),
            error::ArityMismatchSnafu { expected: self.params.len(), got: args.len() }
        );
        let mut env: Vec<Option<Value>> = vec![None; self.n_slots];
        for ((_, s), value) in self.params.iter().zip(args) {
            env[*s] = Some(value.clone());
        }
        for s in &self.entry_dispose {
            env[*s] = None;
        }
        for instr in &self.instrs {
            let value = instr.eval(root, &env)?;
            env[instr.out] = Some(value);
            for s in &instr.dispose {
                env[*s] = None;
            }
        }
        match &self.ret {
            Operand::Lit(v) => Ok(v.clone()),
            Operand::Slot(s) => {
                env[*s].take().ok_or_else(|| error::SlotDeadSnafu { name: "output" }.build())
            }
        }
    }
}

impl Instr {
    fn eval(&self, root: &dyn Module, env: &[Option<Value>]) -> Result<Value> {
        let fetch = |op: &Operand| -> Result<Value> {
            match op {
                Operand::Lit(v) => Ok(v.clone()),
                Operand::Slot(s) => env[*s]
                    .clone()
                    .ok_or_else(|| error::SlotDeadSnafu { name: self.name.clone() }.build()),
            }
        };
        let args = self.args.iter().map(&fetch).collect::<Result<Vec<_>>>()?;
        match &self.kind {
            InstrKind::Call(f) => Ok(f(&args)?),
            InstrKind::Method(name) => {
                let kwargs = self
                    .kwargs
                    .iter()
                    .map(|(k, op)| Ok((k.clone(), fetch(op)?)))
                    .collect::<Result<Kwargs>>()?;
                let [receiver, rest @ ..] = args.as_slice() else {
                    return error::MethodWithoutReceiverSnafu { name: self.name.clone() }.fail();
                };
                Ok(receiver.call_method(name, rest, &kwargs)?)
            }
            InstrKind::Attr(path) => resolve_attr(root, path)
                .ok_or_else(|| error::AttrResolveSnafu { path }.build()),
            InstrKind::Module(path) => {
                let child = resolve_child(root, path)
                    .ok_or_else(|| error::ChildResolveSnafu { path }.build())?;
                let syms: Vec<Sym> = args.into_iter().map(Sym::lit).collect();
                let mut cx = Ctx::eval(child);
                let out = child.forward(&mut cx, &syms)?;
                out.value()
                    .cloned()
                    .ok_or_else(|| error::NotConcreteSnafu { name: self.name.clone() }.build())
            }
        }
    }
}

/// Render a graph as readable pseudocode, one line per operation with
/// explicit `drop` trailers where last-use analysis releases a value.
pub fn render_code(graph: &Graph) -> Result<String> {
    let out_id = graph.output_node().ok_or_else(|| error::MissingOutputSnafu.build())?;
    let ret_node = graph[out_id].args().first().and_then(Arg::as_node);

    // Node after which each value dies.
    let mut last_use: HashMap<NodeId, NodeId> = HashMap::new();
    for (id, node) in graph.nodes() {
        for input in node.input_nodes() {
            last_use.insert(input, id);
        }
    }

    let name_of = |id: NodeId| graph[id].name().to_owned();
    let arg_text = |arg: &Arg| match arg {
        Arg::Node(id) => name_of(*id),
        Arg::Lit(v) => v.to_string(),
    };

    let params: Vec<String> =
        graph.placeholders().iter().map(|&id| name_of(id)).collect();
    let mut lines = vec![format!("fn forward({}) {{", params.join(", "))];

    let entry_drops: Vec<String> = graph
        .placeholders()
        .iter()
        .copied()
        .filter(|id| !last_use.contains_key(id) && Some(*id) != ret_node)
        .map(|id| name_of(id))
        .collect();
    if !entry_drops.is_empty() {
        lines.push(format!("    drop({});", entry_drops.join(", ")));
    }

    for (id, node) in graph.nodes() {
        let expr = match (node.opcode(), node.target()) {
            (Opcode::Placeholder, _) | (Opcode::Output, _) => continue,
            (Opcode::GetAttr, Target::Attr(path)) => format!("get_attr({path:?})"),
            (Opcode::CallFunction, Target::Function(name)) => {
                let args: Vec<String> = node.args().iter().map(&arg_text).collect();
                format!("{name}({})", args.join(", "))
            }
            (Opcode::CallMethod, Target::Method(name)) => {
                let mut parts: Vec<String> =
                    node.args().iter().skip(1).map(&arg_text).collect();
                parts.extend(node.kwargs().iter().map(|(k, a)| format!("{k} = {}", arg_text(a))));
                let receiver = node
                    .args()
                    .first()
                    .map(&arg_text)
                    .unwrap_or_default();
                format!("{receiver}.{name}({})", parts.join(", "))
            }
            (Opcode::CallModule, Target::Module(path)) => {
                let mut parts = vec![format!("{path:?}")];
                parts.extend(node.args().iter().map(&arg_text));
                format!("call_module({})", parts.join(", "))
            }
            (opcode, _) => {
                return error::BadTargetSnafu { name: node.name(), opcode }.fail();
            }
        };

        let mut dead: Vec<String> = Vec::new();
        for input in node.input_nodes() {
            if last_use.get(&input) == Some(&id) && Some(input) != ret_node {
                let name = name_of(input);
                if !dead.contains(&name) {
                    dead.push(name);
                }
            }
        }
        if !last_use.contains_key(&id) && Some(id) != ret_node {
            dead.push(node.name().to_owned());
        }

        let mut line = format!("    let {} = {expr};", node.name());
        if !dead.is_empty() {
            line.push_str(&format!(" drop({});", dead.join(", ")));
        }
        lines.push(line);
    }

    match graph[out_id].args().first() {
        Some(arg) => lines.push(format!("    {}", arg_text(arg))),
        None => return error::MissingOutputSnafu.fail(),
    }
    lines.push("}".to_owned());
    lines.push(String::new());
    Ok(lines.join("\n"))
}
