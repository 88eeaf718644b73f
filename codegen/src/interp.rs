//! Node-by-node graph execution over symbolic values.
//!
//! [`Interpreter`] walks a graph in order, dispatching each node through
//! an overridable per-opcode handler. The handlers operate on [`Sym`]
//! values through a [`Ctx`], so the same walk serves two purposes:
//! with an evaluation context and concrete arguments it executes the
//! graph, with a tracing context and symbolic arguments it re-records
//! the graph into a new one (the basis of [`Transformer`]).
//!
//! [`Transformer`]: crate::transform::Transformer

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use snafu::ensure;
use weft_ir::{Arg, Graph, Node, NodeId, Opcode, Target};
use weft_trace::{Ctx, Registry, Sym};

use crate::error::{self, Result};

/// Per-opcode execution of graph nodes. Every handler has a default;
/// implementors override the ones whose behavior they change and provide
/// a [`registry`](Interpreter::registry) for free-function fallback.
pub trait Interpreter {
    /// Registry consulted when a free function is absent from the
    /// ambient lookup path.
    fn registry(&self) -> &Arc<Registry>;

    /// Walk `graph` in order, binding placeholders to `args` positionally
    /// and returning the value reaching the output node.
    fn run(&mut self, cx: &mut Ctx<'_>, graph: &Graph, args: &[Sym]) -> Result<Sym> {
        let expected = graph.placeholders().len();
        ensure!(
            args.len() == expected,
            error::ArityMismatchSnafu { expected, got: args.len() }
        );

        let mut env: HashMap<NodeId, Sym> = HashMap::new();
        let mut next_arg = 0usize;
        for (id, node) in graph.nodes() {
            let fetch = |arg: &Arg| -> Result<Sym> {
                match arg {
                    Arg::Lit(v) => Ok(Sym::lit(v.clone())),
                    Arg::Node(nid) => env.get(nid).cloned().ok_or_else(|| {
                        let name = graph
                            .get(*nid)
                            .map(|n| n.name().to_owned())
                            .unwrap_or_default();
                        error::UndefinedSnafu { name }.build()
                    }),
                }
            };
            let sym = match node.opcode() {
                Opcode::Placeholder => {
                    let arg = args[next_arg].clone();
                    next_arg += 1;
                    self.placeholder(cx, node, arg)?
                }
                Opcode::GetAttr => self.get_attr(cx, node)?,
                Opcode::Output => {
                    let arg = node
                        .args()
                        .first()
                        .ok_or_else(|| error::MissingOutputSnafu.build())?;
                    let out = fetch(arg)?;
                    return self.output(cx, node, out);
                }
                opcode => {
                    let call_args =
                        node.args().iter().map(&fetch).collect::<Result<Vec<_>>>()?;
                    let kwargs = node
                        .kwargs()
                        .iter()
                        .map(|(k, a)| Ok((k.clone(), fetch(a)?)))
                        .collect::<Result<BTreeMap<_, _>>>()?;
                    match opcode {
                        Opcode::CallFunction => {
                            self.call_function(cx, node, &call_args, &kwargs)?
                        }
                        Opcode::CallMethod => {
                            self.call_method(cx, node, &call_args, &kwargs)?
                        }
                        Opcode::CallModule => self.call_module(cx, node, &call_args)?,
                        _ => unreachable!("placeholder, get_attr and output handled above"),
                    }
                }
            };
            env.insert(id, sym);
        }
        error::MissingOutputSnafu.fail()
    }

    /// Bind one formal parameter. The default passes the caller's
    /// argument through unchanged.
    fn placeholder(&mut self, _cx: &mut Ctx<'_>, _node: &Node, arg: Sym) -> Result<Sym> {
        Ok(arg)
    }

    /// Read stored state through the context, so tracing contexts record
    /// a fresh `get_attr` node and evaluation contexts return the value.
    fn get_attr(&mut self, cx: &mut Ctx<'_>, node: &Node) -> Result<Sym> {
        let Target::Attr(path) = node.target() else {
            return error::BadTargetSnafu { name: node.name(), opcode: node.opcode() }.fail();
        };
        Ok(cx.attr(path)?)
    }

    /// Apply a free function: symbolic dispatch first, the interpreter's
    /// registry as fallback for names invisible outside a trace.
    fn call_function(
        &mut self,
        _cx: &mut Ctx<'_>,
        node: &Node,
        args: &[Sym],
        kwargs: &BTreeMap<String, Sym>,
    ) -> Result<Sym> {
        let Target::Function(name) = node.target() else {
            return error::BadTargetSnafu { name: node.name(), opcode: node.opcode() }.fail();
        };
        ensure!(kwargs.is_empty(), error::FunctionKwargsSnafu { name });
        match weft_trace::sym::call(name, args) {
            Err(weft_trace::Error::UnknownFunction { .. }) => {
                let f = self
                    .registry()
                    .get(name)
                    .ok_or_else(|| error::UnknownFunctionSnafu { name }.build())?;
                let vals = args
                    .iter()
                    .map(|s| {
                        s.value().cloned().ok_or_else(|| {
                            error::NotConcreteSnafu { name: node.name() }.build()
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Sym::lit(f(&vals)?))
            }
            other => Ok(other?),
        }
    }

    /// Invoke a method on the receiver, the first argument.
    fn call_method(
        &mut self,
        _cx: &mut Ctx<'_>,
        node: &Node,
        args: &[Sym],
        kwargs: &BTreeMap<String, Sym>,
    ) -> Result<Sym> {
        let Target::Method(name) = node.target() else {
            return error::BadTargetSnafu { name: node.name(), opcode: node.opcode() }.fail();
        };
        let [receiver, rest @ ..] = args else {
            return error::MethodWithoutReceiverSnafu { name: node.name() }.fail();
        };
        Ok(receiver.call_method_kw(name, rest, kwargs)?)
    }

    /// Call a nested module through the context: tracing contexts apply
    /// the leaf rule, evaluation contexts run the child's forward.
    fn call_module(&mut self, cx: &mut Ctx<'_>, node: &Node, args: &[Sym]) -> Result<Sym> {
        let Target::Module(path) = node.target() else {
            return error::BadTargetSnafu { name: node.name(), opcode: node.opcode() }.fail();
        };
        Ok(cx.call_child(path, args)?)
    }

    /// Final value of the walk. The default passes it through.
    fn output(&mut self, _cx: &mut Ctx<'_>, _node: &Node, value: Sym) -> Result<Sym> {
        Ok(value)
    }
}

/// The stock interpreter: default handlers, no state beyond the
/// registry.
pub struct Interp {
    registry: Arc<Registry>,
}

impl Interp {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl Interpreter for Interp {
    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
