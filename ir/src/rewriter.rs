//! Pattern/replacement subgraph rewriting.
//!
//! A pattern is an ordinary [`Graph`] whose placeholders act as wildcards
//! binding the match's external inputs; the node feeding the pattern's
//! output anchors the match. Replacement graphs pair their placeholders
//! with the pattern's by position.
//!
//! Matching is structural: opcode, target and connectivity must agree,
//! names are ignored. Interior pattern nodes (everything but placeholders
//! and the anchor) must have all their consumers inside the match, so
//! splicing never strands an externally visible value.

use std::collections::{HashMap, HashSet};

use snafu::ensure;

use crate::error::{self, Result};
use crate::graph::{Graph, map_arg};
use crate::node::{Arg, NodeId, Opcode};

/// One found occurrence of a pattern inside a target graph.
#[derive(Debug, Clone)]
pub struct Match {
    /// Target node matched to the node feeding the pattern's output.
    pub anchor: NodeId,
    /// Matched target node, keyed by pattern node name. Placeholders
    /// appear only when they bound a node rather than a literal.
    pub nodes_map: HashMap<String, NodeId>,
}

/// Find every non-overlapping occurrence of `pattern` in `target` and
/// splice in a copy of `replacement`.
///
/// Returns the matches found; an empty vector is not an error. Matched
/// nodes that end up without consumers are erased, matched nodes still
/// referenced from outside the match are kept.
pub fn replace_pattern(target: &mut Graph, pattern: &Graph, replacement: &Graph) -> Result<Vec<Match>> {
    let pattern_placeholders = pattern.placeholders();
    let replacement_placeholders = replacement.placeholders();
    ensure!(
        pattern_placeholders.len() == replacement_placeholders.len(),
        error::PatternAritySnafu {
            pattern: pattern_placeholders.len(),
            replacement: replacement_placeholders.len(),
        }
    );

    let Some(pattern_anchor) = pattern
        .output_node()
        .and_then(|out| pattern[out].args().first().and_then(Arg::as_node))
    else {
        return Ok(Vec::new());
    };

    // Phase 1: read-only scan for non-overlapping matches.
    let mut consumed: HashSet<NodeId> = HashSet::new();
    let mut matches: Vec<(Match, HashMap<NodeId, Arg>)> = Vec::new();

    let candidates: Vec<NodeId> = target.nodes().map(|(id, _)| id).collect();
    for candidate in candidates {
        let mut binding: HashMap<NodeId, Arg> = HashMap::new();
        if !try_match(pattern, target, pattern_anchor, &Arg::Node(candidate), &mut binding) {
            continue;
        }
        if !interior_is_private(pattern, target, pattern_anchor, &binding) {
            continue;
        }

        let body: Vec<NodeId> = binding
            .iter()
            .filter(|(pid, _)| pattern[**pid].opcode() != Opcode::Placeholder)
            .filter_map(|(_, arg)| arg.as_node())
            .collect();
        if body.iter().any(|id| consumed.contains(id)) {
            continue;
        }
        consumed.extend(body);

        let nodes_map = binding
            .iter()
            .filter_map(|(pid, arg)| arg.as_node().map(|t| (pattern[*pid].name().to_owned(), t)))
            .collect();
        matches.push((Match { anchor: candidate, nodes_map }, binding));
    }

    tracing::debug!(found = matches.len(), "subgraph matches");

    // Phase 2: splice each match. Matches are node-disjoint, but a later
    // match's external input may be an earlier match's anchor, which the
    // earlier splice erases; `becomes` chases those bindings to the node
    // that replaced them.
    let mut becomes: HashMap<NodeId, Arg> = HashMap::new();
    for (m, binding) in &matches {
        splice(
            target,
            pattern,
            replacement,
            &pattern_placeholders,
            &replacement_placeholders,
            pattern_anchor,
            m.anchor,
            binding,
            &mut becomes,
        )?;
    }

    Ok(matches.into_iter().map(|(m, _)| m).collect())
}

/// Structural match of pattern node `pid` against target argument `arg`,
/// extending `binding`. Placeholders match anything, consistently.
fn try_match(
    pattern: &Graph,
    target: &Graph,
    pid: NodeId,
    arg: &Arg,
    binding: &mut HashMap<NodeId, Arg>,
) -> bool {
    if let Some(bound) = binding.get(&pid) {
        return bound == arg;
    }
    let pnode = &pattern[pid];
    if pnode.opcode() == Opcode::Placeholder {
        binding.insert(pid, arg.clone());
        return true;
    }

    let Some(tid) = arg.as_node() else {
        return false;
    };
    let tnode = &target[tid];
    if tnode.opcode() != pnode.opcode() || tnode.target() != pnode.target() {
        return false;
    }
    if tnode.args().len() != pnode.args().len() || tnode.kwargs().len() != pnode.kwargs().len() {
        return false;
    }

    binding.insert(pid, arg.clone());
    for (parg, targ) in pnode.args().iter().zip(tnode.args()) {
        if !match_arg(pattern, target, parg, targ, binding) {
            binding.remove(&pid);
            return false;
        }
    }
    for ((pkey, parg), (tkey, targ)) in pnode.kwargs().iter().zip(tnode.kwargs()) {
        if pkey != tkey || !match_arg(pattern, target, parg, targ, binding) {
            binding.remove(&pid);
            return false;
        }
    }
    true
}

fn match_arg(
    pattern: &Graph,
    target: &Graph,
    parg: &Arg,
    targ: &Arg,
    binding: &mut HashMap<NodeId, Arg>,
) -> bool {
    match parg {
        Arg::Node(cpid) => try_match(pattern, target, *cpid, targ, binding),
        Arg::Lit(v) => matches!(targ, Arg::Lit(t) if t == v),
    }
}

/// Every interior node's consumers must themselves be part of the match.
fn interior_is_private(
    pattern: &Graph,
    target: &Graph,
    pattern_anchor: NodeId,
    binding: &HashMap<NodeId, Arg>,
) -> bool {
    let matched: HashSet<NodeId> = binding
        .iter()
        .filter(|(pid, _)| pattern[**pid].opcode() != Opcode::Placeholder)
        .filter_map(|(_, arg)| arg.as_node())
        .collect();
    for (pid, arg) in binding {
        if *pid == pattern_anchor || pattern[*pid].opcode() == Opcode::Placeholder {
            continue;
        }
        let Some(tid) = arg.as_node() else {
            continue;
        };
        if !target[tid].users().iter().all(|u| matched.contains(u)) {
            return false;
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn splice(
    target: &mut Graph,
    pattern: &Graph,
    replacement: &Graph,
    pattern_placeholders: &[NodeId],
    replacement_placeholders: &[NodeId],
    pattern_anchor: NodeId,
    target_anchor: NodeId,
    binding: &HashMap<NodeId, Arg>,
    becomes: &mut HashMap<NodeId, Arg>,
) -> Result<()> {
    // Chase an argument through the replacements applied so far.
    let resolve = |becomes: &HashMap<NodeId, Arg>, mut arg: Arg| loop {
        match arg.as_node().and_then(|id| becomes.get(&id)) {
            Some(next) => arg = next.clone(),
            None => return arg,
        }
    };

    // Replacement placeholders inherit the pattern's external bindings.
    let mut rmap: HashMap<NodeId, Arg> = replacement_placeholders
        .iter()
        .zip(pattern_placeholders)
        .map(|(rid, pid)| (*rid, resolve(becomes, binding[pid].clone())))
        .collect();

    // Copy the replacement body right before the anchor.
    let replacement_out = replacement
        .output_node()
        .and_then(|out| replacement[out].args().first().cloned());
    {
        let mut guard = target.inserting_before(target_anchor)?;
        for (rid, rnode) in replacement.nodes() {
            if matches!(rnode.opcode(), Opcode::Placeholder | Opcode::Output) {
                continue;
            }
            let new_id = guard.node_copy(rnode, &mut |dep| rmap[&dep].clone())?;
            rmap.insert(rid, Arg::Node(new_id));
        }
    }

    // Redirect the match's external consumers onto the replacement output.
    let new_out = match replacement_out {
        Some(Arg::Node(rid)) => rmap[&rid].clone(),
        Some(Arg::Lit(v)) => Arg::Lit(v),
        None => Arg::Lit(weft_value::Value::Unit),
    };
    becomes.insert(target_anchor, new_out.clone());
    match new_out {
        Arg::Node(new_id) => {
            target.replace_all_uses_with(target_anchor, new_id)?;
        }
        Arg::Lit(lit) => {
            // Literal replacement output: rewrite each consumer argument.
            let users: Vec<NodeId> = target[target_anchor].users().iter().copied().collect();
            for user in users {
                let args = target[user]
                    .args()
                    .iter()
                    .map(|a| map_arg(a, &mut |d| if d == target_anchor { Arg::Lit(lit.clone()) } else { Arg::Node(d) }))
                    .collect();
                let kwargs = target[user]
                    .kwargs()
                    .iter()
                    .map(|(k, a)| {
                        (k.clone(), map_arg(a, &mut |d| if d == target_anchor { Arg::Lit(lit.clone()) } else { Arg::Node(d) }))
                    })
                    .collect();
                target.set_args(user, args)?;
                target.set_kwargs(user, kwargs)?;
            }
        }
    }

    // Erase matched nodes that are now dead, deepest-last first.
    let mut body: Vec<NodeId> = binding
        .iter()
        .filter(|(pid, _)| pattern[**pid].opcode() != Opcode::Placeholder && **pid != pattern_anchor)
        .filter_map(|(_, arg)| arg.as_node())
        .chain(std::iter::once(target_anchor))
        .collect();
    body.sort_by_key(|id| target.position(*id));
    for id in body.into_iter().rev() {
        if target[id].users().is_empty() {
            target.erase_node(id)?;
        }
    }
    Ok(())
}
