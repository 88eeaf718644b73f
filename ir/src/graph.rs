//! Graph arena, insertion cursor, mutation primitives and lint.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use smallvec::SmallVec;
use snafu::ensure;
use weft_value::ValueKind;

use crate::error::{self, Error, Result};
use crate::node::{Arg, Args, KwArgs, Node, NodeId, Opcode, Target};

/// Where the next insertion lands in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertPoint {
    /// End of the graph, but before the output node when one exists.
    End,
    Before(NodeId),
    /// After the anchor; advances to the newly inserted node so that a
    /// run of insertions keeps source order.
    After(NodeId),
}

/// An ordered, arena-owned collection of nodes with a single output.
///
/// The graph is the sole owner of its nodes; nodes reference each other
/// only by [`NodeId`]. Every insertion and argument mutation keeps the
/// derived `users` index consistent. Ordering is an invariant: a node may
/// only reference nodes that appear strictly earlier in program order,
/// checked on insertion and by [`Graph::lint`] after manual surgery.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    slots: Vec<Option<Node>>,
    order: Vec<NodeId>,
    names: HashMap<String, NodeId>,
    point: InsertPoint,
    output: Option<NodeId>,
}

impl Default for InsertPoint {
    fn default() -> Self {
        InsertPoint::End
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in program order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.order.iter().map(|id| (*id, &self[*id]))
    }

    /// Fallible lookup; `None` for erased or foreign ids.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn try_node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or_else(|| error::UnknownNodeSnafu { what: format!("{id:?}") }.build())
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.index()].as_mut().unwrap_or_else(|| panic!("stale node id {id:?}"))
    }

    /// Look a node up by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// The output node, if the graph has one.
    pub fn output_node(&self) -> Option<NodeId> {
        self.output
    }

    /// Position of a node in program order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|n| *n == id)
    }

    /// Placeholder nodes in program order; these bind formal parameters.
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self[*id].opcode == Opcode::Placeholder)
            .collect()
    }

    // ===== Insertion =====

    /// Insert a placeholder for a formal parameter.
    pub fn placeholder(&mut self, name: &str, ty: Option<ValueKind>) -> Result<NodeId> {
        let id = self.create_node(Opcode::Placeholder, Target::None, Vec::new(), BTreeMap::new(), Some(name))?;
        self.node_mut(id).ty = ty;
        Ok(id)
    }

    /// Insert a read of stored external state at `path`.
    pub fn get_attr(&mut self, path: &str) -> Result<NodeId> {
        let hint = path.rsplit('.').next().unwrap_or(path).to_owned();
        self.create_node(Opcode::GetAttr, Target::Attr(path.to_owned()), Vec::new(), BTreeMap::new(), Some(&hint))
    }

    /// Insert a free-function call.
    pub fn call_function(
        &mut self,
        name: &str,
        args: Vec<Arg>,
        kwargs: BTreeMap<String, Arg>,
    ) -> Result<NodeId> {
        self.create_node(Opcode::CallFunction, Target::Function(name.to_owned()), args, kwargs, Some(name))
    }

    /// Insert a method call; the receiver is the first argument.
    pub fn call_method(
        &mut self,
        name: &str,
        args: Vec<Arg>,
        kwargs: BTreeMap<String, Arg>,
    ) -> Result<NodeId> {
        self.create_node(Opcode::CallMethod, Target::Method(name.to_owned()), args, kwargs, Some(name))
    }

    /// Insert a call of the nested callable at `path`.
    pub fn call_module(
        &mut self,
        path: &str,
        args: Vec<Arg>,
        kwargs: BTreeMap<String, Arg>,
    ) -> Result<NodeId> {
        let hint = path.rsplit('.').next().unwrap_or(path).to_owned();
        self.create_node(Opcode::CallModule, Target::Module(path.to_owned()), args, kwargs, Some(&hint))
    }

    /// Append the output node. Always lands last, regardless of cursor.
    pub fn output(&mut self, arg: Arg) -> Result<NodeId> {
        self.create_node(Opcode::Output, Target::None, vec![arg], BTreeMap::new(), Some("output"))
    }

    /// Insert a node at the current cursor.
    ///
    /// The name is derived from `name_hint` (or the opcode) and uniquified
    /// within the graph. Every referenced node must already exist and
    /// appear strictly before the insertion point.
    pub fn create_node(
        &mut self,
        opcode: Opcode,
        target: Target,
        args: Vec<Arg>,
        kwargs: BTreeMap<String, Arg>,
        name_hint: Option<&str>,
    ) -> Result<NodeId> {
        if opcode == Opcode::Output {
            if let Some(existing) = self.output {
                return error::DuplicateOutputSnafu { existing: self[existing].name.clone() }.fail();
            }
            ensure!(args.len() == 1 && kwargs.is_empty(), error::MalformedOutputSnafu { got: args.len() });
        }

        let name = self.uniquify(name_hint.unwrap_or(opcode.as_ref()));
        let index = if opcode == Opcode::Output { self.order.len() } else { self.insert_index()? };

        // Ordering invariant: referenced nodes are strictly earlier.
        for arg in args.iter().chain(kwargs.values()) {
            if let Some(dep) = arg.as_node() {
                let dep_name = self.try_node(dep)?.name.clone();
                let pos = self
                    .position(dep)
                    .ok_or_else(|| error::UnknownNodeSnafu { what: dep_name.clone() }.build())?;
                ensure!(pos < index, error::UseBeforeDefSnafu { user: name.clone(), used: dep_name });
            }
        }

        let id = self.alloc(Node {
            name: name.clone(),
            opcode,
            target,
            args: Args::from_vec(args),
            kwargs,
            ty: None,
            users: BTreeSet::new(),
        });

        self.names.insert(name, id);
        self.order.insert(index, id);
        for dep in self[id].input_nodes().collect::<SmallVec<[_; 4]>>() {
            self.node_mut(dep).users.insert(id);
        }

        if opcode == Opcode::Output {
            self.output = Some(id);
        } else if let InsertPoint::After(_) = self.point {
            // The output sits outside the cursor chain; capturing it here
            // would push later insertions past it.
            self.point = InsertPoint::After(id);
        }
        Ok(id)
    }

    /// Copy a node from another graph, mapping its argument references
    /// through `map`. Used by the subgraph rewriter's splice step.
    pub fn node_copy<F>(&mut self, source: &Node, map: &mut F) -> Result<NodeId>
    where
        F: FnMut(NodeId) -> Arg,
    {
        let args = source.args.iter().map(|a| map_arg(a, map)).collect();
        let kwargs = source.kwargs.iter().map(|(k, a)| (k.clone(), map_arg(a, map))).collect();
        let id = self.create_node(source.opcode, source.target.clone(), args, kwargs, Some(&source.name))?;
        self.node_mut(id).ty = source.ty;
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.slots.iter().position(Option::is_none) {
            Some(vacant) => {
                self.slots[vacant] = Some(node);
                NodeId(vacant as u32)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    fn insert_index(&self) -> Result<usize> {
        match self.point {
            InsertPoint::End => match self.output {
                // New nodes stay before the output so it remains last.
                Some(out) => Ok(self.position(out).unwrap_or(self.order.len())),
                None => Ok(self.order.len()),
            },
            InsertPoint::Before(anchor) => {
                let name = self.try_node(anchor)?.name.clone();
                self.position(anchor).ok_or_else(|| error::UnknownNodeSnafu { what: name }.build())
            }
            InsertPoint::After(anchor) => {
                let name = self.try_node(anchor)?.name.clone();
                Ok(self
                    .position(anchor)
                    .ok_or_else(|| error::UnknownNodeSnafu { what: name }.build())?
                    + 1)
            }
        }
    }

    fn uniquify(&self, hint: &str) -> String {
        let mut base: String = hint
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if base.is_empty() || base.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            base.insert(0, '_');
        }
        if !self.names.contains_key(&base) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // ===== Insertion cursor =====

    /// Scope insertions to land immediately before `anchor`.
    ///
    /// The returned guard dereferences to the graph; dropping it restores
    /// the previous cursor, so surgeries compose.
    pub fn inserting_before(&mut self, anchor: NodeId) -> Result<InsertGuard<'_>> {
        self.try_node(anchor)?;
        let prev = self.point;
        self.point = InsertPoint::Before(anchor);
        Ok(InsertGuard { graph: self, prev })
    }

    /// Scope insertions to land immediately after `anchor`; consecutive
    /// insertions keep their source order.
    pub fn inserting_after(&mut self, anchor: NodeId) -> Result<InsertGuard<'_>> {
        self.try_node(anchor)?;
        let prev = self.point;
        self.point = InsertPoint::After(anchor);
        Ok(InsertGuard { graph: self, prev })
    }

    // ===== Mutation =====

    /// Remove a node with no remaining consumers. Its name becomes
    /// reusable and it is unregistered from its operands' user sets.
    pub fn erase_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.try_node(id)?;
        if !node.users.is_empty() {
            let users: Vec<String> = node.users.iter().map(|u| self[*u].name.clone()).collect();
            return error::EraseWithUsersSnafu { name: node.name.clone(), users }.fail();
        }
        let deps: SmallVec<[_; 4]> = node.input_nodes().collect();
        let name = node.name.clone();
        for dep in deps {
            self.node_mut(dep).users.remove(&id);
        }
        self.names.remove(&name);
        self.order.retain(|n| *n != id);
        self.slots[id.index()] = None;
        if self.output == Some(id) {
            self.output = None;
        }
        // A cursor anchored on the erased node has nowhere to point.
        match self.point {
            InsertPoint::Before(a) | InsertPoint::After(a) if a == id => {
                self.point = InsertPoint::End;
            }
            _ => {}
        }
        tracing::trace!(node = %name, "erased node");
        Ok(())
    }

    /// Rewire every consumer of `old` to reference `new` instead.
    ///
    /// Updates both user sets and returns the rewired consumers. A node
    /// with no consumers is a no-op. `new` itself is skipped so that a
    /// replacement keeping `old` as an operand does not become
    /// self-referential; `old` is not erased.
    pub fn replace_all_uses_with(&mut self, old: NodeId, new: NodeId) -> Result<Vec<NodeId>> {
        ensure!(old != new, error::SelfReplacementSnafu { name: self.try_node(old)?.name.clone() });
        self.try_node(old)?;
        self.try_node(new)?;

        let users: Vec<NodeId> = self[old].users.iter().copied().filter(|u| *u != new).collect();
        for user in &users {
            let node = self.node_mut(*user);
            for arg in node.args.iter_mut().chain(node.kwargs.values_mut()) {
                if arg.as_node() == Some(old) {
                    *arg = Arg::Node(new);
                }
            }
            self.node_mut(old).users.remove(user);
            self.node_mut(new).users.insert(*user);
        }
        Ok(users)
    }

    /// Replace a node's target, leaving args, kwargs and users untouched.
    pub fn set_target(&mut self, id: NodeId, target: Target) -> Result<()> {
        self.try_node(id)?;
        self.node_mut(id).target = target;
        Ok(())
    }

    /// Replace a node's positional arguments, re-deriving user sets.
    pub fn set_args(&mut self, id: NodeId, args: Vec<Arg>) -> Result<()> {
        self.try_node(id)?;
        for arg in &args {
            if let Some(dep) = arg.as_node() {
                self.try_node(dep)?;
            }
        }
        let old: BTreeSet<NodeId> = self[id].input_nodes().collect();
        self.node_mut(id).args = Args::from_vec(args);
        self.rederive_users(id, &old);
        Ok(())
    }

    /// Replace a node's keyword arguments, re-deriving user sets.
    pub fn set_kwargs(&mut self, id: NodeId, kwargs: BTreeMap<String, Arg>) -> Result<()> {
        self.try_node(id)?;
        for arg in kwargs.values() {
            if let Some(dep) = arg.as_node() {
                self.try_node(dep)?;
            }
        }
        let old: BTreeSet<NodeId> = self[id].input_nodes().collect();
        self.node_mut(id).kwargs = kwargs;
        self.rederive_users(id, &old);
        Ok(())
    }

    /// Set or clear a node's type annotation.
    pub fn set_ty(&mut self, id: NodeId, ty: Option<ValueKind>) -> Result<()> {
        self.try_node(id)?;
        self.node_mut(id).ty = ty;
        Ok(())
    }

    fn rederive_users(&mut self, id: NodeId, old_deps: &BTreeSet<NodeId>) {
        let new_deps: BTreeSet<NodeId> = self[id].input_nodes().collect();
        for dep in old_deps.difference(&new_deps) {
            self.node_mut(*dep).users.remove(&id);
        }
        for dep in new_deps.difference(old_deps) {
            self.node_mut(*dep).users.insert(id);
        }
    }

    // ===== Validation =====

    /// Validate the ordering and user-consistency invariants.
    ///
    /// Intended after manual surgery, before regenerating code. The first
    /// violation is returned as an error; nothing is repaired.
    pub fn lint(&self) -> Result<()> {
        let mut derived: HashMap<NodeId, BTreeSet<NodeId>> = HashMap::new();
        let mut seen: HashMap<NodeId, usize> = HashMap::new();

        for (pos, id) in self.order.iter().enumerate() {
            let node = self.try_node(*id)?;
            ensure!(
                self.names.get(&node.name) == Some(id),
                error::UserIndexMismatchSnafu { name: node.name.clone() }
            );
            for dep in node.input_nodes() {
                let dep_node = self.try_node(dep)?;
                let dep_pos = seen
                    .get(&dep)
                    .copied()
                    .ok_or_else(|| {
                        error::UseBeforeDefSnafu { user: node.name.clone(), used: dep_node.name.clone() }.build()
                    })?;
                ensure!(
                    dep_pos < pos,
                    error::UseBeforeDefSnafu { user: node.name.clone(), used: dep_node.name.clone() }
                );
                derived.entry(dep).or_default().insert(*id);
            }
            seen.insert(*id, pos);
        }

        for (id, node) in self.nodes() {
            let expected = derived.remove(&id).unwrap_or_default();
            ensure!(node.users == expected, error::UserIndexMismatchSnafu { name: node.name.clone() });
        }

        if let Some(out) = self.output {
            let out_node = self.try_node(out)?;
            ensure!(
                self.order.last() == Some(&out),
                error::OutputNotLastSnafu { name: out_node.name.clone() }
            );
            ensure!(
                out_node.args.len() == 1 && out_node.kwargs.is_empty(),
                error::MalformedOutputSnafu { got: out_node.args.len() }
            );
        }
        Ok(())
    }

    /// Erase user-less non-output, non-placeholder nodes, in reverse
    /// program order. Returns the number of nodes removed.
    pub fn eliminate_dead_code(&mut self) -> usize {
        let snapshot: Vec<NodeId> = self.order.iter().rev().copied().collect();
        let mut removed = 0;
        for id in snapshot {
            let erasable = matches!(
                self[id].opcode,
                Opcode::GetAttr | Opcode::CallFunction | Opcode::CallMethod | Opcode::CallModule
            );
            if erasable && self[id].users.is_empty() {
                // Users are empty by construction, so this cannot fail.
                let _ = self.erase_node(id);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "dead code elimination");
        }
        removed
    }
}

impl std::ops::Index<NodeId> for Graph {
    type Output = Node;

    /// Panics on a stale or foreign id; use [`Graph::get`] when the id
    /// may have been erased.
    fn index(&self, id: NodeId) -> &Node {
        self.slots[id.index()].as_ref().unwrap_or_else(|| panic!("stale node id {id:?}"))
    }
}

/// Map a single argument reference through `f`, cloning literals.
pub fn map_arg<F: FnMut(NodeId) -> Arg>(arg: &Arg, f: &mut F) -> Arg {
    match arg {
        Arg::Node(id) => f(*id),
        Arg::Lit(v) => Arg::Lit(v.clone()),
    }
}

/// RAII scope for a temporary insertion cursor; restores the previous
/// cursor on drop.
pub struct InsertGuard<'g> {
    graph: &'g mut Graph,
    prev: InsertPoint,
}

impl std::ops::Deref for InsertGuard<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl std::ops::DerefMut for InsertGuard<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for InsertGuard<'_> {
    fn drop(&mut self) {
        self.graph.point = self.prev;
    }
}
