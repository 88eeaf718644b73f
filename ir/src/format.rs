//! Human-readable and tabular graph rendering.
//!
//! The line format is `opcode name target(args) {kwargs}`, one node per
//! line in program order, diff-friendly. Node references print as
//! `%name`; literals use their value display.

use std::fmt::Write as _;

use crate::graph::Graph;
use crate::node::{Arg, Node, NodeId, Target};

impl Graph {
    fn arg_text(&self, arg: &Arg) -> String {
        match arg {
            Arg::Node(id) => format!("%{}", self[*id].name()),
            Arg::Lit(v) => v.to_string(),
        }
    }

    fn args_text(&self, node: &Node) -> String {
        node.args().iter().map(|a| self.arg_text(a)).collect::<Vec<_>>().join(", ")
    }

    fn kwargs_text(&self, node: &Node) -> String {
        if node.kwargs().is_empty() {
            return String::new();
        }
        let body = node
            .kwargs()
            .iter()
            .map(|(k, a)| format!("{k}: {}", self.arg_text(a)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" {{{body}}}")
    }

    /// Render one node as a single line.
    pub fn node_line(&self, id: NodeId) -> String {
        let node = &self[id];
        let target = match node.target() {
            Target::None => String::new(),
            other => other.as_str().to_owned(),
        };
        format!(
            "{} {} {}({}){}",
            node.opcode(),
            node.name(),
            target,
            self.args_text(node),
            self.kwargs_text(node),
        )
    }

    /// Column-aligned dump over all nodes, for debugging.
    pub fn print_tabular(&self) -> String {
        let header = ["opcode", "name", "target", "args", "kwargs"];
        let mut rows: Vec<[String; 5]> = Vec::with_capacity(self.len());
        for (_, node) in self.nodes() {
            rows.push([
                node.opcode().to_string(),
                node.name().to_owned(),
                node.target().as_str().to_owned(),
                format!("({})", self.args_text(node)),
                self.kwargs_text(node).trim_start().to_owned(),
            ]);
        }

        let mut widths = header.map(str::len);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.len());
            }
        }

        let mut out = String::new();
        let mut emit = |cells: [&str; 5], out: &mut String| {
            for (i, (cell, w)) in cells.iter().zip(widths.iter()).enumerate() {
                if i > 0 {
                    out.push_str("  ");
                }
                let _ = write!(out, "{cell:<w$}", w = *w);
            }
            while out.ends_with(' ') {
                out.pop();
            }
            out.push('\n');
        };

        emit(header, &mut out);
        emit(["------", "----", "------", "----", "------"], &mut out);
        for row in &rows {
            emit([&row[0], &row[1], &row[2], &row[3], &row[4]], &mut out);
        }
        out
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (id, _) in self.nodes() {
            writeln!(f, "{}", self.node_line(id))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Node {
    /// Standalone rendering; node references print as raw arena ids
    /// because names live in the owning graph.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self
            .args()
            .iter()
            .map(|a| match a {
                Arg::Node(id) => format!("%{}", id.index()),
                Arg::Lit(v) => v.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} {} {}({args})", self.opcode(), self.name(), self.target().as_str())
    }
}
