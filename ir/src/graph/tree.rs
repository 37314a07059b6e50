//! Tree visualization of a node's operand cone.
//!
//! Graphs are DAGs, so a node can feed several consumers. The compact renderer
//! prints `%name → (see above)` for a node it already expanded; the full
//! renderer expands every occurrence.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::op::Op;

#[derive(Clone)]
pub struct OperandTreeCompact<'g> {
    graph: &'g Graph,
    id: NodeId,
    visited: Rc<RefCell<HashSet<NodeId>>>,
    is_backref: RefCell<bool>,
}

impl<'g> OperandTreeCompact<'g> {
    pub fn new(graph: &'g Graph, id: NodeId) -> Self {
        Self { graph, id, visited: Rc::new(RefCell::new(HashSet::new())), is_backref: RefCell::new(false) }
    }
}

impl TreeItem for OperandTreeCompact<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let Some(node) = self.graph.get(self.id) else {
            return write!(f, "{} <erased>", self.id);
        };
        let mut visited = self.visited.borrow_mut();
        if visited.insert(self.id) {
            write!(f, "{}", format_node(node))
        } else {
            *self.is_backref.borrow_mut() = true;
            write!(f, "%{} → (see above)", node.name())
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let children = operands(self.graph, self.id)
            .into_iter()
            .map(|id| Self { graph: self.graph, id, visited: self.visited.clone(), is_backref: RefCell::new(false) })
            .collect::<Vec<_>>();
        Cow::Owned(children)
    }
}

#[derive(Clone)]
pub struct OperandTreeFull<'g> {
    graph: &'g Graph,
    id: NodeId,
}

impl<'g> OperandTreeFull<'g> {
    pub fn new(graph: &'g Graph, id: NodeId) -> Self {
        Self { graph, id }
    }
}

impl TreeItem for OperandTreeFull<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        match self.graph.get(self.id) {
            Some(node) => write!(f, "{}", format_node(node)),
            None => write!(f, "{} <erased>", self.id),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Owned(operands(self.graph, self.id).into_iter().map(|id| Self { graph: self.graph, id }).collect())
    }
}

fn operands(graph: &Graph, id: NodeId) -> Vec<NodeId> {
    graph.get(id).map(|node| node.operand_nodes().into_vec()).unwrap_or_default()
}

/// `%name = kind[target]`, with inline literal operands appended.
fn format_node(node: &Node) -> String {
    let target = match node.op() {
        Op::Placeholder | Op::Output => String::new(),
        op => format!("[{}]", op.target().unwrap_or_default()),
    };
    let literals: Vec<String> = node.args().iter().filter_map(|arg| arg.as_literal()).map(ToString::to_string).collect();
    let literals = if literals.is_empty() { String::new() } else { format!(" ({})", literals.join(", ")) };
    format!("%{} = {}{}{}", node.name(), node.op().kind(), target, literals)
}

impl Graph {
    /// Compact ASCII tree of the operand cone of `root`.
    pub fn tree(&self, root: NodeId) -> io::Result<String> {
        render(&OperandTreeCompact::new(self, root))
    }

    /// Full ASCII tree of the operand cone of `root`, shared operands expanded every time.
    pub fn tree_full(&self, root: NodeId) -> io::Result<String> {
        render(&OperandTreeFull::new(self, root))
    }
}

fn render<T: TreeItem>(tree: &T) -> io::Result<String> {
    let mut buf = Vec::new();
    ptree::write_tree(tree, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
