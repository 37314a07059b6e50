//! Ordered dataflow graph.
//!
//! Nodes live in an arena indexed by [`NodeId`] and are threaded through a
//! doubly-linked list that records program order. The list order is always a
//! topological order: every operand precedes its consumers. Each node keeps its
//! use set in sync with the operand lists of the graph, which is what makes
//! [`Graph::erase_node`] safe to check and [`Graph::replace_all_uses_with`]
//! cheap.
//!
//! Structural fields of [`Node`] are only writable from this module; callers
//! mutate a graph exclusively through the primitives here and in [`mutate`].

mod constructors;
mod lint;
mod listing;
pub mod mutate;
pub mod tree;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Index;
use std::panic::Location;

use smallvec::SmallVec;
use snafu::ensure;
use tracing::trace;

use crate::error::*;
use crate::node::{Node, NodeId, NodeMeta};
use crate::op::{Arg, Op};
use crate::provenance::{ProvenanceEvent, SourceLocation};

/// Where [`Graph::create_node`] links a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPoint {
    /// Immediately before the output node, or at the end when there is none.
    #[default]
    Append,
    /// After the anchor. The point advances to every created node so that a
    /// sequence of creations keeps its order.
    After(NodeId),
    /// Immediately before the anchor.
    Before(NodeId),
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    output: Option<NodeId>,
    insert_point: InsertPoint,
    names: HashSet<String>,
    name_counters: HashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::NodeNotFound { id })
    }

    /// Metadata is the only part of a node that may be edited in place.
    pub fn meta_mut(&mut self, id: NodeId) -> Result<&mut NodeMeta> {
        self.get_mut(id).map(Node::meta_mut)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut).ok_or(Error::NodeNotFound { id })
    }

    pub fn output_node(&self) -> Option<NodeId> {
        self.output
    }

    pub fn insert_point(&self) -> InsertPoint {
        self.insert_point
    }

    /// Live nodes in program order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { graph: self, cursor: self.head }
    }

    /// Snapshot of the current program order.
    ///
    /// Passes iterate a snapshot and re-check [`Graph::contains`] for each id, so
    /// nodes erased or inserted during the walk never invalidate the iteration.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(Node::id).collect()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|node| node.name == name).map(Node::id)
    }

    /// Zero-based index of `id` in program order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes().position(|node| node.id == id)
    }

    /// Whichever of `a` and `b` occurs later in program order.
    pub fn later_of(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let pa = self.position(a).ok_or(Error::NodeNotFound { id: a })?;
        let pb = self.position(b).ok_or(Error::NodeNotFound { id: b })?;
        Ok(if pa >= pb { a } else { b })
    }

    /// Creates a node at the current insertion point.
    ///
    /// Every referenced operand must be live and precede the insertion point.
    /// The name is derived from the target and made unique within the graph.
    #[track_caller]
    pub fn create_node(&mut self, op: Op, args: impl IntoIterator<Item = Arg>, kwargs: BTreeMap<String, Arg>) -> Result<NodeId> {
        let hint = name_hint(&op);
        let meta = NodeMeta {
            provenance: vec![ProvenanceEvent::Created { location: SourceLocation::from_caller(Location::caller()) }],
            ..Default::default()
        };
        self.insert_node(hint, op, args.into_iter().collect(), kwargs, meta)
    }

    pub(crate) fn insert_node(
        &mut self,
        hint: String,
        op: Op,
        args: SmallVec<[Arg; 4]>,
        kwargs: BTreeMap<String, Arg>,
        meta: NodeMeta,
    ) -> Result<NodeId> {
        let is_output = matches!(op, Op::Output);
        if let (true, Some(existing)) = (is_output, self.output) {
            return DuplicateOutputSnafu { existing: self.node(existing)?.name.clone() }.fail();
        }

        // Resolve the predecessor the new node will be linked after.
        let prev = if is_output { self.tail } else { self.predecessor_at_insert_point()? };

        let id = NodeId(self.nodes.len() as u32);
        let name = self.unique_name(&hint);
        let mut node = Node {
            id,
            name,
            op,
            args,
            kwargs,
            users: SmallVec::new(),
            meta,
            prev: None,
            next: None,
        };

        let operands = node.operand_nodes();
        self.check_operands_precede(&node, &operands, prev)?;

        for &operand in &operands {
            let users = &mut self.get_mut(operand)?.users;
            if !users.contains(&id) {
                users.push(id);
            }
        }

        node.prev = prev;
        self.names.insert(node.name.clone());
        self.nodes.push(Some(node));
        self.link_after(id, prev)?;
        self.len += 1;

        if is_output {
            self.output = Some(id);
        }
        if let InsertPoint::After(_) = self.insert_point {
            self.insert_point = InsertPoint::After(id);
        }

        trace!(node = %self[id].name, op = %self[id].op.kind(), "created node");
        Ok(id)
    }

    /// Removes a node that no longer has consumers.
    pub fn erase_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if !node.users.is_empty() {
            let users: Vec<String> =
                node.users.iter().filter_map(|&u| self.get(u)).map(|u| u.name.clone()).collect();
            return NodeHasUsersSnafu { node: node.name.clone(), users }.fail();
        }

        let operands = node.operand_nodes();
        for operand in operands {
            if let Ok(producer) = self.get_mut(operand) {
                producer.users.retain(|u| *u != id);
            }
        }

        self.unlink(id)?;
        if self.output == Some(id) {
            self.output = None;
        }
        let removed = self.nodes[id.index()].take();
        self.len -= 1;

        if let Some(node) = removed {
            trace!(node = %node.name, "erased node");
        }
        Ok(())
    }

    /// Redirects every consumer of `old` to read `new` instead.
    ///
    /// Returns how many consumers were redirected. `new` itself is never
    /// rewired, so it may legitimately consume `old`.
    pub fn replace_all_uses_with(&mut self, old: NodeId, new: NodeId) -> Result<usize> {
        self.node(new)?;
        if old == new {
            return Ok(0);
        }

        let users: SmallVec<[NodeId; 4]> = self.node(old)?.users.iter().copied().filter(|&u| u != new).collect();
        for &user in &users {
            let node = self.get_mut(user)?;
            for arg in node.args.iter_mut().chain(node.kwargs.values_mut()) {
                arg.replace_node(old, new);
            }
        }

        self.get_mut(old)?.users.retain(|u| *u == new);
        let replacement = &mut self.get_mut(new)?.users;
        for &user in &users {
            if !replacement.contains(&user) {
                replacement.push(user);
            }
        }

        Ok(users.len())
    }

    fn predecessor_at_insert_point(&self) -> Result<Option<NodeId>> {
        match self.insert_point {
            InsertPoint::Append => Ok(match self.output {
                Some(output) => self.node(output)?.prev,
                None => self.tail,
            }),
            InsertPoint::After(anchor) => {
                ensure!(self.contains(anchor), StaleInsertPointSnafu { anchor });
                Ok(Some(anchor))
            }
            InsertPoint::Before(anchor) => {
                let node = self.get(anchor).ok_or(Error::StaleInsertPoint { anchor })?;
                Ok(node.prev)
            }
        }
    }

    /// Walks backwards from `prev` and checks that every operand is found.
    fn check_operands_precede(&self, node: &Node, operands: &[NodeId], prev: Option<NodeId>) -> Result<()> {
        for &operand in operands {
            ensure!(self.contains(operand), DanglingOperandSnafu { node: node.name.clone(), operand });
        }

        let mut pending: SmallVec<[NodeId; 4]> = operands.iter().copied().collect();
        let mut cursor = prev;
        while let Some(id) = cursor {
            if pending.is_empty() {
                break;
            }
            pending.retain(|p| *p != id);
            cursor = self[id].prev;
        }

        match pending.first() {
            None => Ok(()),
            Some(&late) => OperandAfterUserSnafu { node: node.name.clone(), operand: self[late].name.clone() }.fail(),
        }
    }

    fn link_after(&mut self, id: NodeId, prev: Option<NodeId>) -> Result<()> {
        let next = match prev {
            Some(p) => self.node(p)?.next,
            None => self.head,
        };

        {
            let node = self.get_mut(id)?;
            node.prev = prev;
            node.next = next;
        }
        match prev {
            Some(p) => self.get_mut(p)?.next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.get_mut(n)?.prev = Some(id),
            None => self.tail = Some(id),
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) -> Result<()> {
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.get_mut(p)?.next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.get_mut(n)?.prev = prev,
            None => self.tail = prev,
        }
        Ok(())
    }

    fn unique_name(&mut self, hint: &str) -> String {
        if !self.names.contains(hint) {
            return hint.to_string();
        }
        let counter = self.name_counters.entry(hint.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{hint}_{counter}");
            if !self.names.contains(&candidate) {
                return candidate;
            }
        }
    }
}

impl Index<NodeId> for Graph {
    type Output = Node;

    /// Panics on an erased id; use [`Graph::node`] for a fallible lookup.
    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id} is not part of the graph"),
        }
    }
}

/// Iterator over live nodes in program order.
pub struct Nodes<'a> {
    graph: &'a Graph,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.graph.get(self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}

/// Default node name for an operation: the last path segment of its target.
fn name_hint(op: &Op) -> String {
    let raw = match op {
        Op::Placeholder => "input".to_string(),
        Op::Output => "output".to_string(),
        Op::GetAttr(path) | Op::CallModule(path) => path.segments().join("_"),
        Op::CallFunction(function) => function.as_str().rsplit("::").next().unwrap_or_default().to_string(),
        Op::CallMethod(method) => method.to_string(),
    };
    sanitize(&raw)
}

pub(crate) fn sanitize(raw: &str) -> String {
    let mut name: String = raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
