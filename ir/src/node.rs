//! Graph nodes.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::op::{Arg, Op};
use crate::provenance::ProvenanceEvent;
use crate::types::{Function, Method, QualifiedName};

/// Stable handle of a node inside one [`Graph`](crate::Graph).
///
/// Ids are never reused within a graph, so a handle to an erased node stays
/// invalid instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Debugging and provenance data carried alongside a node.
///
/// Metadata never influences matching or use/def structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    pub provenance: Vec<ProvenanceEvent>,
    pub tags: BTreeMap<String, String>,
}

/// A single operation in the dataflow graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) op: Op,
    pub(crate) args: SmallVec<[Arg; 4]>,
    pub(crate) kwargs: BTreeMap<String, Arg>,
    /// Consumers in first-use order, without duplicates.
    pub(crate) users: SmallVec<[NodeId; 4]>,
    pub(crate) meta: NodeMeta,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// Operand `index` if it is a node reference.
    pub fn arg_node(&self, index: usize) -> Option<NodeId> {
        self.arg(index).and_then(Arg::as_node)
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Arg> {
        &self.kwargs
    }

    pub fn kwarg(&self, name: &str) -> Option<&Arg> {
        self.kwargs.get(name)
    }

    pub fn users(&self) -> &[NodeId] {
        &self.users
    }

    pub fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    pub fn is_call_function(&self, function: &Function) -> bool {
        matches!(&self.op, Op::CallFunction(f) if f == function)
    }

    pub fn is_call_method(&self, method: &Method) -> bool {
        matches!(&self.op, Op::CallMethod(m) if m == method)
    }

    pub fn is_get_attr(&self) -> bool {
        matches!(self.op, Op::GetAttr(_))
    }

    /// Registry path of a module call.
    pub fn module_path(&self) -> Option<&QualifiedName> {
        match &self.op {
            Op::CallModule(path) => Some(path),
            _ => None,
        }
    }

    /// Parameter path of an attribute read.
    pub fn attr_path(&self) -> Option<&QualifiedName> {
        match &self.op {
            Op::GetAttr(path) => Some(path),
            _ => None,
        }
    }

    /// Every node referenced by positional and keyword operands, deduplicated in
    /// first-occurrence order.
    pub fn operand_nodes(&self) -> SmallVec<[NodeId; 4]> {
        let mut nodes: SmallVec<[NodeId; 4]> = SmallVec::new();
        let mut push = |id: NodeId| {
            if !nodes.contains(&id) {
                nodes.push(id);
            }
        };
        for arg in self.args.iter().chain(self.kwargs.values()) {
            arg.for_each_node(&mut push);
        }
        nodes
    }
}
