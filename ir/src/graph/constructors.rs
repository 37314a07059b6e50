//! Convenience constructors, one per operation kind.

use std::collections::BTreeMap;
use std::panic::Location;

use crate::error::Result;
use crate::graph::{Graph, sanitize};
use crate::node::{NodeId, NodeMeta};
use crate::op::{Arg, Op};
use crate::provenance::{ProvenanceEvent, SourceLocation};
use crate::types::{Function, Method, QualifiedName};

impl Graph {
    /// Graph input named `name`.
    #[track_caller]
    pub fn placeholder(&mut self, name: &str) -> Result<NodeId> {
        self.insert_node(sanitize(name), Op::Placeholder, Default::default(), BTreeMap::new(), created_here())
    }

    /// Read of the parameter or module attribute at `path`.
    #[track_caller]
    pub fn get_attr(&mut self, path: impl Into<QualifiedName>) -> Result<NodeId> {
        self.create_node(Op::GetAttr(path.into()), [], BTreeMap::new())
    }

    #[track_caller]
    pub fn call_function(&mut self, function: impl Into<Function>, args: impl IntoIterator<Item = Arg>) -> Result<NodeId> {
        self.create_node(Op::CallFunction(function.into()), args, BTreeMap::new())
    }

    #[track_caller]
    pub fn call_function_with_kwargs(
        &mut self,
        function: impl Into<Function>,
        args: impl IntoIterator<Item = Arg>,
        kwargs: impl IntoIterator<Item = (String, Arg)>,
    ) -> Result<NodeId> {
        self.create_node(Op::CallFunction(function.into()), args, kwargs.into_iter().collect())
    }

    /// Method call; the receiver is the first positional operand.
    #[track_caller]
    pub fn call_method(&mut self, method: impl Into<Method>, args: impl IntoIterator<Item = Arg>) -> Result<NodeId> {
        self.create_node(Op::CallMethod(method.into()), args, BTreeMap::new())
    }

    #[track_caller]
    pub fn call_module(&mut self, path: impl Into<QualifiedName>, args: impl IntoIterator<Item = Arg>) -> Result<NodeId> {
        self.create_node(Op::CallModule(path.into()), args, BTreeMap::new())
    }

    /// Graph result. Always linked last; a graph holds at most one.
    #[track_caller]
    pub fn output(&mut self, value: impl Into<Arg>) -> Result<NodeId> {
        self.create_node(Op::Output, [value.into()], BTreeMap::new())
    }
}

#[track_caller]
fn created_here() -> NodeMeta {
    NodeMeta {
        provenance: vec![ProvenanceEvent::Created { location: SourceLocation::from_caller(Location::caller()) }],
        ..Default::default()
    }
}
