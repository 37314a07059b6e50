//! A graph together with the registry and parameters it closes over.

use snafu::OptionExt;
use tracing::trace;

use crate::error::*;
use crate::graph::Graph;
use crate::module::{Module, ModuleTree};
use crate::node::NodeId;
use crate::op::Op;
use crate::params::{ParamStore, ParamValue};
use crate::types::QualifiedName;

/// Owned, closed-world unit of lowering.
///
/// Fields are public so a pass can hold the graph mutably while reading the
/// registry; [`GraphModule::recompile`] must run after structural edits.
#[derive(Debug, Clone, Default)]
pub struct GraphModule {
    pub graph: Graph,
    pub modules: ModuleTree,
    pub params: ParamStore,
    code: String,
}

impl GraphModule {
    pub fn new(graph: Graph, modules: ModuleTree, params: ParamStore) -> Self {
        let mut gm = Self { graph, modules, params, code: String::new() };
        gm.recompile();
        gm
    }

    /// Regenerates the listing that represents the current graph. Idempotent.
    pub fn recompile(&mut self) {
        self.code = self.graph.to_string();
        trace!(nodes = self.graph.len(), "recompiled graph module");
    }

    /// Listing produced by the last [`GraphModule::recompile`].
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Value behind the attribute-read node `node`.
    ///
    /// Paths resolve first in the parameter store, then as module attributes.
    pub fn attr_value(&self, node: NodeId) -> Result<&ParamValue> {
        let node = self.graph.node(node)?;
        let path = node.attr_path().context(NotAnAttributeSnafu { node: node.name() })?;
        self.resolve_attr(path).context(UnknownAttributeSnafu { path: path.clone() })
    }

    pub fn resolve_attr(&self, path: &QualifiedName) -> Option<&ParamValue> {
        self.params.get(path).or_else(|| self.modules.attr(path))
    }

    /// Module instance targeted by a call-module node.
    pub fn module_of(&self, node: NodeId) -> Option<&Module> {
        self.graph.get(node)?.module_path().and_then(|path| self.modules.get(path))
    }

    /// Graph lint plus resolution of every module and attribute target.
    pub fn lint(&self) -> Result<()> {
        self.graph.lint()?;
        for node in self.graph.nodes() {
            match node.op() {
                Op::CallModule(path) => {
                    self.modules.resolve(path)?;
                }
                Op::GetAttr(path) => {
                    let resolved = self.resolve_attr(path).is_some() || self.modules.get(path).is_some();
                    snafu::ensure!(resolved, UnknownAttributeSnafu { path: path.clone() });
                }
                _ => {}
            }
        }
        Ok(())
    }
}
