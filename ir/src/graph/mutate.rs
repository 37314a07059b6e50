//! Rewrite primitives built on top of the core graph operations.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::*;
use crate::graph::{Graph, InsertPoint};
use crate::node::NodeId;
use crate::op::{Arg, Op};
use crate::provenance::{PassName, ProvenanceEvent};

impl Graph {
    /// Runs `f` with every created node linked after `anchor`, in creation order.
    ///
    /// The previous insertion point is restored even when `f` fails.
    pub fn inserting_after<R, E>(&mut self, anchor: NodeId, f: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E>
    where
        E: From<Error>,
    {
        self.with_insert_point(anchor, InsertPoint::After(anchor), f)
    }

    /// Runs `f` with every created node linked immediately before `anchor`.
    pub fn inserting_before<R, E>(&mut self, anchor: NodeId, f: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E>
    where
        E: From<Error>,
    {
        self.with_insert_point(anchor, InsertPoint::Before(anchor), f)
    }

    fn with_insert_point<R, E>(
        &mut self,
        anchor: NodeId,
        point: InsertPoint,
        f: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<Error>,
    {
        self.node(anchor)?;
        let saved = std::mem::replace(&mut self.insert_point, point);
        let result = f(self);
        self.insert_point = saved;
        result
    }

    /// Creates a replacement for `old` that inherits its metadata.
    ///
    /// Only metadata is copied; operands and users come from the arguments. The
    /// provenance chain gains a `Transformed` event naming `old` and `pass`.
    pub fn create_node_preserving_meta(
        &mut self,
        old: NodeId,
        op: Op,
        args: impl IntoIterator<Item = Arg>,
        kwargs: BTreeMap<String, Arg>,
        pass: PassName,
    ) -> Result<NodeId> {
        let source = self.node(old)?;
        let mut meta = source.meta.clone();
        meta.provenance.push(ProvenanceEvent::Transformed { from: source.name.clone(), pass });
        let hint = super::name_hint(&op);
        self.insert_node(hint, op, args.into_iter().collect(), kwargs, meta)
    }

    /// Rewires every consumer of `node` to `replacement`, then erases `node`.
    ///
    /// Returns the number of redirected consumers.
    pub fn elide(&mut self, node: NodeId, replacement: NodeId) -> Result<usize> {
        let redirected = self.replace_all_uses_with(node, replacement)?;
        self.erase_node(node)?;
        trace!(node = %node, replacement = %self[replacement].name, redirected, "elided node");
        Ok(redirected)
    }

    /// Erases `node` if nothing reads it anymore.
    ///
    /// Returns `false` when the node still has users or was already erased;
    /// shared parameter reads are released by whichever rewrite drops the last use.
    pub fn erase_if_unused(&mut self, node: NodeId) -> Result<bool> {
        match self.get(node) {
            Some(n) if n.users.is_empty() => {
                self.erase_node(node)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
