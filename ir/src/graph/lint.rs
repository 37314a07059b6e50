//! Structural validation of a graph.

use std::collections::{HashMap, HashSet};

use snafu::ensure;

use crate::error::*;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::op::Op;

impl Graph {
    /// Checks every structural invariant and reports the first violation.
    ///
    /// - the linked order visits exactly the live arena entries
    /// - node names are unique
    /// - every operand is live and strictly precedes its consumer
    /// - recorded use sets equal the actual consumer sets
    /// - exactly one output node exists and it is last
    /// - every node other than an input is read by someone
    #[tracing::instrument(skip_all, fields(nodes = self.len))]
    pub fn lint(&self) -> Result<()> {
        let live = self.nodes.iter().filter(|slot| slot.is_some()).count();
        let walked = self.nodes().count();
        ensure!(walked == live && live == self.len, CorruptedOrderSnafu { walked, live });

        let mut names = HashSet::with_capacity(live);
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(live);
        let mut consumers: HashMap<NodeId, Vec<NodeId>> = HashMap::with_capacity(live);
        let mut outputs = Vec::new();

        for node in self.nodes() {
            ensure!(names.insert(node.name.as_str()), DuplicateNameSnafu { name: node.name.clone() });

            for operand in node.operand_nodes() {
                let producer = self.get(operand).ok_or_else(|| Error::DanglingOperand { node: node.name.clone(), operand })?;
                ensure!(seen.contains(&operand), OperandAfterUserSnafu {
                    node: node.name.clone(),
                    operand: producer.name.clone(),
                });
                consumers.entry(operand).or_default().push(node.id);
            }

            if matches!(node.op, Op::Output) {
                outputs.push(node.id);
            }
            seen.insert(node.id);
        }

        for node in self.nodes() {
            let mut recorded: Vec<NodeId> = node.users.to_vec();
            let mut actual = consumers.remove(&node.id).unwrap_or_default();
            recorded.sort();
            actual.sort();
            if recorded != actual {
                let to_names = |ids: &[NodeId]| -> Vec<String> {
                    ids.iter().filter_map(|&id| self.get(id)).map(|n| n.name.clone()).collect()
                };
                return UsersOutOfSyncSnafu {
                    node: node.name.clone(),
                    recorded: to_names(&recorded),
                    actual: to_names(&actual),
                }
                .fail();
            }
        }

        let output = match outputs.as_slice() {
            [] => return MissingOutputSnafu.fail(),
            [single] => *single,
            [first, ..] => return DuplicateOutputSnafu { existing: self[*first].name.clone() }.fail(),
        };
        ensure!(self.tail == Some(output) && self.output == Some(output), OutputNotLastSnafu {
            node: self[output].name.clone()
        });

        for node in self.nodes() {
            let exempt = matches!(node.op, Op::Placeholder | Op::Output);
            ensure!(exempt || !node.users.is_empty(), DeadNodeSnafu { node: node.name.clone() });
        }

        Ok(())
    }
}
