use snafu::Snafu;

use crate::{NodeId, QualifiedName};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node id does not refer to a live node.
    #[snafu(display("node {id} is not part of the graph"))]
    NodeNotFound { id: NodeId },

    /// Erasing a node that still has consumers.
    #[snafu(display("cannot erase node '{node}': still used by {users:?}"))]
    NodeHasUsers { node: String, users: Vec<String> },

    /// Operand refers to an erased or foreign node.
    #[snafu(display("node '{node}' has dangling operand {operand}"))]
    DanglingOperand { node: String, operand: NodeId },

    /// Operand is defined at or after its consumer.
    #[snafu(display("node '{node}' uses '{operand}' before it is defined"))]
    OperandAfterUser { node: String, operand: String },

    /// Recorded use set differs from the actual consumers.
    #[snafu(display("use set of '{node}' is out of sync: recorded {recorded:?}, actual {actual:?}"))]
    UsersOutOfSync { node: String, recorded: Vec<String>, actual: Vec<String> },

    /// Non-input node whose value is never read.
    #[snafu(display("node '{node}' is dead: it has no users and is not an input"))]
    DeadNode { node: String },

    #[snafu(display("graph has no output node"))]
    MissingOutput,

    #[snafu(display("graph already has output node '{existing}'"))]
    DuplicateOutput { existing: String },

    #[snafu(display("output node '{node}' is not the last node in the graph"))]
    OutputNotLast { node: String },

    #[snafu(display("node name '{name}' is used more than once"))]
    DuplicateName { name: String },

    /// Scoped insertion point refers to a node that was erased inside the scope.
    #[snafu(display("insertion anchor {anchor} is no longer part of the graph"))]
    StaleInsertPoint { anchor: NodeId },

    #[snafu(display("node list is corrupted: walked {walked} nodes, arena holds {live}"))]
    CorruptedOrder { walked: usize, live: usize },

    /// Module path does not resolve in the registry.
    #[snafu(display("no module registered at '{path}'"))]
    UnknownModule { path: QualifiedName },

    /// Attribute path does not resolve in the parameter store or registry.
    #[snafu(display("no attribute stored at '{path}'"))]
    UnknownAttribute { path: QualifiedName },

    #[snafu(display("node '{node}' is not an attribute read"))]
    NotAnAttribute { node: String },

    #[snafu(display("cannot replace the module tree root"))]
    RootReplacement,
}
