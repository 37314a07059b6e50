//! The four rewriting stages, in pipeline order.
//!
//! Every pass walks a snapshot of the node order, skips ids erased earlier in
//! the same walk, and recompiles the graph module before returning.

pub mod functional;
pub mod module;
pub mod special;
pub mod subgraph;

pub use functional::lower_weighted_ref_functional;
pub use module::lower_weighted_ref_module;
pub use special::special_pattern_replacement;
pub use subgraph::{PatternReplacement, SubgraphRewriter, apply_subgraph_rewrites};
