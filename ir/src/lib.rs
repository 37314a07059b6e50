//! Graph IR for quantized operator lowering.
//!
//! This crate defines the dataflow graph that lowering passes rewrite, the
//! module registry and parameter store the graph closes over, and the
//! structural pattern matcher the passes use to find rewrite sites.
//!
//! # Module Organization
//!
//! - [`types`] - Target identifiers, qualified paths and literal operands
//! - [`op`] - Operation kinds and operands
//! - [`node`] - Nodes, node ids and metadata
//! - [`graph`] - Ordered graph, rewrite primitives, lint and rendering
//! - [`module`] - Module registry
//! - [`params`] - Parameter values and store
//! - [`graph_module`] - Graph plus registry plus parameters
//! - [`pattern`] - Structural pattern matching
//! - [`provenance`] - Creation and rewrite history of nodes
//! - [`error`] - Error types and result handling

pub mod error;
pub mod graph;
pub mod graph_module;
pub mod module;
pub mod node;
pub mod op;
pub mod params;
pub mod pattern;
pub mod provenance;
pub mod types;


pub use error::{Error, Result};
pub use graph::{Graph, InsertPoint};
pub use graph_module::GraphModule;
pub use module::{Module, ModuleTree};
pub use node::{Node, NodeId, NodeMeta};
pub use op::{Arg, Op, OpKind};
pub use params::{ParamStore, ParamValue, QParams, Tensor};
pub use pattern::{Bindings, Head, Pattern, is_match, match_pattern};
pub use provenance::{PassName, ProvenanceEvent, SourceLocation};
pub use types::{Function, Literal, Method, ModuleType, QualifiedName};

pub use qlower_dtype::DType;
