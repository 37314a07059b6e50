//! Lowering of reference quantized operator patterns to fused native operators.
//!
//! A quantized model traced to a graph expresses every quantized operator in
//! its reference form: dequantize the inputs, run the float operator, quantize
//! the result. This crate recognizes those patterns and rewrites them into the
//! fused operators of the native quantized backend, preserving the numerics
//! of the reference graph.
//!
//! # Module Organization
//!
//! - [`config`] - The lowering table: which patterns lower to what
//! - [`catalog`] - Operator names of the native backend
//! - [`reference`] - Construction of fused modules from reference modules
//! - [`passes`] - Module, functional, subgraph and special-case passes
//! - [`pipeline`] - [`lower_to_native_backend`], the entry point
//! - [`report`] - Record of lowered and skipped pattern sites
//! - [`error`] - Error types and result handling
//!
//! # Example
//!
//! ```ignore
//! let config = LoweringConfig::from_env();
//! let report = lower_to_native_backend(&mut gm, &config)?;
//! for skip in &report.skipped {
//!     eprintln!("{skip}");
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod passes;
pub mod pipeline;
pub mod reference;
pub mod report;


pub use config::{Conversions, FunctionalLowering, FusedModuleLowering, LoweringConfig, ModuleLowering, OpSet};
pub use error::{LowerError, Result};
pub use passes::{PatternReplacement, SubgraphRewriter};
pub use pipeline::lower_to_native_backend;
pub use reference::FromReference;
pub use report::{Lowered, LoweringReport, Skip, SkipReason};
