use snafu::Snafu;

use qlower_dtype::DType;
use qlower_ir::{Function, ModuleType};

pub type Result<T, E = LowerError> = std::result::Result<T, E>;

/// Fatal lowering conditions.
///
/// Unsupported but well-formed pattern sites are not errors; passes record
/// them as [`Skip`](crate::report::Skip) entries and move on.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LowerError {
    /// Graph invariant violation raised by a rewrite primitive or the final lint.
    #[snafu(context(false), display("graph invariant violated: {source}"))]
    Graph { source: qlower_ir::Error },

    /// The functional table names a reference function without a prepack operator.
    #[snafu(display("lowering for functional '{function}' is not supported: only linear has a prepack operator"))]
    UnsupportedFunctional { function: Function },

    #[snafu(display("no linear prepack operator for weight dtype {dtype}"))]
    UnsupportedWeightDType { dtype: DType },

    /// The quantized weight feeding a functional call carries no storage dtype.
    #[snafu(display("cannot determine the storage dtype of quantized weight '{node}'"))]
    UnknownWeightDType { node: String },

    #[snafu(display("cannot build {module_type} from reference module: {reason}"))]
    FromReference { module_type: ModuleType, reason: String },

    #[snafu(display("{patterns} subgraph patterns configured but no subgraph rewriter is installed"))]
    MissingRewriter { patterns: usize },

    /// A validated site lost its shape while the other sites of its module were rewritten.
    #[snafu(display("pattern site '{node}' changed before it was rewritten"))]
    SiteChanged { node: String },
}
