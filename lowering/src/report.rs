//! What a lowering run did.

use derive_more::Display;

use qlower_dtype::DType;
use qlower_ir::{ModuleType, PassName};

/// A rewritten pattern site.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{pass}: '{node}' -> {target}")]
pub struct Lowered {
    pub pass: PassName,
    /// The node the match was rooted at, before the rewrite.
    pub node: String,
    /// Fused module type or function that replaced the reference pattern.
    pub target: String,
}

/// A pattern site that matched structurally but could not be lowered.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{pass}: skipped '{node}': {reason}")]
pub struct Skip {
    pub pass: PassName,
    pub node: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SkipReason {
    #[display("output scale and zero point must be attribute reads")]
    NonAttributeQParams,

    #[display("output scale and zero point must be scalars")]
    NonScalarQParams,

    #[display("only {expected} output is supported, got {found}")]
    UnsupportedOutputDType { expected: DType, found: String },

    #[display("inner module of fused module must be {expected}, got {found}")]
    InnerModuleMismatch { expected: ModuleType, found: String },

    #[display("fixed-range operator feeding a reduced-precision conversion")]
    FixedRangeReducedFloat,

    #[display("dequantize node '{node}' has other consumers")]
    SharedDequantize { node: String },

    #[display("reference operator '{node}' has other consumers")]
    SharedReference { node: String },

    #[display("operand '{operand}' is not a graph node")]
    NonNodeOperand { operand: String },

    /// Swapping the module would change a call site that is not lowered with it.
    #[display("module '{path}' is also called outside a lowerable site")]
    SharedModule { path: String },

    #[display("call sites of module '{path}' quantize their output with different parameters")]
    ConflictingQParams { path: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoweringReport {
    pub lowered: Vec<Lowered>,
    pub skipped: Vec<Skip>,
}

impl LoweringReport {
    pub fn lowered(&mut self, pass: PassName, node: impl Into<String>, target: impl ToString) {
        let entry = Lowered { pass, node: node.into(), target: target.to_string() };
        tracing::debug!(pass = %entry.pass, node = %entry.node, target = %entry.target, "lowered pattern");
        self.lowered.push(entry);
    }

    pub fn skip(&mut self, pass: PassName, node: impl Into<String>, reason: SkipReason) {
        let entry = Skip { pass, node: node.into(), reason };
        tracing::warn!(pass = %entry.pass, node = %entry.node, reason = %entry.reason, "pattern found but not lowered");
        self.skipped.push(entry);
    }

    pub fn extend(&mut self, other: LoweringReport) {
        self.lowered.extend(other.lowered);
        self.skipped.extend(other.skipped);
    }

    pub fn is_empty(&self) -> bool {
        self.lowered.is_empty() && self.skipped.is_empty()
    }

    pub fn lowered_by(&self, pass: PassName) -> impl Iterator<Item = &Lowered> {
        self.lowered.iter().filter(move |entry| entry.pass == pass)
    }
}
