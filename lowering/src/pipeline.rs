//! Entry point: the four passes in order, then the final lint.

use qlower_ir::{GraphModule, PassName};

use crate::config::LoweringConfig;
use crate::error::*;
use crate::passes::{apply_subgraph_rewrites, lower_weighted_ref_functional, lower_weighted_ref_module, special_pattern_replacement};
use crate::report::LoweringReport;

/// Lowers every reference quantized pattern in `gm` to its fused native form.
///
/// Each pass runs exactly once:
///
/// 1. [`lower_weighted_ref_module`] swaps reference modules for fused ones
/// 2. [`lower_weighted_ref_functional`] packs weights of functional calls
/// 3. [`apply_subgraph_rewrites`] runs the configured pattern/replacement pairs
/// 4. [`special_pattern_replacement`] drops conversions around transparent ops
///
/// The graph module is linted afterwards; any invariant violation is returned
/// as [`LowerError::Graph`]. Sites that match structurally but use an
/// unsupported variant are left in place and listed in the report.
#[tracing::instrument(skip_all, fields(nodes = gm.graph.len()))]
pub fn lower_to_native_backend(gm: &mut GraphModule, config: &LoweringConfig) -> Result<LoweringReport> {
    let mut report = LoweringReport::default();

    report.extend(lower_weighted_ref_module(gm, config)?);
    dump(gm, config, PassName::LowerModule);

    report.extend(lower_weighted_ref_functional(gm, config)?);
    dump(gm, config, PassName::LowerFunctional);

    report.extend(apply_subgraph_rewrites(gm, config)?);
    dump(gm, config, PassName::SubgraphRewrite);

    report.extend(special_pattern_replacement(gm, config)?);
    dump(gm, config, PassName::SpecialPattern);

    gm.lint()?;
    tracing::debug!(lowered = report.lowered.len(), skipped = report.skipped.len(), nodes = gm.graph.len(), "lowering finished");
    Ok(report)
}

fn dump(gm: &GraphModule, config: &LoweringConfig, stage: PassName) {
    if config.dump_graphs {
        tracing::debug!(graph = gm.code(), "after {stage}");
    }
}
