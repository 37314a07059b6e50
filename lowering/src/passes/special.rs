//! Removal of the conversions around quantization-transparent operators.
//!
//! Handles `quantize(op(dequantize(x)), ...)` and `op(dequantize(x)).to(float16)`
//! where `op` computes in the representation of its input: pooling, shape
//! manipulation, bounded activations, concatenation over a list of dequantized
//! inputs, and normalization modules that are swapped for quantized ones.

use itertools::Itertools;
use smallvec::SmallVec;
use snafu::OptionExt;

use qlower_ir::{Arg, GraphModule, NodeId, Op, PassName, QParams, QualifiedName};

use crate::config::{LoweringConfig, ModuleLowering};
use crate::error::*;
use crate::passes::module::{call_sites, output_qparams, swap_module};
use crate::report::{LoweringReport, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Quantize,
    ReducedFloat,
}

/// A validated conversion site, not yet rewritten.
struct Site<'a> {
    n: NodeId,
    n_name: String,
    reference: NodeId,
    dequantizes: SmallVec<[NodeId; 4]>,
    /// Operands of `n` after the converted value.
    trailing: SmallVec<[NodeId; 4]>,
    target: String,
    swap: Option<Swap<'a>>,
}

/// Registry replacement the site needs before it can be rewritten.
struct Swap<'a> {
    path: QualifiedName,
    lowering: &'a ModuleLowering,
    output: QParams,
}

#[tracing::instrument(skip_all)]
pub fn special_pattern_replacement(gm: &mut GraphModule, config: &LoweringConfig) -> Result<LoweringReport> {
    let mut report = LoweringReport::default();
    for n in gm.graph.node_ids() {
        if !gm.graph.contains(n) {
            continue;
        }
        let Some(site) = plan_site(gm, config, n, &mut report) else {
            continue;
        };
        if site.swap.is_some() {
            lower_module_sites(gm, config, site, &mut report)?;
        } else {
            rewrite_site(gm, site, &mut report)?;
        }
    }
    gm.recompile();
    Ok(report)
}

fn classify(config: &LoweringConfig, gm: &GraphModule, n: NodeId) -> Option<Conversion> {
    let node = &gm.graph[n];
    let conversions = &config.conversions;
    if node.is_call_function(&conversions.quantize) {
        Some(Conversion::Quantize)
    } else if node.is_call_method(&conversions.to)
        && node.arg(1).and_then(Arg::as_dtype) == Some(conversions.reduced_float)
    {
        Some(Conversion::ReducedFloat)
    } else {
        None
    }
}

/// The dequantize nodes feeding operand 0 of `reference`, deduplicated, or
/// `None` when operand 0 is not entirely made of them.
fn feeding_dequantizes(config: &LoweringConfig, gm: &GraphModule, reference: NodeId) -> Option<SmallVec<[NodeId; 4]>> {
    let is_dequantize = |arg: &Arg| {
        arg.as_node().filter(|&id| gm.graph[id].is_call_method(&config.conversions.dequantize))
    };
    let operand = gm.graph[reference].arg(0)?;
    match operand {
        Arg::Node(_) => is_dequantize(operand).map(|dq| SmallVec::from_elem(dq, 1)),
        Arg::List(items) => {
            let nodes: Option<SmallVec<[NodeId; 4]>> = items.iter().map(is_dequantize).collect();
            nodes.filter(|nodes| !nodes.is_empty()).map(|nodes| nodes.into_iter().unique().collect())
        }
        Arg::Lit(_) => None,
    }
}

/// Validates the conversion site at `n` without touching the graph, recording a
/// skip for unsupported variants.
fn plan_site<'a>(
    gm: &GraphModule,
    config: &'a LoweringConfig,
    n: NodeId,
    report: &mut LoweringReport,
) -> Option<Site<'a>> {
    let conversion = classify(config, gm, n)?;
    let reference = gm.graph[n].arg_node(0)?;
    let n_name = gm.graph[n].name().to_string();

    if conversion == Conversion::ReducedFloat && config.is_fixed_range(gm, &gm.graph[reference]) {
        report.skip(PassName::SpecialPattern, n_name, SkipReason::FixedRangeReducedFloat);
        return None;
    }
    if !config.special_ops.contains(&gm.modules, &gm.graph[reference]) {
        return None;
    }
    let dequantizes = feeding_dequantizes(config, gm, reference)?;

    if let Some(&shared) = dequantizes.iter().find(|&&dq| gm.graph[dq].users().iter().any(|&user| user != reference)) {
        let node = gm.graph[shared].name().to_string();
        report.skip(PassName::SpecialPattern, n_name, SkipReason::SharedDequantize { node });
        return None;
    }
    if gm.graph[reference].users().iter().any(|&user| user != n) {
        let node = gm.graph[reference].name().to_string();
        report.skip(PassName::SpecialPattern, n_name, SkipReason::SharedReference { node });
        return None;
    }
    let non_node = dequantizes.iter().find_map(|&dq| match gm.graph[dq].arg(0) {
        Some(Arg::Node(_)) => None,
        other => Some(other.map(ToString::to_string).unwrap_or_default()),
    });
    if let Some(operand) = non_node {
        report.skip(PassName::SpecialPattern, n_name, SkipReason::NonNodeOperand { operand });
        return None;
    }

    let mut target = gm.graph[reference].op().target().unwrap_or_default();
    let lowering = match (gm.graph[reference].op(), conversion) {
        (Op::CallModule(path), Conversion::Quantize) => gm
            .modules
            .module_type(path)
            .and_then(|ty| config.special_module(ty))
            .map(|lowering| (path.clone(), lowering)),
        _ => None,
    };
    let swap = match lowering {
        Some((path, lowering)) => {
            let output = match (gm.graph[n].arg_node(1), gm.graph[n].arg_node(2)) {
                (Some(s), Some(z)) if gm.graph[s].is_get_attr() && gm.graph[z].is_get_attr() => output_qparams(gm, s, z),
                _ => {
                    report.skip(PassName::SpecialPattern, n_name, SkipReason::NonAttributeQParams);
                    return None;
                }
            };
            let Some(output) = output else {
                report.skip(PassName::SpecialPattern, n_name, SkipReason::NonScalarQParams);
                return None;
            };
            target = lowering.lowered.to_string();
            Some(Swap { path, lowering, output })
        }
        None => None,
    };

    let trailing = gm.graph[n].args().iter().skip(1).flat_map(Arg::nodes).unique().collect();
    Some(Site { n, n_name, reference, dequantizes, trailing, target, swap })
}

/// Swaps the module behind `site` once, then rewrites every call site of it.
///
/// All call sites of the module must be lowerable with the same output
/// parameters; otherwise the module and all its sites are left alone.
fn lower_module_sites<'a>(
    gm: &mut GraphModule,
    config: &'a LoweringConfig,
    site: Site<'a>,
    report: &mut LoweringReport,
) -> Result<()> {
    let Some(swap) = &site.swap else {
        return rewrite_site(gm, site, report);
    };
    let (path, lowering, output) = (swap.path.clone(), swap.lowering, swap.output);

    // Peers are visited again by the caller when this group is rejected, so
    // their own skips are not recorded here.
    let mut scratch = LoweringReport::default();
    let mut peers = Vec::new();
    for call in call_sites(gm, &path) {
        if call == site.reference {
            continue;
        }
        let peer = match gm.graph[call].users() {
            [user] => plan_site(gm, config, *user, &mut scratch),
            _ => None,
        };
        match peer {
            Some(peer) if peer.reference == call && peer.swap.as_ref().is_some_and(|swap| swap.path == path) => {
                peers.push(peer)
            }
            _ => {
                report.skip(PassName::SpecialPattern, site.n_name, SkipReason::SharedModule { path: path.to_string() });
                return Ok(());
            }
        }
    }
    if peers.iter().any(|peer| peer.swap.as_ref().is_some_and(|swap| swap.output != output)) {
        report.skip(PassName::SpecialPattern, site.n_name, SkipReason::ConflictingQParams { path: path.to_string() });
        return Ok(());
    }

    let lowered = (lowering.from_reference)(gm.modules.resolve(&path)?, &lowering.lowered, output)?;
    swap_module(gm, &path, lowered)?;
    for site in std::iter::once(site).chain(peers) {
        rewrite_site(gm, site, report)?;
    }
    Ok(())
}

fn rewrite_site(gm: &mut GraphModule, site: Site<'_>, report: &mut LoweringReport) -> Result<()> {
    for &dq in &site.dequantizes {
        // Read at rewrite time: an earlier site of the same module may have rewired it.
        let input = gm.graph[dq].arg_node(0).context(SiteChangedSnafu { node: site.n_name.clone() })?;
        gm.graph.elide(dq, input)?;
    }
    gm.graph.elide(site.n, site.reference)?;
    for operand in site.trailing {
        gm.graph.erase_if_unused(operand)?;
    }

    report.lowered(PassName::SpecialPattern, site.n_name, site.target);
    Ok(())
}
