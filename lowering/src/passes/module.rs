//! Lowering of `quantize(RefModule(dequantize(x)), scale, zero_point, dtype)`.
//!
//! The reference module is swapped in the registry for its fused native
//! counterpart, which consumes and produces quantized values, so both
//! conversions around the call disappear and the call node itself stays.

use smallvec::SmallVec;
use snafu::OptionExt;
use tracing::debug;

use qlower_ir::{GraphModule, ModuleType, NodeId, PassName, Pattern, QParams, QualifiedName, match_pattern};

use crate::config::LoweringConfig;
use crate::error::*;
use crate::reference::FromReference;
use crate::report::{LoweringReport, SkipReason};

/// One reference class the pass looks for.
struct Candidate<'a> {
    reference: &'a ModuleType,
    lowered: &'a ModuleType,
    /// Required type of child `"0"` for fused classes.
    inner_reference: Option<&'a ModuleType>,
    from_reference: FromReference,
}

#[tracing::instrument(skip_all)]
pub fn lower_weighted_ref_module(gm: &mut GraphModule, config: &LoweringConfig) -> Result<LoweringReport> {
    let plain = config.modules.iter().map(|lowering| Candidate {
        reference: &lowering.reference,
        lowered: &lowering.lowered,
        inner_reference: None,
        from_reference: lowering.from_reference,
    });
    let fused = config.fused_modules.iter().map(|lowering| Candidate {
        reference: &lowering.fused,
        lowered: &lowering.lowered,
        inner_reference: Some(&lowering.inner_reference),
        from_reference: lowering.from_reference,
    });

    let mut report = LoweringReport::default();
    for candidate in plain.chain(fused) {
        lower_class(gm, config, &candidate, &mut report)?;
        gm.recompile();
    }
    Ok(report)
}

/// A matched `quantize(Ref(dequantize(x)))` site, validated but not yet rewritten.
struct Site {
    q: NodeId,
    q_name: String,
    ref_node: NodeId,
    dq: NodeId,
    scale: NodeId,
    zero_point: NodeId,
    path: QualifiedName,
    output: QParams,
}

fn lower_class(
    gm: &mut GraphModule,
    config: &LoweringConfig,
    candidate: &Candidate<'_>,
    report: &mut LoweringReport,
) -> Result<()> {
    let conversions = &config.conversions;
    let pattern = Pattern::function(conversions.quantize.clone()).with_operands([
        Pattern::module(candidate.reference.clone())
            .with_operands([Pattern::method(conversions.dequantize.clone()).named("dq")])
            .named("ref"),
        Pattern::any().named("scale"),
        Pattern::any().named("zero_point"),
        Pattern::any().named("dtype"),
    ]);

    // The registry is only written once every site of the class is known, so
    // every call of a shared module is matched against its reference type.
    let mut groups: Vec<(QualifiedName, Vec<Site>)> = Vec::new();
    for q in gm.graph.node_ids() {
        let Some(site) = match_site(gm, config, candidate, &pattern, q, report)? else {
            continue;
        };
        match groups.iter_mut().find(|(path, _)| *path == site.path) {
            Some((_, sites)) => sites.push(site),
            None => groups.push((site.path.clone(), vec![site])),
        }
    }

    for (path, sites) in groups {
        if let Some(reason) = shared_module_conflict(gm, &path, &sites) {
            for site in sites {
                report.skip(PassName::LowerModule, site.q_name, reason.clone());
            }
            continue;
        }

        let lowered = (candidate.from_reference)(gm.modules.resolve(&path)?, candidate.lowered, sites[0].output)?;
        swap_module(gm, &path, lowered)?;

        for site in sites {
            // Re-read: an earlier site of the group may have rewired this input.
            let dq_input = gm.graph[site.dq].arg_node(0).context(SiteChangedSnafu { node: site.q_name.clone() })?;
            gm.graph.elide(site.dq, dq_input)?;
            gm.graph.elide(site.q, site.ref_node)?;
            gm.graph.erase_if_unused(site.scale)?;
            gm.graph.erase_if_unused(site.zero_point)?;
            report.lowered(PassName::LowerModule, site.q_name, candidate.lowered);
        }
    }
    Ok(())
}

/// Matches and validates the site rooted at `q`, recording a skip for
/// unsupported variants.
fn match_site(
    gm: &GraphModule,
    config: &LoweringConfig,
    candidate: &Candidate<'_>,
    pattern: &Pattern,
    q: NodeId,
    report: &mut LoweringReport,
) -> Result<Option<Site>> {
    if !gm.graph.contains(q) {
        return Ok(None);
    }
    let Some(bindings) = match_pattern(&gm.modules, &gm.graph, q, pattern) else {
        return Ok(None);
    };
    let q_name = gm.graph[q].name().to_string();
    let (Some(ref_node), Some(dq)) = (bindings.node("ref"), bindings.node("dq")) else {
        return Ok(None);
    };

    let (scale, zero_point) = match (bindings.node("scale"), bindings.node("zero_point")) {
        (Some(s), Some(z)) if gm.graph[s].is_get_attr() && gm.graph[z].is_get_attr() => (s, z),
        _ => {
            report.skip(PassName::LowerModule, q_name, SkipReason::NonAttributeQParams);
            return Ok(None);
        }
    };

    let output_dtype = config.conversions.output_dtype;
    let dtype = bindings.get("dtype").and_then(|arg| arg.as_dtype());
    if dtype != Some(output_dtype) {
        let found = bindings.get("dtype").map(ToString::to_string).unwrap_or_default();
        report.skip(PassName::LowerModule, q_name, SkipReason::UnsupportedOutputDType { expected: output_dtype, found });
        return Ok(None);
    }

    let Some(path) = gm.graph[ref_node].module_path().cloned() else {
        return Ok(None);
    };
    let reference = gm.modules.resolve(&path)?;

    if let Some(inner) = candidate.inner_reference {
        let found = reference.child("0").map(|child| child.ty());
        if found != Some(inner) {
            let found = found.map(ToString::to_string).unwrap_or_else(|| "nothing".to_string());
            report.skip(PassName::LowerModule, q_name, SkipReason::InnerModuleMismatch { expected: inner.clone(), found });
            return Ok(None);
        }
    }

    let Some(output) = output_qparams(gm, scale, zero_point) else {
        report.skip(PassName::LowerModule, q_name, SkipReason::NonScalarQParams);
        return Ok(None);
    };
    if gm.graph[dq].arg_node(0).is_none() {
        let operand = gm.graph[dq].arg(0).map(ToString::to_string).unwrap_or_default();
        report.skip(PassName::LowerModule, q_name, SkipReason::NonNodeOperand { operand });
        return Ok(None);
    }

    Ok(Some(Site { q, q_name, ref_node, dq, scale, zero_point, path, output }))
}

/// Why the module at `path` cannot be swapped for the lowered sites `sites`, if
/// anything prevents it.
fn shared_module_conflict(gm: &GraphModule, path: &QualifiedName, sites: &[Site]) -> Option<SkipReason> {
    let calls = call_sites(gm, path);
    if calls.iter().any(|call| !sites.iter().any(|site| site.ref_node == *call)) {
        return Some(SkipReason::SharedModule { path: path.to_string() });
    }
    if sites.iter().any(|site| site.output != sites[0].output) {
        return Some(SkipReason::ConflictingQParams { path: path.to_string() });
    }
    None
}

/// Every call-module node targeting `path`, in graph order.
pub(crate) fn call_sites(gm: &GraphModule, path: &QualifiedName) -> SmallVec<[NodeId; 4]> {
    gm.graph.nodes().filter(|node| node.module_path() == Some(path)).map(|node| node.id()).collect()
}

/// Reads `(scale, zero_point)` through the two attribute nodes.
pub(crate) fn output_qparams(gm: &GraphModule, scale: NodeId, zero_point: NodeId) -> Option<QParams> {
    let scale = gm.attr_value(scale).ok()?.as_f64()?;
    let zero_point = gm.attr_value(zero_point).ok()?.as_i64()?;
    Some(QParams::new(scale, zero_point))
}

pub(crate) fn swap_module(gm: &mut GraphModule, path: &QualifiedName, module: qlower_ir::Module) -> Result<()> {
    let ty = module.ty().clone();
    let replaced = gm.modules.insert(path, module)?;
    debug!(module = %path, from = ?replaced.map(|m| m.ty().to_string()), to = %ty, "swapped module");
    Ok(())
}
