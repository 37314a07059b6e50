//! Lowering of `quantize([activation](f(dequantize(x), dequantize(w)[, bias])), scale, zero_point, dtype)`.
//!
//! The weight is packed once by a prepack call and the whole chain collapses
//! into one fused call `f_q(x, packed, scale, zero_point)`.

use std::collections::BTreeMap;

use snafu::ensure;

use qlower_dtype::DType;
use qlower_ir::{Arg, Function, GraphModule, Literal, NodeId, Op, PassName, Pattern, match_pattern};

use crate::catalog::function;
use crate::config::{FunctionalLowering, LoweringConfig};
use crate::error::*;
use crate::report::{LoweringReport, SkipReason};

const BIAS: &str = "bias";

/// One of the four shapes a functional site can take.
#[derive(Debug, Clone, Copy)]
struct Variant {
    with_activation: bool,
    positional_bias: bool,
}

impl Variant {
    fn all() -> impl Iterator<Item = Variant> {
        [false, true].into_iter().flat_map(|with_activation| {
            [false, true].into_iter().map(move |positional_bias| Variant { with_activation, positional_bias })
        })
    }
}

#[tracing::instrument(skip_all)]
pub fn lower_weighted_ref_functional(gm: &mut GraphModule, config: &LoweringConfig) -> Result<LoweringReport> {
    let mut report = LoweringReport::default();
    for lowering in &config.functionals {
        for variant in Variant::all() {
            let fused = match (variant.with_activation, &lowering.lowered_with_activation) {
                (false, _) => &lowering.lowered,
                (true, Some(fused)) => fused,
                (true, None) => continue,
            };
            lower_variant(gm, config, lowering, variant, fused, &mut report)?;
        }
    }
    gm.recompile();
    Ok(report)
}

fn site_pattern(config: &LoweringConfig, lowering: &FunctionalLowering, variant: Variant) -> Pattern {
    let dequantize = || Pattern::method(config.conversions.dequantize.clone());
    let mut operands = vec![dequantize().named("input_dq"), dequantize().named("weight_dq")];
    if variant.positional_bias {
        operands.push(Pattern::any().named(BIAS));
    }
    let call = Pattern::function(lowering.reference.clone()).with_operands(operands).named("func");
    let body = if variant.with_activation {
        Pattern::function(lowering.activation.clone()).with_operands([call]).named("activation")
    } else {
        call
    };
    Pattern::function(config.conversions.quantize.clone()).with_operands([
        body,
        Pattern::any().named("scale"),
        Pattern::any().named("zero_point"),
        Pattern::any(),
    ])
}

fn lower_variant(
    gm: &mut GraphModule,
    config: &LoweringConfig,
    lowering: &FunctionalLowering,
    variant: Variant,
    fused: &Function,
    report: &mut LoweringReport,
) -> Result<()> {
    let pattern = site_pattern(config, lowering, variant);

    for q in gm.graph.node_ids() {
        if !gm.graph.contains(q) {
            continue;
        }
        let Some(bindings) = match_pattern(&gm.modules, &gm.graph, q, &pattern) else {
            continue;
        };
        let q_name = gm.graph[q].name().to_string();
        let (Some(func), Some(input_dq), Some(weight_dq)) =
            (bindings.node("func"), bindings.node("input_dq"), bindings.node("weight_dq"))
        else {
            continue;
        };
        if input_dq == weight_dq {
            report.skip(PassName::LowerFunctional, q_name, SkipReason::SharedDequantize { node: gm.graph[input_dq].name().to_string() });
            continue;
        }
        let (Some(scale), Some(zero_point)) = (bindings.get("scale").cloned(), bindings.get("zero_point").cloned()) else {
            continue;
        };

        let (x, quantized_weight) = match (gm.graph[input_dq].arg(0), gm.graph[weight_dq].arg(0)) {
            (Some(Arg::Node(x)), Some(Arg::Node(w))) => (*x, *w),
            (x, w) => {
                let operand = [x, w].into_iter().flatten().find(|arg| arg.as_node().is_none());
                let operand = operand.map(ToString::to_string).unwrap_or_default();
                report.skip(PassName::LowerFunctional, q_name, SkipReason::NonNodeOperand { operand });
                continue;
            }
        };

        let bias = if variant.positional_bias { bindings.get(BIAS) } else { gm.graph[func].kwarg(BIAS) };
        let bias = bias.cloned().unwrap_or(Arg::Lit(Literal::None));

        let prepack = prepack_function(gm, &lowering.reference, quantized_weight)?;

        let pack_anchor = match bias.as_node() {
            Some(bias) => gm.graph.later_of(bias, quantized_weight)?,
            None => quantized_weight,
        };
        let packed = gm
            .graph
            .inserting_after(pack_anchor, |g| g.call_function(prepack, [Arg::Node(quantized_weight), bias]))?;

        let args = [Arg::Node(x), Arg::Node(packed), scale, zero_point];
        let call_anchor = args.iter().flat_map(Arg::nodes).try_fold(x, |latest, node| gm.graph.later_of(latest, node))?;
        let fused_call = gm.graph.inserting_after(call_anchor, |g| {
            g.create_node_preserving_meta(
                func,
                Op::CallFunction(fused.clone()),
                args,
                BTreeMap::new(),
                PassName::LowerFunctional,
            )
        })?;

        gm.graph.replace_all_uses_with(q, fused_call)?;
        gm.graph.elide(input_dq, x)?;
        gm.graph.elide(weight_dq, quantized_weight)?;

        gm.graph.erase_node(q)?;
        if let Some(activation) = bindings.node("activation") {
            gm.graph.erase_node(activation)?;
        }
        gm.graph.erase_node(func)?;

        report.lowered(PassName::LowerFunctional, q_name, fused);
    }
    Ok(())
}

/// Storage dtype of the quantized weight feeding a functional call.
///
/// Either the dtype operand of the conversion that produced it or the dtype
/// of a stored quantized tensor.
fn weight_dtype(gm: &GraphModule, weight: NodeId) -> Result<DType> {
    let node = &gm.graph[weight];
    let dtype = match node.op() {
        Op::CallFunction(_) | Op::CallMethod(_) => node
            .kwarg("dtype")
            .and_then(Arg::as_dtype)
            .or_else(|| node.args().iter().rev().find_map(Arg::as_dtype)),
        Op::GetAttr(_) => gm.attr_value(weight).ok().and_then(|value| value.dtype()),
        _ => None,
    };
    dtype.ok_or_else(|| UnknownWeightDTypeSnafu { node: node.name() }.build())
}

/// Pack operator for `reference` over the quantized weight `weight`.
///
/// Only linear has one; any other reference function is rejected before the
/// weight is inspected.
fn prepack_function(gm: &GraphModule, reference: &Function, weight: NodeId) -> Result<Function> {
    ensure!(reference == &function::LINEAR, UnsupportedFunctionalSnafu { function: reference.clone() });
    match weight_dtype(gm, weight)? {
        DType::Float16 => Ok(function::LINEAR_PREPACK_FP16),
        DType::QInt8 | DType::QUInt8 => Ok(function::LINEAR_PREPACK),
        dtype => UnsupportedWeightDTypeSnafu { dtype }.fail(),
    }
}
