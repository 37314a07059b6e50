//! Construction of fused native modules from reference modules.
//!
//! A reference module keeps a float weight together with the parameters it is
//! quantized with on every forward (`weight_scale`, `weight_zero_point`,
//! `weight_dtype`). The fused module stores the weight already quantized and
//! the output quantization parameters taken from the quantize node the
//! reference module fed.

use qlower_dtype::DType;
use qlower_ir::{Module, ModuleType, ParamValue, QParams, Tensor};

use crate::error::*;

/// Contract every fused module type exposes: build the fused instance from the
/// reference instance and the output quantization parameters.
pub type FromReference = fn(&Module, &ModuleType, QParams) -> Result<Module>;

const WEIGHT: &str = "weight";
const WEIGHT_SCALE: &str = "weight_scale";
const WEIGHT_ZERO_POINT: &str = "weight_zero_point";
const WEIGHT_DTYPE: &str = "weight_dtype";

/// Attribute names of the output quantization parameters on fused modules.
pub const SCALE: &str = "scale";
pub const ZERO_POINT: &str = "zero_point";

/// Weighted modules (linear, convolutions): quantize the weight once, keep the
/// remaining attributes (bias, hyper-parameters) as they are.
pub fn weighted_from_reference(reference: &Module, lowered: &ModuleType, output: QParams) -> Result<Module> {
    let fail = |reason: &str| FromReferenceSnafu { module_type: lowered.clone(), reason }.build();

    let weight = reference.attr(WEIGHT).and_then(ParamValue::as_tensor).ok_or_else(|| fail("missing float weight"))?;
    let scale = reference.attr(WEIGHT_SCALE).and_then(ParamValue::as_f64).ok_or_else(|| fail("missing weight scale"))?;
    let zero_point =
        reference.attr(WEIGHT_ZERO_POINT).and_then(ParamValue::as_i64).ok_or_else(|| fail("missing weight zero point"))?;
    let dtype = reference.attr(WEIGHT_DTYPE).and_then(ParamValue::as_dtype).unwrap_or(DType::QInt8);
    if !dtype.is_quantized() {
        return Err(fail(&format!("weight dtype {dtype} is not a quantized type")));
    }

    let qparams = QParams::new(scale, zero_point);
    let data = weight.data.iter().map(|&w| quantize_scalar(w, qparams, dtype)).collect();
    let qweight = Tensor::quantized(dtype, weight.shape.iter().copied(), data, qparams);

    let mut module = Module::new(lowered.clone()).with_attr(WEIGHT, qweight);
    for (name, value) in reference.attrs() {
        if !matches!(name.as_str(), WEIGHT | WEIGHT_SCALE | WEIGHT_ZERO_POINT | WEIGHT_DTYPE) {
            module.set_attr(name.clone(), value.clone());
        }
    }
    Ok(with_output_qparams(module, output))
}

/// Fused modules hold the reference module as child `"0"`; the fused native
/// module absorbs the trailing activation.
pub fn fused_from_reference(reference: &Module, lowered: &ModuleType, output: QParams) -> Result<Module> {
    let inner = reference
        .child("0")
        .ok_or_else(|| FromReferenceSnafu { module_type: lowered.clone(), reason: "fused module has no child \"0\"" }.build())?;
    weighted_from_reference(inner, lowered, output)
}

/// Normalization layers carry no quantized weight: copy every attribute.
pub fn batch_norm_from_reference(reference: &Module, lowered: &ModuleType, output: QParams) -> Result<Module> {
    let mut module = Module::new(lowered.clone());
    for (name, value) in reference.attrs() {
        module.set_attr(name.clone(), value.clone());
    }
    Ok(with_output_qparams(module, output))
}

fn with_output_qparams(module: Module, output: QParams) -> Module {
    module.with_attr(SCALE, output.scale).with_attr(ZERO_POINT, output.zero_point)
}

/// Affine quantization of one value, rounding half to even and clamping to the
/// storage range of `dtype`.
pub fn quantize_scalar(value: f64, qparams: QParams, dtype: DType) -> f64 {
    let q = (value / qparams.scale).round_ties_even() + qparams.zero_point as f64;
    match dtype.quantized_range() {
        Some((lo, hi)) => q.clamp(lo as f64, hi as f64),
        None => q,
    }
}

pub fn dequantize_scalar(value: f64, qparams: QParams) -> f64 {
    (value - qparams.zero_point as f64) * qparams.scale
}
