use test_case::test_case;

use qlower_dtype::DType;
use qlower_ir::{
    Arg, Graph, GraphModule, Module, ModuleTree, ParamStore, ParamValue, PassName, QParams, QualifiedName, Tensor,
};

use crate::catalog::{function, method, module};
use crate::passes::lower_weighted_ref_module;
use crate::report::SkipReason;
use crate::test::eval::evaluate;
use crate::test::helpers::{
    INPUT_QPARAMS, OUTPUT_QPARAMS, count_target, linear_module_site, linear_relu_module_site, module_site, names,
    reference_linear, shared_module_sites,
};
use crate::{LoweringConfig, LoweringReport};

fn lower(gm: &mut GraphModule) -> LoweringReport {
    lower_weighted_ref_module(gm, &LoweringConfig::native_backend()).unwrap()
}

#[test]
fn test_reference_linear_is_swapped_in_place() {
    let mut site = linear_module_site();
    let report = lower(&mut site.gm);

    assert_eq!(names(&site.gm), ["x", "linear", "output"]);
    assert_eq!(site.gm.graph[site.call].args(), [Arg::Node(site.x)]);
    assert_eq!(site.gm.graph[site.out].args(), [Arg::Node(site.call)]);
    assert!(!site.gm.graph.contains(site.dq));
    assert!(!site.gm.graph.contains(site.q));
    assert!(!site.gm.graph.contains(site.scale));
    assert!(!site.gm.graph.contains(site.zero_point));
    site.gm.lint().unwrap();

    assert_eq!(report.lowered.len(), 1);
    assert_eq!(report.lowered[0].pass, PassName::LowerModule);
    assert_eq!(report.lowered[0].node, "quantize_per_tensor");
    assert_eq!(report.lowered[0].target, module::QUANTIZED_LINEAR.to_string());
    assert!(report.skipped.is_empty());
}

#[test]
fn test_swapped_module_carries_output_qparams() {
    let mut site = linear_module_site();
    lower(&mut site.gm);

    let lowered = site.gm.modules.get(&QualifiedName::parse("linear")).unwrap();
    assert_eq!(lowered.ty(), &module::QUANTIZED_LINEAR);
    assert_eq!(lowered.attr("scale"), Some(&ParamValue::Float(OUTPUT_QPARAMS.scale)));
    assert_eq!(lowered.attr("zero_point"), Some(&ParamValue::Int(OUTPUT_QPARAMS.zero_point)));

    let weight = lowered.attr("weight").and_then(ParamValue::as_tensor).unwrap();
    assert_eq!(weight.dtype, DType::QInt8);
    assert!(weight.data.iter().all(|q| q.fract() == 0.0));
    assert!(lowered.attr("weight_scale").is_none());
    assert!(lowered.attr("bias").is_some());
}

#[test]
fn test_listing_is_recompiled() {
    let mut site = linear_module_site();
    let before = site.gm.code().to_string();
    lower(&mut site.gm);

    assert_ne!(site.gm.code(), before);
    assert_eq!(site.gm.code(), site.gm.graph.to_string());
    assert!(!site.gm.code().contains("dequantize"));
}

#[test_case(DType::Float16 ; "half precision")]
#[test_case(DType::QInt8 ; "signed 8 bit")]
#[test_case(DType::QInt32 ; "32 bit")]
fn test_unsupported_output_dtype_is_skipped(dtype: DType) {
    let mut site = module_site(reference_linear(), dtype);
    let listing = site.gm.code().to_string();
    let report = lower(&mut site.gm);

    assert_eq!(site.gm.code(), listing);
    assert_eq!(site.gm.modules.module_type(&"linear".into()), Some(&module::REFERENCE_LINEAR));
    assert!(report.lowered.is_empty());
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::UnsupportedOutputDType { expected: DType::QUInt8, found: dtype.to_string() }
    );
}

#[test]
fn test_fused_module_lowers_to_fused_type() {
    let mut site = linear_relu_module_site(reference_linear());
    let report = lower(&mut site.gm);

    assert_eq!(names(&site.gm), ["x", "linear", "output"]);
    assert_eq!(site.gm.modules.module_type(&"linear".into()), Some(&module::QUANTIZED_LINEAR_RELU));
    assert_eq!(report.lowered[0].target, module::QUANTIZED_LINEAR_RELU.to_string());
}

#[test]
fn test_fused_module_with_other_inner_type_is_skipped() {
    let inner = Module::new(module::REFERENCE_CONV2D);
    let mut site = linear_relu_module_site(inner);
    let report = lower(&mut site.gm);

    assert_eq!(site.gm.modules.module_type(&"linear".into()), Some(&module::LINEAR_RELU));
    assert!(site.gm.graph.contains(site.dq));
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::InnerModuleMismatch {
            expected: module::REFERENCE_LINEAR,
            found: module::REFERENCE_CONV2D.to_string(),
        }
    );
}

#[test]
fn test_literal_qparams_are_skipped() {
    let mut graph = Graph::new();
    let x = graph.placeholder("x").unwrap();
    let dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let call = graph.call_module("linear", [dq.into()]).unwrap();
    let q = graph
        .call_function(function::QUANTIZE_PER_TENSOR, [call.into(), 0.05.into(), 10i64.into(), DType::QUInt8.into()])
        .unwrap();
    graph.output(q).unwrap();
    let modules = ModuleTree::new(Module::new("GraphModule").with_child("linear", reference_linear()));
    let mut gm = GraphModule::new(graph, modules, ParamStore::new());

    let report = lower(&mut gm);

    assert!(gm.graph.contains(dq));
    assert_eq!(report.skipped[0].reason, SkipReason::NonAttributeQParams);
}

#[test]
fn test_shared_dequantize_does_not_match() {
    let mut site = linear_module_site();
    site.gm.graph.call_method(method::RELU, [site.dq.into()]).unwrap();
    site.gm.recompile();

    let report = lower(&mut site.gm);

    assert!(report.is_empty());
    assert!(site.gm.graph.contains(site.q));
}

#[test]
fn test_shared_qparam_reads_survive_until_last_use() {
    let mut graph = Graph::new();
    let x = graph.placeholder("x").unwrap();
    let scale = graph.get_attr("shared_scale").unwrap();
    let zero_point = graph.get_attr("shared_zero_point").unwrap();
    let mut last = x;
    for path in ["first", "second"] {
        let dq = graph.call_method(method::DEQUANTIZE, [last.into()]).unwrap();
        let call = graph.call_module(path, [dq.into()]).unwrap();
        last = graph
            .call_function(function::QUANTIZE_PER_TENSOR, [call.into(), scale.into(), zero_point.into(), DType::QUInt8.into()])
            .unwrap();
    }
    graph.output(last).unwrap();

    let modules = ModuleTree::new(
        Module::new("GraphModule").with_child("first", reference_linear()).with_child("second", reference_linear()),
    );
    let mut params = ParamStore::new();
    params.insert("shared_scale", OUTPUT_QPARAMS.scale);
    params.insert("shared_zero_point", OUTPUT_QPARAMS.zero_point);
    let mut gm = GraphModule::new(graph, modules, params);

    let report = lower(&mut gm);

    assert_eq!(report.lowered.len(), 2);
    assert!(!gm.graph.contains(scale));
    assert!(!gm.graph.contains(zero_point));
    assert_eq!(names(&gm), ["x", "first", "second", "output"]);
    gm.lint().unwrap();
}

#[test]
fn test_lowered_graph_is_left_alone() {
    let mut site = linear_module_site();
    lower(&mut site.gm);
    let listing = site.gm.code().to_string();

    assert!(lower(&mut site.gm).is_empty());
    assert_eq!(site.gm.code(), listing);
}

fn linear_inputs() -> [Tensor; 2] {
    [
        Tensor::quantized(DType::QUInt8, [2, 3], vec![0.0, 8.0, 17.0, 255.0, 40.0, 3.0], INPUT_QPARAMS),
        Tensor::quantized(DType::QUInt8, [1, 3], vec![12.0, 200.0, 9.0], INPUT_QPARAMS),
    ]
}

#[test]
fn test_every_call_of_a_shared_module_is_lowered() {
    let mut sites = shared_module_sites("linear", reference_linear(), OUTPUT_QPARAMS);
    let inputs = linear_inputs();
    let expected = evaluate(&sites.gm, &inputs);

    let report = lower(&mut sites.gm);

    assert_eq!(report.lowered.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(sites.gm.modules.module_type(&"linear".into()), Some(&module::QUANTIZED_LINEAR));
    for (call, input) in sites.calls.into_iter().zip(sites.inputs) {
        assert_eq!(sites.gm.graph[call].args(), [Arg::Node(input)]);
    }
    assert!(sites.conversions.iter().all(|&q| !sites.gm.graph.contains(q)));
    assert_eq!(count_target(&sites.gm, method::DEQUANTIZE.as_str()), 0);
    sites.gm.lint().unwrap();
    assert_eq!(evaluate(&sites.gm, &inputs), expected);
}

#[test]
fn test_shared_module_with_conflicting_qparams_is_skipped() {
    let mut sites = shared_module_sites("linear", reference_linear(), QParams::new(0.2, 3));
    let listing = sites.gm.code().to_string();

    let report = lower(&mut sites.gm);

    assert_eq!(sites.gm.code(), listing);
    assert_eq!(sites.gm.modules.module_type(&"linear".into()), Some(&module::REFERENCE_LINEAR));
    assert!(report.lowered.is_empty());
    let reasons: Vec<_> = report.skipped.iter().map(|skip| skip.reason.clone()).collect();
    assert_eq!(reasons, vec![SkipReason::ConflictingQParams { path: "linear".to_string() }; 2]);
}

#[test]
fn test_module_with_float_caller_is_not_swapped() {
    let mut site = linear_module_site();
    let float_call = site
        .gm
        .graph
        .inserting_before(site.out, |g| {
            let z = g.placeholder("z")?;
            g.call_module("linear", [z.into()])
        })
        .unwrap();
    site.gm.graph.erase_node(site.out).unwrap();
    site.gm.graph.output(Arg::List(vec![site.q.into(), float_call.into()])).unwrap();
    site.gm.recompile();
    let listing = site.gm.code().to_string();

    let report = lower(&mut site.gm);

    assert_eq!(site.gm.code(), listing);
    assert_eq!(site.gm.modules.module_type(&"linear".into()), Some(&module::REFERENCE_LINEAR));
    assert_eq!(report.skipped[0].reason, SkipReason::SharedModule { path: "linear".to_string() });
}
