//! Graph builders for the reference patterns the passes lower.

use qlower_dtype::DType;
use qlower_ir::{Arg, Graph, GraphModule, Literal, Module, ModuleTree, NodeId, ParamStore, QParams, Tensor};

use crate::catalog::{function, method, module};

/// Quantization parameters of every graph input.
pub const INPUT_QPARAMS: QParams = QParams { scale: 0.1, zero_point: 8 };
/// Output quantization parameters stored for every lowered site.
pub const OUTPUT_QPARAMS: QParams = QParams { scale: 0.05, zero_point: 10 };

pub const IN_FEATURES: usize = 3;
pub const OUT_FEATURES: usize = 2;

pub fn float_weight() -> Tensor {
    Tensor::new(DType::Float32, [OUT_FEATURES, IN_FEATURES], vec![0.31, -0.52, 0.07, -0.18, 0.44, 0.9])
}

pub fn float_bias() -> Tensor {
    Tensor::new(DType::Float32, [OUT_FEATURES], vec![0.125, -0.3])
}

/// Quantized graph input holding `data` as its integer representation.
pub fn quantized_input(data: Vec<f64>) -> Tensor {
    Tensor::quantized(DType::QUInt8, [data.len()], data, INPUT_QPARAMS)
}

pub fn reference_linear() -> Module {
    Module::new(module::REFERENCE_LINEAR)
        .with_attr("weight", float_weight())
        .with_attr("bias", float_bias())
        .with_attr("weight_scale", 0.02)
        .with_attr("weight_zero_point", 0i64)
        .with_attr("weight_dtype", DType::QInt8)
}

fn output_params(params: &mut ParamStore, prefix: &str, qparams: QParams) {
    params.insert(format!("{prefix}_scale_0").as_str(), qparams.scale);
    params.insert(format!("{prefix}_zero_point_0").as_str(), qparams.zero_point);
}

/// Appends `quantize(value, scale, zero_point, dtype)` reading the output
/// parameters stored under `prefix`; returns `(scale, zero_point, quantize)`.
fn quantize_output(graph: &mut Graph, value: NodeId, prefix: &str, dtype: DType) -> (NodeId, NodeId, NodeId) {
    let scale = graph.get_attr(format!("{prefix}_scale_0").as_str()).unwrap();
    let zero_point = graph.get_attr(format!("{prefix}_zero_point_0").as_str()).unwrap();
    let q = graph
        .call_function(function::QUANTIZE_PER_TENSOR, [value.into(), scale.into(), zero_point.into(), dtype.into()])
        .unwrap();
    (scale, zero_point, q)
}

/// Node handles of a `quantize(Module(dequantize(x)))` site.
pub struct ModuleSite {
    pub gm: GraphModule,
    pub x: NodeId,
    pub dq: NodeId,
    pub call: NodeId,
    pub scale: NodeId,
    pub zero_point: NodeId,
    pub q: NodeId,
    pub out: NodeId,
}

/// `x -> dequantize -> linear(instance) -> quantize(_, scale, zero_point, output_dtype) -> output`.
pub fn module_site(instance: Module, output_dtype: DType) -> ModuleSite {
    let mut graph = Graph::new();
    let x = graph.placeholder("x").unwrap();
    let dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let call = graph.call_module("linear", [dq.into()]).unwrap();
    let (scale, zero_point, q) = quantize_output(&mut graph, call, "linear", output_dtype);
    let out = graph.output(q).unwrap();

    let modules = ModuleTree::new(Module::new("GraphModule").with_child("linear", instance));
    let mut params = ParamStore::new();
    output_params(&mut params, "linear", OUTPUT_QPARAMS);

    ModuleSite { gm: GraphModule::new(graph, modules, params), x, dq, call, scale, zero_point, q, out }
}

/// Reference linear module site with an 8-bit unsigned output.
pub fn linear_module_site() -> ModuleSite {
    module_site(reference_linear(), DType::QUInt8)
}

/// Fused linear+relu whose child `"0"` is `inner`.
pub fn linear_relu_module_site(inner: Module) -> ModuleSite {
    module_site(Module::new(module::LINEAR_RELU).with_child("0", inner), DType::QUInt8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Positional,
    Keyword,
    Absent,
}

/// Node handles of a `quantize(F.linear(dequantize(x), dequantize(w_q), bias))` site.
pub struct FunctionalSite {
    pub gm: GraphModule,
    pub x: NodeId,
    pub quantized_weight: NodeId,
    pub bias: Option<NodeId>,
    pub input_dq: NodeId,
    pub weight_dq: NodeId,
    pub func: NodeId,
    pub relu: Option<NodeId>,
    pub scale: NodeId,
    pub zero_point: NodeId,
    pub q: NodeId,
    pub out: NodeId,
}

/// Functional linear site.
///
/// A quantized `weight_dtype` quantizes the float weight in the graph; any
/// other dtype reads an already converted weight of that dtype from the
/// parameter store. The bias is read after the weight conversion, so the pack
/// call belongs after the bias.
pub fn functional_site(bias: Bias, relu: bool, weight_dtype: DType) -> FunctionalSite {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();

    let x = graph.placeholder("x").unwrap();
    let quantized_weight = if weight_dtype.is_quantized() {
        let w = graph.get_attr("w").unwrap();
        let w_scale = graph.get_attr("w_scale").unwrap();
        let w_zero_point = graph.get_attr("w_zero_point").unwrap();
        params.insert("w", float_weight());
        params.insert("w_scale", 0.02);
        params.insert("w_zero_point", 0i64);
        graph
            .call_function(
                function::QUANTIZE_PER_TENSOR,
                [w.into(), w_scale.into(), w_zero_point.into(), weight_dtype.into()],
            )
            .unwrap()
    } else {
        let mut stored = float_weight();
        stored.dtype = weight_dtype;
        params.insert("w_converted", stored);
        graph.get_attr("w_converted").unwrap()
    };

    let bias_node = match bias {
        Bias::Absent => None,
        Bias::Positional | Bias::Keyword => {
            params.insert("b", float_bias());
            Some(graph.get_attr("b").unwrap())
        }
    };

    let input_dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let weight_dq = graph.call_method(method::DEQUANTIZE, [quantized_weight.into()]).unwrap();
    let operands = [Arg::Node(input_dq), Arg::Node(weight_dq)];
    let func = match (bias, bias_node) {
        (Bias::Positional, Some(b)) => {
            graph.call_function(function::LINEAR, operands.into_iter().chain([Arg::Node(b)])).unwrap()
        }
        (Bias::Keyword, Some(b)) => {
            graph.call_function_with_kwargs(function::LINEAR, operands, [("bias".to_string(), Arg::Node(b))]).unwrap()
        }
        _ => graph.call_function(function::LINEAR, operands).unwrap(),
    };
    let relu = relu.then(|| graph.call_function(function::RELU, [func.into()]).unwrap());

    let (scale, zero_point, q) = quantize_output(&mut graph, relu.unwrap_or(func), "linear", DType::QUInt8);
    output_params(&mut params, "linear", OUTPUT_QPARAMS);
    let out = graph.output(q).unwrap();

    FunctionalSite {
        gm: GraphModule::new(graph, ModuleTree::default(), params),
        x,
        quantized_weight,
        bias: bias_node,
        input_dq,
        weight_dq,
        func,
        relu,
        scale,
        zero_point,
        q,
        out,
    }
}

/// Node handles of a single-conversion site around a transparent operator.
pub struct SpecialSite {
    pub gm: GraphModule,
    pub inputs: Vec<NodeId>,
    pub dequantizes: Vec<NodeId>,
    pub reference: NodeId,
    pub conversion: NodeId,
    pub out: NodeId,
}

/// How the result of the transparent operator leaves the float domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quantize,
    ToFloat16,
}

fn exit(graph: &mut Graph, params: &mut ParamStore, value: NodeId, exit: Exit, qparams: QParams) -> NodeId {
    match exit {
        Exit::Quantize => {
            output_params(params, "out", qparams);
            quantize_output(graph, value, "out", DType::QUInt8).2
        }
        Exit::ToFloat16 => graph.call_method(method::TO, [value.into(), DType::Float16.into()]).unwrap(),
    }
}

/// `x -> dequantize -> sigmoid -> exit`.
pub fn sigmoid_site(how: Exit) -> SpecialSite {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.placeholder("x").unwrap();
    let dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let reference = graph.call_function(function::SIGMOID, [dq.into()]).unwrap();
    let conversion = exit(&mut graph, &mut params, reference, how, crate::test::eval::SIGMOID_QPARAMS);
    let out = graph.output(conversion).unwrap();

    SpecialSite {
        gm: GraphModule::new(graph, ModuleTree::default(), params),
        inputs: vec![x],
        dequantizes: vec![dq],
        reference,
        conversion,
        out,
    }
}

/// `x -> dequantize -> relu -> quantize` with the output parameters of the input.
pub fn relu_site() -> SpecialSite {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.placeholder("x").unwrap();
    let dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let reference = graph.call_function(function::RELU, [dq.into()]).unwrap();
    let conversion = exit(&mut graph, &mut params, reference, Exit::Quantize, INPUT_QPARAMS);
    let out = graph.output(conversion).unwrap();

    SpecialSite {
        gm: GraphModule::new(graph, ModuleTree::default(), params),
        inputs: vec![x],
        dequantizes: vec![dq],
        reference,
        conversion,
        out,
    }
}

pub fn batch_norm() -> Module {
    Module::new(module::BATCH_NORM2D)
        .with_attr("running_mean", 0.5)
        .with_attr("running_var", 2.0)
        .with_attr("eps", 1e-5)
        .with_attr("weight", 1.5)
        .with_attr("bias", -0.25)
}

/// `x -> dequantize -> bn(BatchNorm2d) -> quantize`.
pub fn batch_norm_site() -> SpecialSite {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.placeholder("x").unwrap();
    let dq = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let reference = graph.call_module("bn", [dq.into()]).unwrap();
    let conversion = exit(&mut graph, &mut params, reference, Exit::Quantize, OUTPUT_QPARAMS);
    let out = graph.output(conversion).unwrap();

    let modules = ModuleTree::new(Module::new("GraphModule").with_child("bn", batch_norm()));
    SpecialSite {
        gm: GraphModule::new(graph, modules, params),
        inputs: vec![x],
        dequantizes: vec![dq],
        reference,
        conversion,
        out,
    }
}

/// `cat([x.dequantize(), y.dequantize()]) -> quantize` over inputs sharing parameters.
pub fn cat_site() -> SpecialSite {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.placeholder("x").unwrap();
    let y = graph.placeholder("y").unwrap();
    let dq_x = graph.call_method(method::DEQUANTIZE, [x.into()]).unwrap();
    let dq_y = graph.call_method(method::DEQUANTIZE, [y.into()]).unwrap();
    let reference = graph.call_function(function::CAT, [Arg::List(vec![dq_x.into(), dq_y.into()]), Literal::Int(0).into()]).unwrap();
    let conversion = exit(&mut graph, &mut params, reference, Exit::Quantize, INPUT_QPARAMS);
    let out = graph.output(conversion).unwrap();

    SpecialSite {
        gm: GraphModule::new(graph, ModuleTree::default(), params),
        inputs: vec![x, y],
        dequantizes: vec![dq_x, dq_y],
        reference,
        conversion,
        out,
    }
}

/// Two `quantize(path(dequantize(input)))` sites calling the same module.
pub struct SharedModuleSites {
    pub gm: GraphModule,
    pub inputs: [NodeId; 2],
    pub dequantizes: [NodeId; 2],
    pub calls: [NodeId; 2],
    pub conversions: [NodeId; 2],
}

/// Inputs `x` and `y` each run through `instance` at `path`; the first site
/// quantizes with [`OUTPUT_QPARAMS`], the second with `second`. Both results
/// are returned as a list.
pub fn shared_module_sites(path: &str, instance: Module, second: QParams) -> SharedModuleSites {
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    output_params(&mut params, "first", OUTPUT_QPARAMS);
    output_params(&mut params, "second", second);

    let x = graph.placeholder("x").unwrap();
    let y = graph.placeholder("y").unwrap();
    let mut site = |input: NodeId, prefix: &str| {
        let dq = graph.call_method(method::DEQUANTIZE, [input.into()]).unwrap();
        let call = graph.call_module(path, [dq.into()]).unwrap();
        let (_, _, q) = quantize_output(&mut graph, call, prefix, DType::QUInt8);
        (dq, call, q)
    };
    let (dq_x, call_x, q_x) = site(x, "first");
    let (dq_y, call_y, q_y) = site(y, "second");
    graph.output(Arg::List(vec![q_x.into(), q_y.into()])).unwrap();

    let modules = ModuleTree::new(Module::new("GraphModule").with_child(path, instance));
    SharedModuleSites {
        gm: GraphModule::new(graph, modules, params),
        inputs: [x, y],
        dequantizes: [dq_x, dq_y],
        calls: [call_x, call_y],
        conversions: [q_x, q_y],
    }
}

/// Live nodes whose target is `target`.
pub fn count_target(gm: &GraphModule, target: &str) -> usize {
    gm.graph.nodes().filter(|node| node.op().target().as_deref() == Some(target)).count()
}

pub fn names(gm: &GraphModule) -> Vec<String> {
    gm.graph.nodes().map(|node| node.name().to_string()).collect()
}
