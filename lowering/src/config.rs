//! Lowering configuration table.
//!
//! Describes which reference patterns have fused native equivalents and how
//! to build them. [`LoweringConfig::native_backend`] is the table of the
//! native quantized backend; tests and embedders can build their own with
//! [`LoweringConfig::builder`].

use std::sync::Arc;

use bon::bon;
use derive_more::Debug;

use qlower_dtype::DType;
use qlower_ir::{Function, GraphModule, Method, ModuleTree, ModuleType, Node, Op};

use crate::catalog::{function, method, module};
use crate::passes::subgraph::{PatternReplacement, SubgraphRewriter};
use crate::reference::{FromReference, batch_norm_from_reference, fused_from_reference, weighted_from_reference};

/// Reference module type with a fused native counterpart.
#[derive(Debug, Clone)]
pub struct ModuleLowering {
    pub reference: ModuleType,
    pub lowered: ModuleType,
    #[debug(skip)]
    pub from_reference: FromReference,
}

impl ModuleLowering {
    pub fn new(reference: ModuleType, lowered: ModuleType, from_reference: FromReference) -> Self {
        Self { reference, lowered, from_reference }
    }
}

/// Fused module type whose child `"0"` must be `inner_reference`.
#[derive(Debug, Clone)]
pub struct FusedModuleLowering {
    pub fused: ModuleType,
    pub inner_reference: ModuleType,
    pub lowered: ModuleType,
    #[debug(skip)]
    pub from_reference: FromReference,
}

/// Reference function with its fused replacement and, optionally, the
/// replacement that also absorbs a following `activation` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalLowering {
    pub reference: Function,
    pub lowered: Function,
    pub lowered_with_activation: Option<Function>,
    pub activation: Function,
}

/// Operators identified by function identity, method name or module type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpSet {
    pub functions: Vec<Function>,
    pub methods: Vec<Method>,
    pub modules: Vec<ModuleType>,
}

impl OpSet {
    pub fn contains(&self, modules: &ModuleTree, node: &Node) -> bool {
        match node.op() {
            Op::CallFunction(f) => self.functions.contains(f),
            Op::CallMethod(m) => self.methods.contains(m),
            Op::CallModule(path) => modules.module_type(path).is_some_and(|ty| self.modules.contains(ty)),
            _ => false,
        }
    }
}

/// The conversion operators the passes look for.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversions {
    /// `quantize(value, scale, zero_point, dtype)`.
    pub quantize: Function,
    /// `value.dequantize()`.
    pub dequantize: Method,
    /// `value.to(dtype)`.
    pub to: Method,
    /// The only output representation fused modules support.
    pub output_dtype: DType,
    /// Target of the precision-reducing `to` conversion.
    pub reduced_float: DType,
}

impl Default for Conversions {
    fn default() -> Self {
        Self {
            quantize: function::QUANTIZE_PER_TENSOR,
            dequantize: method::DEQUANTIZE,
            to: method::TO,
            output_dtype: DType::QUInt8,
            reduced_float: DType::Float16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoweringConfig {
    pub conversions: Conversions,
    pub modules: Vec<ModuleLowering>,
    pub fused_modules: Vec<FusedModuleLowering>,
    pub functionals: Vec<FunctionalLowering>,
    /// Module swaps applied by the special-case pass (normalization layers).
    pub special_modules: Vec<ModuleLowering>,
    /// Operators with a fixed output range.
    pub fixed_range_ops: OpSet,
    /// Operators whose conversions the special-case pass may drop.
    pub special_ops: OpSet,
    pub subgraph_patterns: Vec<PatternReplacement>,
    #[debug(skip)]
    pub subgraph_rewriter: Option<Arc<dyn SubgraphRewriter>>,
    /// Emit the graph listing after every stage at debug level.
    pub dump_graphs: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self::native_backend()
    }
}

#[bon]
impl LoweringConfig {
    /// Create a lowering configuration with builder pattern.
    ///
    /// Every table defaults to the native backend's.
    #[builder]
    pub fn new(
        #[builder(default)] conversions: Conversions,
        #[builder(default = native_module_lowerings())] modules: Vec<ModuleLowering>,
        #[builder(default = native_fused_module_lowerings())] fused_modules: Vec<FusedModuleLowering>,
        #[builder(default = native_functional_lowerings())] functionals: Vec<FunctionalLowering>,
        #[builder(default = native_special_module_lowerings())] special_modules: Vec<ModuleLowering>,
        #[builder(default = native_fixed_range_ops())] fixed_range_ops: OpSet,
        #[builder(default = native_special_ops())] special_ops: OpSet,
        #[builder(default)] subgraph_patterns: Vec<PatternReplacement>,
        subgraph_rewriter: Option<Arc<dyn SubgraphRewriter>>,
        #[builder(default = false)] dump_graphs: bool,
    ) -> Self {
        Self {
            conversions,
            modules,
            fused_modules,
            functionals,
            special_modules,
            fixed_range_ops,
            special_ops,
            subgraph_patterns,
            subgraph_rewriter,
            dump_graphs,
        }
    }

    pub fn native_backend() -> Self {
        Self::builder().build()
    }

    /// Native backend table with overrides from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `QLOWER_DUMP_GRAPHS` - Set to any value to log the graph after every stage
    pub fn from_env() -> Self {
        Self::builder().dump_graphs(std::env::var("QLOWER_DUMP_GRAPHS").is_ok()).build()
    }

    /// Module swap for a module type in the special-case table.
    pub fn special_module(&self, ty: &ModuleType) -> Option<&ModuleLowering> {
        self.special_modules.iter().find(|lowering| &lowering.reference == ty)
    }

    /// Whether `node` is one of the fixed-range operators.
    pub fn is_fixed_range(&self, gm: &GraphModule, node: &Node) -> bool {
        self.fixed_range_ops.contains(&gm.modules, node)
    }
}

pub fn native_module_lowerings() -> Vec<ModuleLowering> {
    vec![
        ModuleLowering::new(module::REFERENCE_LINEAR, module::QUANTIZED_LINEAR, weighted_from_reference),
        ModuleLowering::new(module::REFERENCE_CONV1D, module::QUANTIZED_CONV1D, weighted_from_reference),
        ModuleLowering::new(module::REFERENCE_CONV2D, module::QUANTIZED_CONV2D, weighted_from_reference),
        ModuleLowering::new(module::REFERENCE_CONV3D, module::QUANTIZED_CONV3D, weighted_from_reference),
    ]
}

pub fn native_fused_module_lowerings() -> Vec<FusedModuleLowering> {
    vec![FusedModuleLowering {
        fused: module::LINEAR_RELU,
        inner_reference: module::REFERENCE_LINEAR,
        lowered: module::QUANTIZED_LINEAR_RELU,
        from_reference: fused_from_reference,
    }]
}

pub fn native_functional_lowerings() -> Vec<FunctionalLowering> {
    vec![FunctionalLowering {
        reference: function::LINEAR,
        lowered: function::QUANTIZED_LINEAR,
        lowered_with_activation: Some(function::QUANTIZED_LINEAR_RELU),
        activation: function::RELU,
    }]
}

pub fn native_special_module_lowerings() -> Vec<ModuleLowering> {
    vec![
        ModuleLowering::new(module::BATCH_NORM2D, module::QUANTIZED_BATCH_NORM2D, batch_norm_from_reference),
        ModuleLowering::new(module::BATCH_NORM3D, module::QUANTIZED_BATCH_NORM3D, batch_norm_from_reference),
    ]
}

pub fn native_fixed_range_ops() -> OpSet {
    OpSet {
        functions: vec![function::HARDSIGMOID, function::SIGMOID, function::TANH],
        methods: vec![
            method::HARDSIGMOID,
            method::HARDSIGMOID_,
            method::SIGMOID,
            method::SIGMOID_,
            method::TANH,
            method::TANH_,
        ],
        modules: vec![module::HARDSIGMOID, module::SIGMOID, module::TANH],
    }
}

/// Operators that produce their output in the representation of their input,
/// so the conversions around them can be dropped.
pub fn native_special_ops() -> OpSet {
    let fixed = native_fixed_range_ops();

    let mut functions = vec![
        function::ADAPTIVE_AVG_POOL1D,
        function::ADAPTIVE_AVG_POOL2D,
        function::ADAPTIVE_AVG_POOL3D,
        function::AVG_POOL1D,
        function::AVG_POOL2D,
        function::AVG_POOL3D,
        function::CAT,
        function::DROPOUT,
        function::ELU,
        function::FLATTEN,
        function::HARDSWISH,
        function::HARDTANH,
        function::INSTANCE_NORM,
        function::INTERPOLATE,
        function::LAYER_NORM,
        function::LEAKY_RELU,
        function::MAX_POOL1D,
        function::MAX_POOL2D,
        function::MAX_POOL3D,
        function::MEAN,
        function::RELU,
        function::RELU6,
        function::STACK,
        function::TRANSPOSE,
    ];
    functions.extend(fixed.functions);

    let mut methods = vec![
        method::CONTIGUOUS,
        method::DETACH,
        method::DETACH_,
        method::MEAN,
        method::PERMUTE,
        method::RELU,
        method::RELU_,
        method::REPEAT,
        method::REPEAT_INTERLEAVE,
        method::RESHAPE,
        method::RESIZE_,
        method::SHAPE,
        method::SIZE,
        method::SQUEEZE,
        method::SQUEEZE_,
        method::TRANSPOSE,
        method::UNSQUEEZE,
        method::UNSQUEEZE_,
        method::VIEW,
    ];
    methods.extend(fixed.methods);

    let mut modules = vec![
        module::ADAPTIVE_AVG_POOL1D,
        module::ADAPTIVE_AVG_POOL2D,
        module::ADAPTIVE_AVG_POOL3D,
        module::AVG_POOL1D,
        module::AVG_POOL2D,
        module::AVG_POOL3D,
        module::DROPOUT,
        module::ELU,
        module::HARDSWISH,
        module::HARDTANH,
        module::IDENTITY,
        module::INSTANCE_NORM1D,
        module::INSTANCE_NORM2D,
        module::INSTANCE_NORM3D,
        module::LAYER_NORM,
        module::LEAKY_RELU,
        module::MAX_POOL1D,
        module::MAX_POOL2D,
        module::MAX_POOL3D,
        module::RELU,
        module::RELU6,
    ];
    modules.extend(fixed.modules);
    modules.extend(native_special_module_lowerings().into_iter().map(|lowering| lowering.reference));

    OpSet { functions, methods, modules }
}
