//! Operator vocabulary of the native quantized backend.
//!
//! Names only; which of them are lowered to which is decided by
//! [`LoweringConfig`](crate::LoweringConfig).

pub mod function {
    use qlower_ir::Function;

    pub const QUANTIZE_PER_TENSOR: Function = Function::from_static("quantize_per_tensor");
    pub const QUANTIZE_PER_CHANNEL: Function = Function::from_static("quantize_per_channel");

    pub const LINEAR: Function = Function::from_static("linear");
    pub const RELU: Function = Function::from_static("relu");
    pub const RELU6: Function = Function::from_static("relu6");
    pub const HARDTANH: Function = Function::from_static("hardtanh");
    pub const ELU: Function = Function::from_static("elu");
    pub const LEAKY_RELU: Function = Function::from_static("leaky_relu");
    pub const HARDSWISH: Function = Function::from_static("hardswish");
    pub const SIGMOID: Function = Function::from_static("sigmoid");
    pub const HARDSIGMOID: Function = Function::from_static("hardsigmoid");
    pub const TANH: Function = Function::from_static("tanh");
    pub const DROPOUT: Function = Function::from_static("dropout");
    pub const LAYER_NORM: Function = Function::from_static("layer_norm");
    pub const INSTANCE_NORM: Function = Function::from_static("instance_norm");
    pub const MAX_POOL1D: Function = Function::from_static("max_pool1d");
    pub const MAX_POOL2D: Function = Function::from_static("max_pool2d");
    pub const MAX_POOL3D: Function = Function::from_static("max_pool3d");
    pub const ADAPTIVE_AVG_POOL1D: Function = Function::from_static("adaptive_avg_pool1d");
    pub const ADAPTIVE_AVG_POOL2D: Function = Function::from_static("adaptive_avg_pool2d");
    pub const ADAPTIVE_AVG_POOL3D: Function = Function::from_static("adaptive_avg_pool3d");
    pub const AVG_POOL1D: Function = Function::from_static("avg_pool1d");
    pub const AVG_POOL2D: Function = Function::from_static("avg_pool2d");
    pub const AVG_POOL3D: Function = Function::from_static("avg_pool3d");
    pub const INTERPOLATE: Function = Function::from_static("interpolate");
    pub const CAT: Function = Function::from_static("cat");
    pub const STACK: Function = Function::from_static("stack");
    pub const FLATTEN: Function = Function::from_static("flatten");
    pub const TRANSPOSE: Function = Function::from_static("transpose");
    pub const MEAN: Function = Function::from_static("mean");

    pub const QUANTIZED_LINEAR: Function = Function::from_static("quantized::linear");
    pub const QUANTIZED_LINEAR_RELU: Function = Function::from_static("quantized::linear_relu");
    pub const LINEAR_PREPACK: Function = Function::from_static("quantized::linear_prepack");
    pub const LINEAR_PREPACK_FP16: Function = Function::from_static("quantized::linear_prepack_fp16");
}

pub mod method {
    use qlower_ir::Method;

    pub const DEQUANTIZE: Method = Method::from_static("dequantize");
    pub const TO: Method = Method::from_static("to");

    pub const RELU: Method = Method::from_static("relu");
    pub const RELU_: Method = Method::from_static("relu_");
    pub const SIGMOID: Method = Method::from_static("sigmoid");
    pub const SIGMOID_: Method = Method::from_static("sigmoid_");
    pub const HARDSIGMOID: Method = Method::from_static("hardsigmoid");
    pub const HARDSIGMOID_: Method = Method::from_static("hardsigmoid_");
    pub const TANH: Method = Method::from_static("tanh");
    pub const TANH_: Method = Method::from_static("tanh_");
    pub const CONTIGUOUS: Method = Method::from_static("contiguous");
    pub const DETACH: Method = Method::from_static("detach");
    pub const DETACH_: Method = Method::from_static("detach_");
    pub const MEAN: Method = Method::from_static("mean");
    pub const PERMUTE: Method = Method::from_static("permute");
    pub const REPEAT: Method = Method::from_static("repeat");
    pub const REPEAT_INTERLEAVE: Method = Method::from_static("repeat_interleave");
    pub const RESHAPE: Method = Method::from_static("reshape");
    pub const RESIZE_: Method = Method::from_static("resize_");
    pub const SHAPE: Method = Method::from_static("shape");
    pub const SIZE: Method = Method::from_static("size");
    pub const SQUEEZE: Method = Method::from_static("squeeze");
    pub const SQUEEZE_: Method = Method::from_static("squeeze_");
    pub const TRANSPOSE: Method = Method::from_static("transpose");
    pub const UNSQUEEZE: Method = Method::from_static("unsqueeze");
    pub const UNSQUEEZE_: Method = Method::from_static("unsqueeze_");
    pub const VIEW: Method = Method::from_static("view");
}

pub mod module {
    use qlower_ir::ModuleType;

    pub const REFERENCE_LINEAR: ModuleType = ModuleType::from_static("reference.Linear");
    pub const REFERENCE_CONV1D: ModuleType = ModuleType::from_static("reference.Conv1d");
    pub const REFERENCE_CONV2D: ModuleType = ModuleType::from_static("reference.Conv2d");
    pub const REFERENCE_CONV3D: ModuleType = ModuleType::from_static("reference.Conv3d");

    pub const QUANTIZED_LINEAR: ModuleType = ModuleType::from_static("quantized.Linear");
    pub const QUANTIZED_CONV1D: ModuleType = ModuleType::from_static("quantized.Conv1d");
    pub const QUANTIZED_CONV2D: ModuleType = ModuleType::from_static("quantized.Conv2d");
    pub const QUANTIZED_CONV3D: ModuleType = ModuleType::from_static("quantized.Conv3d");

    pub const LINEAR_RELU: ModuleType = ModuleType::from_static("intrinsic.LinearReLU");
    pub const QUANTIZED_LINEAR_RELU: ModuleType = ModuleType::from_static("quantized.intrinsic.LinearReLU");

    pub const BATCH_NORM2D: ModuleType = ModuleType::from_static("BatchNorm2d");
    pub const BATCH_NORM3D: ModuleType = ModuleType::from_static("BatchNorm3d");
    pub const QUANTIZED_BATCH_NORM2D: ModuleType = ModuleType::from_static("quantized.BatchNorm2d");
    pub const QUANTIZED_BATCH_NORM3D: ModuleType = ModuleType::from_static("quantized.BatchNorm3d");

    pub const RELU: ModuleType = ModuleType::from_static("ReLU");
    pub const RELU6: ModuleType = ModuleType::from_static("ReLU6");
    pub const HARDTANH: ModuleType = ModuleType::from_static("Hardtanh");
    pub const ELU: ModuleType = ModuleType::from_static("ELU");
    pub const LEAKY_RELU: ModuleType = ModuleType::from_static("LeakyReLU");
    pub const HARDSWISH: ModuleType = ModuleType::from_static("Hardswish");
    pub const SIGMOID: ModuleType = ModuleType::from_static("Sigmoid");
    pub const HARDSIGMOID: ModuleType = ModuleType::from_static("Hardsigmoid");
    pub const TANH: ModuleType = ModuleType::from_static("Tanh");
    pub const DROPOUT: ModuleType = ModuleType::from_static("Dropout");
    pub const IDENTITY: ModuleType = ModuleType::from_static("Identity");
    pub const LAYER_NORM: ModuleType = ModuleType::from_static("LayerNorm");
    pub const INSTANCE_NORM1D: ModuleType = ModuleType::from_static("InstanceNorm1d");
    pub const INSTANCE_NORM2D: ModuleType = ModuleType::from_static("InstanceNorm2d");
    pub const INSTANCE_NORM3D: ModuleType = ModuleType::from_static("InstanceNorm3d");
    pub const MAX_POOL1D: ModuleType = ModuleType::from_static("MaxPool1d");
    pub const MAX_POOL2D: ModuleType = ModuleType::from_static("MaxPool2d");
    pub const MAX_POOL3D: ModuleType = ModuleType::from_static("MaxPool3d");
    pub const AVG_POOL1D: ModuleType = ModuleType::from_static("AvgPool1d");
    pub const AVG_POOL2D: ModuleType = ModuleType::from_static("AvgPool2d");
    pub const AVG_POOL3D: ModuleType = ModuleType::from_static("AvgPool3d");
    pub const ADAPTIVE_AVG_POOL1D: ModuleType = ModuleType::from_static("AdaptiveAvgPool1d");
    pub const ADAPTIVE_AVG_POOL2D: ModuleType = ModuleType::from_static("AdaptiveAvgPool2d");
    pub const ADAPTIVE_AVG_POOL3D: ModuleType = ModuleType::from_static("AdaptiveAvgPool3d");
}
