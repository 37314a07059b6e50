//! Parameter values read through attribute nodes.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use qlower_dtype::DType;

use crate::types::QualifiedName;

/// Affine quantization parameters of a per-tensor quantized value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QParams {
    pub scale: f64,
    pub zero_point: i64,
}

impl QParams {
    pub fn new(scale: f64, zero_point: i64) -> Self {
        Self { scale, zero_point }
    }
}

/// Dense tensor constant.
///
/// Quantized tensors store their integer representation in `data` and carry
/// the parameters needed to map it back to real values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: SmallVec<[usize; 4]>,
    pub data: Vec<f64>,
    pub qparams: Option<QParams>,
}

impl Tensor {
    pub fn new(dtype: DType, shape: impl IntoIterator<Item = usize>, data: Vec<f64>) -> Self {
        Self { dtype, shape: shape.into_iter().collect(), data, qparams: None }
    }

    pub fn quantized(dtype: DType, shape: impl IntoIterator<Item = usize>, data: Vec<f64>, qparams: QParams) -> Self {
        Self { qparams: Some(qparams), ..Self::new(dtype, shape, data) }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_quantized(&self) -> bool {
        self.dtype.is_quantized()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    /// Representation tag, e.g. the storage type a reference module quantizes its weight to.
    DType(DType),
    Tensor(Tensor),
}

impl ParamValue {
    /// Scalar value; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::DType(_) | Self::Tensor(_) => None,
        }
    }

    /// Integral scalar; floats are accepted only when they hold an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_dtype(&self) -> Option<DType> {
        match self {
            Self::DType(dtype) => Some(*dtype),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Element type of the stored value; `None` for representation tags.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::Float(_) => Some(DType::Float64),
            Self::Int(_) => Some(DType::Int64),
            Self::DType(_) => None,
            Self::Tensor(t) => Some(t.dtype),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<DType> for ParamValue {
    fn from(dtype: DType) -> Self {
        Self::DType(dtype)
    }
}

impl From<Tensor> for ParamValue {
    fn from(t: Tensor) -> Self {
        Self::Tensor(t)
    }
}

/// Top-level namespace of stored constants, keyed by attribute path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamStore {
    values: BTreeMap<QualifiedName, ParamValue>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<QualifiedName>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.values.insert(path.into(), value.into())
    }

    pub fn get(&self, path: &QualifiedName) -> Option<&ParamValue> {
        self.values.get(path)
    }

    pub fn contains(&self, path: &QualifiedName) -> bool {
        self.values.contains_key(path)
    }

    pub fn remove(&mut self, path: &QualifiedName) -> Option<ParamValue> {
        self.values.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
