//! Element representation tags for quantized dataflow graphs.
//!
//! A [`DType`] names how the values flowing along a graph edge are stored:
//! plain integers and floats, reduced-precision floats, and the affine
//! quantized representations produced by `quantize`-style conversions.


/// Element representation of a tensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    Bool,

    UInt8,
    Int8,
    Int16,
    Int32,
    Int64,

    Float16,
    BFloat16,
    Float32,
    Float64,

    /// Affine quantized, unsigned 8-bit storage.
    QUInt8,
    /// Affine quantized, signed 8-bit storage.
    QInt8,
    /// Affine quantized, signed 32-bit storage (bias accumulators).
    QInt32,
    /// Two unsigned 4-bit values packed per byte.
    QUInt4x2,
}

impl DType {
    /// Storage width of one element in bits.
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bool => 8,
            Self::UInt8 | Self::Int8 | Self::QUInt8 | Self::QInt8 => 8,
            Self::QUInt4x2 => 4,
            Self::Int16 | Self::Float16 | Self::BFloat16 => 16,
            Self::Int32 | Self::Float32 | Self::QInt32 => 32,
            Self::Int64 | Self::Float64 => 64,
        }
    }

    pub const fn is_quantized(&self) -> bool {
        matches!(self, Self::QUInt8 | Self::QInt8 | Self::QInt32 | Self::QUInt4x2)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Floating types narrower than single precision.
    pub const fn is_reduced_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16)
    }

    /// Integer range `[min, max]` representable by a quantized storage type.
    ///
    /// Returns `None` for non-quantized types.
    pub const fn quantized_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::QUInt8 => Some((0, 255)),
            Self::QInt8 => Some((-128, 127)),
            Self::QInt32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::QUInt4x2 => Some((0, 15)),
            _ => None,
        }
    }
}
