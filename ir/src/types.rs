//! Target identifiers and literal operands.
//!
//! Function, method and module-type targets are compared by name. The catalog of
//! which names exist is configuration; the IR only stores and compares them.

use std::borrow::Cow;
use std::fmt;

use smallvec::SmallVec;

use qlower_dtype::DType;

macro_rules! symbol {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            pub const fn from_static(name: &'static str) -> Self {
                Self(Cow::Borrowed(name))
            }

            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&'static str> for $name {
            fn from(name: &'static str) -> Self {
                Self::from_static(name)
            }
        }
    };
}

symbol! {
    /// Identity of a free function called by a `CallFunction` node.
    Function
}

symbol! {
    /// Name of a method invoked on a value by a `CallMethod` node.
    Method
}

symbol! {
    /// Class of a module instance held in the registry.
    ModuleType
}

/// Dotted path split into segments once, at construction.
///
/// The empty path names the root of a module tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(SmallVec<[String; 4]>);

impl QualifiedName {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, `None` for the root.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Path of the containing module and the leaf attribute name within it.
    pub fn split_parent(&self) -> Option<(QualifiedName, &str)> {
        let (leaf, parent) = self.0.split_last()?;
        Some((Self(parent.iter().cloned().collect()), leaf.as_str()))
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for QualifiedName {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Constant operand stored inline in a node's argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    DType(DType),
    Str(String),
}

impl Literal {
    pub fn as_dtype(&self) -> Option<DType> {
        match self {
            Self::DType(dtype) => Some(*dtype),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::DType(dtype) => write!(f, "{dtype}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<DType> for Literal {
    fn from(dtype: DType) -> Self {
        Self::DType(dtype)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
