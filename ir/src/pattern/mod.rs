//! Structural patterns over graph nodes.
//!
//! A [`Pattern`] describes the shape of a producer cone rooted at one node:
//!
//! ```text
//! quantize_per_tensor(Linear(dequantize(_)), _, _, _)
//! ```
//!
//! is written as
//!
//! ```ignore
//! Pattern::function(quantize_per_tensor)
//!     .with_operands([
//!         Pattern::module(linear).with_operands([Pattern::method(dequantize)]).named("ref"),
//!         Pattern::any().named("scale"),
//!         Pattern::any().named("zero_point"),
//!         Pattern::any().named("dtype"),
//!     ])
//!     .named("q")
//! ```
//!
//! Matching rules:
//! - [`Pattern::Any`] matches every operand, node or literal.
//! - A node pattern without operands checks only the head, so
//!   `Pattern::method(dequantize)` matches any dequantize call whatever it reads.
//! - A node pattern with operands requires exactly that many positional operands.
//! - Every node matched below the root must have at most one consumer; the
//!   root itself may have any number.
//! - Module heads compare the type of the module the registry resolves, not
//!   the module path.

mod matcher;

use std::collections::BTreeMap;
use std::fmt;

use crate::node::NodeId;
use crate::op::Arg;
use crate::types::{Function, Literal, Method, ModuleType};

pub use matcher::{is_match, match_pattern};

/// What a node pattern requires of the node's operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Head {
    Function(Function),
    Method(Method),
    Module(ModuleType),
    /// Any attribute read.
    GetAttr,
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(function) => write!(f, "{function}"),
            Self::Method(method) => write!(f, ".{method}"),
            Self::Module(ty) => write!(f, "{ty}"),
            Self::GetAttr => f.write_str("getattr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Any { name: Option<String> },
    Literal(Literal),
    /// A list operand whose elements each match the inner pattern.
    Each(Box<Pattern>),
    Node { head: Head, operands: Option<Vec<Pattern>>, name: Option<String> },
}

impl Pattern {
    pub fn any() -> Self {
        Self::Any { name: None }
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::Literal(value.into())
    }

    pub fn each(inner: Pattern) -> Self {
        Self::Each(Box::new(inner))
    }

    pub fn function(function: impl Into<Function>) -> Self {
        Self::head(Head::Function(function.into()))
    }

    pub fn method(method: impl Into<Method>) -> Self {
        Self::head(Head::Method(method.into()))
    }

    pub fn module(ty: impl Into<ModuleType>) -> Self {
        Self::head(Head::Module(ty.into()))
    }

    pub fn get_attr() -> Self {
        Self::head(Head::GetAttr)
    }

    fn head(head: Head) -> Self {
        Self::Node { head, operands: None, name: None }
    }

    /// Requires exactly these positional operands. No-op on non-node patterns.
    pub fn with_operands(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        if let Self::Node { operands, .. } = &mut self {
            *operands = Some(patterns.into_iter().collect());
        }
        self
    }

    /// Binds whatever this pattern matches under `binding`.
    pub fn named(mut self, binding: impl Into<String>) -> Self {
        match &mut self {
            Self::Any { name } | Self::Node { name, .. } => *name = Some(binding.into()),
            Self::Literal(_) | Self::Each(_) => {}
        }
        self
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any { .. } => f.write_str("_"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Each(inner) => write!(f, "[{inner}..]"),
            Self::Node { head, operands, .. } => {
                write!(f, "{head}")?;
                if let Some(operands) = operands {
                    f.write_str("(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{operand}")?;
                    }
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

/// Operands captured by named patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<String, Arg>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.values.get(name)
    }

    /// Bound node, `None` when the binding is absent or holds a literal.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.get(name).and_then(Arg::as_node)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn bind(&mut self, name: &str, value: Arg) {
        self.values.insert(name.to_string(), value);
    }
}
