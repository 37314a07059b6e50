//! Operation kinds and operand representation.
//!
//! The [`Op`] enum is the closed set of node kinds a graph may hold. Each kind
//! carries its own target payload, so a `CallModule` can never hold a function
//! and a `GetAttr` always names a parameter path.

use std::fmt;

use qlower_dtype::DType;

use crate::node::NodeId;
use crate::types::{Function, Literal, Method, QualifiedName};

/// Operation kind with its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Graph input.
    Placeholder,
    /// Read of a stored parameter or constant.
    GetAttr(QualifiedName),
    /// Call of a free function.
    CallFunction(Function),
    /// Method call on the value of operand 0.
    CallMethod(Method),
    /// Call of a registered sub-module.
    CallModule(QualifiedName),
    /// Graph result.
    Output,
}

/// Payload-free discriminant of [`Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    Placeholder,
    GetAttr,
    CallFunction,
    CallMethod,
    CallModule,
    Output,
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Placeholder => OpKind::Placeholder,
            Self::GetAttr(_) => OpKind::GetAttr,
            Self::CallFunction(_) => OpKind::CallFunction,
            Self::CallMethod(_) => OpKind::CallMethod,
            Self::CallModule(_) => OpKind::CallModule,
            Self::Output => OpKind::Output,
        }
    }

    /// True for the three call kinds.
    pub fn is_call(&self) -> bool {
        matches!(self, Self::CallFunction(_) | Self::CallMethod(_) | Self::CallModule(_))
    }

    pub fn target(&self) -> Option<String> {
        match self {
            Self::Placeholder | Self::Output => None,
            Self::GetAttr(path) | Self::CallModule(path) => Some(path.to_string()),
            Self::CallFunction(function) => Some(function.to_string()),
            Self::CallMethod(method) => Some(method.to_string()),
        }
    }
}

/// One operand position of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Node(NodeId),
    Lit(Literal),
    /// Tuple or list operand, e.g. the inputs of a concatenation.
    List(Vec<Arg>),
}

impl Arg {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Lit(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arg]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dtype(&self) -> Option<DType> {
        self.as_literal().and_then(Literal::as_dtype)
    }

    /// Calls `f` on every node referenced by this operand, nested lists included.
    pub fn for_each_node(&self, f: &mut impl FnMut(NodeId)) {
        match self {
            Self::Node(id) => f(*id),
            Self::Lit(_) => {}
            Self::List(items) => items.iter().for_each(|item| item.for_each_node(f)),
        }
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        self.for_each_node(&mut |id| nodes.push(id));
        nodes
    }

    /// Rewrites every reference to `old` into `new`; returns whether anything changed.
    pub(crate) fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        match self {
            Self::Node(id) if *id == old => {
                *id = new;
                true
            }
            Self::Node(_) | Self::Lit(_) => false,
            Self::List(items) => items.iter_mut().fold(false, |changed, item| item.replace_node(old, new) | changed),
        }
    }
}

impl From<NodeId> for Arg {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Literal> for Arg {
    fn from(lit: Literal) -> Self {
        Self::Lit(lit)
    }
}

impl From<DType> for Arg {
    fn from(dtype: DType) -> Self {
        Self::Lit(Literal::DType(dtype))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Lit(Literal::Int(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Lit(Literal::Float(value))
    }
}

impl From<Vec<NodeId>> for Arg {
    fn from(ids: Vec<NodeId>) -> Self {
        Self::List(ids.into_iter().map(Self::Node).collect())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Lit(lit) => write!(f, "{lit}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
