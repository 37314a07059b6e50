//! Module registry.
//!
//! Modules form an owning tree. A call-module node names its target by a
//! [`QualifiedName`], which is resolved segment by segment from the root; the
//! graph itself never holds module instances.

use std::collections::BTreeMap;

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::params::ParamValue;
use crate::types::{ModuleType, QualifiedName};

/// Module instance: a type tag, named attributes and ordered named children.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    ty: ModuleType,
    attrs: BTreeMap<String, ParamValue>,
    children: Vec<(String, Module)>,
}

impl Module {
    pub fn new(ty: impl Into<ModuleType>) -> Self {
        Self { ty: ty.into(), attrs: BTreeMap::new(), children: Vec::new() }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: Module) -> Self {
        self.set_child(name, child);
        self
    }

    pub fn ty(&self) -> &ModuleType {
        &self.ty
    }

    pub fn attr(&self, name: &str) -> Option<&ParamValue> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, ParamValue> {
        &self.attrs
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.attrs.insert(name.into(), value.into())
    }

    pub fn child(&self, name: &str) -> Option<&Module> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.children.iter_mut().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.children.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Replaces the child called `name`, keeping its position, or appends it.
    pub fn set_child(&mut self, name: impl Into<String>, child: Module) -> Option<Module> {
        let name = name.into();
        match self.child_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, child)),
            None => {
                self.children.push((name, child));
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleTree {
    root: Module,
}

impl Default for ModuleTree {
    fn default() -> Self {
        Self::new(Module::new("GraphModule"))
    }
}

impl ModuleTree {
    pub fn new(root: Module) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    pub fn get(&self, path: &QualifiedName) -> Option<&Module> {
        path.segments().iter().try_fold(&self.root, |module, segment| module.child(segment))
    }

    pub fn get_mut(&mut self, path: &QualifiedName) -> Option<&mut Module> {
        path.segments().iter().try_fold(&mut self.root, |module, segment| module.child_mut(segment))
    }

    pub fn resolve(&self, path: &QualifiedName) -> Result<&Module> {
        self.get(path).context(UnknownModuleSnafu { path: path.clone() })
    }

    pub fn module_type(&self, path: &QualifiedName) -> Option<&ModuleType> {
        self.get(path).map(Module::ty)
    }

    /// Attribute `a.b.c` is attribute `c` of module `a.b`.
    pub fn attr(&self, path: &QualifiedName) -> Option<&ParamValue> {
        let (parent, leaf) = path.split_parent()?;
        self.get(&parent)?.attr(leaf)
    }

    /// Installs `module` at `path`, returning the instance it replaced.
    ///
    /// The parent container must already exist; the root cannot be replaced.
    pub fn insert(&mut self, path: &QualifiedName, module: Module) -> Result<Option<Module>> {
        ensure!(!path.is_root(), RootReplacementSnafu);
        let Some((parent, leaf)) = path.split_parent() else {
            return RootReplacementSnafu.fail();
        };
        let container = self.get_mut(&parent).context(UnknownModuleSnafu { path: parent.clone() })?;
        Ok(container.set_child(leaf, module))
    }

    /// Every module with its path, depth first, parents before children.
    pub fn iter(&self) -> Vec<(QualifiedName, &Module)> {
        let mut out = Vec::new();
        let mut stack = vec![(QualifiedName::root(), &self.root)];
        while let Some((path, module)) = stack.pop() {
            for (name, child) in module.children.iter().rev() {
                stack.push((path.child(name.clone()), child));
            }
            out.push((path, module));
        }
        out
    }
}
