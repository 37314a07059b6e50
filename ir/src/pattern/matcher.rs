use crate::graph::Graph;
use crate::module::ModuleTree;
use crate::node::{Node, NodeId};
use crate::op::{Arg, Op};
use crate::pattern::{Bindings, Head, Pattern};

/// Whether the producer cone rooted at `node` has the shape of `pattern`.
///
/// Pure inspection: the graph and registry are only read.
pub fn is_match(modules: &ModuleTree, graph: &Graph, node: NodeId, pattern: &Pattern) -> bool {
    match_pattern(modules, graph, node, pattern).is_some()
}

/// Like [`is_match`], returning the named captures on success.
pub fn match_pattern(modules: &ModuleTree, graph: &Graph, node: NodeId, pattern: &Pattern) -> Option<Bindings> {
    let matcher = Matcher { modules, graph };
    let mut bindings = Bindings::default();
    matcher.arg(&Arg::Node(node), pattern, usize::MAX, &mut bindings).then_some(bindings)
}

struct Matcher<'a> {
    modules: &'a ModuleTree,
    graph: &'a Graph,
}

impl Matcher<'_> {
    fn arg(&self, arg: &Arg, pattern: &Pattern, max_uses: usize, bindings: &mut Bindings) -> bool {
        match pattern {
            Pattern::Any { name } => {
                if let Some(name) = name {
                    bindings.bind(name, arg.clone());
                }
                true
            }
            Pattern::Literal(expected) => arg.as_literal() == Some(expected),
            Pattern::Each(inner) => match arg {
                Arg::List(items) => items.iter().all(|item| self.arg(item, inner, 1, bindings)),
                _ => false,
            },
            Pattern::Node { head, operands, name } => {
                let Some(node) = arg.as_node().and_then(|id| self.graph.get(id)) else {
                    return false;
                };
                if node.users().len() > max_uses || !self.head(node, head) {
                    return false;
                }
                if let Some(operands) = operands {
                    if operands.len() != node.args().len() {
                        return false;
                    }
                    let all = node.args().iter().zip(operands).all(|(a, p)| self.arg(a, p, 1, bindings));
                    if !all {
                        return false;
                    }
                }
                if let Some(name) = name {
                    bindings.bind(name, Arg::Node(node.id()));
                }
                true
            }
        }
    }

    fn head(&self, node: &Node, head: &Head) -> bool {
        match (head, node.op()) {
            (Head::Function(expected), Op::CallFunction(function)) => expected == function,
            (Head::Method(expected), Op::CallMethod(method)) => expected == method,
            (Head::Module(expected), Op::CallModule(path)) => self.modules.module_type(path) == Some(expected),
            (Head::GetAttr, Op::GetAttr(_)) => true,
            _ => false,
        }
    }
}
