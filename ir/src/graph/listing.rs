//! Textual listing of a graph, one node per line.
//!
//! ```text
//! graph():
//!     %x : [num_users=1] = placeholder[target=x]
//!     %dequantize : [num_users=1] = call_method[target=dequantize](args = (%x,), kwargs = {})
//!     ...
//!     return %linear
//! ```

use std::fmt;

use crate::graph::Graph;
use crate::node::Node;
use crate::op::{Arg, Op};

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph():")?;
        for node in self.nodes() {
            writeln!(f, "    {}", NodeLine { graph: self, node })?;
        }
        Ok(())
    }
}

struct NodeLine<'a> {
    graph: &'a Graph,
    node: &'a Node,
}

impl fmt::Display for NodeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;
        if let Op::Output = node.op {
            f.write_str("return ")?;
            return write_args(f, self.graph, &node.args);
        }

        write!(f, "%{} : [num_users={}] = {}", node.name, node.users.len(), node.op.kind())?;
        match &node.op {
            Op::Placeholder => write!(f, "[target={}]", node.name),
            Op::GetAttr(path) => write!(f, "[target={path}]"),
            op => {
                write!(f, "[target={}](args = (", op.target().unwrap_or_default())?;
                write_args(f, self.graph, &node.args)?;
                if node.args.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str("), kwargs = {")?;
                for (i, (key, value)) in node.kwargs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", ArgRef { graph: self.graph, arg: value })?;
                }
                f.write_str("})")
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, graph: &Graph, args: &[Arg]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", ArgRef { graph, arg })?;
    }
    Ok(())
}

/// Operand rendered with node names instead of raw ids.
struct ArgRef<'a> {
    graph: &'a Graph,
    arg: &'a Arg,
}

impl fmt::Display for ArgRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg {
            Arg::Node(id) => match self.graph.get(*id) {
                Some(node) => write!(f, "%{}", node.name),
                None => write!(f, "{id}<erased>"),
            },
            Arg::Lit(lit) => write!(f, "{lit}"),
            Arg::List(items) => {
                f.write_str("[")?;
                write_args(f, self.graph, items)?;
                f.write_str("]")
            }
        }
    }
}
