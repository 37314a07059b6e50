//! Provenance tracking for graph nodes.
//!
//! Every node carries a chain of events in its [`NodeMeta`](crate::NodeMeta):
//! where it was created and which rewrite passes derived it from older nodes.
//! Replacement nodes inherit the chain of the node they replace, so a fused
//! operator can still be traced back to the reference call it came from.

use std::borrow::Cow;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use derive_more::Display;

/// Source code location with a workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{file}:{line}:{column}")]
pub struct SourceLocation {
    pub file: Cow<'static, str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn from_caller(loc: &'static Location<'static>) -> Self {
        Self { file: Cow::Borrowed(relative_location(loc)), line: loc.line(), column: loc.column() }
    }
}

/// Rewrite pass that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PassName {
    #[display("lower_weighted_ref_module")]
    LowerModule,
    #[display("lower_weighted_ref_functional")]
    LowerFunctional,
    #[display("subgraph_rewrite")]
    SubgraphRewrite,
    #[display("special_pattern_replacement")]
    SpecialPattern,
}

/// Individual event in a node's history.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProvenanceEvent {
    #[display("created at {location}")]
    Created { location: SourceLocation },

    #[display("replaces '{from}' ({pass})")]
    Transformed { from: String, pass: PassName },
}

pub type ProvenanceChain = Vec<ProvenanceEvent>;

/// Workspace root, derived from this crate's manifest directory at compile time.
fn workspace_root() -> &'static Path {
    static ROOT: OnceLock<PathBuf> = OnceLock::new();
    ROOT.get_or_init(|| {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| manifest_dir.to_path_buf())
    })
    .as_path()
}

/// Strips the workspace root from a caller location, falling back to the full path.
pub(crate) fn relative_location(loc: &'static Location<'static>) -> &'static str {
    let file = loc.file();
    let Some(root) = workspace_root().to_str() else {
        return file;
    };
    match file.strip_prefix(root) {
        Some(stripped) => stripped.strip_prefix('/').or_else(|| stripped.strip_prefix('\\')).unwrap_or(stripped),
        None => file,
    }
}

/// Multi-line rendering of a provenance chain.
pub fn format_chain(chain: &[ProvenanceEvent]) -> String {
    chain.iter().enumerate().map(|(i, event)| format!("\n  [{i}] {event}")).collect()
}
