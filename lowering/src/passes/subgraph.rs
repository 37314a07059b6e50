//! Hook for the generic pattern/replacement subgraph rewriter.
//!
//! The rewriter itself is supplied by the embedder. Its contract: every match
//! of `pattern` present before the call is absent after it, every match is
//! replaced by an instance of `replacement`, non-overlapping matches only, and
//! nothing outside a matched region changes.

use qlower_ir::{Graph, GraphModule, PassName};

use crate::config::LoweringConfig;
use crate::error::*;
use crate::report::LoweringReport;

/// A pattern graph and the graph that replaces each of its matches.
#[derive(Debug, Clone)]
pub struct PatternReplacement {
    pub name: String,
    pub pattern: Graph,
    pub replacement: Graph,
}

pub trait SubgraphRewriter: Send + Sync {
    /// Rewrites every non-overlapping match of `rule.pattern` in `gm`, returning
    /// the number of replaced matches.
    fn replace_pattern(&self, gm: &mut GraphModule, rule: &PatternReplacement) -> Result<usize>;
}

#[tracing::instrument(skip_all, fields(patterns = config.subgraph_patterns.len()))]
pub fn apply_subgraph_rewrites(gm: &mut GraphModule, config: &LoweringConfig) -> Result<LoweringReport> {
    let mut report = LoweringReport::default();
    if config.subgraph_patterns.is_empty() {
        return Ok(report);
    }
    let Some(rewriter) = config.subgraph_rewriter.as_deref() else {
        return MissingRewriterSnafu { patterns: config.subgraph_patterns.len() }.fail();
    };

    for rule in &config.subgraph_patterns {
        let replaced = rewriter.replace_pattern(gm, rule)?;
        for _ in 0..replaced {
            report.lowered(PassName::SubgraphRewrite, rule.name.as_str(), &rule.name);
        }
        gm.recompile();
    }
    Ok(report)
}
