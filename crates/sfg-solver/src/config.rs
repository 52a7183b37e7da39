//! Solver configuration.

use sfg_expr::SimplifyConfig;

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Refuse graphs with more nodes than this; enumeration is exponential
    pub max_nodes: usize,
    /// Simplify partial sums while building the result
    pub simplify: bool,
    /// Round limit handed to the simplifier
    pub max_simplify_passes: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_nodes: 64,
            simplify: true,
            max_simplify_passes: 16,
        }
    }
}

impl SolverConfig {
    /// Simplifier settings for partial sums, or `None` when disabled.
    pub fn simplify_config(&self) -> Option<SimplifyConfig> {
        self.simplify.then(|| SimplifyConfig {
            max_passes: self.max_simplify_passes,
            ..SimplifyConfig::default()
        })
    }
}
