//! Solver entry points.

use sfg_core::NodeId;
use sfg_expr::Expr;
use sfg_graph::{Graph, find_forward_paths, find_loops};
use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::mason::{MasonResult, mason};

/// Transfer function from `input` to `output` with default settings.
pub fn solve(graph: &Graph, input: NodeId, output: NodeId) -> SolverResult<Expr> {
    solve_with_config(graph, input, output, &SolverConfig::default())
}

pub fn solve_with_config(
    graph: &Graph,
    input: NodeId,
    output: NodeId,
    config: &SolverConfig,
) -> SolverResult<Expr> {
    Ok(solve_detailed(graph, input, output, config)?.transfer_function)
}

/// Like [`solve_with_config`] with the endpoints given by node name.
pub fn solve_named(
    graph: &Graph,
    input: &str,
    output: &str,
    config: &SolverConfig,
) -> SolverResult<MasonResult> {
    let lookup = |name: &str| {
        graph.find_node(name).ok_or_else(|| SolverError::NotFound {
            what: format!("node '{name}'"),
        })
    };
    solve_detailed(graph, lookup(input)?, lookup(output)?, config)
}

/// Full Mason computation, keeping paths, loops and intermediate terms.
pub fn solve_detailed(
    graph: &Graph,
    input: NodeId,
    output: NodeId,
    config: &SolverConfig,
) -> SolverResult<MasonResult> {
    if graph.node_count() > config.max_nodes {
        return Err(SolverError::GraphTooLarge {
            nodes: graph.node_count(),
            max: config.max_nodes,
        });
    }

    let paths = find_forward_paths(graph, input, output)?;
    if !graph.incoming(input).is_empty() {
        warn!(
            input = %input,
            incoming = graph.incoming(input).len(),
            "input node has incoming branches; it is not a pure source"
        );
    }
    let loops = find_loops(graph)?;
    debug!(
        input = %input,
        output = %output,
        paths = paths.len(),
        loops = loops.len(),
        "solving"
    );

    mason(graph, paths, loops, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfg_graph::{GraphBuilder, GraphError};

    fn line(n: usize) -> Graph {
        let mut b = GraphBuilder::new();
        for i in 0..n {
            b.add_node(format!("n{i}"));
        }
        for i in 1..n {
            b.connect(&format!("n{}", i - 1), &format!("n{i}"), None);
        }
        b.build().unwrap()
    }

    #[test]
    fn node_limit_is_enforced() {
        let g = line(5);
        let config = SolverConfig {
            max_nodes: 4,
            ..SolverConfig::default()
        };
        let input = g.find_node("n0").unwrap();
        let output = g.find_node("n4").unwrap();
        assert_eq!(
            solve_with_config(&g, input, output, &config),
            Err(SolverError::GraphTooLarge { nodes: 5, max: 4 })
        );
    }

    #[test]
    fn unknown_names() {
        let g = line(2);
        let err = solve_named(&g, "n0", "nope", &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::NotFound { .. }));
    }

    #[test]
    fn stale_ids_are_graph_errors() {
        let g = line(2);
        let ghost = NodeId::from_index(9);
        let input = g.find_node("n0").unwrap();
        assert_eq!(
            solve(&g, input, ghost),
            Err(SolverError::Graph(GraphError::NodeNotFound { node: ghost }))
        );
    }

    #[test]
    fn unit_chain_has_unit_gain() {
        let g = line(4);
        let input = g.find_node("n0").unwrap();
        let output = g.find_node("n3").unwrap();
        assert_eq!(solve(&g, input, output).unwrap().as_literal(), Some(1.0));
    }
}
