//! Mason's gain rule.
//!
//! `T = (sum_k P_k * D_k) / D` where `D = 1 - sum L_i + sum L_i*L_j - ...`
//! runs over sets of mutually non-touching loops, and the cofactor `D_k` is
//! the same sum restricted to loops that share no node with path `k`.

use std::collections::HashMap;

use sfg_core::NodeId;
use sfg_expr::{Expr, SimplifyConfig, eliminate_identities, fold_constants, simplify};
use sfg_graph::{Graph, Path, PathList};
use tracing::{debug, trace, warn};

use crate::config::SolverConfig;
use crate::error::SolverResult;

/// Transfer function together with the terms it was built from.
#[derive(Debug, Clone)]
pub struct MasonResult {
    /// `numerator / determinant`, or literal 0 without forward paths
    pub transfer_function: Expr,
    /// `sum_k P_k * D_k`
    pub numerator: Expr,
    /// Graph determinant `D`
    pub determinant: Expr,
    /// One cofactor per forward path, in path order
    pub cofactors: Vec<Expr>,
    pub paths: PathList,
    pub loops: PathList,
}

/// Loop gains, node sets and pairwise touch flags, computed once per solve.
struct LoopTable {
    gains: Vec<Expr>,
    nodes: Vec<Vec<NodeId>>,
    /// Row-major `n x n`
    touching: Vec<bool>,
}

impl LoopTable {
    fn new(graph: &Graph, loops: &[Path]) -> SolverResult<Self> {
        let n = loops.len();
        let mut gains = Vec::with_capacity(n);
        let mut nodes = Vec::with_capacity(n);
        for l in loops {
            gains.push(l.gain(graph)?);
            nodes.push(l.nodes(graph)?);
        }

        let mut touching = vec![false; n * n];
        for i in 0..n {
            for j in i..n {
                let t = shares_node(&nodes[i], &nodes[j]);
                touching[i * n + j] = t;
                touching[j * n + i] = t;
            }
        }
        Ok(Self {
            gains,
            nodes,
            touching,
        })
    }

    fn len(&self) -> usize {
        self.gains.len()
    }

    fn touch(&self, i: usize, j: usize) -> bool {
        self.touching[i * self.len() + j]
    }

    fn touches_nodes(&self, i: usize, nodes: &[NodeId]) -> bool {
        shares_node(&self.nodes[i], nodes)
    }

    fn product(&self, set: &[usize]) -> Expr {
        set.iter()
            .map(|&i| self.gains[i].clone())
            .reduce(|acc, g| acc * g)
            .unwrap_or_else(|| Expr::literal(1.0))
    }
}

fn shares_node(a: &[NodeId], b: &[NodeId]) -> bool {
    a.iter().any(|n| b.contains(n))
}

/// Every set of mutually non-touching loops drawn from `members` (ascending),
/// grouped by size: `levels[k]` holds the `k + 1`-sets in lexicographic order.
///
/// A size with no sets ends the list, since no larger set can exist then.
fn non_touching_sets(table: &LoopTable, members: &[usize]) -> Vec<Vec<Vec<usize>>> {
    let mut levels = Vec::new();
    let mut current: Vec<Vec<usize>> = members.iter().map(|&m| vec![m]).collect();

    while !current.is_empty() {
        let mut next = Vec::new();
        for set in &current {
            let Some(&last) = set.last() else { continue };
            for &m in members.iter().filter(|&&m| m > last) {
                if set.iter().all(|&s| !table.touch(s, m)) {
                    let mut grown = Vec::with_capacity(set.len() + 1);
                    grown.extend_from_slice(set);
                    grown.push(m);
                    next.push(grown);
                }
            }
        }
        levels.push(current);
        current = next;
    }
    levels
}

/// Determinant over the loops listed in `members`.
fn determinant_of(
    table: &LoopTable,
    members: &[usize],
    simplify_config: Option<&SimplifyConfig>,
) -> Expr {
    let mut det = Expr::literal(1.0);
    for (k, sets) in non_touching_sets(table, members).into_iter().enumerate() {
        let Some(sum) = sets
            .iter()
            .map(|set| table.product(set))
            .reduce(|acc, p| acc + p)
        else {
            break;
        };
        // odd-sized sets subtract, even-sized sets add
        det = if k % 2 == 0 { det - sum } else { det + sum };
        if let Some(config) = simplify_config {
            simplify(&mut det, config);
        }
        trace!(size = k + 1, sets = sets.len(), "determinant level");
    }
    det
}

/// Graph determinant for a loop list, as returned by
/// [`find_loops`](sfg_graph::find_loops).
pub fn determinant(graph: &Graph, loops: &[Path], config: &SolverConfig) -> SolverResult<Expr> {
    let table = LoopTable::new(graph, loops)?;
    let all: Vec<usize> = (0..table.len()).collect();
    Ok(determinant_of(
        &table,
        &all,
        config.simplify_config().as_ref(),
    ))
}

/// Combine enumerated paths and loops into a transfer function.
pub(crate) fn mason(
    graph: &Graph,
    paths: PathList,
    loops: PathList,
    config: &SolverConfig,
) -> SolverResult<MasonResult> {
    let simplify_config = config.simplify_config();
    let table = LoopTable::new(graph, &loops)?;
    let all: Vec<usize> = (0..table.len()).collect();
    let determinant = determinant_of(&table, &all, simplify_config.as_ref());

    // Paths avoiding the same loops share a cofactor; attach clones only.
    let mut cache: HashMap<Vec<usize>, Expr> = HashMap::new();
    let mut cofactors = Vec::with_capacity(paths.len());
    let mut numerator: Option<Expr> = None;

    for path in &paths {
        let path_nodes = path.nodes(graph)?;
        let free: Vec<usize> = all
            .iter()
            .copied()
            .filter(|&i| !table.touches_nodes(i, &path_nodes))
            .collect();
        let cofactor = match cache.get(&free) {
            Some(c) => c.clone(),
            None => {
                let c = determinant_of(&table, &free, simplify_config.as_ref());
                cache.insert(free, c.clone());
                c
            }
        };

        let gain = path.gain(graph)?;
        let term = if cofactor.as_literal() == Some(1.0) {
            gain
        } else {
            gain * cofactor.clone()
        };
        cofactors.push(cofactor);

        let mut sum = match numerator.take() {
            Some(acc) => acc + term,
            None => term,
        };
        if let Some(config) = &simplify_config {
            simplify(&mut sum, config);
        }
        numerator = Some(sum);
    }
    let numerator = numerator.unwrap_or_else(|| Expr::literal(0.0));

    let transfer_function = if paths.is_empty() {
        Expr::literal(0.0)
    } else {
        if determinant.as_literal() == Some(0.0) {
            warn!("determinant is identically zero, leaving the division unevaluated");
        }
        let mut t = numerator.clone() / determinant.clone();
        if config.simplify {
            fold_constants(&mut t);
            eliminate_identities(&mut t);
        }
        t
    };

    debug!(
        paths = paths.len(),
        loops = loops.len(),
        distinct_cofactors = cache.len(),
        "applied Mason's rule"
    );
    Ok(MasonResult {
        transfer_function,
        numerator,
        determinant,
        cofactors,
        paths,
        loops,
    })
}
