use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sfg_core::NodeId;
use sfg_expr::{Binding, ExprError, SimplifyConfig, SubsTable, parse, simplify};
use sfg_graph::{Graph, GraphBuilder, GraphError, Path, find_forward_paths, find_loops};
use sfg_solver::{SolverConfig, SolverError, solve_named};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfg")]
#[command(about = "Symbolic signal-flow graph solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// Expression text, e.g. "2a + exp(b)"
        expr: String,
        /// Variable binding; the value may itself be an expression
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// Simplify an expression and print the result
    Simplify {
        /// Expression text
        expr: String,
        /// Maximum simplifier rounds
        #[arg(long, default_value_t = 16)]
        max_passes: usize,
    },
    /// Print the expression tree as a Graphviz digraph
    Dot {
        /// Expression text
        expr: String,
    },
    /// List the elementary loops of a graph
    Loops {
        #[command(flatten)]
        graph: GraphArgs,
    },
    /// List the forward paths between two nodes
    Paths {
        #[command(flatten)]
        graph: GraphArgs,
        /// Input node name
        #[arg(long)]
        input: String,
        /// Output node name
        #[arg(long)]
        output: String,
    },
    /// Compute the transfer function between two nodes
    Solve {
        #[command(flatten)]
        graph: GraphArgs,
        /// Input node name
        #[arg(long)]
        input: String,
        /// Output node name
        #[arg(long)]
        output: String,
        /// Variable binding used to also report a numeric value
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
        /// Keep the raw Mason expansion
        #[arg(long)]
        no_simplify: bool,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct GraphArgs {
    /// Branch between two nodes; nodes are created on first mention
    #[arg(short, long = "branch", value_name = "SRC:DST[=WEIGHT]", required = true)]
    branches: Vec<String>,
    /// Extra node without branches
    #[arg(long = "node", value_name = "NAME")]
    nodes: Vec<String>,
    /// Refuse graphs with more nodes than this, before any enumeration
    #[arg(long, default_value_t = 64)]
    max_nodes: usize,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Invalid branch '{spec}', expected SRC:DST or SRC:DST=WEIGHT")]
    InvalidBranch { spec: String },

    #[error("Invalid binding '{spec}', expected NAME=VALUE")]
    InvalidBinding { spec: String },

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    // stdout carries results only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval { expr, vars } => cmd_eval(&expr, &vars),
        Commands::Simplify { expr, max_passes } => cmd_simplify(&expr, max_passes),
        Commands::Dot { expr } => cmd_dot(&expr),
        Commands::Loops { graph } => cmd_loops(&graph),
        Commands::Paths {
            graph,
            input,
            output,
        } => cmd_paths(&graph, &input, &output),
        Commands::Solve {
            graph,
            input,
            output,
            vars,
            no_simplify,
            json,
        } => cmd_solve(&graph, &input, &output, &vars, !no_simplify, json),
    }
}

fn cmd_eval(text: &str, vars: &[String]) -> CliResult<()> {
    let expr = parse(text)?;
    let subs = substitutions(vars)?;
    println!("{}", expr.evaluate(&subs)?);
    Ok(())
}

fn cmd_simplify(text: &str, max_passes: usize) -> CliResult<()> {
    let mut expr = parse(text)?;
    let report = simplify(
        &mut expr,
        &SimplifyConfig {
            max_passes,
            ..SimplifyConfig::default()
        },
    );
    debug!(
        passes = report.passes,
        rewrites = report.rewrites,
        converged = report.converged,
        "simplified"
    );
    println!("{}", expr);
    Ok(())
}

fn cmd_dot(text: &str) -> CliResult<()> {
    print!("{}", parse(text)?.to_dot());
    Ok(())
}

fn cmd_loops(args: &GraphArgs) -> CliResult<()> {
    let graph = build_graph(args)?;
    let loops = find_loops(&graph)?;
    if loops.is_empty() {
        println!("No loops");
    }
    for (i, l) in loops.iter().enumerate() {
        let report = PathReport::new(&graph, l)?;
        println!("L{}: {}  gain: {}", i + 1, report.nodes.join(" -> "), report.gain);
    }
    Ok(())
}

fn cmd_paths(args: &GraphArgs, input: &str, output: &str) -> CliResult<()> {
    let graph = build_graph(args)?;
    let (input, output) = (node_named(&graph, input)?, node_named(&graph, output)?);
    let paths = find_forward_paths(&graph, input, output)?;
    if paths.is_empty() {
        println!("No forward paths");
    }
    for (i, p) in paths.iter().enumerate() {
        let report = PathReport::new(&graph, p)?;
        println!("P{}: {}  gain: {}", i + 1, report.nodes.join(" -> "), report.gain);
    }
    Ok(())
}

fn cmd_solve(
    args: &GraphArgs,
    input: &str,
    output: &str,
    vars: &[String],
    simplify: bool,
    json: bool,
) -> CliResult<()> {
    let graph = build_graph(args)?;
    let config = SolverConfig {
        max_nodes: args.max_nodes,
        simplify,
        ..SolverConfig::default()
    };
    let result = solve_named(&graph, input, output, &config)?;

    let value = if vars.is_empty() {
        None
    } else {
        Some(result.transfer_function.evaluate(&substitutions(vars)?)?)
    };

    if json {
        let report = SolveReport {
            transfer_function: result.transfer_function.to_string(),
            numerator: result.numerator.to_string(),
            determinant: result.determinant.to_string(),
            paths: reports(&graph, &result.paths)?,
            loops: reports(&graph, &result.loops)?,
            value,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("T = {}", result.transfer_function);
    println!("  numerator:   {}", result.numerator);
    println!("  determinant: {}", result.determinant);
    println!(
        "  {} forward path(s), {} loop(s)",
        result.paths.len(),
        result.loops.len()
    );
    if let Some(v) = value {
        println!("  value: {}", v);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct PathReport {
    nodes: Vec<String>,
    gain: String,
}

impl PathReport {
    fn new(graph: &Graph, path: &Path) -> CliResult<Self> {
        let nodes = path
            .nodes(graph)?
            .into_iter()
            .filter_map(|id| graph.node(id).map(|n| n.name.clone()))
            .collect();
        Ok(Self {
            nodes,
            gain: path.gain(graph)?.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SolveReport {
    transfer_function: String,
    numerator: String,
    determinant: String,
    paths: Vec<PathReport>,
    loops: Vec<PathReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

fn reports(graph: &Graph, paths: &[Path]) -> CliResult<Vec<PathReport>> {
    paths.iter().map(|p| PathReport::new(graph, p)).collect()
}

/// Split `SRC:DST` or `SRC:DST=WEIGHT`.
fn parse_branch_spec(spec: &str) -> CliResult<(&str, &str, Option<&str>)> {
    let invalid = || CliError::InvalidBranch {
        spec: spec.to_string(),
    };
    let (ends, weight) = match spec.split_once('=') {
        Some((ends, weight)) => (ends, Some(weight.trim())),
        None => (spec, None),
    };
    let (src, dst) = ends.split_once(':').ok_or_else(invalid)?;
    let (src, dst) = (src.trim(), dst.trim());
    if src.is_empty() || dst.is_empty() || weight == Some("") {
        return Err(invalid());
    }
    Ok((src, dst, weight))
}

/// `NAME=VALUE`, where a value that is not a number is read as an expression.
fn parse_binding(spec: &str) -> CliResult<(String, Binding)> {
    let (name, value) = spec
        .split_once('=')
        .map(|(n, v)| (n.trim(), v.trim()))
        .filter(|(n, v)| !n.is_empty() && !v.is_empty())
        .ok_or_else(|| CliError::InvalidBinding {
            spec: spec.to_string(),
        })?;
    let binding = match value.parse::<f64>() {
        Ok(v) => Binding::Value(v),
        Err(_) => Binding::Expr(parse(value)?),
    };
    Ok((name.to_string(), binding))
}

fn substitutions(vars: &[String]) -> CliResult<SubsTable> {
    let mut subs = SubsTable::with_builtins();
    for spec in vars {
        let (name, binding) = parse_binding(spec)?;
        subs.insert(name, binding);
    }
    Ok(subs)
}

fn build_graph(args: &GraphArgs) -> CliResult<Graph> {
    let mut builder = GraphBuilder::new();
    for name in &args.nodes {
        builder.ensure_node(name);
    }
    for spec in &args.branches {
        let (src, dst, weight) = parse_branch_spec(spec)?;
        builder.ensure_node(src);
        builder.ensure_node(dst);
        builder.connect(src, dst, weight);
    }
    let graph = builder.build()?;
    // enumeration is exponential in the node count, for every subcommand
    if graph.node_count() > args.max_nodes {
        return Err(SolverError::GraphTooLarge {
            nodes: graph.node_count(),
            max: args.max_nodes,
        }
        .into());
    }
    Ok(graph)
}

fn node_named(graph: &Graph, name: &str) -> CliResult<NodeId> {
    graph.find_node(name).ok_or_else(|| {
        GraphError::UnknownNodeName {
            name: name.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_args(branches: &[&str]) -> GraphArgs {
        GraphArgs {
            branches: branches.iter().map(|s| s.to_string()).collect(),
            nodes: Vec::new(),
            max_nodes: 64,
        }
    }

    #[test]
    fn branch_specs() {
        assert_eq!(parse_branch_spec("a:b").unwrap(), ("a", "b", None));
        assert_eq!(
            parse_branch_spec(" u : y = 2*G ").unwrap(),
            ("u", "y", Some("2*G"))
        );
        assert!(parse_branch_spec("ab").is_err());
        assert!(parse_branch_spec(":b").is_err());
        assert!(parse_branch_spec("a:b=").is_err());
    }

    #[test]
    fn bindings() {
        let (name, binding) = parse_binding("k=2.5").unwrap();
        assert_eq!(name, "k");
        assert_eq!(binding, Binding::Value(2.5));

        let (_, binding) = parse_binding("tau = 1/w").unwrap();
        assert_eq!(binding, Binding::Expr(parse("1/w").unwrap()));

        assert!(matches!(
            parse_binding("novalue"),
            Err(CliError::InvalidBinding { .. })
        ));
        assert!(matches!(parse_binding("k=2 +"), Err(CliError::Expr(_))));
    }

    #[test]
    fn graph_from_specs() {
        let graph = build_graph(&graph_args(&["r:e", "e:y=G", "y:e=-H"])).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.branch_count(), 3);
        assert_eq!(find_loops(&graph).unwrap().len(), 1);
    }

    #[test]
    fn node_cap_applies_to_every_graph() {
        let mut args = graph_args(&["a:b", "b:c", "c:a"]);
        args.max_nodes = 2;
        assert!(matches!(
            build_graph(&args),
            Err(CliError::Solver(SolverError::GraphTooLarge { nodes: 3, max: 2 }))
        ));
        assert!(matches!(
            cmd_loops(&args),
            Err(CliError::Solver(SolverError::GraphTooLarge { .. }))
        ));
        args.max_nodes = 3;
        assert_eq!(build_graph(&args).unwrap().node_count(), 3);
    }

    #[test]
    fn substitutions_include_builtins() {
        let subs = substitutions(&["x=2".to_string()]).unwrap();
        assert!(subs.contains("pi"));
        assert_eq!(subs.value_of("x").unwrap(), 2.0);
    }

    #[test]
    fn report_lists_names_and_gain() {
        let graph = build_graph(&graph_args(&["a:b=k", "b:c=m"])).unwrap();
        let (a, c) = (
            graph.find_node("a").unwrap(),
            graph.find_node("c").unwrap(),
        );
        let paths = find_forward_paths(&graph, a, c).unwrap();
        let report = PathReport::new(&graph, &paths[0]).unwrap();
        assert_eq!(report.nodes, ["a", "b", "c"]);
        assert_eq!(report.gain, "k*m");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"nodes":["a","b","c"],"gain":"k*m"}"#);
    }
}
