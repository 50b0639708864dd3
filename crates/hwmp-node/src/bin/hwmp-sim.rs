use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use hwmp_node::NodeConfig;
use hwmp_node::sim::Sim;

#[derive(Parser)]
#[command(
    name = "hwmp-sim",
    about = "Run HWMP path discovery across an in-process chain of mesh nodes"
)]
struct Cli {
    /// Path to a node configuration file applied to every node
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of nodes in the chain
    #[arg(short, long, default_value_t = 5)]
    nodes: usize,

    /// Index of the node that starts the discovery
    #[arg(long, default_value_t = 0)]
    from: usize,

    /// Index of the target node (defaults to the last node)
    #[arg(long)]
    to: Option<usize>,

    /// How long to wait for the discovery, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match NodeConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => NodeConfig::default(),
    };

    hwmp_node::logging::init_from_env(&config.logging.level);

    if cli.nodes < 2 {
        eprintln!("need at least 2 nodes");
        std::process::exit(2);
    }
    let to = cli.to.unwrap_or(cli.nodes - 1);
    if cli.from >= cli.nodes || to >= cli.nodes {
        eprintln!("node index out of range (0..{})", cli.nodes);
        std::process::exit(2);
    }

    let mut sim = match Sim::chain(&config, cli.nodes).await {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("failed to start simulation: {e}");
            std::process::exit(1);
        }
    };

    let origin = sim.node(cli.from).address();
    let target = sim.node(to).address();
    let outcome = sim
        .discover(cli.from, to, Duration::from_millis(cli.timeout_ms))
        .await;

    let code = match outcome {
        Ok(Some(next_hop)) => {
            println!("{origin} -> {target}: next hop {next_hop}");
            for hop in sim.trace(cli.from, to) {
                println!(
                    "  {} metric={} hops={}",
                    hop.node, hop.metric, hop.hop_count
                );
            }
            println!("  {target}");
            let diag = sim.node(cli.from).diagnostics();
            println!(
                "preq_tx={} prep_rx={} discoveries_completed={}",
                diag.preq_tx, diag.prep_rx, diag.discoveries_completed
            );
            0
        }
        Ok(None) => {
            println!("{origin} -> {target}: unreachable");
            1
        }
        Err(e) => {
            tracing::error!("simulation failed: {e}");
            1
        }
    };

    sim.shutdown().await;
    std::process::exit(code);
}
