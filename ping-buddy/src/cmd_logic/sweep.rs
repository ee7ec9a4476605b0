use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use futures::executor;
use log::info;
use ping_buddy::results::{self, SweepResults};
use ping_buddy::sweep::{self, SweepOptions};
use ping_buddy::{config, nodes, BatchPing, ClientConfig};

use batch_ping::helpers::stop;

use super::{PingParams, TargetParams};

#[derive(Args)]
pub struct Params {
    #[clap(flatten)]
    client: config::Params,

    #[clap(flatten)]
    ping: PingParams,

    #[clap(flatten)]
    nodes: nodes::Params,

    /// Targets per job, at most 256 (the default)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Seconds to wait between two jobs on the same node
    #[arg(long, default_value = "1")]
    chunk_pause_secs: u64,

    /// Seconds to wait before moving on to the next node
    #[arg(long, default_value = "2")]
    node_pause_secs: u64,

    /// How many of the fastest results to log per node
    #[arg(long, default_value = "10")]
    top: usize,

    /// Where to save results, defaults to a timestamped file in the working directory
    #[arg(long, value_name = "JSON FILE")]
    output: Option<PathBuf>,

    #[clap(flatten)]
    targets: TargetParams,
}

pub fn handle(params: Params) -> Result<()> {
    let catalog = nodes::read(&params.nodes).context("while loading node catalog")?;
    if catalog.is_empty() {
        bail!("Node catalog {:?} lists no nodes", params.nodes.nodes_file);
    }
    let targets = params.targets.into_list()?;
    let client = BatchPing::new(ClientConfig::from(&params.client))?;
    let options = SweepOptions {
        chunk_size: params.chunk_size,
        chunk_pause: Duration::from_secs(params.chunk_pause_secs),
        node_pause: Duration::from_secs(params.node_pause_secs),
        top_n: params.top,
        ping: params.ping.to_options(),
    };

    let sig_handler = stop::new();
    let stop_rx = sig_handler.subscribe_stop();
    tokio::spawn(sig_handler.wait_for_signal());

    let results = executor::block_on(sweep::sweep(
        &client, &targets, &catalog, &options, &stop_rx,
    ));

    let path = params
        .output
        .unwrap_or_else(|| results::default_output_path(Local::now()));
    results::save(&results, &path)?;
    info!("Results saved to {:?}", path);

    log_summary(&results);
    Ok(())
}

fn log_summary(results: &SweepResults) {
    info!("Sweep summary, {} node(s) tested", results.node_count());
    for summary in results.summarize() {
        match summary.best {
            Some(best) => info!(
                "{}: best IP {} at {}ms ({}), {} result(s) total",
                summary.node_name, best.ip, best.delay, best.address, summary.result_count
            ),
            None => info!(
                "{}: no numeric delays among {} result(s)",
                summary.node_name, summary.result_count
            ),
        }
    }
}
