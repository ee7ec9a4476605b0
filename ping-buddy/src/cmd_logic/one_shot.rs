use anyhow::{Context, Result};
use clap::Args;
use futures::executor;
use log::{info, warn};
use ping_buddy::{config, BatchPing, ClientConfig};
use ping_models::PingEvent;
use serde_json::Value;

use super::{PingParams, TargetParams};

#[derive(Args)]
pub struct Params {
    #[clap(flatten)]
    client: config::Params,

    #[clap(flatten)]
    ping: PingParams,

    /// Id of the node to ping from
    #[arg(long, env = "NODE_ID")]
    node_id: String,

    #[clap(flatten)]
    targets: TargetParams,
}

pub fn handle(params: Params) -> Result<()> {
    let targets = params.targets.into_list()?;
    let client = BatchPing::new(ClientConfig::from(&params.client))?;
    let options = params.ping.to_options();

    let summary = executor::block_on(client.run(targets, &params.node_id, log_payload, &options))
        .with_context(|| format!("while pinging from node {}", params.node_id))?;
    info!(
        "Job done: {} result(s), subscription re-sent {} time(s)",
        summary.events, summary.resubscribes
    );
    Ok(())
}

fn log_payload(payload: Value) {
    match PingEvent::from_payload(&payload) {
        Ok(event) => info!(
            "IP={}, delay={}ms, address={}",
            event.ip, event.result, event.address
        ),
        Err(e) => warn!("Result in unexpected shape ({}): {}", e, payload),
    }
}
