use std::time::Duration;

use log::{debug, info, warn};
use ping_models::{Node, PingEvent};
use serde_json::Value;
use tokio::select;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchPing, PingOptions};
use crate::nodes::NodeCatalog;
use crate::results::{PingResult, SweepResults};

/// Upper bound of targets submitted in one job.
pub const MAX_CHUNK_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Defaults to as many targets as possible per job
    pub chunk_size: Option<usize>,
    pub chunk_pause: Duration,
    pub node_pause: Duration,
    /// How many of the fastest results to log after each node
    pub top_n: usize,
    pub ping: PingOptions,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            chunk_pause: Duration::from_secs(1),
            node_pause: Duration::from_secs(2),
            top_n: 10,
            ping: PingOptions::default(),
        }
    }
}

impl SweepOptions {
    fn effective_chunk_size(&self, target_count: usize) -> usize {
        self.chunk_size
            .unwrap_or(MAX_CHUNK_SIZE)
            .min(MAX_CHUNK_SIZE)
            .min(target_count)
            .max(1)
    }
}

/// Pings all `targets` from every node of `catalog`, one node after the other.
///
/// Failing chunks are logged and skipped. Once `stop_rx` is cancelled, the running job is
/// abandoned and the results gathered so far are returned.
pub async fn sweep(
    client: &BatchPing,
    targets: &[String],
    catalog: &NodeCatalog,
    options: &SweepOptions,
    stop_rx: &CancellationToken,
) -> SweepResults {
    let chunk_size = options.effective_chunk_size(targets.len());
    let node_count = catalog.len();
    info!(
        "Sweeping {} target(s) in chunks of {} from {} node(s)",
        targets.len(),
        chunk_size,
        node_count
    );

    let mut all_results = SweepResults::default();
    for (index, node) in catalog.iter().enumerate() {
        if stop_rx.is_cancelled() {
            break;
        }
        info!("[{}/{}] Using node {} ({})", index + 1, node_count, node.name, node.id);
        let results = sweep_node(client, targets, node, chunk_size, options, stop_rx).await;
        all_results.push(node.name.clone(), results);
        if let Some((name, sorted)) = all_results.iter().last() {
            log_fastest(name, sorted, options.top_n);
        }

        if index + 1 < node_count {
            pause(options.node_pause, stop_rx).await;
        }
    }
    all_results
}

async fn sweep_node(
    client: &BatchPing,
    targets: &[String],
    node: &Node,
    chunk_size: usize,
    options: &SweepOptions,
    stop_rx: &CancellationToken,
) -> Vec<PingResult> {
    let mut results = vec![];
    let chunk_count = targets.len().div_ceil(chunk_size);

    for (index, chunk) in targets.chunks(chunk_size).enumerate() {
        debug!(
            "Node {}: chunk {}/{} with {} target(s): {}",
            node.name,
            index + 1,
            chunk_count,
            chunk.len(),
            chunk.join(", ")
        );
        let outcome = select! {
            biased;
            _ = stop_rx.cancelled() => {
                info!("Stop requested, abandoning job on node {}", node.name);
                break;
            }
            outcome = client.run(
                chunk.to_vec(),
                &node.id,
                |payload| record_event(&mut results, payload, &node.name),
                &options.ping,
            ) => outcome,
        };
        match outcome {
            Ok(_) => debug!("Node {}: chunk {}/{} done", node.name, index + 1, chunk_count),
            Err(e) => warn!(
                "Node {}: chunk {}/{} failed, continuing with the next: {:#}",
                node.name,
                index + 1,
                chunk_count,
                anyhow::Error::new(e)
            ),
        }

        if index + 1 < chunk_count {
            pause(options.chunk_pause, stop_rx).await;
        }
    }
    results
}

fn record_event(results: &mut Vec<PingResult>, payload: Value, node_name: &str) {
    match PingEvent::from_payload(&payload) {
        Ok(event) => {
            info!(
                "Result: IP={}, delay={}ms, address={}",
                event.ip, event.result, event.address
            );
            results.push(PingResult::from_event(event, node_name));
        }
        Err(e) => warn!("Unable to map result payload, skipping it: {} - {}", e, payload),
    }
}

async fn pause(duration: Duration, stop_rx: &CancellationToken) {
    select! {
        _ = sleep(duration) => {}
        _ = stop_rx.cancelled() => {}
    }
}

fn log_fastest(node_name: &str, sorted: &[PingResult], top_n: usize) {
    if sorted.is_empty() {
        info!("Node {} produced no results", node_name);
        return;
    }
    let shown = top_n.min(sorted.len());
    info!("Fastest {} result(s) from node {}:", shown, node_name);
    for (rank, result) in sorted.iter().take(shown).enumerate() {
        info!(
            "{}. IP={}: {}ms ({})",
            rank + 1,
            result.ip,
            result.delay,
            result.address
        );
    }
}
