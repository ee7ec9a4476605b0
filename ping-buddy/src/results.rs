use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use ping_models::PingEvent;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One ping result, attributed to the node it was measured from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResult {
    pub ip: String,
    pub node_name: String,
    /// As reported by the service, see [PingEvent::result]
    pub delay: String,
    pub address: String,
}

impl PingResult {
    pub fn from_event(event: PingEvent, node_name: &str) -> Self {
        Self {
            ip: event.ip,
            node_name: node_name.to_string(),
            delay: event.result,
            address: event.address,
        }
    }

    /// Latency in milliseconds, if the service reported a number.
    pub fn delay_ms(&self) -> Option<f64> {
        self.delay
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|it| it.is_finite())
    }

    /// Fastest first, non-numeric delays (timeouts etc.) last.
    pub fn cmp_by_delay(&self, other: &Self) -> Ordering {
        let key = |it: &Self| it.delay_ms().unwrap_or(f64::INFINITY);
        key(self).total_cmp(&key(other))
    }
}

/// Results of a sweep, grouped by node in sweep order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepResults {
    nodes: Vec<(String, Vec<PingResult>)>,
}

#[derive(Debug, PartialEq)]
pub struct NodeSummary<'res> {
    pub node_name: &'res str,
    pub result_count: usize,
    /// Lowest numeric delay, none if the node had no numeric results at all
    pub best: Option<&'res PingResult>,
}

impl SweepResults {
    /// Sorts `results` by delay before storing them.
    pub fn push(&mut self, node_name: String, mut results: Vec<PingResult>) {
        results.sort_by(PingResult::cmp_by_delay);
        self.nodes.push((node_name, results));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PingResult])> {
        self.nodes
            .iter()
            .map(|(name, results)| (name.as_str(), results.as_slice()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn summarize(&self) -> Vec<NodeSummary<'_>> {
        self.iter()
            .filter(|(_, results)| !results.is_empty())
            .map(|(node_name, results)| NodeSummary {
                node_name,
                result_count: results.len(),
                best: results
                    .iter()
                    .filter(|it| it.delay_ms().is_some())
                    .min_by(|a, b| a.cmp_by_delay(b)),
            })
            .collect()
    }
}

impl Serialize for SweepResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (node_name, results) in &self.nodes {
            map.serialize_entry(node_name, results)?;
        }
        map.end()
    }
}

pub fn default_output_path(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "ping_results_all_nodes_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ))
}

pub fn save(results: &SweepResults, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("while creating results file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)
        .with_context(|| format!("while writing results to {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("while flushing results to {:?}", path))?;
    Ok(())
}
