use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use itertools::Itertools;
use ping_buddy::PingOptions;
use ping_models::GatewayPosition;

pub mod list_nodes;
pub mod one_shot;
pub mod sweep;

pub fn handle(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::OneShot(data) => one_shot::handle(data),
        Commands::Sweep(data) => sweep::handle(data),
        Commands::ListNodes(data) => list_nodes::handle(data),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ping the given targets once, from a single node, logging results as they arrive.
    OneShot(one_shot::Params),

    /// Ping the given targets from every node of the catalog, then save and summarise the
    /// results.
    Sweep(sweep::Params),

    /// Print the node catalog.
    ListNodes(list_nodes::Params),
}

#[derive(Args, Clone, Debug)]
#[group(id = "ping")]
pub struct PingParams {
    /// Submit CIDR blocks without asking the service to filter network/broadcast addresses
    #[arg(long)]
    no_cidr_filter: bool,

    /// Position of the gateway address in submitted CIDR blocks (first, last)
    #[arg(long, default_value = "last")]
    gateway: GatewayPosition,
}

impl PingParams {
    fn to_options(&self) -> PingOptions {
        PingOptions {
            cidr_filter: !self.no_cidr_filter,
            gateway: self.gateway,
            recv_timeout: None,
        }
    }
}

#[derive(Args, Clone, Debug)]
#[group(id = "target_list")]
pub struct TargetParams {
    /// File with additional targets, one per line, # to comment out a line
    #[arg(long, value_name = "FILE")]
    targets_file: Option<PathBuf>,

    /// IP addresses (or CIDR blocks) to ping
    targets: Vec<String>,
}

impl TargetParams {
    fn into_list(self) -> Result<Vec<String>> {
        let mut targets = self.targets;
        if let Some(path) = self.targets_file {
            let file = File::open(&path)
                .with_context(|| format!("while opening targets file {:?}", path))?;
            let from_file: Vec<String> = BufReader::new(file)
                .lines()
                .map_ok(|line| line.trim().to_string())
                .filter_ok(|line| !line.starts_with('#') && !line.is_empty())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("while reading targets file {:?}", path))?;
            targets.extend(from_file);
        }
        if targets.is_empty() {
            bail!("No targets given, pass them as arguments or via --targets-file");
        }
        Ok(targets)
    }
}
