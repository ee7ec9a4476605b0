use anyhow::{Context, Result};
use clap::Args;
use ping_buddy::nodes;

#[derive(Args)]
pub struct Params {
    #[clap(flatten)]
    nodes: nodes::Params,
}

pub fn handle(params: Params) -> Result<()> {
    let catalog = nodes::read(&params.nodes).context("while loading node catalog")?;
    for node in catalog.iter() {
        println!("{}\t{}", node.id, node.name);
    }
    Ok(())
}
