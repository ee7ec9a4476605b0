use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use clap::Args;
use itertools::Itertools;
use ping_models::Node;
use thiserror::Error;

#[derive(Args, Clone, Debug)]
#[group(id = "nodes")]
pub struct Params {
    /// Flatfile to read the vantage points (nodes) from.
    /// One node per line: `<id>,<name>` (tab works as separator too)
    /// # at start of line to comment out the whole line
    /// No headers or similar
    #[arg(long, default_value = "nodes.txt", env = "NODES_FILE")]
    pub nodes_file: PathBuf,
}

/// Ordered collection of vantage points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCatalog {
    nodes: Vec<Node>,
}

impl NodeCatalog {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum CatalogReadError {
    #[error("node catalog file does not exist: `{0}`")]
    NoSuchFile(PathBuf),

    #[error("failed to open node catalog file `{path}`")]
    FailedOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read a line from node catalog file")]
    FailedRead { source: std::io::Error },

    #[error("invalid node line, expected `<id>,<name>`: `{line}`")]
    LineSyntax { line: String },

    /// Results are keyed by node name, so names must be unique
    #[error("node name `{name}` is used by both `{first_id}` and `{second_id}`")]
    DuplicateName {
        name: String,
        first_id: String,
        second_id: String,
    },
}

pub type CatalogReadResult = Result<NodeCatalog, CatalogReadError>;

pub fn read(params: &Params) -> CatalogReadResult {
    read_from(params.nodes_file.clone())
}

fn read_from(path: PathBuf) -> CatalogReadResult {
    use CatalogReadError as E;

    if !path.is_file() {
        return Err(E::NoSuchFile(path));
    }

    let file = File::open(&path).map_err(|source| E::FailedOpen { path, source })?;
    let lines = BufReader::new(file)
        .lines()
        .map_ok(|line| line.trim().to_string())
        .filter_ok(|line| !line.starts_with('#') && !line.is_empty());

    let mut nodes: Vec<Node> = vec![];
    for line_res in lines {
        let line = line_res.map_err(|source| E::FailedRead { source })?;
        let node = parse_line(line)?;
        if let Some(existing) = nodes.iter().find(|it| it.name == node.name) {
            return Err(E::DuplicateName {
                name: node.name,
                first_id: existing.id.clone(),
                second_id: node.id,
            });
        }
        nodes.push(node);
    }
    Ok(NodeCatalog::new(nodes))
}

fn parse_line(line: String) -> Result<Node, CatalogReadError> {
    match line.split_once(|c| c == ',' || c == '\t') {
        Some((id, name)) if !id.trim().is_empty() => Ok(Node::new(id.trim(), name.trim())),
        _ => Err(CatalogReadError::LineSyntax { line }),
    }
}
