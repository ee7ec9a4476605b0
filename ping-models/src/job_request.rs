use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Separator the service expects between two targets in the submitted list.
pub const TARGET_SEPARATOR: &str = "\r\n";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("target list must not be empty")]
    EmptyTargets,

    #[error("vantage point (node) id must not be empty")]
    EmptyNodeId,
}

/// Targets as accepted from callers: either one pre-joined, newline-delimited string, or an
/// ordered list of individual targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Text(String),
    List(Vec<String>),
}

impl Targets {
    /// Produces the target field as submitted to the service. Lists are joined with CRLF,
    /// text is passed on as-is.
    pub fn normalize(self) -> Result<String, InvalidArgument> {
        let joined = match self {
            Targets::Text(text) => text,
            Targets::List(list) => list.join(TARGET_SEPARATOR),
        };
        if joined.trim().is_empty() {
            Err(InvalidArgument::EmptyTargets)
        } else {
            Ok(joined)
        }
    }
}

impl From<String> for Targets {
    fn from(value: String) -> Self {
        Targets::Text(value)
    }
}

impl From<&str> for Targets {
    fn from(value: &str) -> Self {
        Targets::Text(value.to_string())
    }
}

impl From<Vec<String>> for Targets {
    fn from(value: Vec<String>) -> Self {
        Targets::List(value)
    }
}

impl From<&[&str]> for Targets {
    fn from(value: &[&str]) -> Self {
        Targets::List(value.iter().map(|it| it.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(value: [&str; N]) -> Self {
        Targets::from(&value[..])
    }
}

/// Where the service should assume the gateway address of a submitted CIDR block.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GatewayPosition {
    First,
    #[default]
    Last,
}

/// One submission of a target set to one vantage point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    targets: String,
    node_id: String,
    cidr_filter: bool,
    gateway: GatewayPosition,
}

impl JobRequest {
    pub fn new(targets: impl Into<Targets>, node_id: impl Into<String>) -> Result<Self, InvalidArgument> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(InvalidArgument::EmptyNodeId);
        }
        Ok(Self {
            targets: targets.into().normalize()?,
            node_id,
            cidr_filter: true,
            gateway: GatewayPosition::default(),
        })
    }

    pub fn with_cidr_filter(mut self, cidr_filter: bool) -> Self {
        self.cidr_filter = cidr_filter;
        self
    }

    pub fn with_gateway(mut self, gateway: GatewayPosition) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn targets(&self) -> &str {
        &self.targets
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn target_count(&self) -> usize {
        self.targets.split(TARGET_SEPARATOR).count()
    }

    pub fn form(&self) -> JobForm<'_> {
        JobForm {
            host: &self.targets,
            node_id: &self.node_id,
            cidr_filter: if self.cidr_filter { "true" } else { "false" },
            gateway: self.gateway,
        }
    }
}

/// Form-encoded body of the submission request.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JobForm<'req> {
    pub host: &'req str,
    pub node_id: &'req str,
    pub cidr_filter: &'static str,
    pub gateway: GatewayPosition,
}
