use std::time::Duration;

use clap::Args;

pub const DEFAULT_ENDPOINT: &str = "https://www.itdog.cn/batch_ping/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
/// Shared with the service, which uses it to verify stream subscriptions.
pub const DEFAULT_TOKEN_SUFFIX: &str = "token_20230313000136kwyktxb0tgspm00yo5";
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable settings of one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Job submission endpoint
    pub endpoint: String,
    pub referer: String,
    pub user_agent: String,
    pub token_suffix: String,
    /// How long to wait for the next stream message before re-sending the subscription
    pub recv_timeout: Duration,
    pub http_timeout: Duration,
    /// Bound for opening the result stream, including the WebSocket handshake
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }
}

impl ClientConfig {
    /// Defaults, but submitting to `endpoint` (which is also used as `Referer`).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            referer: endpoint.clone(),
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token_suffix: DEFAULT_TOKEN_SUFFIX.to_string(),
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }
}

#[derive(Args, Clone, Debug)]
#[group(id = "client")]
pub struct Params {
    /// URL that batch ping jobs are submitted to
    #[arg(long, env = "BATCH_PING_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Referer header to send, defaults to the endpoint
    #[arg(long, env = "BATCH_PING_REFERER")]
    referer: Option<String>,

    /// User-Agent header to send. The service rejects non-browser agents.
    #[arg(long, env = "BATCH_PING_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Suffix used to derive stream tokens from job ids
    #[arg(long, env = "BATCH_PING_TOKEN_SUFFIX", default_value = DEFAULT_TOKEN_SUFFIX, hide_default_value = true)]
    token_suffix: String,

    /// Seconds to wait for a stream message before re-sending the subscription
    #[arg(long, env = "BATCH_PING_RECV_TIMEOUT_SECS", default_value = "10")]
    recv_timeout_secs: u64,

    /// Seconds after which the job submission request is aborted
    #[arg(long, env = "BATCH_PING_HTTP_TIMEOUT_SECS", default_value = "30")]
    http_timeout_secs: u64,

    /// Seconds after which opening the result stream is given up
    #[arg(long, env = "BATCH_PING_CONNECT_TIMEOUT_SECS", default_value = "10")]
    connect_timeout_secs: u64,
}

impl From<&Params> for ClientConfig {
    fn from(params: &Params) -> Self {
        Self {
            endpoint: params.endpoint.clone(),
            referer: params.referer.clone().unwrap_or_else(|| params.endpoint.clone()),
            user_agent: params.user_agent.clone(),
            token_suffix: params.token_suffix.clone(),
            recv_timeout: Duration::from_secs(params.recv_timeout_secs),
            http_timeout: Duration::from_secs(params.http_timeout_secs),
            connect_timeout: Duration::from_secs(params.connect_timeout_secs),
        }
    }
}
