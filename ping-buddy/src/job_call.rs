use log::{debug, log_enabled, trace, Level};
use ping_models::JobRequest;
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::Client;

use crate::config::ClientConfig;
use crate::error::ProtocolError;

pub use self::patterns::ResponsePatterns;

mod patterns;

/// Identifiers the service assigned to a freshly submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// WebSocket URL that results are streamed from
    pub stream_url: String,
    pub task_id: String,
}

/// Submits jobs to the service and extracts the [JobHandle] from the HTML it answers with.
#[derive(Debug)]
pub struct JobInitiator {
    http: Client,
    endpoint: String,
    referer: String,
    user_agent: String,
    patterns: ResponsePatterns,
}

impl JobInitiator {
    pub fn new(http: Client, config: &ClientConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            referer: config.referer.clone(),
            user_agent: config.user_agent.clone(),
            patterns: ResponsePatterns::compile(),
        }
    }

    pub async fn initiate(&self, request: &JobRequest) -> Result<JobHandle, ProtocolError> {
        debug!(
            "Submitting {} target(s) to node {} via {}",
            request.target_count(),
            request.node_id(),
            self.endpoint
        );
        let response = self
            .http
            .post(&self.endpoint)
            .header(REFERER, &self.referer)
            .header(USER_AGENT, &self.user_agent)
            .form(&request.form())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        if log_enabled!(Level::Trace) {
            trace!("Job submission response: {}", body);
        }

        let handle = self.patterns.parse(&body)?;
        debug!("Job {} accepted, results at {}", handle.task_id, handle.stream_url);
        Ok(handle)
    }
}

pub fn build_http_client(config: &ClientConfig) -> Result<Client, ProtocolError> {
    Ok(Client::builder().timeout(config.http_timeout).build()?)
}
