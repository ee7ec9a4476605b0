use std::time::Duration;

use log::info;
use ping_models::{GatewayPosition, JobRequest, Targets};
use reqwest::Client;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{BatchPingError, PingError};
use crate::job_call::{build_http_client, JobInitiator};
use crate::stream::{SessionSummary, StreamingSession};
use crate::token;

/// Per-call knobs of a batch ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingOptions {
    /// Have the service drop network/broadcast addresses of submitted CIDR blocks
    pub cidr_filter: bool,
    pub gateway: GatewayPosition,
    /// Overrides the receive timeout of the client config
    pub recv_timeout: Option<Duration>,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            cidr_filter: true,
            gateway: GatewayPosition::Last,
            recv_timeout: None,
        }
    }
}

impl PingOptions {
    pub fn to_request(
        &self,
        targets: impl Into<Targets>,
        node_id: &str,
    ) -> Result<JobRequest, PingError> {
        Ok(JobRequest::new(targets, node_id)?
            .with_cidr_filter(self.cidr_filter)
            .with_gateway(self.gateway))
    }
}

/// Submits a job, derives its token and streams its results, all in one call.
#[derive(Debug)]
pub struct BatchPing {
    config: ClientConfig,
    initiator: JobInitiator,
}

impl BatchPing {
    pub fn new(config: ClientConfig) -> Result<Self, BatchPingError> {
        let http = build_http_client(&config)?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: ClientConfig, http: Client) -> Self {
        let initiator = JobInitiator::new(http, &config);
        Self { config, initiator }
    }

    /// Validates the arguments, then runs one job to completion. `on_event` receives every
    /// result payload as-is, in arrival order.
    pub async fn run<F>(
        &self,
        targets: impl Into<Targets>,
        node_id: &str,
        on_event: F,
        options: &PingOptions,
    ) -> Result<SessionSummary, PingError>
    where
        F: FnMut(Value),
    {
        let request = options.to_request(targets, node_id)?;
        let recv_timeout = options.recv_timeout.unwrap_or(self.config.recv_timeout);
        Ok(self.execute(&request, recv_timeout, on_event).await?)
    }

    /// Same as [BatchPing::run], but blocks the calling thread on a private single-threaded
    /// runtime. Must not be called from within an async context.
    pub fn run_blocking<F>(
        &self,
        targets: impl Into<Targets>,
        node_id: &str,
        on_event: F,
        options: &PingOptions,
    ) -> Result<SessionSummary, PingError>
    where
        F: FnMut(Value),
    {
        // validate before spinning anything up
        let request = options.to_request(targets, node_id)?;
        let recv_timeout = options.recv_timeout.unwrap_or(self.config.recv_timeout);
        self.block_on_execute(&request, recv_timeout, on_event)
    }

    fn block_on_execute<F>(
        &self,
        request: &JobRequest,
        recv_timeout: Duration,
        on_event: F,
    ) -> Result<SessionSummary, PingError>
    where
        F: FnMut(Value),
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PingError::Runtime)?;
        Ok(runtime.block_on(self.execute(request, recv_timeout, on_event))?)
    }

    pub async fn execute<F>(
        &self,
        request: &JobRequest,
        recv_timeout: Duration,
        on_event: F,
    ) -> Result<SessionSummary, BatchPingError>
    where
        F: FnMut(Value),
    {
        let handle = self.initiator.initiate(request).await?;
        let token = token::derive(&handle.task_id, &self.config.token_suffix);
        let summary = StreamingSession::new(handle, token, recv_timeout)
            .with_connect_timeout(self.config.connect_timeout)
            .run(on_event)
            .await?;
        info!(
            "Node {} reported {} result(s) for {} target(s)",
            request.node_id(),
            summary.events,
            request.target_count()
        );
        Ok(summary)
    }
}

/// Runs one batch ping against the default service, blocking until the job finished or failed.
///
/// Argument errors surface as [PingError::InvalidArgument] before any network activity,
/// everything after that as [PingError::BatchPing].
pub fn batch_ping<F>(
    targets: impl Into<Targets>,
    node_id: &str,
    on_event: F,
    options: &PingOptions,
) -> Result<SessionSummary, PingError>
where
    F: FnMut(Value),
{
    let request = options.to_request(targets, node_id)?;
    let mut config = ClientConfig::default();
    if let Some(recv_timeout) = options.recv_timeout {
        config = config.with_recv_timeout(recv_timeout);
    }
    let client = BatchPing::new(config)?;
    client.block_on_execute(&request, client.config.recv_timeout, on_event)
}

#[cfg(test)]
mod tests {
    use assertor::*;
    use ping_models::InvalidArgument;
    use serde_json::json;

    use super::*;
    use crate::error::ProtocolError;
    use crate::test_utils::{FakeHttpServer, FakeStreamServer, Step};

    fn submission_page(stream_url: &str, task_id: &str) -> String {
        format!(
            "<html><script>var wss_url='{}';\nvar task_id='{}';</script></html>",
            stream_url, task_id
        )
    }

    fn quick_options() -> PingOptions {
        PingOptions {
            recv_timeout: Some(Duration::from_millis(200)),
            ..PingOptions::default()
        }
    }

    #[test]
    fn empty_targets_fail_before_network() {
        // given
        let mut calls = 0;
        // when
        let result = batch_ping("", "node1", |_| calls += 1, &PingOptions::default());
        // then
        assert!(
            matches!(result, Err(PingError::InvalidArgument(InvalidArgument::EmptyTargets))),
            "got {:?}",
            result
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn empty_node_fails_before_network() {
        // endpoint would refuse the connection, which would be a transport error
        let client = BatchPing::new(ClientConfig::with_endpoint("http://127.0.0.1:1/"))
            .expect("client to build");

        let result = client.run_blocking(["1.1.1.1"], " ", |_| {}, &PingOptions::default());

        assert!(
            matches!(result, Err(PingError::InvalidArgument(InvalidArgument::EmptyNodeId))),
            "got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn full_job() -> anyhow::Result<()> {
        // given
        let stream = FakeStreamServer::start(vec![
            Step::Expect,
            Step::Send(r#"{"ip":"1.1.1.1","result":"5","address":"Sydney"}"#.to_string()),
            Step::Send(r#"{"ip":"1.0.0.1","result":"timeout"}"#.to_string()),
            Step::Send(r#"{"type":"finished"}"#.to_string()),
        ])
        .await?;
        let http = FakeHttpServer::start(200, &submission_page(&stream.url(), "job-42")).await?;
        let client = BatchPing::new(ClientConfig::with_endpoint(http.url()))?;
        let mut seen = vec![];

        // when
        let summary = client
            .run(
                vec!["1.1.1.1".to_string(), "1.0.0.1".to_string()],
                "node1",
                |it| seen.push(it),
                &quick_options(),
            )
            .await?;

        // then
        assert_that!(summary.events).is_equal_to(2);
        assert_eq!(
            seen,
            vec![
                json!({"ip": "1.1.1.1", "result": "5", "address": "Sydney"}),
                json!({"ip": "1.0.0.1", "result": "timeout"}),
            ]
        );
        let submitted = http.captured().await?;
        assert_eq!(submitted.form_value("host").as_deref(), Some("1.1.1.1\r\n1.0.0.1"));
        let subscriptions = stream.received().await?;
        let first: Value = serde_json::from_str(&subscriptions[0])?;
        assert_eq!(first["task_id"], "job-42");
        assert_eq!(
            first["task_token"],
            token::derive("job-42", crate::config::DEFAULT_TOKEN_SUFFIX).as_str()
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejection_is_wrapped() -> anyhow::Result<()> {
        // given
        let http = FakeHttpServer::start(
            200,
            r#"<script>err_tip_more("<li>quota exceeded</li>");</script>"#,
        )
        .await?;
        let client = BatchPing::new(ClientConfig::with_endpoint(http.url()))?;

        // when
        let result = client.run("1.1.1.1", "node1", |_| {}, &quick_options()).await;

        // then
        let err = result.expect_err("rejection to fail the call");
        match err.protocol_cause() {
            Some(ProtocolError::ServiceRejected { message }) => assert_eq!(message, "quota exceeded"),
            other => panic!("expected rejection, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn blocking_call_drives_session() -> anyhow::Result<()> {
        // given
        let server_rt = tokio::runtime::Runtime::new()?;
        let (stream, http) = server_rt.block_on(async {
            let stream = FakeStreamServer::start(vec![
                Step::Expect,
                Step::Send(r#"{"ip":"9.9.9.9","result":"11"}"#.to_string()),
                Step::Send(r#"{"type":"finished"}"#.to_string()),
            ])
            .await?;
            let http = FakeHttpServer::start(200, &submission_page(&stream.url(), "t")).await?;
            anyhow::Ok((stream, http))
        })?;
        let client = BatchPing::new(ClientConfig::with_endpoint(http.url()))?;
        let mut ips = vec![];

        // when
        let summary = client.run_blocking(
            "9.9.9.9",
            "node1",
            |it| ips.push(it["ip"].as_str().unwrap_or_default().to_string()),
            &quick_options(),
        )?;

        // then
        assert_that!(summary.events).is_equal_to(1);
        assert_eq!(ips, vec!["9.9.9.9"]);
        drop((stream, http));
        Ok(())
    }
}
