use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, log_enabled, trace, warn, Level};
use ping_models::{InboundMessage, SubscribeMessage};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::error::{ConnectFailure, ProtocolError, StreamFailure};
use crate::job_call::JobHandle;
use crate::token::AuthToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Subscribing,
    Streaming,
    Completed,
    Failed,
}

/// What a session went through until it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// Events handed to the callback
    pub events: usize,
    /// Times the subscription was re-sent after a receive timeout
    pub resubscribes: u64,
}

enum Flow {
    Continue,
    Finished,
}

/// One persistent connection to the result stream of one job.
///
/// The session subscribes once, then waits for messages. Each wait is bounded by the receive
/// timeout; when it elapses, the identical subscription is sent again and waiting continues.
/// Control frames (ping/pong) do not count as messages and leave the running wait untouched.
/// There is no limit on how often this happens, so a service that never reports `finished`
/// keeps the session alive forever. Callers that need a hard deadline have to wrap
/// [StreamingSession::run] themselves.
pub struct StreamingSession {
    handle: JobHandle,
    token: AuthToken,
    recv_timeout: Duration,
    connect_timeout: Duration,
    state: SessionState,
    summary: SessionSummary,
}

impl StreamingSession {
    pub fn new(handle: JobHandle, token: AuthToken, recv_timeout: Duration) -> Self {
        Self {
            handle,
            token,
            recv_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: SessionState::Connecting,
            summary: SessionSummary::default(),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Runs the session to its end, passing every non-terminal payload to `on_event` as it
    /// arrives. On error, `on_event` may already have seen some events; these stay valid.
    pub async fn run<F>(mut self, mut on_event: F) -> Result<SessionSummary, ProtocolError>
    where
        F: FnMut(Value),
    {
        let subscribe = self.encode_subscribe()?;
        let mut ws = self.connect().await?;

        let result = self.drive(&mut ws, &subscribe, &mut on_event).await;
        match &result {
            Ok(_) => self.transition(SessionState::Completed),
            Err(e) => {
                debug!("[{}] Session failed: {}", self.handle.task_id, e);
                self.transition(SessionState::Failed)
            }
        }
        self.close(ws).await;
        result.map(|_| self.summary)
    }

    fn encode_subscribe(&mut self) -> Result<String, ProtocolError> {
        let msg = SubscribeMessage {
            task_id: self.handle.task_id.clone(),
            task_token: self.token.to_string(),
        };
        msg.to_json().map_err(|e| {
            self.transition(SessionState::Failed);
            StreamFailure::Encode(e).into()
        })
    }

    async fn connect(&mut self) -> Result<WsStream, ProtocolError> {
        debug!("[{}] Connecting to {}", self.handle.task_id, self.handle.stream_url);
        let attempt = timeout(
            self.connect_timeout,
            connect_async(self.handle.stream_url.as_str()),
        )
        .await;
        let source = match attempt {
            Ok(Ok((ws, _))) => return Ok(ws),
            Ok(Err(e)) => ConnectFailure::Handshake(e),
            Err(_) => ConnectFailure::TimedOut(self.connect_timeout),
        };
        self.transition(SessionState::Failed);
        Err(ProtocolError::Connection {
            url: self.handle.stream_url.clone(),
            source,
        })
    }

    async fn drive<F>(
        &mut self,
        ws: &mut WsStream,
        subscribe: &str,
        on_event: &mut F,
    ) -> Result<(), ProtocolError>
    where
        F: FnMut(Value),
    {
        self.transition(SessionState::Subscribing);
        send_subscribe(ws, subscribe).await?;
        // The service doesn't acknowledge subscriptions
        self.transition(SessionState::Streaming);

        loop {
            match self.next_message(ws).await? {
                None => {
                    self.summary.resubscribes += 1;
                    warn!(
                        "[{}] Nothing received for {:?}, re-sending subscription (#{})",
                        self.handle.task_id, self.recv_timeout, self.summary.resubscribes
                    );
                    send_subscribe(ws, subscribe).await?;
                }
                Some(msg) => {
                    if let Flow::Finished = self.handle_message(msg, on_event)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Next data or close frame, none if the receive timeout elapsed first.
    async fn next_message(&self, ws: &mut WsStream) -> Result<Option<Message>, StreamFailure> {
        let deadline = Instant::now() + self.recv_timeout;
        loop {
            match timeout_at(deadline, ws.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => return Err(StreamFailure::ClosedEarly),
                Ok(Some(Err(e))) => return Err(StreamFailure::Transport(e)),
                // tungstenite answers pings on its own
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)))) => {
                    trace!("[{}] Control frame, still waiting", self.handle.task_id);
                }
                Ok(Some(Ok(msg))) => return Ok(Some(msg)),
            }
        }
    }

    fn handle_message<F>(&mut self, msg: Message, on_event: &mut F) -> Result<Flow, ProtocolError>
    where
        F: FnMut(Value),
    {
        let (raw, parsed) = match msg {
            Message::Text(text) => {
                let parsed = InboundMessage::parse(&text);
                (text, parsed)
            }
            Message::Binary(bytes) => {
                // lossy text only for logs, parsing sees the real bytes
                let parsed = InboundMessage::parse_bytes(&bytes);
                (String::from_utf8_lossy(&bytes).into_owned(), parsed)
            }
            Message::Close(frame) => {
                debug!("[{}] Server sent close: {:?}", self.handle.task_id, frame);
                return Err(StreamFailure::ClosedEarly.into());
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(Flow::Continue),
        };
        if log_enabled!(Level::Trace) {
            trace!("[{}] Received: {}", self.handle.task_id, raw);
        }

        match parsed {
            Ok(InboundMessage::Finished) => {
                debug!(
                    "[{}] Job finished after {} event(s)",
                    self.handle.task_id, self.summary.events
                );
                Ok(Flow::Finished)
            }
            Ok(InboundMessage::Event(payload)) => {
                self.summary.events += 1;
                on_event(Value::Object(payload));
                Ok(Flow::Continue)
            }
            Err(source) => {
                error!(
                    "[{}] Received malformed message, giving up: {:?}",
                    self.handle.task_id, raw
                );
                Err(ProtocolError::MalformedMessage { raw, source })
            }
        }
    }

    async fn close(&self, mut ws: WsStream) {
        if let Err(e) = ws.close(None).await {
            trace!("[{}] Error while closing stream (ignored): {}", self.handle.task_id, e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        trace!("[{}] {:?} -> {:?}", self.handle.task_id, self.state, next);
        self.state = next;
    }
}

async fn send_subscribe(ws: &mut WsStream, subscribe: &str) -> Result<(), StreamFailure> {
    ws.send(Message::Text(subscribe.to_string())).await?;
    Ok(())
}
