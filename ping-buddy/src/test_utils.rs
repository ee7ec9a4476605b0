//! In-process stand-ins for the service: a one-shot HTTP responder for job submission and a
//! scripted WebSocket server for the result stream.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, Stream, StreamExt};
use log::trace;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Names lower-cased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn form_value(&self, name: &str) -> Option<String> {
        let as_query = Url::parse(&format!("http://form.invalid/?{}", self.body)).ok()?;
        as_query
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Answers exactly one HTTP request with a fixed status and body.
pub struct FakeHttpServer {
    url: String,
    captured_rx: oneshot::Receiver<CapturedRequest>,
}

impl FakeHttpServer {
    pub async fn start(status: u16, body: &str) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/batch_ping/", listener.local_addr()?);
        let (captured_tx, captured_rx) = oneshot::channel();
        let body = body.to_string();

        tokio::spawn(async move {
            if let Err(e) = Self::serve_once(listener, status, body, captured_tx).await {
                trace!("fake HTTP server failed: {:?}", e);
            }
        });
        Ok(Self { url, captured_rx })
    }

    async fn serve_once(
        listener: TcpListener,
        status: u16,
        body: String,
        captured_tx: oneshot::Sender<CapturedRequest>,
    ) -> Result<()> {
        let (stream, _) = listener.accept().await?;
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut headers = vec![];
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_lowercase(), value.trim().to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(key, _)| key == "content-length")
            .map(|(_, value)| value.parse::<usize>())
            .transpose()?
            .unwrap_or(0);
        let mut raw_body = vec![0u8; content_length];
        reader.read_exact(&mut raw_body).await?;

        let captured = CapturedRequest {
            method,
            path,
            headers,
            body: String::from_utf8(raw_body)?,
        };
        let _ = captured_tx.send(captured);

        let response = format!(
            "HTTP/1.1 {} Fake\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    pub async fn captured(self) -> Result<CapturedRequest> {
        self.captured_rx
            .await
            .map_err(|_| anyhow!("fake HTTP server received no request"))
    }
}

pub enum Step {
    /// Wait for the next text message from the client
    Expect,
    Send(String),
    SendBinary(Vec<u8>),
    /// Keepalive ping without payload
    Ping,
    Pause(Duration),
    /// Initiate a close handshake
    Close,
}

/// WebSocket server accepting a single client and playing a fixed script. Afterwards, it keeps
/// reading (and recording) until the client goes away.
pub struct FakeStreamServer {
    url: String,
    task: JoinHandle<Result<Vec<String>>>,
}

impl FakeStreamServer {
    pub async fn start(script: Vec<Step>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://{}/", listener.local_addr()?);
        let task = tokio::spawn(Self::serve_once(listener, script));
        Ok(Self { url, task })
    }

    async fn serve_once(listener: TcpListener, script: Vec<Step>) -> Result<Vec<String>> {
        let (stream, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .context("websocket handshake")?;
        let mut received = vec![];

        for step in script {
            let outcome = match step {
                Step::Expect => match next_text(&mut ws).await {
                    Some(text) => {
                        received.push(text);
                        Ok(())
                    }
                    None => return Ok(received),
                },
                Step::Send(text) => ws.send(Message::Text(text)).await,
                Step::SendBinary(bytes) => ws.send(Message::Binary(bytes)).await,
                Step::Ping => ws.send(Message::Ping(vec![])).await,
                Step::Pause(duration) => {
                    sleep(duration).await;
                    Ok(())
                }
                Step::Close => ws.close(None).await,
            };
            if outcome.is_err() {
                return Ok(received);
            }
        }

        while let Some(text) = next_text(&mut ws).await {
            received.push(text);
        }
        Ok(received)
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Text messages the client sent, available once the client disconnected.
    pub async fn received(self) -> Result<Vec<String>> {
        self.task.await?
    }
}

async fn next_text<S>(ws: &mut S) -> Option<String>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => return Some(text),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}
