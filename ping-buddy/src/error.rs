use std::time::Duration;

use ping_models::InvalidArgument;
use reqwest::StatusCode;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Everything that can go wrong talking to the service, after arguments were accepted.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("job submission request failed (HTTP status: {status:?})")]
    Transport {
        status: Option<StatusCode>,
        source: reqwest::Error,
    },

    #[error("service rejected the job: {message}")]
    ServiceRejected { message: String },

    #[error("unable to locate `{field}` in the job submission response")]
    ResponseParse { field: &'static str },

    #[error("unable to connect to result stream at `{url}`")]
    Connection { url: String, source: ConnectFailure },

    #[error("received malformed stream message: `{raw}`")]
    MalformedMessage {
        raw: String,
        source: serde_json::Error,
    },

    #[error("result stream failed")]
    Stream { source: StreamFailure },
}

#[derive(Error, Debug)]
pub enum ConnectFailure {
    #[error(transparent)]
    Handshake(#[from] tungstenite::Error),

    #[error("no handshake completed within {0:?}")]
    TimedOut(Duration),
}

#[derive(Error, Debug)]
pub enum StreamFailure {
    #[error(transparent)]
    Transport(#[from] tungstenite::Error),

    #[error("server closed the stream before the job finished")]
    ClosedEarly,

    #[error("unable to encode subscribe message")]
    Encode(#[source] serde_json::Error),
}

impl From<StreamFailure> for ProtocolError {
    fn from(source: StreamFailure) -> Self {
        ProtocolError::Stream { source }
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(source: reqwest::Error) -> Self {
        ProtocolError::Transport {
            status: source.status(),
            source,
        }
    }
}

/// Single error surface for all protocol stages of one batch ping.
#[derive(Error, Debug)]
#[error("batch ping failed")]
pub struct BatchPingError {
    #[from]
    cause: ProtocolError,
}

impl BatchPingError {
    pub fn cause(&self) -> &ProtocolError {
        &self.cause
    }
}

/// Result of the façade: argument errors are kept apart from everything that happened on the
/// network.
#[derive(Error, Debug)]
pub enum PingError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    #[error(transparent)]
    BatchPing(#[from] BatchPingError),

    #[error("unable to start async runtime for blocking call")]
    Runtime(#[source] std::io::Error),
}

impl From<ProtocolError> for PingError {
    fn from(cause: ProtocolError) -> Self {
        PingError::BatchPing(cause.into())
    }
}

impl PingError {
    /// The protocol-level cause, if this is not an argument error.
    pub fn protocol_cause(&self) -> Option<&ProtocolError> {
        match self {
            PingError::BatchPing(err) => Some(err.cause()),
            PingError::InvalidArgument(_) | PingError::Runtime(_) => None,
        }
    }
}
