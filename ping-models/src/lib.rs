pub mod job_request;
pub mod node;
pub mod stream_message;

pub use job_request::{GatewayPosition, InvalidArgument, JobRequest, Targets};
pub use node::Node;
pub use stream_message::{InboundMessage, PingEvent, SubscribeMessage, UNKNOWN_ADDRESS};
