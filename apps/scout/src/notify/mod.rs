// Delivery to the operator: message formatting, batching and the Telegram sink.

pub mod dispatcher;
pub mod format;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Message rejected: {description}")]
    Rejected { description: String },
}

/// Where formatted messages go. One call is one outbound message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), SinkError>;
}
