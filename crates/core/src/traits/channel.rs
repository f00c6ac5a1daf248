//! Outbound channel interface

use async_trait::async_trait;

use crate::error::Result;

/// A delivery channel for outbound messages.
///
/// The driver itself is channel-agnostic and only produces
/// [`MessageOutput`](crate::types::MessageOutput); adapters implement
/// this trait to push messages to their platform.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<()>;

    /// Send a text message with selectable option titles.
    async fn send_buttons(&self, recipient: &str, text: &str, options: &[String]) -> Result<()>;

    /// Send an image by URL.
    async fn send_image(&self, recipient: &str, url: &str) -> Result<()>;
}
