//! Console outbound channel
//!
//! The simplest possible [`OutboundChannel`]: writes to stdout. Used by
//! the console demo binary.

use async_trait::async_trait;

use flowbot_core::{OutboundChannel, Result};

#[derive(Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutboundChannel for ConsoleChannel {
    async fn send_text(&self, _recipient: &str, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    async fn send_buttons(&self, _recipient: &str, text: &str, options: &[String]) -> Result<()> {
        println!("{text}");
        for (index, option) in options.iter().enumerate() {
            println!("  {}. {option}", index + 1);
        }
        Ok(())
    }

    async fn send_image(&self, _recipient: &str, url: &str) -> Result<()> {
        println!("[image] {url}");
        Ok(())
    }
}
