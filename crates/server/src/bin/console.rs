//! Console demo
//!
//! Drives a single conversation from stdin. Uses the configured NLU
//! endpoint; when the classifier is unreachable the driver answers with
//! the default prompt, so the demo stays usable.

use std::io::{BufRead, Write};
use std::sync::Arc;

use flowbot_config::{load_settings, Settings};
use flowbot_core::{NluOracle, OutboundChannel};
use flowbot_server::{ConsoleChannel, Engine, HttpNluOracle};

const USER_ID: &str = "admin";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let env = std::env::var("FLOWBOT_ENV").ok();
    let mut config = load_settings(env.as_deref()).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {e}. Using defaults.");
        Settings::default()
    });
    // the demo keeps no history between runs
    config.persistence.enabled = false;

    let nlu: Arc<dyn NluOracle> = Arc::new(HttpNluOracle::new(&config.nlu)?);
    let engine = Engine::build(&config, nlu)?;
    let channel = ConsoleChannel::new();

    println!("flowbot console demo - empty line quits");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let conversation = engine.conversations.get(USER_ID, USER_ID).await;
        let output = {
            let mut conversation = conversation.lock().await;
            engine
                .controller
                .handle(&mut conversation, Some(message))
                .await
        };
        engine.conversations.save(USER_ID).await;

        let text = output.text.as_deref().unwrap_or("");
        match &output.button {
            Some(options) => channel.send_buttons(USER_ID, text, options).await?,
            None => channel.send_text(USER_ID, text).await?,
        }
    }

    Ok(())
}
