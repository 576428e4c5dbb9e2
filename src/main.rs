// Console harness for the chat moderation engine.
//
// This plays the part of the messaging layer: it composes one
// `ModerationService` and feeds it commands read from stdin, printing each
// outcome as a line of JSON. Handy for poking at thresholds from a `.env`
// file without standing up the web front end.
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize the service (dependency injection)
// 3. Run the command loop

mod console;

use chat_moderation::{ModerationConfig, ModerationService, SystemClock};
use console::Command;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = ModerationConfig::from_env()?;
    tracing::info!(
        "Moderation config: {} messages per {}s, max length {}",
        config.max_messages_per_window,
        config.spam_window_secs,
        config.max_message_length
    );

    let service = ModerationService::new(SystemClock, config)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", line, e);
                continue;
            }
        };

        match console::execute(&service, command) {
            Ok(output) => println!("{}", output),
            Err(e) => tracing::error!("Command failed: {}", e),
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
