// Utterlog Entry Point
// Console host for the message-enrichment bot: one utterance per stdin line.

mod actors;
mod brain;
mod config;
mod database;
mod error;
mod logging;
mod models;

#[cfg(test)]
mod tests;

use actors::supervisor::SupervisorHandle;
use anyhow::Context;
use config::BotConfig;
use models::Activity;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const CONSOLE_CONVERSATION: &str = "console";
const CONSOLE_CHANNEL: &str = "console";

/// Activity for one console line, sent as typed. Blank lines yield nothing.
fn console_activity(line: &str) -> Option<Activity> {
    if line.trim().is_empty() {
        return None;
    }
    Some(Activity::new(CONSOLE_CONVERSATION, CONSOLE_CHANNEL, line))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::load().context("Failed to load configuration")?;
    logging::init(config.log_format).context("Failed to initialize logging")?;

    info!(
        partition = %config.storage.partition,
        policy = %config.failure_policy,
        retries = config.retry.max_retries,
        "Starting utterlog"
    );

    let pool = database::init_db(&config.storage.db_path)
        .await
        .context("Failed to initialize database")?;
    let supervisor = SupervisorHandle::new(&config, pool.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(activity) = console_activity(&line) else {
            continue;
        };

        match supervisor.process_activity(activity).await {
            Ok(outcome) => {
                for reply in &outcome.replies {
                    println!("{}", reply);
                }
                match &outcome.failure {
                    Some(f) if f.is_analysis_failure() => warn!("Message not enriched: {}", f),
                    Some(f) => error!("Message not stored: {}", f),
                    None => info!(stored = outcome.stored(), "Turn complete"),
                }
            }
            Err(e) => error!("Failed to handle message: {}", e),
        }
    }

    if let Some(state) = supervisor.conversation(CONSOLE_CONVERSATION).await? {
        info!(
            messages = state.message_count,
            last_seen = %state.timestamp,
            "Console conversation ended"
        );
    }
    let stored = database::count_documents(&pool, &config.storage.partition).await?;
    info!(stored, "Input closed, exiting");

    supervisor.shutdown().await?;
    Ok(())
}
