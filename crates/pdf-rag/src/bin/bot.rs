//! Telegram bot binary
//!
//! Run with: TELEGRAM_BOT_TOKEN=... cargo run -p pdf-rag --bin pdf-rag-bot

use anyhow::Context;
use clap::Parser;
use pdf_rag::{
    bot::{BotHandler, TelegramClient},
    config::RagConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdf-rag-bot", version, about = "Telegram front-end for the PDF RAG service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load(args.config.as_deref())?;
    let bot = &config.bot;

    let token = bot
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .context("TELEGRAM_BOT_TOKEN is not set")?;

    tracing::info!("RAG service: {}", bot.api_url);
    tracing::info!("Feedback log: {}", bot.feedback_log.display());

    let transport = Arc::new(TelegramClient::new(
        token,
        &bot.telegram_url,
        bot.poll_timeout_secs,
    )?);
    let handler = BotHandler::from_config(transport, bot)?;

    handler.run(bot.poll_timeout_secs).await?;

    Ok(())
}
