use anyhow::Context;
use api_client::LemonClient;
use clap::{Parser, Subcommand};
use configuration::{init_tracing, load_config};
use engine::commands::Command;
use engine::messages::OutputMessage;
use engine::{ConversationId, TradeEngine};
use std::path::PathBuf;
use std::sync::Arc;
use telegram::{run_bot_service, TelegramClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// The conversation id used by the console.
const CONSOLE_CONVERSATION: ConversationId = 0;

/// Trade securities through a conversation, backed by the lemon.markets API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot.
    Telegram,
    /// Hold one conversation on stdin/stdout.
    Console,
}

/// The main entry point for the Lemon Trader application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; everything can come from the environment.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = init_tracing(&config.logging)?;

    let api_client = Arc::new(LemonClient::new(&config.gateway)?);
    let engine = Arc::new(TradeEngine::from_config(api_client, &config));
    tracing::info!(venue = %config.gateway.venue, "Trade engine ready.");

    match cli.command {
        Commands::Telegram => {
            let bot = TelegramClient::new(&config.telegram)?;
            tokio::select! {
                _ = run_bot_service(bot, engine, config.telegram.clone()) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received. Stopping the bot.");
                }
            }
        }
        Commands::Console => run_console(engine).await?,
    }
    Ok(())
}

fn print_reply(message: &OutputMessage) {
    println!("{}", message.text);
    if !message.suggested_replies.is_empty() {
        let choices: Vec<String> = message
            .suggested_replies
            .iter()
            .map(|reply| format!("[{}]", reply))
            .collect();
        println!("{}", choices.join(" "));
    }
    println!();
}

/// Reads user turns from stdin. Turns are handled in order, but `/cancel`
/// is handled at once so it can interrupt a pending order.
async fn run_console(engine: Arc<TradeEngine>) -> anyhow::Result<()> {
    println!("Lemon Trader console. Send /start to begin, Ctrl-D to quit.\n");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let worker = {
        let engine = engine.clone();
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                print_reply(&engine.handle(CONSOLE_CONVERSATION, &line).await);
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if matches!(Command::parse(&line), Some(Command::Cancel)) {
            print_reply(&engine.cancel(CONSOLE_CONVERSATION).await);
            continue;
        }
        tx.send(line).context("Console worker stopped")?;
    }

    drop(tx);
    worker.await?;
    Ok(())
}
