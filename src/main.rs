use std::error::Error;
use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use teloxide::utils::command::BotCommands;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use vocabquizbot::catalog::{CatalogCache, SheetSource};
use vocabquizbot::commands::Command;
use vocabquizbot::config::{Config, DEFAULT_LOG_LEVEL};
use vocabquizbot::schema::schema;
use vocabquizbot::{Sessions, SheetCache};

fn init_tracing(level: &str) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_line_number(true)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Failed to set up logging: {e}");
    }
    log::info!("Loaded {:?}", config);

    let source = match SheetSource::new(&config.sheet_id, &config.sheet_gid) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Invalid spreadsheet address: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("Reading words from {}", source.url());

    let cache: Arc<SheetCache> = Arc::new(CatalogCache::new(
        source,
        config.refresh_interval,
        config.fetch_timeout,
    ));
    let sessions = Arc::new(Sessions::new());
    let config = Arc::new(config);

    let bot = Bot::new(config.bot_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Failed to register bot commands: {}", e);
    }
    log::info!("Starting bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![cache, sessions, config.clone()])
        .enable_ctrlc_handler()
        .build();

    if let Some(webhook) = config.webhook.clone() {
        let listener = match webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("Failed to build a webhook listener: {}", e);
                std::process::exit(1);
            }
        };
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await
    } else {
        dispatcher.dispatch().await
    }
}
