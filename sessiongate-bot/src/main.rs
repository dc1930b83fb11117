//! sessiongate-bot: walks a user through login and sends back their `.session` file.
//!
//! # Setup
//! 1. Put `API_ID`, `API_HASH` and `BOT_TOKEN` in `.env` (or pass `--api-id` …).
//! 2. `cargo run -p sessiongate-bot`
//!
//! Logging: `RUST_LOG=sessiongate=debug cargo run -p sessiongate-bot`

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use layer_client::{BinaryFileBackend, Client};
use sessiongate::telegram::{LayerBot, LayerConnector, updates::to_event};
use sessiongate::{AuthBridge, Config, Controller};

const SWEEP_EVERY: Duration = Duration::from_secs(60);
const DEFAULT_LOG_FILTER: &str = "sessiongate=info,sessiongate_bot=info,layer_client=warn";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER)).init();

    let config = Config::parse();
    if let Err(e) = run(config).await {
        log::error!("fatal: {e}");
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    std::fs::create_dir_all(&config.sessions_dir)?;

    log::info!("Connecting…");
    let (client, shutdown) = Client::connect(layer_client::Config {
        api_id:          config.api_id,
        api_hash:        config.api_hash.clone(),
        session_backend: Arc::new(BinaryFileBackend::new(config.bot_session.clone())),
        ..Default::default()
    }).await?;

    if !client.is_authorized().await? {
        log::info!("Signing in as bot…");
        client.bot_sign_in(&config.bot_token).await?;
        client.save_session().await?;
    }

    let me = client.get_me().await?;
    let bot_id   = me.id;
    let username = me.username.clone().unwrap_or_default();
    log::info!("Logged in as @{username} (id={bot_id}), sessions in {}", config.sessions_dir.display());

    let controller = Arc::new(
        Controller::new(
            Arc::new(LayerBot::new(client.clone())),
            Arc::new(LayerConnector::new(config.api_id, config.api_hash.clone(), config.sessions_dir.clone())),
            AuthBridge::new(config.auth_workers, config.auth_timeout()),
        )
        .purge_after_delivery(config.purge_after_delivery),
    );

    if let Some(ttl) = config.session_ttl() {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_EVERY.min(ttl));
            loop {
                tick.tick().await;
                controller.sweep_stale(ttl).await;
            }
        });
    }

    let mut updates = client.stream_updates();
    log::info!("Listening for updates… (Ctrl+C to quit)");

    loop {
        let update = tokio::select! {
            u = updates.next() => match u {
                Some(u) => u,
                None => {
                    log::warn!("Update stream closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        };
        let Some(event) = to_event(update, bot_id, &username) else { continue };
        let controller = controller.clone();
        // Each update in its own task so the receive loop never blocks on an auth call
        tokio::spawn(async move {
            controller.handle(event).await;
        });
    }

    client.save_session().await?;
    shutdown.cancel();
    Ok(())
}
