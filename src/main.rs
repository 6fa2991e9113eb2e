// ABOUTME: Main entry point for the aibot Matrix bot with sync loop
// ABOUTME: Initializes logging, config, the language-model backend, Matrix client and event handlers

use aibot::{matrix_client, matrix_interface::MatrixInterface, message_handler};
use aibot_agent::AgentRegistry;
use aibot_core::{config::Config, Router};
use anyhow::{Context, Result};
use clap::Parser;
use matrix_sdk::{
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{OriginalSyncRoomMemberEvent, StrippedRoomMemberEvent},
        message::OriginalSyncRoomMessageEvent,
    },
    Client, RoomState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aibot", version, about = "Matrix bot that answers through a language model")]
struct Cli {
    /// Config file; takes precedence over AIBOT_CONFIG_PATH and ./config.toml
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print the available backend types and exit
    #[arg(long)]
    list_backends: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n╔══════════════════════════════════════════════════════════╗");
        eprintln!("║ PANIC! Bot crashed with the following error:            ║");
        eprintln!("╚══════════════════════════════════════════════════════════╝\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,matrix_sdk_crypto=error".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let registry = AgentRegistry::default();
    if cli.list_backends {
        for name in registry.available() {
            println!("{}", name);
        }
        return Ok(());
    }

    tracing::info!("Starting aibot");

    dotenvy::dotenv().ok();
    let config = Config::load_with(cli.config.as_deref())?;

    tracing::info!(
        homeserver = %config.matrix.home_server,
        user_id = %config.matrix.user_id,
        backend = %config.backend.backend_type,
        addressing = %config.bot.addressing,
        fast_model = %config.models.fast.name,
        advanced_model = %config.models.advanced.name,
        "Configuration loaded"
    );

    let backend = registry
        .create(&config.backend.backend_type, &config.backend_settings())
        .with_context(|| format!("Failed to start {} backend", config.backend.backend_type))?;
    let router = Arc::new(Router::new(
        config.bot.clone(),
        config.models.clone(),
        backend,
    )?);

    let client = matrix_client::create_client(&config.matrix).await?;
    matrix_client::login(&client, &config.matrix).await?;
    let chat = Arc::new(MatrixInterface::new(client.clone())?);

    if config.bot.auto_join {
        client.add_event_handler(
            |ev: StrippedRoomMemberEvent, client: Client, room: Room| async move {
                if client.user_id() != Some(&*ev.state_key) {
                    return; // Not an invite for us
                }
                if room.state() != RoomState::Invited {
                    return;
                }

                tracing::info!(
                    room_id = %room.room_id(),
                    inviter = %ev.sender,
                    "Auto-joining room invite"
                );
                if let Err(e) = room.join().await {
                    tracing::error!(
                        error = %e,
                        room_id = %room.room_id(),
                        "Failed to join room"
                    );
                }
            },
        );
    }

    // Perform initial sync to upload device keys and establish encryption
    tracing::info!("Performing initial sync to set up encryption...");
    let response = client
        .sync_once(SyncSettings::default())
        .await
        .context("Initial sync failed")?;

    tracing::info!("Initial sync complete");

    // Registered after the initial sync so history from before startup is not answered
    let router_for_messages = Arc::clone(&router);
    let chat_for_messages = Arc::clone(&chat);
    client.add_event_handler(move |event: OriginalSyncRoomMessageEvent, room: Room| {
        let router = Arc::clone(&router_for_messages);
        let chat = Arc::clone(&chat_for_messages);
        async move {
            tokio::spawn(async move {
                let room_id = room.room_id().to_owned();
                if let Err(e) =
                    message_handler::handle_message(&router, &chat, room, event).await
                {
                    tracing::error!(room_id = %room_id, error = %e, "Error handling message");
                }
            });
        }
    });

    let router_for_members = Arc::clone(&router);
    let chat_for_members = Arc::clone(&chat);
    client.add_event_handler(move |event: OriginalSyncRoomMemberEvent, room: Room| {
        let router = Arc::clone(&router_for_members);
        let chat = Arc::clone(&chat_for_members);
        async move {
            tokio::spawn(async move {
                let room_id = room.room_id().to_owned();
                if let Err(e) =
                    message_handler::handle_membership(&router, &chat, room, event).await
                {
                    tracing::error!(room_id = %room_id, error = %e, "Error handling membership change");
                }
            });
        }
    });

    tracing::info!("Message and membership handlers registered");

    // Start continuous sync loop with the sync token from initial sync
    let settings = SyncSettings::default().token(response.next_batch);
    tracing::info!("Starting continuous sync loop");
    client.sync(settings).await?;

    Ok(())
}
