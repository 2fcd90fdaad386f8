//! # Kate Binary
//!
//! Assembles the store, the Discord adapter, the services and the HTTP
//! server, then runs until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use kate_api::AppState;
use kate_configs::{LogFormat, LogSettings, Settings};
use kate_core::traits::InsultRepo;
use kate_db_sqlite::SqliteStore;
use kate_discord::{AnnouncerIdentity, DiscordChat, GatewayHandler};
use kate_services::{
    AcceptancePublisher, CatalogService, MentionResponder, SubmissionService, VoteRegistry,
    VoteSettings,
};
use secrecy::ExposeSecret;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Document store
    let store = Arc::new(SqliteStore::new(settings.store.database_url.expose_secret()).await?);
    for category in &settings.store.categories {
        store
            .create_category(category)
            .await
            .with_context(|| format!("seeding category {category}"))?;
    }

    // 2. Chat platform
    let identity = AnnouncerIdentity {
        username: settings.announcer.username.clone(),
        avatar_url: settings.announcer.avatar_url.clone(),
    };
    let chat = Arc::new(
        DiscordChat::connect(
            settings.discord.token.expose_secret(),
            settings.discord.channel_id,
            settings.discord.webhook_id,
            settings.discord.webhook_token.expose_secret(),
            identity,
        )
        .await?,
    );

    // 3. Services
    let publisher = Arc::new(AcceptancePublisher::new(store.clone(), chat.clone()));
    let vote_settings = VoteSettings {
        emoji: settings.votes.emoji.clone(),
        window: settings.votes.window(),
        threshold: settings.votes.threshold,
    };
    let votes = Arc::new(VoteRegistry::new(vote_settings, publisher));
    let state = AppState {
        submissions: Arc::new(SubmissionService::new(
            store.clone(),
            store.clone(),
            chat.clone(),
            votes.clone(),
        )),
        catalog: Arc::new(CatalogService::new(store.clone(), store.clone())),
        votes: votes.clone(),
    };
    let open_votes = votes.clone();
    let responder = Arc::new(MentionResponder::new(
        store.clone(),
        settings.mention.category.clone(),
    ));

    // 4. Gateway: reaction votes and mention replies
    let mut client = kate_discord::gateway(
        settings.discord.token.expose_secret(),
        GatewayHandler::new(votes, responder),
    )
    .await?;
    let shard_manager = client.shard_manager.clone();
    let gateway = tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!(error = %e, "discord gateway stopped");
        }
    });

    // 5. HTTP
    let app = kate_api::router(state, &settings.server.static_dir);
    let listener =
        tokio::net::TcpListener::bind((settings.server.host.as_str(), settings.server.port))
            .await
            .with_context(|| format!("binding {}:{}", settings.server.host, settings.server.port))?;
    info!("kate listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Open votes are dropped here; they do not survive a restart.
    info!(open_votes = open_votes.in_flight().len(), "shutting down");
    shard_manager.shutdown_all().await;
    if let Err(e) = gateway.await {
        error!(error = %e, "gateway task panicked");
    }
    store.close().await;
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
