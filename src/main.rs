use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod content;
mod error;
mod game_logic;
mod library;
mod session_actor;
mod state;
mod web;

use crate::config::load_settings;
use crate::content::loader_from_config;
use crate::error::Result as AppResult;
use crate::library::GameLibrary;
use crate::state::AppState;
use crate::web::run_server;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,tower_http=debug", env!("CARGO_PKG_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_settings = load_settings()?;
    tracing::info!("Configuration loaded: {:?}", app_settings);

    let http_client = reqwest::Client::new();
    let loader = loader_from_config(&app_settings.content, http_client.clone())?;

    let library = match GameLibrary::load(&app_settings.content, &http_client).await {
        Ok(library) => library,
        Err(e) => {
            tracing::warn!(error = %e, "Game library unavailable, titles will fall back to game ids");
            GameLibrary::default()
        }
    };

    let app_state = AppState::new(loader, Arc::new(library), app_settings.quiz);

    run_server(app_state, app_settings.server).await?;

    Ok(())
}
