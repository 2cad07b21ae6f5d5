//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod clients;
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use crate::{
    config::{connect_pool, AppState, Collaborators, Config},
    db::Repositories,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // If configuration fails the application must not start
    let config = Config::from_env()?;

    let repos = match &config.database_url {
        Some(database_url) => {
            let pool = connect_pool(database_url).await?;

            // Embedded migrations run on every start
            sqlx::migrate!()
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Repositories::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Repositories::in_memory()
        }
    };

    let collaborators = Collaborators::from_config(&config)?;
    let app_state = AppState::new(&config.services, repos, collaborators);
    let cors = routes::cors_layer(config.cors_origin.as_deref())?;
    let app = routes::app(app_state, cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
