pub mod commands;
pub mod config;
pub mod error;
pub mod excel;
pub mod manual;
pub mod models;
pub mod services;
pub mod types;
pub mod web;

pub use config::AppConfig;
pub use error::{Error, Stage, StageError};
pub use models::InferenceContext;

use anyhow::Context;
use tracing::info;

/// Bind and serve the form application until the process is stopped.
pub async fn run(ctx: InferenceContext, config: AppConfig, bind: &str) -> anyhow::Result<()> {
    let state = web::AppState::new(ctx, config);
    let app = web::build_router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Could not bind {}", bind))?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}
