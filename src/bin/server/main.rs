use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use molpic::{config::Config, resolve::PubChem};

mod handlers;
mod templates;

pub(crate) struct AppState {
    pubchem: PubChem,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // usage: server [config.toml]
    let config = Config::load_or_default(std::env::args().nth(1))?;

    let state = Arc::new(AppState {
        pubchem: PubChem::new(&config.pubchem)?,
    });

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/generate", post(handlers::generate))
        .route("/image", get(handlers::image))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
