use anyhow::Context;
use axum::{
    extract::{State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod game;
mod handler;
mod protocol;
mod room;
mod shared;
mod store;
mod transport;

use auth::TicketVerifier;
use config::Config;
use room::Directory;
use store::AccountStore;
use transport::client::MAX_FRAME_BYTES;
use transport::hub::Hub;
use transport::ws_session;

#[derive(Clone)]
struct AppState {
    hub: Arc<Hub>,
    router: Arc<handler::Router>,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    ensure_db_dir(&config.database_url)?;
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let verifier = TicketVerifier::new(
        config.trusted_key_prefixes.clone(),
        config.allowed_audiences.clone(),
        config.timestamp_tolerance,
    )?;
    if let (Some(url), Some(encoded)) = (&config.static_key_url, &config.static_key_b64) {
        let key = STANDARD
            .decode(encoded)
            .context("AUTH_STATIC_KEY is not valid base64")?;
        verifier.insert_key(url, key);
        tracing::info!(url = %url, "seeded static ticket key");
    }

    let hub = Arc::new(Hub::new());
    let router = Arc::new(handler::Router::new(
        Directory::new(),
        verifier,
        AccountStore::new(db),
    ));

    let dispatch = router.clone();
    let disconnect = router.clone();
    let runner = hub.clone();
    tokio::spawn(async move {
        runner
            .run(
                move |client, text| {
                    let router = dispatch.clone();
                    async move { router.dispatch(client, text).await }
                },
                move |client| {
                    let router = disconnect.clone();
                    async move { router.handle_disconnect(client).await }
                },
            )
            .await;
    });

    let state = Arc::new(AppState { hub, router });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app: Router = Router::new()
        .route("/api/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let address = format!("0.0.0.0:{}", config.port);
    tracing::info!("listening on {address}");

    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn ensure_db_dir(database_url: &str) -> anyhow::Result<()> {
    if database_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"));
    let Some(path) = path else { return Ok(()) };
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    let db_path = PathBuf::from(path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !db_path.exists() {
        std::fs::File::create(&db_path)?;
    }
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES).on_upgrade(move |socket| {
        ws_session::handle_socket(socket, state.hub.clone(), state.router.clone())
    })
}
