mod agent;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod service;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::OpenAiAgentService;
use crate::config::Settings;
use crate::db::conversation_repository::ConversationRepository;
use crate::db::message_repository::MessageRepository;
use crate::routes::api_routes::{
    chat_handler, create_conversation_handler, get_conversation_handler, health_handler,
    list_conversations_handler, update_conversation_handler,
};
use crate::routes::AppState;
use crate::service::chat_service::ChatService;
use crate::service::conversation_service::ConversationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_api=debug,tower_http=debug".into()),
        )
        .init();

    let settings = Settings::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = db::connect(&settings.database_url).await?;
    info!("Database connection established and migrations applied");

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let conversation_repo = ConversationRepository::new(pool.clone());
    let message_repo = MessageRepository::new(pool.clone());
    let conversation_service = ConversationService::new(conversation_repo, message_repo);

    let backend = Arc::new(OpenAiAgentService::new(
        &settings.openai_api_key,
        settings.openai_model.clone(),
        settings.max_tokens,
    ));
    let chat_service = ChatService::new(conversation_service.clone(), backend);

    let state = AppState { chat_service, conversation_service };

    // ── Router ────────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route(
            "/conversations",
            get(list_conversations_handler).post(create_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation_handler).put(update_conversation_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
