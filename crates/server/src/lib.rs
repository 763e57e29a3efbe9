//! Askboard Server Library
//!
//! Real-time classroom Q&A board: questions and replies over HTTP, live
//! updates fanned out to every connected WebSocket client, a single shared
//! admin identity behind bearer sessions, and a timed maintenance mode.

pub mod ai;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod hub;
pub mod maintenance;
pub mod models;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ai::{AiConfig, DisabledReplyGenerator, GenAiReplyGenerator, ReplyGenerator};
use auth::middleware::mw_require_admin;
use auth::SessionRegistry;
use config::{AppState, ServerConfig, DEFAULT_ADMIN_PASSWORD};
use handlers::{
    // Board
    clear_questions,
    create_question,
    create_reply,
    delete_question,
    delete_reply,
    list_questions,
    // Maintenance
    clear_maintenance,
    get_maintenance,
    set_maintenance,
    // Members
    list_members,
    member_count,
    // Auth
    login,
    logout,
    // Real-time
    ws_handler,
};
use hub::Hub;
use maintenance::MaintenanceManager;
use store::QuestionStore;

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Askboard Server ===");
    info!("Features: Questions | Live Fan-out | Admin Sessions | Maintenance | AI Answers");

    let config = ServerConfig::from_env();
    if config.admin_password == DEFAULT_ADMIN_PASSWORD && config.admin_password_hash.is_none() {
        warn!("Using the default admin password; set ADMIN_PASSWORD or ADMIN_PASSWORD_HASH");
    }

    let state = build_state(&config);
    info!(
        "Session tokens: {}",
        if config.session_secret.is_some() {
            "signed credentials"
        } else {
            "opaque ids"
        }
    );
    info!("Maintenance eviction policy: {:?}", config.eviction);

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Askboard server listening on http://{}", addr);
    info!("WebSocket endpoint: /ws");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the component stack into shared state.
pub fn build_state(config: &ServerConfig) -> AppState {
    let store = Arc::new(QuestionStore::new());
    let hub = Arc::new(Hub::new());
    let sessions = Arc::new(SessionRegistry::new(config));
    let maintenance = MaintenanceManager::new(hub.clone(), config.eviction);

    let ai: Arc<dyn ReplyGenerator> = if config.ai_enabled {
        Arc::new(GenAiReplyGenerator::new(AiConfig {
            model: config.ai_model.clone(),
            ..AiConfig::default()
        }))
    } else {
        info!("[@AnswerBot] disabled");
        Arc::new(DisabledReplyGenerator)
    };

    AppState {
        store,
        sessions,
        maintenance,
        hub,
        ai,
    }
}

pub fn router(state: AppState) -> Router {
    // Privileged routes sit behind the bearer-session gate.
    let admin_routes = Router::new()
        .route("/questions/{id}", delete(delete_question))
        .route("/questions/{id}/replies/{rid}", delete(delete_reply))
        .route("/admin/questions", delete(clear_questions))
        .route("/admin/logout", post(logout))
        .route(
            "/admin/maintenance",
            get(get_maintenance)
                .post(set_maintenance)
                .put(set_maintenance)
                .delete(clear_maintenance),
        )
        .route("/admin/members", get(list_members))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/{id}/replies", post(create_reply))
        .route("/members/count", get(member_count))
        .route("/admin/login", post(login))
        .route("/ws", get(ws_handler))
        .merge(admin_routes)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "time": Utc::now() }))
}
