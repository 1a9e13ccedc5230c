//! Sage HTTP 入口
//!
//! 启动: cargo run --bin sage-web --features web
//! POST /api/chat {"query": "...", "web_search": false, "ai_search": false, "graph": false}

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use sage::config::load_config_or_default;
use sage::{build_orchestrator, observability, CapabilityFlags, ExchangeOrchestrator, TierKind};

#[derive(Debug, Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    web_search: bool,
    /// 文档检索开关（沿用 ai_search 字段名）
    #[serde(default, alias = "indexed_search")]
    ai_search: bool,
    #[serde(default)]
    graph: bool,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    plan: String,
    tier: TierKind,
}

async fn api_chat(
    State(orchestrator): State<Arc<ExchangeOrchestrator>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let flags = CapabilityFlags {
        web_search: req.web_search,
        indexed_search: req.ai_search,
        graph: req.graph,
    };
    let response = orchestrator
        .handle_text(req.query, flags)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(ChatResponse {
        response: response.text,
        plan: response.trace,
        tier: response.tier,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config_or_default(None);
    let orchestrator = Arc::new(build_orchestrator(&cfg));

    let app = Router::new()
        .route("/api/chat", post(api_chat))
        .route("/health", get(|| async { "OK" }))
        .with_state(orchestrator);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(
        "{} web listening on http://{}",
        cfg.app.name.as_deref().unwrap_or("sage"),
        addr
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
