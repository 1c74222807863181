//! HTTP surface for the interception collaborator and the operator console.
//!
//! These routes are the only way core state is mutated from outside the pipeline.

use crate::enforcer::{EnforcementAction, InterceptedRequest, RequestEnforcer};
use crate::engine::{BlockEvent, ListKind, Verdict};
use crate::error::PatternError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

struct ApiState {
    enforcer: Arc<RequestEnforcer>,
    recent_default: usize,
}

pub fn router(enforcer: Arc<RequestEnforcer>, recent_default: usize) -> Router {
    let state = Arc::new(ApiState {
        enforcer,
        recent_default,
    });

    Router::new()
        .route("/api/enforce", post(enforce))
        .route("/api/decide", get(decide))
        .route("/api/history", get(history))
        .route("/api/rules", get(list_rules))
        .route("/api/rules/:list", post(add_rule).delete(remove_rule))
        .route("/api/cache/clear", post(clear_cache))
        .route("/blocked", get(blocked_page))
        .with_state(state)
}

pub async fn start_api_server(
    enforcer: Arc<RequestEnforcer>,
    recent_default: usize,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("API Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(enforcer, recent_default)).await?;
    Ok(())
}

async fn enforce(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<InterceptedRequest>,
) -> Json<EnforcementAction> {
    Json(state.enforcer.enforce(&request).await)
}

#[derive(Deserialize)]
struct DecideQuery {
    url: String,
}

async fn decide(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DecideQuery>,
) -> Json<Verdict> {
    Json(state.enforcer.pipeline().decide(&query.url).await)
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<BlockEvent>> {
    let limit = query.limit.unwrap_or(state.recent_default);
    Json(state.enforcer.ledger().recent(limit))
}

async fn list_rules(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let pipeline = state.enforcer.pipeline();
    Json(serde_json::json!({
        "allowlist": pipeline.patterns(ListKind::Allow),
        "denylist": pipeline.patterns(ListKind::Deny),
    }))
}

#[derive(Deserialize)]
struct PatternRequest {
    pattern: String,
}

async fn add_rule(
    State(state): State<Arc<ApiState>>,
    Path(list): Path<ListKind>,
    Json(payload): Json<PatternRequest>,
) -> Response {
    match state.enforcer.pipeline().add_pattern(list, &payload.pattern) {
        Ok(added) => Json(serde_json::json!({ "added": added })).into_response(),
        Err(e) => pattern_error(e),
    }
}

async fn remove_rule(
    State(state): State<Arc<ApiState>>,
    Path(list): Path<ListKind>,
    Json(payload): Json<PatternRequest>,
) -> impl IntoResponse {
    let removed = state.enforcer.pipeline().remove_pattern(list, &payload.pattern);
    Json(serde_json::json!({ "removed": removed }))
}

async fn clear_cache(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    state.enforcer.pipeline().clear_cache();
    Json(serde_json::json!({ "status": "cache_cleared" }))
}

#[derive(Deserialize)]
struct BlockedQuery {
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
}

/// Interstitial shown in place of a blocked navigation.
async fn blocked_page(Query(query): Query<BlockedQuery>) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>Blocked</title></head><body>\
         <h1>This page was blocked</h1>\
         <p><code>{}</code></p><p>Reason: {}</p></body></html>",
        escape_html(&query.url),
        escape_html(&query.source)
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn pattern_error(e: PatternError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("http://plain.com/"), "http://plain.com/");
    }
}
