#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What the fake classifier answers with.
#[derive(Clone)]
pub enum Reply {
    Json(serde_json::Value),
    Status(u16),
    Raw(&'static str),
    Slow(Duration),
}

#[derive(Clone)]
struct FakeState {
    reply: Reply,
    seen: Arc<Mutex<Vec<serde_json::Value>>>,
}

pub struct FakeClassifier {
    pub endpoint: String,
    pub seen: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn analyze(
    State(state): State<FakeState>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    state.seen.lock().unwrap().push(body);
    match state.reply {
        Reply::Json(v) => Json(v).into_response(),
        Reply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        Reply::Raw(text) => text.into_response(),
        Reply::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(serde_json::json!({ "decision": "BLOCK" })).into_response()
        }
    }
}

/// Starts a throw-away classifier service on an ephemeral port.
pub async fn spawn_fake_classifier(reply: Reply) -> FakeClassifier {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        reply,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/analyze/url", post(analyze))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    FakeClassifier {
        endpoint: format!("http://{}/analyze/url", addr),
        seen,
    }
}

/// An address nothing is listening on.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/analyze/url", addr)
}
