use serde_json::{json, Value};
use std::sync::Arc;
use url_sentinel::api::router;
use url_sentinel::config::Config;
use url_sentinel::engine::{Classification, Classifier, Decision, ManualClock};
use url_sentinel::init::{build_sentinel, Sentinel};
use url_sentinel::store::{MemoryStore, PersistenceAdapter};

struct BlockEverything;

#[async_trait::async_trait]
impl Classifier for BlockEverything {
    async fn classify(&self, _url: &str) -> Classification {
        Classification::Decided(Decision::Block)
    }
}

struct TestServer {
    base: String,
    http: reqwest::Client,
    sentinel: Sentinel,
}

async fn serve() -> TestServer {
    let mut config = Config::default();
    config.rules.allowlist = vec!["*.trusted.com".to_string()];
    let store = Arc::new(MemoryStore::new());
    store.initialize().unwrap();
    let sentinel = build_sentinel(
        &config,
        store,
        Arc::new(BlockEverything),
        Arc::new(ManualClock::new(1_700_000_000_000)),
    )
    .unwrap();

    let app = router(sentinel.enforcer.clone(), 3);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base: format!("http://{}", addr),
        http: reqwest::Client::new(),
        sentinel,
    }
}

impl TestServer {
    async fn enforce(&self, body: Value) -> Value {
        self.http
            .post(format!("{}/api/enforce", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> Value {
        self.http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_enforce_endpoint() {
    let server = serve().await;

    let action = server
        .enforce(json!({ "url": "http://a.trusted.com/", "top_level": true }))
        .await;
    assert_eq!(action, json!({ "action": "proceed" }));

    let action = server
        .enforce(json!({
            "url": "http://cdn.net/x.js",
            "top_level": false,
            "document_url": "http://shady.org/"
        }))
        .await;
    assert_eq!(action, json!({ "action": "cancel" }));

    let action = server
        .enforce(json!({ "url": "http://shady.org/", "top_level": true }))
        .await;
    assert_eq!(action["action"], "redirect");
    let redirect = action["redirect_url"].as_str().unwrap();
    assert!(redirect.starts_with("http://127.0.0.1:8081/blocked?url=http%3A%2F%2Fshady.org%2F"));
    assert!(redirect.ends_with("&source=cache"));
}

#[tokio::test]
async fn test_decide_endpoint_reports_source() {
    let server = serve().await;

    let verdict = server.get("/api/decide?url=http%3A%2F%2Fa.trusted.com%2Fx").await;
    assert_eq!(verdict, json!({ "decision": "ALLOW", "source": "whitelist" }));

    let verdict = server.get("/api/decide?url=http%3A%2F%2Fother.com").await;
    assert_eq!(verdict, json!({ "decision": "BLOCK", "source": "remote" }));
}

#[tokio::test]
async fn test_history_limit_and_default() {
    let server = serve().await;
    for i in 0..5 {
        server
            .enforce(json!({ "url": format!("http://bad{}.com/", i), "top_level": true }))
            .await;
    }

    let history = server.get("/api/history").await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["url"], "http://bad4.com/");
    assert_eq!(history[0]["originalUrl"], "http://bad4.com/");
    assert_eq!(history[0]["source"], "remote");

    let history = server.get("/api/history?limit=10").await;
    assert_eq!(history.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_rule_management() {
    let server = serve().await;
    let url = format!("{}/api/rules/deny", server.base);

    let resp = server
        .http
        .post(&url)
        .json(&json!({ "pattern": "*.ads.net" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "added": true }));

    let resp = server
        .http
        .post(&url)
        .json(&json!({ "pattern": "*.ads.net" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "added": false }));

    let resp = server
        .http
        .post(&url)
        .json(&json!({ "pattern": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(resp.json::<Value>().await.unwrap()["error"].is_string());

    let rules = server.get("/api/rules").await;
    assert_eq!(
        rules,
        json!({ "allowlist": ["*.trusted.com"], "denylist": ["*.ads.net"] })
    );

    let verdict = server.get("/api/decide?url=http%3A%2F%2Fx.ads.net%2F").await;
    assert_eq!(verdict["source"], "blacklist");

    let resp = server
        .http
        .delete(&url)
        .json(&json!({ "pattern": "*.ads.net" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "removed": true }));

    let resp = server
        .http
        .post(format!("{}/api/rules/grey", server.base))
        .json(&json!({ "pattern": "x" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_clear_cache_endpoint() {
    let server = serve().await;
    server.get("/api/decide?url=http%3A%2F%2Fcached.com").await;
    assert_eq!(server.sentinel.pipeline.cache().len(), 1);

    let body: Value = server
        .http
        .post(format!("{}/api/cache/clear", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "cache_cleared" }));
    assert!(server.sentinel.pipeline.cache().is_empty());
}

#[tokio::test]
async fn test_block_page_escapes_query() {
    let server = serve().await;
    let body = server
        .http
        .get(format!(
            "{}/blocked?url=http%3A%2F%2Fx.com%2F%3Cscript%3E&source=blacklist",
            server.base
        ))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("http://x.com/&lt;script&gt;"));
    assert!(body.contains("Reason: blacklist"));
}
