//! End-to-end handler tests against the in-memory store and event bus.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use trading_api::events::InMemoryEventBus;
use trading_api::observability::metrics;
use trading_api::passwords::verify_password;
use trading_api::store::EntityStore;
use trading_api::{app, Agent, AppState, MemoryStore, User};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

struct TestApp {
    router: Router,
    bus: InMemoryEventBus,
    state: Arc<AppState>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_bus(InMemoryEventBus::new(), PUBLISH_TIMEOUT)
    }

    fn with_bus(bus: InMemoryEventBus, publish_timeout: Duration) -> Self {
        let state = Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(bus.clone()),
            publish_timeout,
        ));
        let router = app(state.clone(), &["http://localhost:3000".to_string()]);
        Self { router, bus, state }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }
}

fn agent_body(status: &str) -> Value {
    json!({
        "user_id": Uuid::new_v4(),
        "name": "momentum-1",
        "description": "buys strength",
        "strategy_id": Uuid::new_v4(),
        "configuration": {"max_position": 100},
        "status": status
    })
}

fn strategy_body(id: Uuid) -> Value {
    json!({
        "id": id,
        "name": "SMA10",
        "code": "return close > sma(close, 10)",
        "parameters_schema": {}
    })
}

#[tokio::test]
async fn test_root_welcome() {
    let app = TestApp::new();
    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Trading Bot API");
}

#[tokio::test]
async fn test_create_agent_publishes_created_event() {
    let app = TestApp::new();

    let (status, body) = app.post("/agents", agent_body("active")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let events = app.bus.events("agents").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "agent.created");
    assert_eq!(events[0].data["id"], body["id"]);
    assert!(events[0].data["id"].is_string());
}

#[tokio::test]
async fn test_update_publishes_post_update_snapshot() {
    let app = TestApp::new();
    let (_, created) = app.post("/agents", agent_body("active")).await;
    let id = created["id"].as_str().unwrap();

    let mut changes = agent_body("paused");
    changes["name"] = json!("momentum-2");
    let (status, updated) = app.put(&format!("/agents/{id}"), changes).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["status"], "paused");
    assert_eq!(updated["created_at"], created["created_at"]);

    let events = app.bus.events("agents").await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "agent.updated");
    assert_eq!(events[1].data["status"], "paused");
    assert_eq!(events[1].data["name"], "momentum-2");
}

#[tokio::test]
async fn test_delete_publishes_deleted_row() {
    let app = TestApp::new();
    let (_, created) = app.post("/swarms", json!({
        "user_id": Uuid::new_v4(),
        "name": "alpha",
        "architecture": "hierarchical",
        "status": "idle"
    }))
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app.delete(&format!("/swarms/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Swarm deleted");

    let events = app.bus.events("swarms").await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "swarm.deleted");
    assert_eq!(events[1].data["id"], json!(id));
    assert_eq!(events[1].data["architecture"], "hierarchical");

    let (status, _) = app.get(&format!("/swarms/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failing_bus_does_not_change_response() {
    let healthy = TestApp::new();
    let broken = TestApp::with_bus(InMemoryEventBus::failing(), PUBLISH_TIMEOUT);
    let id = Uuid::new_v4();
    let uri = format!("/strategies/{id}");

    let ok = healthy.post("/strategies", strategy_body(id)).await;
    let failed = broken.post("/strategies", strategy_body(id)).await;
    assert_eq!(ok, failed);
    assert_eq!(ok.0, StatusCode::OK);

    let mut changes = strategy_body(id);
    changes["name"] = json!("SMA20");
    assert_eq!(healthy.put(&uri, changes.clone()).await, broken.put(&uri, changes).await);

    assert_eq!(healthy.delete(&uri).await, broken.delete(&uri).await);

    // every mutation was attempted once, none delivered
    assert_eq!(broken.bus.attempts(), 3);
    assert!(broken.bus.published().await.is_empty());
    assert_eq!(
        broken.state.metrics.get_counter(metrics::EVENTS_PUBLISH_FAILED).await,
        3
    );
    assert_eq!(healthy.bus.events("strategies").await.len(), 3);
}

#[tokio::test]
async fn test_publish_timeout_does_not_change_response() {
    let slow = TestApp::with_bus(
        InMemoryEventBus::new().with_delay(Duration::from_millis(500)),
        Duration::from_millis(20),
    );

    let (status, body) = slow.post("/agents", agent_body("active")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(slow.bus.attempts(), 1);
    assert!(slow.bus.published().await.is_empty());

    let (status, _) = slow.get(&format!("/agents/{}", body["id"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_unknown_id_is_404_without_publish() {
    let app = TestApp::new();

    for kind in ["agents", "strategies", "swarms", "users"] {
        let (status, body) = app.delete(&format!("/{kind}/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{kind}");
        assert!(body["detail"].as_str().unwrap().ends_with("not found"));
    }

    assert_eq!(app.bus.attempts(), 0);
}

#[tokio::test]
async fn test_update_unknown_id_is_404_without_publish() {
    let app = TestApp::new();

    let (status, body) = app
        .put(&format!("/agents/{}", Uuid::new_v4()), agent_body("active"))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Agent not found");
    assert_eq!(app.bus.attempts(), 0);
}

#[tokio::test]
async fn test_get_unknown_id_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get(&format!("/strategies/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Strategy not found");
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let app = TestApp::new();
    let request = agent_body("active");

    let (_, created) = app.post("/agents", request.clone()).await;
    let (status, fetched) = app
        .get(&format!("/agents/{}", created["id"].as_str().unwrap()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    for field in ["user_id", "name", "description", "strategy_id", "configuration", "status"] {
        assert_eq!(fetched[field], request[field], "{field}");
    }
}

#[tokio::test]
async fn test_strategy_gets_generated_uuid() {
    let app = TestApp::new();

    let (status, created) = app
        .post("/strategies", json!({
            "name": "SMA10",
            "code": "return close > sma(close, 10)",
            "parameters_schema": {}
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());

    let (status, fetched) = app.get(&format!("/strategies/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "SMA10");
    assert_eq!(fetched["code"], "return close > sma(close, 10)");
}

#[tokio::test]
async fn test_caller_supplied_id_is_honoured() {
    let app = TestApp::new();
    let id = Uuid::new_v4();

    let (_, created) = app.post("/strategies", strategy_body(id)).await;
    assert_eq!(created["id"], json!(id.to_string()));

    // same id again is a store failure
    let (status, body) = app.post("/strategies", strategy_body(id)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");
    assert_eq!(app.bus.attempts(), 1);
}

#[tokio::test]
async fn test_two_creates_make_two_entities_and_events() {
    let app = TestApp::new();

    let (_, first) = app.post("/agents", agent_body("active")).await;
    let (_, second) = app.post("/agents", agent_body("active")).await;
    assert_ne!(first["id"], second["id"]);

    let (_, list) = app.get("/agents").await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(app.bus.events("agents").await.len(), 2);
}

#[tokio::test]
async fn test_invalid_input_rejected_before_mutation() {
    let app = TestApp::new();

    let mut bad_config = agent_body("active");
    bad_config["configuration"] = json!([1, 2, 3]);
    let (status, _) = app.post("/agents", bad_config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut empty_name = agent_body("active");
    empty_name["name"] = json!("");
    let (status, _) = app.post("/agents", empty_name).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/agents", json!({"name": "no ids"})).await;
    assert!(status.is_client_error());

    let (status, _) = app.get("/agents/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get("/agents").await;
    assert!(list.as_array().unwrap().is_empty());
    assert_eq!(app.bus.attempts(), 0);
}

#[tokio::test]
async fn test_users_never_expose_password() {
    let app = TestApp::new();

    let (status, created) = app
        .post("/users", json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "s3cret"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(created.get("password_hash").is_none());
    assert!(created.get("password").is_none());

    let events = app.bus.events("users").await;
    assert_eq!(events[0].event_type, "user.created");
    assert!(events[0].data.get("password_hash").is_none());

    let (_, listed) = app.get("/users").await;
    assert!(listed[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_user_update_without_password() {
    let app = TestApp::new();
    let (_, created) = app
        .post("/users", json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "first"
        }))
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = app
        .put(&format!("/users/{id}"), json!({
            "username": "bobby",
            "email": "bobby@example.com"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["username"], "bobby");
    assert_eq!(updated["created_at"], created["created_at"]);

    let events = app.bus.events("users").await;
    assert_eq!(events.last().unwrap().event_type, "user.updated");
    assert_eq!(events.last().unwrap().data["email"], "bobby@example.com");
}

#[tokio::test]
async fn test_invalid_email_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/users", json!({
            "username": "eve",
            "email": "nope",
            "password": "x"
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    assert_eq!(app.bus.attempts(), 0);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    app.post("/agents", agent_body("active")).await;

    let (status, _) = app.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, ready) = app.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ready");

    let (status, detail) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "healthy");
    assert_eq!(detail["metrics"]["counters"]["agent_created_total"], 1);
    assert_eq!(detail["metrics"]["counters"]["events_published_total"], 1);
}

async fn stored_user(app: &TestApp, id: &str) -> User {
    EntityStore::<User>::get(app.state.store.as_ref(), Uuid::parse_str(id).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_client_disconnect_mid_publish_still_delivers() {
    let app = TestApp::with_bus(
        InMemoryEventBus::new().with_delay(Duration::from_millis(300)),
        PUBLISH_TIMEOUT,
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/agents")
        .header("content-type", "application/json")
        .body(Body::from(agent_body("active").to_string()))
        .unwrap();

    // the caller gives up while the publish is still in flight
    let response =
        tokio::time::timeout(Duration::from_millis(50), app.router.clone().oneshot(request)).await;
    assert!(response.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;

    let agents: Vec<Agent> = EntityStore::<Agent>::list(app.state.store.as_ref()).await.unwrap();
    assert_eq!(agents.len(), 1);
    let events = app.bus.events("agents").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data["id"], json!(agents[0].id.to_string()));
    assert_eq!(app.state.metrics.get_counter(metrics::EVENTS_PUBLISHED).await, 1);
}

#[tokio::test]
async fn test_client_disconnect_mid_failed_publish_is_counted() {
    let app = TestApp::with_bus(
        InMemoryEventBus::failing().with_delay(Duration::from_millis(300)),
        PUBLISH_TIMEOUT,
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/strategies")
        .header("content-type", "application/json")
        .body(Body::from(strategy_body(Uuid::new_v4()).to_string()))
        .unwrap();

    let response =
        tokio::time::timeout(Duration::from_millis(50), app.router.clone().oneshot(request)).await;
    assert!(response.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(app.bus.attempts(), 1);
    assert_eq!(app.state.metrics.get_counter(metrics::EVENTS_PUBLISH_FAILED).await, 1);
}

#[tokio::test]
async fn test_malformed_body_uses_detail_shape() {
    let app = TestApp::new();

    let (status, body) = app.post("/agents", json!({"name": "no ids"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("user_id"));

    let (status, body) = app.send(Method::POST, "/strategies", None).await;
    assert!(status.is_client_error());
    assert!(body["detail"].is_string());

    assert_eq!(app.bus.attempts(), 0);
}

#[tokio::test]
async fn test_user_password_rehashed_only_when_changed() {
    let app = TestApp::new();
    let (_, created) = app
        .post("/users", json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "first"
        }))
        .await;
    let id = created["id"].as_str().unwrap();
    let original = stored_user(&app, id).await.password_hash;

    let (status, _) = app
        .put(&format!("/users/{id}"), json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "first"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_user(&app, id).await.password_hash, original);

    let (status, _) = app
        .put(&format!("/users/{id}"), json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "second"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let rehashed = stored_user(&app, id).await.password_hash;
    assert_ne!(rehashed, original);
    assert!(verify_password("second", &rehashed));
}

#[tokio::test]
async fn test_password_update_for_unknown_user_is_404() {
    let app = TestApp::new();
    let (status, body) = app
        .put(&format!("/users/{}", Uuid::new_v4()), json!({
            "username": "ghost",
            "email": "ghost@example.com",
            "password": "boo"
        }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");
    assert_eq!(app.bus.attempts(), 0);
}
