//! Axum router configuration with middleware.
//!
//! Routes:
//! - `GET /`                            liveness
//! - `GET /health`                      readiness (store ping)
//! - `POST /chat`                       chat exchange (rate limited)
//! - `DELETE /chat/session/{session_id}` session deletion
//!
//! Middleware: CORS (permissive unless disabled), request tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route(
            "/chat/session/{session_id}",
            delete(handlers::session::delete_session),
        );

    if state.config.server.cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use parley_core::chat::repository::ConversationStore;
    use parley_core::llm::box_provider::BoxLlmProvider;
    use parley_core::llm::provider::LlmProvider;
    use parley_core::rate::FixedWindowRateGate;
    use parley_infra::sqlite::conversation::SqliteConversationStore;
    use parley_types::chat::SessionId;
    use parley_types::config::{RelayConfig, StoreConfig};
    use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError, Message, Usage};

    use crate::state::open_store;

    /// Provider that replays scripted outcomes and records prompts.
    #[derive(Clone, Default)]
    struct ScriptedProvider {
        outcomes: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
        prompts: Arc<Mutex<Vec<Vec<Message>>>>,
    }

    impl ScriptedProvider {
        fn with(outcomes: Vec<Result<String, LlmError>>) -> Self {
            let provider = Self::default();
            provider.outcomes.lock().unwrap().extend(outcomes);
            provider
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.messages.clone());
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default reply".to_string()));
            next.map(|content| CompletionResponse {
                id: None,
                content,
                model: Some(request.model.clone()),
                finish_reason: Some("stop".to_string()),
                usage: Usage::default(),
            })
        }
    }

    struct TestApp {
        router: Router,
        store: SqliteConversationStore,
        provider: ScriptedProvider,
        _dir: tempfile::TempDir,
    }

    async fn test_app_with(provider: ScriptedProvider, config: RelayConfig) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config;
        config.store = StoreConfig {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("api.db").display()),
            ..StoreConfig::default()
        };

        let store = open_store(&config.store).await.unwrap();
        let rate_gate = Arc::new(FixedWindowRateGate::new(
            config.rate_limit.quota,
            Duration::from_secs(config.rate_limit.window_secs),
        ));
        let state = AppState::from_parts(
            config,
            store.clone(),
            BoxLlmProvider::new(provider.clone()),
            rate_gate,
        );

        TestApp {
            router: build_router(state),
            store,
            provider,
            _dir: dir,
        }
    }

    async fn test_app(provider: ScriptedProvider) -> TestApp {
        test_app_with(provider, RelayConfig::default()).await
    }

    /// POST /chat as seen from peer `client`.
    fn chat_request(client: &str, body: Value) -> Request<Body> {
        let peer = SocketAddr::new(client.parse().unwrap(), 40000);
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(peer))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn forwarded(mut request: Request<Body>, hop: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert("x-forwarded-for", hop.parse().unwrap());
        request
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response {
        app.router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_liveness() {
        let app = test_app(ScriptedProvider::default()).await;
        let response = send(&app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Parley Chat API");
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = test_app(ScriptedProvider::default()).await;
        let response = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_health_unready_when_store_closed() {
        let app = test_app(ScriptedProvider::default()).await;
        app.store.pool().close().await;

        let response = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert!(body["database"].as_str().unwrap().starts_with("error: "));
    }

    #[tokio::test]
    async fn test_chat_new_session() {
        let app = test_app(ScriptedProvider::with(vec![Ok("Hi there!".to_string())])).await;

        let response = send(&app, chat_request("1.1.1.1", json!({"message": "Hello"}))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["response"], "Hi there!");
        let sid = body["session_id"].as_str().unwrap().to_string();
        assert_eq!(sid.len(), 36);

        let history = app.store.read_history(&SessionId::new(sid), 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_message, "Hello");
    }

    #[tokio::test]
    async fn test_chat_continues_session_with_context() {
        let provider = ScriptedProvider::with(vec![Ok("Hello!".to_string()), Ok("Sunny.".to_string())]);
        let app = test_app(provider).await;

        let first = json_body(send(&app, chat_request("1.1.1.1", json!({"message": "Hi"}))).await).await;
        let sid = first["session_id"].as_str().unwrap();

        let second = send(
            &app,
            chat_request("1.1.1.1", json!({"message": "Weather?", "session_id": sid})),
        )
        .await;
        assert_eq!(second.status(), StatusCode::OK);
        let second = json_body(second).await;
        assert_eq!(second["session_id"], sid);

        let prompts = app.provider.prompts.lock().unwrap().clone();
        assert_eq!(
            prompts[1],
            vec![
                Message::user("Hi"),
                Message::assistant("Hello!"),
                Message::user("Weather?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_validation_errors() {
        let app = test_app(ScriptedProvider::default()).await;

        let cases = [
            json!({"message": ""}),
            json!({"message": "x".repeat(4001)}),
            json!({"session_id": "abc"}),
            json!({"message": 42}),
        ];
        for body in cases {
            let response = send(&app, chat_request("2.2.2.2", body.clone())).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
            let json = json_body(response).await;
            assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");
        }

        let malformed = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(SocketAddr::from(([3, 3, 3, 3], 40000))))
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(send(&app, malformed).await.status(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(app.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_sixth_request_in_window_is_rate_limited() {
        let app = test_app(ScriptedProvider::default()).await;

        for _ in 0..5 {
            let response = send(&app, chat_request("9.9.9.9", json!({"message": "hi"}))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(&app, chat_request("9.9.9.9", json!({"message": "hi"}))).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));
        assert_eq!(json_body(response).await["errors"][0]["code"], "RATE_LIMITED");
        assert_eq!(app.provider.calls(), 5);

        // Another client has its own budget.
        let other = send(&app, chat_request("8.8.8.8", json!({"message": "hi"}))).await;
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_requests_do_not_spend_quota() {
        let mut config = RelayConfig::default();
        config.rate_limit.quota = 1;
        let app = test_app_with(ScriptedProvider::default(), config).await;

        for body in [json!({"message": ""}), json!({"message": "x".repeat(4001)})] {
            let response = send(&app, chat_request("4.4.4.4", body)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let admitted = send(&app, chat_request("4.4.4.4", json!({"message": "ok"}))).await;
        assert_eq!(admitted.status(), StatusCode::OK);

        // Quota spent: even a valid request is now throttled, an invalid one is still 422.
        let throttled = send(&app, chat_request("4.4.4.4", json!({"message": "ok"}))).await;
        assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);
        let invalid = send(&app, chat_request("4.4.4.4", json!({"message": ""}))).await;
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_bypass_quota() {
        let app = test_app(ScriptedProvider::default()).await;

        let mut admitted = 0;
        for i in 0..20 {
            let request = forwarded(
                chat_request("203.0.113.9", json!({"message": "hi"})),
                &format!("10.0.0.{i}"),
            );
            if send(&app, request).await.status() == StatusCode::OK {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(app.provider.calls(), 5);
    }

    #[tokio::test]
    async fn test_trusted_forwarded_for_keys_on_first_hop() {
        let mut config = RelayConfig::default();
        config.server.trust_forwarded_for = true;
        config.rate_limit.quota = 1;
        let app = test_app_with(ScriptedProvider::default(), config).await;

        // Same proxy peer, two distinct forwarded clients.
        for hop in ["198.51.100.1", "198.51.100.2"] {
            let request = forwarded(chat_request("10.0.0.1", json!({"message": "hi"})), hop);
            assert_eq!(send(&app, request).await.status(), StatusCode::OK);
        }

        let again = forwarded(
            chat_request("10.0.0.1", json!({"message": "hi"})),
            "198.51.100.1, 10.0.0.1",
        );
        assert_eq!(send(&app, again).await.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_provider_throttling_is_503_and_not_persisted() {
        let app = test_app(ScriptedProvider::with(vec![Err(LlmError::RateLimited)])).await;

        let response = send(
            &app,
            chat_request("5.5.5.5", json!({"message": "Hello", "session_id": "s-throttled"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0]["code"], "SERVICE_UNAVAILABLE");
        assert!(
            app.store
                .read_history(&SessionId::new("s-throttled"), 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_malformed_provider_reply_is_500() {
        let app = test_app(ScriptedProvider::with(vec![Err(LlmError::InvalidResponse(
            "no choices".to_string(),
        ))]))
        .await;

        let response = send(&app, chat_request("6.6.6.6", json!({"message": "Hello"}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = test_app(ScriptedProvider::default()).await;
        app.store
            .append_turn(&SessionId::new("to-delete"), "q", "a")
            .await
            .unwrap();

        let delete_req = || {
            Request::builder()
                .method("DELETE")
                .uri("/chat/session/to-delete")
                .body(Body::empty())
                .unwrap()
        };

        let response = send(&app, delete_req()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Session to-delete deleted successfully"
        );

        let response = send(&app, delete_req()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["errors"][0]["code"],
            "SESSION_NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let app = test_app(ScriptedProvider::default()).await;
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_cors_can_be_disabled() {
        let mut config = RelayConfig::default();
        config.server.cors_allow_any = false;
        let app = test_app_with(ScriptedProvider::default(), config).await;

        let request = Request::builder()
            .uri("/")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
