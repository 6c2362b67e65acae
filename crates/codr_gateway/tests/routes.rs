//! Route-level tests against fakes, no live Redis required.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use codr_bus::{FakeBus, FakeJobStore};
use codr_gateway::{router, AppState};
use codr_protocol::Config;
use codr_security::TokenService;
use tower::ServiceExt;

fn test_config(api_key: Option<&str>) -> Config {
    Config {
        env: "development".to_string(),
        api_key: api_key.map(str::to_string),
        host: "127.0.0.1".to_string(),
        port: 8080,
        cors_origins: "*".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_algorithm: "HS256".to_string(),
        jwt_expiration_minutes: 15,
        execution_timeout_secs: 7,
        max_memory_mb: 300,
        max_file_size_mb: 1,
        compilation_timeout_secs: 10,
        max_input_kb: 10,
        redis_url: "redis://localhost".to_string(),
        redis_ttl_secs: 3600,
        rate_limit_submit: "10/minute".to_string(),
        rate_limit_stream: "60/minute".to_string(),
        job_queue_name: "codr:job_queue".to_string(),
        worker_poll_timeout_secs: 5,
        worker_id: None,
        max_queue_size: 100,
        max_poll_attempts: 3,
        poll_interval_secs: 1,
    }
}

fn test_state(api_key: Option<&str>) -> AppState<FakeJobStore, FakeBus> {
    let config = test_config(api_key);
    let token_service = TokenService::new(config.jwt_secret.clone(), config.jwt_expiration_minutes);
    AppState::new(FakeJobStore::new(), FakeBus::new(), token_service, config)
}

#[tokio::test]
async fn health_reports_ok_against_a_reachable_store() {
    let app = router(test_state(None));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_job_requires_the_configured_api_key() {
    let app = router(test_state(Some("secret-key")));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/create")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_job_mints_a_token_when_no_api_key_is_configured() {
    let app = router(test_state(None));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/create")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn websocket_status_reports_zero_sessions_at_rest() {
    let app = router(test_state(None));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/websocket/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
