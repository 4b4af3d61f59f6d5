//! Integration tests for the public routes and the global middleware chain

use std::net::TcpListener;
use std::sync::Arc;

use social_auth::auth::{Keypair, RefreshSessionManager, SessionStore, TokenSigner, DEFAULT_ISSUER};
use social_auth::middleware::CorsPolicy;
use social_auth::startup::run;
use social_auth::store::MemoryStore;

const PRIVATE_PEM: &str = include_str!("fixtures/signing_private.pem");
const PUBLIC_PEM: &str = include_str!("fixtures/signing_public.pem");

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let signer = TokenSigner::new(
        Keypair::from_pem(PRIVATE_PEM, PUBLIC_PEM).expect("Failed to load keys"),
        DEFAULT_ISSUER,
    );
    let sessions = RefreshSessionManager::new(SessionStore::new(Arc::new(MemoryStore::new())));
    let cors = CorsPolicy::parse("http://localhost:3000");

    let server = run(listener, signer, sessions, cors).expect("Failed to create server");
    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn index_reports_running() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&addr)
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(
        response.text().await.unwrap(),
        "Social Media App API is running!"
    );
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let addr = spawn_app();
    let client = reqwest::Client::new();

    let first = client
        .get(&format!("{}/health", addr))
        .send()
        .await
        .expect("Failed to execute request");
    let second = client
        .get(&format!("{}/does-not-exist", addr))
        .send()
        .await
        .expect("Failed to execute request");

    let first_id = first.headers().get("X-Request-ID").unwrap().to_str().unwrap().to_string();
    let second_id = second.headers().get("X-Request-ID").unwrap().to_str().unwrap().to_string();

    assert_eq!(404, second.status().as_u16());
    assert!(uuid::Uuid::parse_str(&first_id).is_ok());
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn inbound_request_id_is_echoed() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health", addr))
        .header("X-Request-ID", "trace-me-123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers().get("X-Request-ID").unwrap(),
        "trace-me-123"
    );
}

#[tokio::test]
async fn preflight_from_allowed_origin() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &format!("{}/api/v1/auth/refresh", addr))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(204, response.status().as_u16());
    let headers = response.headers();
    assert_eq!(
        headers.get("Access-Control-Allow-Origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(headers.get("Access-Control-Allow-Credentials").unwrap(), "true");
    assert!(headers.get("X-Request-ID").is_some());
}

#[tokio::test]
async fn disallowed_origin_gets_no_cors_headers() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health", addr))
        .header("Origin", "http://evil.test")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert!(response.headers().get("Access-Control-Allow-Origin").is_none());
}
