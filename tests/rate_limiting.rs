use std::net::TcpListener;
use std::sync::Arc;

use serde_json::Value;

use membergate::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, RateLimitSettings, Settings,
};
use membergate::documents::InMemoryDocumentStore;
use membergate::lifecycle::AccountLifecycle;
use membergate::repository::memory::{InMemoryAccountRepository, RecordingNotificationSink};
use membergate::startup::run;

fn test_settings(rate_limit: RateLimitSettings) -> Settings {
    Settings {
        application: ApplicationSettings {
            port: 0,
            documents_dir: "unused".to_string(),
        },
        database: DatabaseSettings {
            username: "unused".to_string(),
            password: "unused".to_string(),
            port: 5432,
            host: "127.0.0.1".to_string(),
            database_name: "unused".to_string(),
        },
        jwt: JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 604800,
        },
        rate_limit,
    }
}

async fn spawn_app(rate_limit: RateLimitSettings) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let lifecycle = AccountLifecycle::new(
        Arc::new(InMemoryAccountRepository::default()),
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(RecordingNotificationSink::default()),
    );

    let server = run(listener, lifecycle, test_settings(rate_limit)).expect("Failed to bind address");
    tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

fn limits(login: u32, registration: u32, health: u32, enabled: bool) -> RateLimitSettings {
    RateLimitSettings {
        enabled,
        login_per_minute: login,
        registration_per_minute: registration,
        health_per_minute: health,
    }
}

fn registration_form(email: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("name", "Jane Doe")
        .text("email", email.to_string())
        .text("password", "SecurePass123")
        .part(
            "document",
            reqwest::multipart::Part::bytes(vec![0u8; 256])
                .file_name("document.png")
                .mime_str("image/png")
                .unwrap(),
        )
}

#[tokio::test]
async fn health_check_is_throttled_past_the_threshold() {
    let address = spawn_app(limits(60, 10, 3, true)).await;
    let client = reqwest::Client::new();

    for i in 1..=3 {
        let response = client
            .get(&format!("{}/health_check", &address))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16(), "request {} should pass", i);
    }

    let throttled = client
        .get(&format!("{}/health_check", &address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(429, throttled.status().as_u16());

    let body: Value = throttled.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn login_is_throttled_past_the_threshold() {
    let address = spawn_app(limits(2, 10, 60, true)).await;
    let client = reqwest::Client::new();

    // The first two attempts are counted and fail on credentials, not limit.
    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/login", &address))
            .form(&[("username", "nobody@example.com"), ("password", "WrongPass1")])
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(401, response.status().as_u16());
    }

    let throttled = client
        .post(&format!("{}/auth/login", &address))
        .form(&[("username", "nobody@example.com"), ("password", "WrongPass1")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(429, throttled.status().as_u16());
}

#[tokio::test]
async fn registration_is_throttled_before_the_handler_runs() {
    let address = spawn_app(limits(60, 1, 60, true)).await;
    let client = reqwest::Client::new();

    let first = client
        .post(&format!("{}/register", &address))
        .multipart(registration_form("first@example.com"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, first.status().as_u16());

    // A perfectly valid second registration is rejected by the limiter.
    let second = client
        .post(&format!("{}/register", &address))
        .multipart(registration_form("second@example.com"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(429, second.status().as_u16());
}

#[tokio::test]
async fn disabled_limiter_passes_every_request() {
    let address = spawn_app(limits(1, 1, 1, false)).await;
    let client = reqwest::Client::new();

    for _ in 0..10 {
        let response = client
            .get(&format!("{}/health_check", &address))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }
}
