//! Integration tests for login/register/logout/whoami against a mock backend.

use std::fs;
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Base URL of a local port with nothing listening on it.
fn unreachable_uri() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn stored_token(home: &Path) -> Option<String> {
    let contents = fs::read_to_string(home.join("credentials.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value["access_token"].as_str().map(str::to_string)
}

fn store_token(home: &Path, token: &str) {
    fs::write(
        home.join("credentials.json"),
        json!({"access_token": token}).to_string(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_login_stores_token() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({"username": "ada", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "tok-123", "refresh": "r"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env("NAIJACAL_PASSWORD", "secret")
        .args(["login", "-u", "ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged in as ada"));

    assert_eq!(stored_token(home.path()).as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn test_login_prompts_for_missing_credentials() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({"username": "ada", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "tok-123"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env_remove("NAIJACAL_PASSWORD")
        .arg("login")
        .write_stdin("ada\nsecret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Username: "))
        .stdout(predicate::str::contains("Password (input is visible): "));
}

#[tokio::test]
async fn test_prompted_password_keeps_surrounding_spaces() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({"username": "ada", "password": " pass word "})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "tok-123"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env_remove("NAIJACAL_PASSWORD")
        .args(["login", "-u", "ada"])
        .write_stdin(" pass word \n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged in as ada"));
}

#[tokio::test]
async fn test_login_rejected_shows_backend_message() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env("NAIJACAL_PASSWORD", "wrong")
        .args(["login", "-u", "ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    assert_eq!(stored_token(home.path()), None);
}

#[test]
fn test_login_unreachable_backend() {
    let uri = unreachable_uri();
    let home = tempdir().unwrap();

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", uri)
        .env("NAIJACAL_PASSWORD", "secret")
        .args(["login", "-u", "ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not connect to backend."));
}

#[tokio::test]
async fn test_login_when_already_logged_in_can_be_cancelled() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    store_token(home.path(), "existing");

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer existing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ada"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "other"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env("NAIJACAL_PASSWORD", "secret")
        .args(["login", "-u", "bob"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already logged in as ada"))
        .stdout(predicate::str::contains("Login cancelled."));

    assert_eq!(stored_token(home.path()).as_deref(), Some("existing"));
}

#[tokio::test]
async fn test_register_sends_email_and_logs_in() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_json(
            json!({"username": "ada", "password": "secret", "email": "ada@example.com"}),
        ))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"access": "tok-new", "refresh": "r", "username": "ada"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env("NAIJACAL_PASSWORD", "secret")
        .args(["register", "-u", "ada", "--email", "ada@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Account created"))
        .stdout(predicate::str::contains("✓ Logged in as ada"));

    assert_eq!(stored_token(home.path()).as_deref(), Some("tok-new"));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Username already exists"})),
        )
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .env("NAIJACAL_PASSWORD", "secret")
        .args(["register", "-u", "ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Username already exists"));
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_logout_removes_stored_session() {
    let home = tempdir().unwrap();
    store_token(home.path(), "tok-123");

    // Logout never contacts the backend.
    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", unreachable_uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged out"));

    assert!(!home.path().join("credentials.json").exists());
}

#[tokio::test]
async fn test_whoami_restores_stored_session() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    store_token(home.path(), "tok-123");

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "ada", "email": "ada@example.com"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::diff("ada\n"));
}

#[tokio::test]
async fn test_whoami_with_expired_token_clears_it() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    store_token(home.path(), "expired");

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Given token not valid for any token type"})),
        )
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("naijacal")
        .env("NAIJACAL_HOME", home.path())
        .env("NAIJACAL_API_URL", mock_server.uri())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));

    assert_eq!(stored_token(home.path()), None);
}
