//! Integration tests for the login / request / logout cycle against a mock backend.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_session(home: &Path) -> HashMap<String, String> {
    let contents = fs::read_to_string(home.join("session.json")).unwrap();
    serde_json::from_str(&contents).unwrap()
}

fn write_session(home: &Path, token: &str, role: &str) {
    let entries = json!({
        "auth_token": token,
        "user_data": json!({"id": 3, "email": "ada@example.com", "first_name": "Ada"}).to_string(),
        "account_data": json!({"id": 9}).to_string(),
        "user_role": role,
    });
    fs::write(home.join("session.json"), entries.to_string()).unwrap();
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({"username": "ada@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Login successful",
            "token": "tok-abcdef123456",
            "data": {
                "id": 3,
                "email": "ada@example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "role": {"id": 1, "role_name": "admin"},
                "departement": {"dep_name": "Archives"},
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_whoami() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada Lovelace"))
        .stdout(predicate::str::contains("(admin)"))
        .stdout(predicate::str::contains("tok-abcdef123456").not());

    let session = read_session(home.path());
    assert_eq!(session["auth_token"], "tok-abcdef123456");
    assert_eq!(session["user_role"], "admin");
    let account: serde_json::Value = serde_json::from_str(&session["account_data"]).unwrap();
    assert_eq!(account, json!({"id": 3}));

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace <ada@example.com>"))
        .stdout(predicate::str::contains("Role: admin"))
        .stdout(predicate::str::contains("Department: Archives"));
}

#[tokio::test]
async fn test_login_reads_password_from_stdin() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .env_remove("DOCDESK_PASSWORD")
        .args(["login", "--email", "ada@example.com"])
        .write_stdin("hunter2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as"));

    assert_eq!(read_session(home.path())["auth_token"], "tok-abcdef123456");
}

#[tokio::test]
async fn test_login_failure_shows_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid email or password",
        })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid email or password"))
        .stderr(predicate::str::contains("Session expired.").not());

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_logout_clears_session_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/logout"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(read_session(home.path()).is_empty());

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[tokio::test]
async fn test_request_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "Q3 report"}])))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["request", "get", "/api/documents/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Q3 report"));
}

#[tokio::test]
async fn test_request_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/"))
        .and(body_json(json!({"title": "Review"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12})))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["request", "POST", "/api/tasks/", "--data", r#"{"title":"Review"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": 12"));
}

#[tokio::test]
async fn test_request_401_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["request", "GET", "/api/documents/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session expired."))
        .stderr(predicate::str::contains("HTTP 401"));

    assert!(read_session(home.path()).is_empty());
}

#[tokio::test]
async fn test_request_403_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/roles/4/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", server.uri())
        .args(["request", "DELETE", "/api/roles/4/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 403"))
        .stderr(predicate::str::contains("Session expired.").not());

    assert_eq!(read_session(home.path())["auth_token"], "tok-1");
}

#[test]
fn test_request_network_error() {
    let home = tempdir().unwrap();
    write_session(home.path(), "tok-1", "user");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .env("DOCDESK_API_URL", "http://127.0.0.1:9")
        .args(["request", "GET", "/api/me/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error occurred"));
}

#[test]
fn test_guard_decisions() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .args(["guard", "--roles", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirect /login"));

    write_session(home.path(), "tok-1", "validator");

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .args(["guard", "--roles", "admin,validator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allow"));

    cargo_bin_cmd!("docdesk")
        .env("DOCDESK_HOME", home.path())
        .args(["guard", "--roles", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirect /v/acceuil"));
}
