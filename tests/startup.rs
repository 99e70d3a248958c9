//! Startup checks: configuration errors and secret strength.

mod common;

use common::server::{TEST_SECRET, base_config, command, free_port};
use common::TestServer;
use std::time::Duration;

/// Run the binary to completion, failing the test if it keeps running.
fn run_to_exit(config: &str, env: &[(&str, &str)]) -> std::process::ExitStatus {
    let (mut cmd, _dir) = command(config);
    for (key, value) in env {
        cmd.env(key, value);
    }
    let mut child = cmd.spawn().unwrap();
    for _ in 0..100 {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    panic!("server kept running");
}

#[test]
fn test_weak_secret_refuses_to_start() {
    let port = free_port();
    let config = base_config(port).replace(TEST_SECRET, "changeme");
    assert!(!run_to_exit(&config, &[]).success());
}

#[test]
fn test_weak_secret_from_environment_refuses_to_start() {
    let port = free_port();
    assert!(!run_to_exit(&base_config(port), &[("JWT_SECRET_KEY", "short")]).success());
}

#[tokio::test]
async fn test_weak_secret_override() {
    let port = free_port();
    let config = base_config(port).replace(TEST_SECRET, "changeme");
    let server = TestServer::spawn_with_config(port, &config, &[("BOVESPA_ALLOW_INSECURE_SECRET", "1")])
        .await
        .unwrap();
    assert_eq!(server.get("/health-check", None).await.status(), 200);
}

#[test]
fn test_invalid_config_refuses_to_start() {
    let port = free_port();
    let config = base_config(port).replace(
        "[logging]",
        "[market]\nprovider = \"http\"\n\n[logging]",
    );
    assert!(!run_to_exit(&config, &[]).success());

    let config = base_config(port).replace("[logging]", "[security]\nauth_burst = 0\n\n[logging]");
    assert!(!run_to_exit(&config, &[]).success());
}

#[test]
fn test_unparseable_config_refuses_to_start() {
    assert!(!run_to_exit("[server\nport = ", &[]).success());
}

#[tokio::test]
async fn test_environment_overrides_port() {
    let file_port = free_port();
    let env_port = free_port();
    let env_port_str = env_port.to_string();
    let server = TestServer::spawn_with_config(
        env_port,
        &base_config(file_port),
        &[("PORT", env_port_str.as_str())],
    )
    .await
    .unwrap();
    assert_eq!(server.get("/health-check", None).await.status(), 200);
}

#[tokio::test]
async fn test_missing_secret_uses_ephemeral_key() {
    let port = free_port();
    let config = base_config(port).replace(&format!("jwt_secret = \"{TEST_SECRET}\""), "");
    let server = TestServer::spawn_with_config(port, &config, &[]).await.unwrap();
    let token = server.register("Ana", "ana@example.com", "senha123").await;
    assert_eq!(server.get("/consultar", Some(&token)).await.status(), 200);
}
