//! Test server management.
//!
//! Spawns and manages bovespa-api instances for integration testing.

use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Secret strong enough to pass the startup check.
pub const TEST_SECRET: &str = "integration-test-secret-7f3a9c1e5b2d8f4a";

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    client: reqwest::Client,
    _dir: TempDir,
}

/// Pick a free local port.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Minimal configuration: memory store, metrics off, strong secret.
pub fn base_config(port: u16) -> String {
    format!(
        r#"
[server]
name = "test-api"
host = "127.0.0.1"
port = {port}
metrics_port = 0

[database]
backend = "memory"

[auth]
jwt_secret = "{TEST_SECRET}"

[logging]
level = "warn"
"#
    )
}

/// Write `config` to a temp dir and build the command that runs the binary on it.
pub fn command(config: &str) -> (Command, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config_path: PathBuf = dir.path().join("config.toml");
    std::fs::write(&config_path, config).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bovespa-api"));
    cmd.arg(&config_path)
        .env_clear()
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    (cmd, dir)
}

impl TestServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        let port = free_port();
        Self::spawn_with_config(port, &base_config(port), &[]).await
    }

    /// Spawn a server with a custom config and extra environment.
    pub async fn spawn_with_config(
        port: u16,
        config: &str,
        env: &[(&str, &str)],
    ) -> anyhow::Result<Self> {
        let (mut cmd, dir) = command(config);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let child = cmd.spawn()?;

        let server = Self {
            child,
            port,
            client: reqwest::Client::new(),
            _dir: dir,
        };

        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    /// Register a user and return the issued token.
    pub async fn register(&self, name: &str, email: &str, senha: &str) -> String {
        let resp = self
            .post("/registrar", json!({"name": name, "email": email, "senha": senha}))
            .await;
        assert_eq!(resp.status(), 200, "registration failed");
        let body: Value = resp.json().await.unwrap();
        body["jwt"].as_str().unwrap().to_string()
    }

    /// Send SIGTERM and wait for the process to exit.
    #[cfg(unix)]
    pub async fn terminate(mut self) -> anyhow::Result<ExitStatus> {
        let status = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status()?;
        anyhow::ensure!(status.success(), "kill failed");
        for _ in 0..50 {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server did not exit within 5 seconds of SIGTERM")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Kill the server process
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
