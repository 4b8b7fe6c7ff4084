//! Shared helpers for integration tests
//!
//! Runs the real router on a loopback listener with every path pointed into
//! a temporary directory and every external command answered by
//! [`RecordingRunner`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use edge_netadmin::admin::{serve, AppState};
use edge_netadmin::config::AdminConfig;
use edge_netadmin::system::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use futures::future::BoxFuture;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TOKEN: &str = "correct-horse-battery-staple";

/// Fake command runner that records every invocation
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    outputs: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingRunner {
    /// Runner answering `ip -j route show default` with `eth0`
    pub fn with_default_route() -> Self {
        let runner = Self::default();
        runner.respond(
            "ip -j route show default",
            r#"[{"dst":"default","gateway":"192.168.1.1","dev":"eth0","protocol":"dhcp"}]"#,
        );
        runner.respond(
            "ip -j addr show eth0",
            r#"[{"ifname":"eth0","address":"52:54:00:12:34:56","addr_info":[
                {"family":"inet","local":"192.168.1.20","prefixlen":24},
                {"family":"inet6","local":"fe80::1","prefixlen":64}]}]"#,
        );
        runner
    }

    /// Answer `command_line` with `stdout`
    pub fn respond(&self, command_line: &str, stdout: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(command_line.to_string(), stdout.to_string());
    }

    /// Make every invocation of `program` time out
    pub fn fail(&self, program: &str) {
        self.failing.lock().unwrap().insert(program.to_string());
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, program: &str, args: &[&str]) -> bool {
        self.calls().iter().any(|c| c.is(program, args))
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls().iter().filter(|c| c.program == program).count()
    }

    /// Wait until `program` has been run, for at most two seconds
    pub async fn wait_for(&self, program: &str) -> bool {
        for _ in 0..200 {
            if self.count(program) > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: CommandSpec) -> BoxFuture<'static, Result<CommandOutput, CommandError>> {
        self.calls.lock().unwrap().push(command.clone());

        let result = if self.failing.lock().unwrap().contains(&command.program) {
            Err(CommandError::Timeout {
                program: command.program.clone(),
                timeout: command.timeout,
            })
        } else {
            let stdout = self
                .outputs
                .lock()
                .unwrap()
                .get(&command.to_string())
                .cloned()
                .unwrap_or_default();
            Ok(CommandOutput::new(stdout))
        };

        Box::pin(async move { result })
    }
}

/// A running server and everything it touches
pub struct TestServer {
    pub addr: SocketAddr,
    pub runner: Arc<RecordingRunner>,
    pub config: AdminConfig,
    pub client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    /// Start a server with the admin token configured
    pub async fn start() -> Self {
        Self::start_with(Some(TOKEN), RecordingRunner::with_default_route(), |_| {}).await
    }

    pub async fn start_with(
        token: Option<&str>,
        runner: RecordingRunner,
        customize: impl FnOnce(&mut AdminConfig),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut config = AdminConfig {
            token_file: root.join("admin-token"),
            log_file: None,
            netplan_dir: root.join("netplan"),
            resolv_conf: root.join("resolv.conf"),
            compose_file: root.join("docker-compose.yml"),
            compose_env_file: root.join(".env"),
            apply_delay_secs: 0,
            ..AdminConfig::default()
        };
        customize(&mut config);

        if let Some(token) = token {
            std::fs::write(&config.token_file, format!("{}\n", token)).unwrap();
        }
        std::fs::write(&config.resolv_conf, "nameserver 192.168.1.1\n").unwrap();

        let runner = Arc::new(runner);
        let state = AppState::new(config.clone(), runner.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));

        Self {
            addr,
            runner,
            config,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn netplan_dir(&self) -> PathBuf {
        self.config.netplan_dir.clone()
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.config.netplan_dir.join(&self.config.netplan_file_name)
    }

    /// Log in and return the `Cookie` header value for the session
    pub async fn login(&self) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth"))
            .json(&serde_json::json!({ "token": TOKEN }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let set_cookie = resp
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        req.send().await.unwrap()
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>, body: serde_json::Value) -> reqwest::Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(cookie) = cookie {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        req.send().await.unwrap()
    }
}
