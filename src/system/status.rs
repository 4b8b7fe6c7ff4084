//! Host and service status
//!
//! Descriptive system metrics and container service status. Like the
//! network inspector, every value is best-effort.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::system::command::{CommandRunner, CommandSpec};
use crate::system::inspector::read_hostname;

const LOADAVG: &str = "/proc/loadavg";

/// Descriptive host metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: Option<String>,
    pub uptime: Option<String>,
    pub disk: Option<String>,
    pub memory: Option<String>,
    pub cpu_load: Option<String>,
}

/// State of one compose service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    pub state: String,
}

/// One line of `docker compose ps --format json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComposeEntry {
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<ComposeEntry> for ServiceStatus {
    fn from(entry: ComposeEntry) -> Self {
        Self {
            name: entry
                .service
                .or(entry.name)
                .unwrap_or_else(|| "unknown".to_string()),
            status: entry
                .status
                .or_else(|| entry.state.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            state: entry.state.unwrap_or_default(),
        }
    }
}

/// Collects host metrics and service status
pub struct StatusCollector {
    runner: Arc<dyn CommandRunner>,
    compose_file: PathBuf,
    compose_env_file: PathBuf,
    timeout: Duration,
}

impl StatusCollector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        compose_file: PathBuf,
        compose_env_file: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            compose_file,
            compose_env_file,
            timeout,
        }
    }

    async fn stdout_of(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.runner.run(CommandSpec::new(program, args, self.timeout)).await {
            Ok(output) => Some(output.stdout),
            Err(e) => {
                debug!("Status command failed: {}", e);
                None
            }
        }
    }

    pub async fn system_info(&self) -> SystemInfo {
        let uptime = self
            .stdout_of("uptime", &["-p"])
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let disk = self.stdout_of("df", &["-h", "/"]).await.and_then(|s| parse_df(&s));
        let memory = self.stdout_of("free", &["-h"]).await.and_then(|s| parse_free(&s));
        let cpu_load = tokio::fs::read_to_string(LOADAVG)
            .await
            .ok()
            .and_then(|s| parse_loadavg(&s));

        SystemInfo {
            hostname: read_hostname(self.runner.as_ref(), self.timeout).await,
            uptime,
            disk,
            memory,
            cpu_load,
        }
    }

    /// Status of every compose service; empty on any failure
    pub async fn service_statuses(&self) -> Vec<ServiceStatus> {
        let compose_file = self.compose_file.to_string_lossy();
        let env_file = self.compose_env_file.to_string_lossy();
        let args = [
            "compose",
            "-f",
            compose_file.as_ref(),
            "--env-file",
            env_file.as_ref(),
            "ps",
            "--format",
            "json",
        ];

        self.stdout_of("docker", &args)
            .await
            .map(|s| parse_compose_ps(&s))
            .unwrap_or_default()
    }
}

/// `used / size (pct used)` from the last line of `df -h`
fn parse_df(output: &str) -> Option<String> {
    let parts: Vec<&str> = output.trim().lines().last()?.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }
    Some(format!("{} / {} ({} used)", parts[2], parts[1], parts[4]))
}

/// `used / total (free free)` from the `Mem:` line of `free -h`
fn parse_free(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.starts_with("Mem:"))?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    Some(format!("{} / {} ({} free)", parts[2], parts[1], parts[3]))
}

fn parse_loadavg(content: &str) -> Option<String> {
    let fields: Vec<&str> = content.split_whitespace().take(3).collect();
    if fields.is_empty() {
        return None;
    }
    Some(fields.join(" "))
}

fn parse_compose_ps(output: &str) -> Vec<ServiceStatus> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<ComposeEntry>(line).ok())
        .map(ServiceStatus::from)
        .collect()
}
