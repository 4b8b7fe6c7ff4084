//! Persisting and activating a rendered configuration
//!
//! [`ConfigApplier::apply`] runs these steps in order:
//! 1. remove every other netplan document in the managed directory (best-effort)
//! 2. write the artifact atomically with owner-only permissions
//! 3. set the hostname, if one was supplied (best-effort)
//! 4. schedule `netplan apply` on a detached task after a short delay
//!
//! Steps 1 and 2 run on the blocking pool under a lock, so overlapping
//! applies never interleave. Only step 2 can fail the operation. The
//! activation task outlives the request that scheduled it; its outcome is
//! logged and counted, never returned.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::common::fs::write_atomic;
use crate::netplan::{AppliedAddress, ApplyError, RenderedArtifact, ValidatedConfig};
use crate::system::command::{CommandError, CommandRunner, CommandSpec};
use crate::system::inspector::is_netplan_file;

const ARTIFACT_MODE: u32 = 0o600;

/// Result of a successful apply
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Where the client should expect to reach the device
    pub address: AppliedAddress,
    /// Path of the written artifact
    pub path: PathBuf,
    /// The scheduled activation. Dropping the handle does not cancel it.
    pub activation: JoinHandle<()>,
}

/// Writes netplan artifacts into the managed directory and activates them
pub struct ConfigApplier {
    dir: PathBuf,
    file_name: String,
    apply_delay: Duration,
    command_timeout: Duration,
    hostname_timeout: Duration,
    runner: Arc<dyn CommandRunner>,
    write_lock: Mutex<()>,
}

impl ConfigApplier {
    pub fn new(
        dir: PathBuf,
        file_name: String,
        apply_delay: Duration,
        command_timeout: Duration,
        hostname_timeout: Duration,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            dir,
            file_name,
            apply_delay,
            command_timeout,
            hostname_timeout,
            runner,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the managed artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Persist `artifact`, rename the host and schedule activation
    pub async fn apply(
        &self,
        config: &ValidatedConfig,
        artifact: &RenderedArtifact,
    ) -> Result<ApplyOutcome, ApplyError> {
        let path = {
            // Overlapping requests take turns at cleanup and write.
            let _guard = self.write_lock.lock().await;

            let dir = self.dir.clone();
            let file_name = self.file_name.clone();
            let content = artifact.content.clone();
            tokio::task::spawn_blocking(move || persist(&dir, &file_name, content.as_bytes())).await??
        };
        info!("Wrote netplan config: {}", path.display());

        if let Some(hostname) = &config.hostname {
            match self.set_hostname(hostname).await {
                Ok(()) => info!("Hostname set to: {}", hostname),
                Err(e) => warn!("Failed to set hostname: {}", e),
            }
        }

        let address = AppliedAddress::from(&config.mode);
        let activation = self.schedule_activation();
        info!(
            "Scheduled netplan apply ({:?} delay) on {}, address {}",
            self.apply_delay, config.interface, address
        );
        metrics::counter!("netadmin_config_applied_total").increment(1);

        Ok(ApplyOutcome {
            address,
            path,
            activation,
        })
    }

    /// Change the hostname with `hostnamectl`
    pub async fn set_hostname(&self, hostname: &str) -> Result<(), CommandError> {
        let command = CommandSpec::new("hostnamectl", &["set-hostname", hostname], self.hostname_timeout);
        self.runner.run(command).await.map(|_| ())
    }

    fn schedule_activation(&self) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let delay = self.apply_delay;
        let command = CommandSpec::new("netplan", &["apply"], self.command_timeout);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match runner.run(command).await {
                Ok(_) => info!("netplan apply completed"),
                Err(e) => {
                    error!("netplan apply failed: {}", e);
                    metrics::counter!("netadmin_activation_failures_total").increment(1);
                }
            }
        })
    }
}

/// Create `dir`, clear foreign documents and write the artifact
///
/// Blocking; runs on the blocking pool.
fn persist(dir: &Path, file_name: &str, content: &[u8]) -> Result<PathBuf, ApplyError> {
    fs::create_dir_all(dir).map_err(|source| ApplyError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    remove_foreign_files(dir, file_name);

    let path = dir.join(file_name);
    write_atomic(&path, content, ARTIFACT_MODE).map_err(|source| ApplyError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn remove_foreign_files(dir: &Path, own_name: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {}: {}", dir.display(), e);
            return;
        }
    };

    for path in entries.flatten().map(|entry| entry.path()) {
        let foreign = is_netplan_file(&path)
            && path.is_file()
            && path.file_name().and_then(|n| n.to_str()) != Some(own_name);
        if !foreign {
            continue;
        }
        match remove_file(&path) {
            Ok(()) => info!("Removed old netplan config: {}", path.display()),
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netplan::NetworkMode;
    use crate::system::command::{CommandOutput, MockCommandRunner};
    use std::net::Ipv4Addr;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FILE_NAME: &str = "99-safeschool-static.yaml";

    fn applier(dir: &Path, runner: MockCommandRunner) -> ConfigApplier {
        ConfigApplier::new(
            dir.to_path_buf(),
            FILE_NAME.to_string(),
            Duration::from_millis(10),
            Duration::from_secs(15),
            Duration::from_secs(10),
            Arc::new(runner),
        )
    }

    fn static_config(hostname: Option<&str>) -> ValidatedConfig {
        ValidatedConfig {
            interface: "eth0".to_string(),
            mode: NetworkMode::Static {
                address: Ipv4Addr::new(192, 168, 1, 50),
                prefix: 24,
                gateway: Ipv4Addr::new(192, 168, 1, 1),
                nameservers: Vec::new(),
            },
            hostname: hostname.map(str::to_string),
        }
    }

    fn artifact() -> RenderedArtifact {
        RenderedArtifact {
            interface: "eth0".to_string(),
            content: "network:\n  version: 2\n".to_string(),
        }
    }

    fn ok_output() -> futures::future::BoxFuture<'static, Result<CommandOutput, CommandError>> {
        Box::pin(async { Ok(CommandOutput::default()) })
    }

    #[tokio::test]
    async fn test_apply_replaces_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("00-installer-config.yaml"), "old").unwrap();
        fs::write(dir.path().join("50-cloud-init.yml"), "old").unwrap();
        fs::write(dir.path().join("README"), "keep").unwrap();
        fs::write(dir.path().join(FILE_NAME), "previous").unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|c| c.is("netplan", &["apply"]))
            .times(1)
            .returning(|_| ok_output());

        let applier = applier(dir.path(), runner);
        let outcome = applier.apply(&static_config(None), &artifact()).await.unwrap();
        outcome.activation.await.unwrap();

        assert_eq!(outcome.address, AppliedAddress::Static(Ipv4Addr::new(192, 168, 1, 50)));
        assert_eq!(outcome.path, dir.path().join(FILE_NAME));

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["99-safeschool-static.yaml".to_string(), "README".to_string()]);

        let content = fs::read_to_string(&outcome.path).unwrap();
        assert_eq!(content, artifact().content);
        let mode = fs::metadata(&outcome.path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn test_apply_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("netplan");

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| ok_output());

        let applier = applier(&dir, runner);
        let config = ValidatedConfig {
            mode: NetworkMode::Dhcp,
            ..static_config(None)
        };
        let outcome = applier.apply(&config, &artifact()).await.unwrap();
        outcome.activation.await.unwrap();

        assert_eq!(outcome.address, AppliedAddress::Dhcp);
        assert!(dir.join(FILE_NAME).is_file());
    }

    #[tokio::test]
    async fn test_apply_sets_hostname_before_activation() {
        let dir = tempfile::tempdir().unwrap();
        let mut seq = mockall::Sequence::new();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|c| c.is("hostnamectl", &["set-hostname", "edge-01"]) && c.timeout == Duration::from_secs(10))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok_output());
        runner
            .expect_run()
            .withf(|c| c.is("netplan", &["apply"]))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok_output());

        let applier = applier(dir.path(), runner);
        let outcome = applier
            .apply(&static_config(Some("edge-01")), &artifact())
            .await
            .unwrap();
        outcome.activation.await.unwrap();
    }

    #[tokio::test]
    async fn test_hostname_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|c| c.program == "hostnamectl")
            .returning(|c| {
                Box::pin(async move {
                    Err(CommandError::Timeout {
                        program: c.program,
                        timeout: c.timeout,
                    })
                })
            });
        runner
            .expect_run()
            .withf(|c| c.program == "netplan")
            .times(1)
            .returning(|_| ok_output());

        let applier = applier(dir.path(), runner);
        let outcome = applier
            .apply(&static_config(Some("edge-01")), &artifact())
            .await
            .unwrap();
        outcome.activation.await.unwrap();
        assert!(outcome.path.is_file());
    }

    #[tokio::test]
    async fn test_activation_failure_is_not_returned() {
        let dir = tempfile::tempdir().unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|c| {
            Box::pin(async move {
                Err(CommandError::Spawn {
                    program: c.program,
                    source: io::Error::from(io::ErrorKind::NotFound),
                })
            })
        });

        let applier = applier(dir.path(), runner);
        let outcome = applier.apply(&static_config(None), &artifact()).await.unwrap();
        assert!(outcome.activation.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_waits_for_delay() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut runner = MockCommandRunner::new();
        let counter = Arc::clone(&runs);
        runner
            .expect_run()
            .withf(|c| c.is("netplan", &["apply"]))
            .times(1)
            .returning(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                ok_output()
            });

        let applier = ConfigApplier::new(
            dir.path().to_path_buf(),
            FILE_NAME.to_string(),
            Duration::from_secs(2),
            Duration::from_secs(15),
            Duration::from_secs(10),
            Arc::new(runner),
        );
        let outcome = applier.apply(&static_config(None), &artifact()).await.unwrap();

        // The caller gets its answer before anything is activated.
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(outcome.path.is_file());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        outcome.activation.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_applies_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("00-installer-config.yaml"), "old").unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|c| c.is("netplan", &["apply"]))
            .times(40)
            .returning(|_| ok_output());

        let applier = applier(dir.path(), runner);
        let config = static_config(None);
        let artifact = artifact();

        for _ in 0..20 {
            let (first, second) = tokio::join!(
                applier.apply(&config, &artifact),
                applier.apply(&config, &artifact)
            );
            let (first, second) = (first.unwrap(), second.unwrap());
            first.activation.await.unwrap();
            second.activation.await.unwrap();
        }

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![FILE_NAME.to_string()]);
        assert_eq!(fs::read_to_string(dir.path().join(FILE_NAME)).unwrap(), artifact.content);
    }

    #[tokio::test]
    async fn test_write_failure_skips_activation() {
        let root = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let dir = root.path().join("netplan");
        fs::write(&dir, "not a directory").unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let applier = applier(&dir, runner);
        let result = applier.apply(&static_config(Some("edge-01")), &artifact()).await;
        assert!(matches!(result, Err(ApplyError::CreateDir { .. })));
    }
}
