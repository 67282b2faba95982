//! External package installation for `packageDependencies`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use hearth_core::config::PackageInstallerConfig;
use hearth_core::error::AppError;
use hearth_core::result::AppResult;

/// Installs one external package.
#[async_trait]
pub trait PackageInstaller: Send + Sync + std::fmt::Debug {
    /// Installs `package`, failing with `ExternalInstall`.
    async fn install(&self, package: &str) -> AppResult<()>;
}

/// Installer that runs `program args... <package>`.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl CommandInstaller {
    /// Creates an installer for the given command line prefix.
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            working_dir: None,
        }
    }

    /// Runs the command inside `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Builds the configured installer; a disabled installer is a no-op.
    pub fn from_config(config: &PackageInstallerConfig) -> Arc<dyn PackageInstaller> {
        if !config.enabled {
            return Arc::new(NoopInstaller);
        }
        Arc::new(Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_seconds),
        ))
    }
}

#[async_trait]
impl PackageInstaller for CommandInstaller {
    async fn install(&self, package: &str) -> AppResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(package)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program, package, "Installing package");

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                info!(package, "Package installed");
                Ok(())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(AppError::external_install(format!(
                    "Installing package '{package}' failed with exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.chars().take(500).collect::<String>()
                )))
            }
            Ok(Err(e)) => Err(AppError::external_install(format!(
                "Cannot run '{}' for package '{package}': {e}",
                self.program
            ))),
            Err(_) => Err(AppError::external_install(format!(
                "Installing package '{package}' timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Installer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstaller;

#[async_trait]
impl PackageInstaller for NoopInstaller {
    async fn install(&self, package: &str) -> AppResult<()> {
        debug!(package, "Package installation disabled, skipping");
        Ok(())
    }
}

/// Installs `packages` one after another. Failures are logged and do not
/// stop the remaining packages. Returns the number of failures.
pub async fn install_packages(
    installer: &dyn PackageInstaller,
    plugin: &str,
    packages: &[String],
) -> usize {
    let mut failures = 0;
    for package in packages {
        if let Err(e) = installer.install(package).await {
            warn!(plugin, package = %package, error = %e, "Package dependency not installed");
            failures += 1;
        }
    }
    failures
}
