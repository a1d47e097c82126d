// Repair actions: side-effecting steps that try to bring a service back

use crate::services::capability::{ProcessControl, RemoteExecutor};
use crate::services::models::ReconnectOutcome;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A mutating operation that may take seconds and may fail.
///
/// Failures are reported through `ReconnectOutcome`, never returned as errors.
/// Overlap is prevented by the owning `Service`, not here.
#[async_trait]
pub trait RepairAction: Send + Sync {
    async fn perform(&self) -> ReconnectOutcome;
}

/// Restart the local Barrier server agent, then the client unit on the remote host
pub struct BarrierRepair {
    processes: Arc<dyn ProcessControl>,
    remote: Arc<dyn RemoteExecutor>,
    agent: String,
    fallback_process: Option<String>,
    remote_unit: String,
}

impl BarrierRepair {
    pub fn new(
        processes: Arc<dyn ProcessControl>,
        remote: Arc<dyn RemoteExecutor>,
        agent: String,
        fallback_process: Option<String>,
        remote_unit: String,
    ) -> Self {
        Self {
            processes,
            remote,
            agent,
            fallback_process,
            remote_unit,
        }
    }

    async fn restart_local(&self) -> Result<&'static str, String> {
        let error = match self.processes.restart_agent(&self.agent).await {
            Ok(()) => return Ok("Server restarted"),
            Err(e) => e,
        };
        tracing::warn!("Agent restart for {} failed: {}", self.agent, error);

        let Some(pattern) = self.fallback_process.as_deref() else {
            return Err(format!("Local server restart failed: {}", error));
        };

        // The agent manager relaunches the server once it is gone
        match self.processes.terminate(pattern).await {
            Ok(true) => Ok("Server killed, keep-alive will restart it"),
            Ok(false) => Err(format!(
                "Local server restart failed: {} (no '{}' process to kill)",
                error, pattern
            )),
            Err(kill_error) => Err(format!(
                "Local server restart failed: {}; kill fallback failed: {}",
                error, kill_error
            )),
        }
    }

    async fn restart_remote(&self) -> Result<(), String> {
        let command = vec![
            "systemctl".to_string(),
            "--user".to_string(),
            "restart".to_string(),
            self.remote_unit.clone(),
        ];
        match self.remote.run(&command).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(output.failure_summary()),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[async_trait]
impl RepairAction for BarrierRepair {
    async fn perform(&self) -> ReconnectOutcome {
        let local = match self.restart_local().await {
            Ok(message) => message,
            Err(message) => return ReconnectOutcome::failure(message),
        };

        // No rollback of the local restart when the remote step fails
        match self.restart_remote().await {
            Ok(()) => ReconnectOutcome::success(format!("{}; Client restarted", local)),
            Err(cause) => {
                tracing::warn!("Remote restart of {} failed: {}", self.remote_unit, cause);
                ReconnectOutcome::failure(format!(
                    "{}; Remote client restart failed: {}",
                    local, cause
                ))
            }
        }
    }
}

/// Kill any stale tunnel and launch a fresh detached one
pub struct TunnelRepair {
    processes: Arc<dyn ProcessControl>,
    signature: String,
    args: Vec<String>,
    settle: Duration,
}

impl TunnelRepair {
    pub fn new(
        processes: Arc<dyn ProcessControl>,
        signature: String,
        args: Vec<String>,
        settle: Duration,
    ) -> Self {
        Self {
            processes,
            signature,
            args,
            settle,
        }
    }
}

#[async_trait]
impl RepairAction for TunnelRepair {
    async fn perform(&self) -> ReconnectOutcome {
        match self.processes.terminate(&self.signature).await {
            Ok(true) => tracing::info!("Terminated stale tunnel matching '{}'", self.signature),
            Ok(false) => tracing::debug!("No stale tunnel to terminate"),
            Err(e) => tracing::warn!("Could not terminate stale tunnel: {}", e),
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        match self.processes.spawn_detached("ssh", &self.args).await {
            Ok(pid) => ReconnectOutcome::success(format!("Tunnel re-established (pid {})", pid)),
            Err(e) => ReconnectOutcome::failure(format!("Failed to start tunnel: {}", e)),
        }
    }
}

/// Ask the desktop shell to mount the share
pub struct SmbRepair {
    processes: Arc<dyn ProcessControl>,
    url: String,
}

impl SmbRepair {
    pub fn new(processes: Arc<dyn ProcessControl>, url: String) -> Self {
        Self { processes, url }
    }
}

#[async_trait]
impl RepairAction for SmbRepair {
    async fn perform(&self) -> ReconnectOutcome {
        match self.processes.open_url(&self.url).await {
            Ok(()) => ReconnectOutcome::success("SMB share open requested"),
            Err(e) => ReconnectOutcome::failure(format!("Failed to open {}: {}", self.url, e)),
        }
    }
}
