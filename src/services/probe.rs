// Health probes: read-only checks turning OS observations into a verdict

use crate::error::RelinkError;
use crate::services::capability::{
    ConnectionInspector, MountInspector, ProcessControl, RemoteExecutor, SocketState,
};
use crate::services::models::CheckResult;
use async_trait::async_trait;
use std::sync::Arc;

/// A side-effect-free health check.
///
/// Implementations never fail: when the underlying capability cannot run,
/// the result is `HealthState::Unknown` with the cause in `detail`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn evaluate(&self) -> CheckResult;
}

/// Healthy while a client holds an established connection on the Barrier port
pub struct BarrierProbe {
    connections: Arc<dyn ConnectionInspector>,
    port: u16,
}

impl BarrierProbe {
    pub fn new(connections: Arc<dyn ConnectionInspector>, port: u16) -> Self {
        Self { connections, port }
    }
}

#[async_trait]
impl Probe for BarrierProbe {
    async fn evaluate(&self) -> CheckResult {
        let sockets = match self.connections.connections().await {
            Ok(sockets) => sockets,
            Err(e) => {
                tracing::warn!("Barrier probe could not list connections: {}", e);
                return CheckResult::unknown(format!("Connection check failed: {}", e));
            }
        };

        let on_port = |state: SocketState| {
            sockets
                .iter()
                .any(|s| s.state == state && s.uses_port(self.port))
        };

        if on_port(SocketState::Established) {
            CheckResult::healthy("Client connected")
        } else if on_port(SocketState::Listen) {
            CheckResult::unhealthy("Listening, no client")
        } else {
            CheckResult::unhealthy("Server not running")
        }
    }
}

/// Healthy when the tunnel process runs and the remote answers over ssh
pub struct TunnelProbe {
    processes: Arc<dyn ProcessControl>,
    remote: Arc<dyn RemoteExecutor>,
    signature: String,
}

impl TunnelProbe {
    pub fn new(
        processes: Arc<dyn ProcessControl>,
        remote: Arc<dyn RemoteExecutor>,
        signature: String,
    ) -> Self {
        Self {
            processes,
            remote,
            signature,
        }
    }
}

#[async_trait]
impl Probe for TunnelProbe {
    async fn evaluate(&self) -> CheckResult {
        let echo = vec!["echo".to_string(), "ok".to_string()];
        let (running, reachable) = tokio::join!(
            self.processes.find(&self.signature),
            self.remote.run(&echo)
        );

        let running = match running {
            Ok(pids) => !pids.is_empty(),
            Err(e) => return CheckResult::unknown(format!("Process check failed: {}", e)),
        };
        let reachable = match reachable {
            Ok(output) => output.success(),
            // A host that never answers is unreachable, not undetermined
            Err(e) if is_timeout(&e) => {
                tracing::debug!("Reachability check timed out: {}", e);
                false
            }
            Err(e) => return CheckResult::unknown(format!("Reachability check failed: {}", e)),
        };

        match (running, reachable) {
            (true, true) => CheckResult::healthy("Tunnel active"),
            (false, true) => CheckResult::unhealthy("SSH reachable, tunnel process not running"),
            (true, false) => CheckResult::unhealthy("Tunnel process running, remote unreachable"),
            (false, false) => {
                CheckResult::unhealthy("Tunnel process not running, remote unreachable")
            }
        }
    }
}

fn is_timeout(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<RelinkError>(),
        Some(RelinkError::CommandTimeout { .. })
    )
}

/// Healthy when an SMB/CIFS mount from the remote host is present
pub struct SmbProbe {
    mounts: Arc<dyn MountInspector>,
    host: String,
}

impl SmbProbe {
    pub fn new(mounts: Arc<dyn MountInspector>, host: String) -> Self {
        Self { mounts, host }
    }
}

#[async_trait]
impl Probe for SmbProbe {
    async fn evaluate(&self) -> CheckResult {
        match self.mounts.mounts().await {
            Ok(mounts) => match mounts.iter().find(|m| m.is_smb_from(&self.host)) {
                Some(mount) => CheckResult::healthy(mount.mount_point.clone()),
                None => CheckResult::unhealthy("No mount found"),
            },
            Err(e) => {
                tracing::warn!("SMB probe could not read mount table: {}", e);
                CheckResult::unknown(format!("Mount check failed: {}", e))
            }
        }
    }
}
