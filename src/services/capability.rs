// OS capabilities consumed by probes and repairs
//
// Each trait is a narrow seam over an external command so the engine can be
// exercised against fakes. Implementations backed by real commands live in
// `system.rs`.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// TCP socket state as reported by netstat/ss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Established,
    Listen,
    Other,
}

/// One row of the active connection table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub local_port: Option<u16>,
    pub remote_port: Option<u16>,
    pub state: SocketState,
}

impl SocketEntry {
    /// True if either end of the socket uses `port`
    pub fn uses_port(&self, port: u16) -> bool {
        self.local_port == Some(port) || self.remote_port == Some(port)
    }
}

/// One row of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: String,
    pub fs_type: String,
}

impl MountEntry {
    /// SMB/CIFS mount whose source names `host`
    pub fn is_smb_from(&self, host: &str) -> bool {
        let fs = self.fs_type.to_lowercase();
        matches!(fs.as_str(), "smbfs" | "cifs" | "smb3") && self.source.contains(host)
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short description of a failed run for outcome messages
    pub fn failure_summary(&self) -> String {
        let status = match self.status {
            Some(code) => format!("exit {}", code),
            None => "killed by signal".to_string(),
        };
        match self.stderr.lines().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{}: {}", status, line.trim()),
            None => status,
        }
    }
}

/// Query active network connections
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionInspector: Send + Sync {
    async fn connections(&self) -> Result<Vec<SocketEntry>>;
}

/// Query active filesystem mounts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MountInspector: Send + Sync {
    async fn mounts(&self) -> Result<Vec<MountEntry>>;
}

/// Run a command on the remote host over the trusted SSH channel
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// `Err` only when the command could not be run at all; a non-zero exit
    /// is reported through `CommandOutput::status`.
    async fn run(&self, command: &[String]) -> Result<CommandOutput>;
}

/// Start, stop and query local processes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// PIDs whose full command line matches `pattern`
    async fn find(&self, pattern: &str) -> Result<Vec<u32>>;

    /// Signal every process matching `pattern`; returns whether any matched
    async fn terminate(&self, pattern: &str) -> Result<bool>;

    /// Restart the agent registered under `label` with the session's service manager
    async fn restart_agent(&self, label: &str) -> Result<()>;

    /// Launch a process that outlives the caller; returns its PID
    async fn spawn_detached(&self, program: &str, args: &[String]) -> Result<u32>;

    /// Ask the desktop shell to open `url`
    async fn open_url(&self, url: &str) -> Result<()>;
}

/// Bundle of capabilities injected into the probes and repairs
#[derive(Clone)]
pub struct Capabilities {
    pub connections: Arc<dyn ConnectionInspector>,
    pub mounts: Arc<dyn MountInspector>,
    pub remote: Arc<dyn RemoteExecutor>,
    pub processes: Arc<dyn ProcessControl>,
}
