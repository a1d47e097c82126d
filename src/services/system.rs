// Capability implementations backed by local commands

use crate::config::Config;
use crate::error::{RelinkError, Result};
use crate::services::capability::{
    Capabilities, CommandOutput, ConnectionInspector, MountEntry, MountInspector,
    ProcessControl, RemoteExecutor, SocketEntry, SocketState,
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

impl Capabilities {
    /// Capabilities that shell out to netstat, mount, ssh and friends
    pub fn system(config: &Config) -> Self {
        let timeout = config.command_timeout();
        Self {
            connections: Arc::new(NetstatInspector::new(timeout)),
            mounts: Arc::new(MountTable::new(timeout)),
            remote: Arc::new(SshExecutor::new(config.ssh_destination(), timeout)),
            processes: Arc::new(LocalProcesses::new(timeout)),
        }
    }
}

/// Run `program` to completion, killing it if it outlives `timeout`
pub async fn run_command(program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| RelinkError::CommandTimeout {
            program: program.to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|e| spawn_error(program, &e))?;

    Ok(CommandOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn spawn_error(program: &str, error: &std::io::Error) -> RelinkError {
    RelinkError::CommandSpawn {
        program: program.to_string(),
        kind: error.kind(),
        message: error.to_string(),
    }
}

fn failed(program: &str, output: &CommandOutput) -> RelinkError {
    RelinkError::CommandFailed {
        program: program.to_string(),
        status: output
            .status
            .map(|code| format!("exit {}", code))
            .unwrap_or_else(|| "signal".to_string()),
        stderr: output.stderr.trim().to_string(),
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Connection table via `netstat -an`, falling back to `ss -tan`
pub struct NetstatInspector {
    timeout: Duration,
}

impl NetstatInspector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ConnectionInspector for NetstatInspector {
    async fn connections(&self) -> Result<Vec<SocketEntry>> {
        let (program, output) = match run_command("netstat", &args(&["-an"]), self.timeout).await {
            Ok(output) => ("netstat", output),
            Err(e) if is_missing_program(&e) => {
                tracing::debug!("netstat unavailable, falling back to ss");
                ("ss", run_command("ss", &args(&["-tan"]), self.timeout).await?)
            }
            Err(e) => return Err(e),
        };

        socket_entries(program, &output)
    }
}

/// Socket table from a finished `netstat`/`ss` run
fn socket_entries(program: &str, output: &CommandOutput) -> Result<Vec<SocketEntry>> {
    if !output.success() {
        return Err(failed(program, output).into());
    }
    Ok(output.stdout.lines().filter_map(parse_socket_line).collect())
}

fn is_missing_program(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<RelinkError>(),
        Some(RelinkError::CommandSpawn {
            kind: ErrorKind::NotFound,
            ..
        })
    )
}

/// Parse one line of `netstat -an` (BSD or Linux) or `ss -tan` output
pub fn parse_socket_line(line: &str) -> Option<SocketEntry> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let state = tokens.iter().find_map(|t| match *t {
        "ESTABLISHED" | "ESTAB" => Some(SocketState::Established),
        "LISTEN" => Some(SocketState::Listen),
        _ => None,
    });

    let mut addresses = tokens.iter().filter(|t| looks_like_address(t));
    let local = addresses.next()?;
    let remote = addresses.next();

    Some(SocketEntry {
        local_port: address_port(local),
        remote_port: remote.and_then(|r| address_port(r)),
        state: state.unwrap_or(SocketState::Other),
    })
}

fn looks_like_address(token: &str) -> bool {
    (token.contains(':') || token.contains('.'))
        && token
            .chars()
            .last()
            .map(|c| c.is_ascii_digit() || c == '*')
            .unwrap_or(false)
}

/// Port after the last `:` (Linux) or `.` (BSD) separator
fn address_port(address: &str) -> Option<u16> {
    let split = address.rfind([':', '.'])?;
    address[split + 1..].parse().ok()
}

/// Mount table via `mount`
pub struct MountTable {
    timeout: Duration,
}

impl MountTable {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MountInspector for MountTable {
    async fn mounts(&self) -> Result<Vec<MountEntry>> {
        let output = run_command("mount", &[], self.timeout).await?;
        if !output.success() {
            return Err(failed("mount", &output).into());
        }
        Ok(output.stdout.lines().filter_map(parse_mount_line).collect())
    }
}

/// Parse `src on /point (fstype, opts)` (macOS) or `src on /point type fstype (opts)` (Linux)
pub fn parse_mount_line(line: &str) -> Option<MountEntry> {
    let (source, rest) = line.split_once(" on ")?;

    let (mount_point, fs_type) = if let Some((point, tail)) = rest.split_once(" type ") {
        (point, tail.split_whitespace().next()?)
    } else {
        let (point, tail) = rest.rsplit_once(" (")?;
        (point, tail.split([',', ')']).next()?.trim())
    };

    Some(MountEntry {
        source: source.trim().to_string(),
        mount_point: mount_point.trim().to_string(),
        fs_type: fs_type.to_string(),
    })
}

/// Remote commands over batch-mode ssh
pub struct SshExecutor {
    destination: String,
    timeout: Duration,
}

impl SshExecutor {
    pub fn new(destination: String, timeout: Duration) -> Self {
        Self { destination, timeout }
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, command: &[String]) -> Result<CommandOutput> {
        let mut ssh_args = args(&["-o", "ConnectTimeout=5", "-o", "BatchMode=yes"]);
        ssh_args.push(self.destination.clone());
        ssh_args.extend(command.iter().cloned());

        tracing::debug!("ssh {} {}", self.destination, command.join(" "));
        run_command("ssh", &ssh_args, self.timeout).await
    }
}

/// pgrep/pkill plus the platform service manager and desktop opener
pub struct LocalProcesses {
    timeout: Duration,
}

impl LocalProcesses {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn current_uid(&self) -> Result<String> {
        let output = run_command("id", &args(&["-u"]), self.timeout).await?;
        if !output.success() {
            return Err(failed("id", &output).into());
        }
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl ProcessControl for LocalProcesses {
    async fn find(&self, pattern: &str) -> Result<Vec<u32>> {
        let output = run_command("pgrep", &args(&["-f", pattern]), self.timeout).await?;
        match output.status {
            Some(0) => Ok(output
                .stdout
                .lines()
                .filter_map(|l| l.trim().parse().ok())
                .collect()),
            // pgrep exits 1 when nothing matched
            Some(1) => Ok(Vec::new()),
            _ => Err(failed("pgrep", &output).into()),
        }
    }

    async fn terminate(&self, pattern: &str) -> Result<bool> {
        let output = run_command("pkill", &args(&["-f", pattern]), self.timeout).await?;
        match output.status {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(failed("pkill", &output).into()),
        }
    }

    async fn restart_agent(&self, label: &str) -> Result<()> {
        let (program, command_args) = if cfg!(target_os = "macos") {
            let uid = self.current_uid().await?;
            ("launchctl", vec![
                "kickstart".to_string(),
                "-k".to_string(),
                format!("gui/{}/{}", uid, label),
            ])
        } else {
            ("systemctl", args(&["--user", "restart", label]))
        };

        let output = run_command(program, &command_args, self.timeout).await?;
        if !output.success() {
            return Err(failed(program, &output).into());
        }
        Ok(())
    }

    async fn spawn_detached(&self, program: &str, args: &[String]) -> Result<u32> {
        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group so terminal signals aimed at relink skip the child
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let child = Command::from(command)
            .spawn()
            .map_err(|e| spawn_error(program, &e))?;
        let pid = child.id().unwrap_or_default();
        tracing::info!("Spawned detached {} (pid {})", program, pid);
        Ok(pid)
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
        self.spawn_detached(opener, &[url.to_string()]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bsd_netstat_line() {
        let entry = parse_socket_line(
            "tcp4       0      0  192.168.1.5.24800      192.168.1.100.51234    ESTABLISHED",
        )
        .unwrap();
        assert_eq!(entry.local_port, Some(24800));
        assert_eq!(entry.remote_port, Some(51234));
        assert_eq!(entry.state, SocketState::Established);
        assert!(entry.uses_port(24800));
    }

    #[test]
    fn test_parse_bsd_listen_line() {
        let entry = parse_socket_line("tcp46      0      0  *.24800                *.*                    LISTEN").unwrap();
        assert_eq!(entry.local_port, Some(24800));
        assert_eq!(entry.remote_port, None);
        assert_eq!(entry.state, SocketState::Listen);
    }

    #[test]
    fn test_parse_linux_netstat_and_ss_lines() {
        let netstat = parse_socket_line(
            "tcp        0      0 192.168.1.5:51234       192.168.1.100:24800     ESTABLISHED",
        )
        .unwrap();
        assert_eq!(netstat.remote_port, Some(24800));
        assert_eq!(netstat.state, SocketState::Established);

        let ss = parse_socket_line("ESTAB   0   0   [::ffff:192.168.1.5]:24800   [::ffff:192.168.1.100]:40022").unwrap();
        assert_eq!(ss.local_port, Some(24800));
        assert_eq!(ss.remote_port, Some(40022));
        assert_eq!(ss.state, SocketState::Established);
    }

    #[test]
    fn test_parse_socket_header_lines() {
        assert!(parse_socket_line("Active Internet connections (including servers)").is_none());
        assert!(parse_socket_line("Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)").is_none());
    }

    #[test]
    fn test_parse_macos_mount_line() {
        let entry = parse_mount_line(
            "//user@192.168.1.100/share on /Volumes/My Share (smbfs, nodev, nosuid, mounted by user)",
        )
        .unwrap();
        assert_eq!(entry.source, "//user@192.168.1.100/share");
        assert_eq!(entry.mount_point, "/Volumes/My Share");
        assert_eq!(entry.fs_type, "smbfs");
        assert!(entry.is_smb_from("192.168.1.100"));
        assert!(!entry.is_smb_from("192.168.1.101"));
    }

    #[test]
    fn test_parse_linux_mount_line() {
        let entry = parse_mount_line("//192.168.1.100/media on /mnt/media type cifs (rw,relatime,vers=3.1.1)").unwrap();
        assert_eq!(entry.mount_point, "/mnt/media");
        assert_eq!(entry.fs_type, "cifs");
        assert!(entry.is_smb_from("192.168.1.100"));

        let local = parse_mount_line("/dev/sda1 on / type ext4 (rw,relatime)").unwrap();
        assert!(!local.is_smb_from("192.168.1.100"));
    }

    #[test]
    fn test_command_output_failure_summary() {
        let output = CommandOutput {
            status: Some(255),
            stdout: String::new(),
            stderr: "\nssh: connect to host 192.168.1.100 port 22: Connection refused\n".to_string(),
        };
        assert_eq!(
            output.failure_summary(),
            "exit 255: ssh: connect to host 192.168.1.100 port 22: Connection refused"
        );
        assert_eq!(CommandOutput::default().failure_summary(), "killed by signal");
    }

    #[tokio::test]
    async fn test_run_command_reports_missing_program() {
        let err = run_command("relink-definitely-not-a-program", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelinkError>(),
            Some(RelinkError::CommandSpawn {
                kind: ErrorKind::NotFound,
                ..
            })
        ));
        assert!(is_missing_program(&err));
    }

    #[test]
    fn test_missing_program_ignores_other_spawn_errors() {
        let denied: anyhow::Error = RelinkError::CommandSpawn {
            program: "netstat".to_string(),
            kind: ErrorKind::PermissionDenied,
            message: "not found in a message does not count".to_string(),
        }
        .into();
        assert!(!is_missing_program(&denied));

        let timeout: anyhow::Error = RelinkError::CommandTimeout {
            program: "netstat".to_string(),
            secs: 10,
        }
        .into();
        assert!(!is_missing_program(&timeout));
    }

    #[test]
    fn test_socket_entries_names_the_program_that_ran() {
        let output = CommandOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: "Cannot open netlink socket".to_string(),
        };
        let err = socket_entries("ss", &output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelinkError>(),
            Some(RelinkError::CommandFailed { program, .. }) if program == "ss"
        ));
        assert!(err.to_string().starts_with("'ss' exited with exit 1"));

        let ok = CommandOutput {
            status: Some(0),
            stdout: "tcp4  0  0  *.24800  *.*  LISTEN\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(socket_entries("netstat", &ok).unwrap().len(), 1);
    }
}
