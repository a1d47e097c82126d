// Configuration management

use crate::error::{RelinkError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "RELINK_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote_host: String,
    pub remote_user: String,
    pub barrier_port: u16,
    /// launchd label (macOS) or user unit (Linux) of the local Barrier server
    pub barrier_agent: String,
    /// `pkill -f` pattern used when the agent restart itself fails
    pub barrier_process: Option<String>,
    pub remote_km_service: String,
    pub ssh_local_forward: String,
    pub ssh_remote_forward: String,
    pub smb_share: Option<String>,
    pub bind_address: String,
    pub port: u16,
    pub open_browser: bool,
    pub refresh_secs: u64,
    pub command_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub repair_timeout_secs: u64,
    pub tunnel_settle_ms: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_host: "192.168.1.100".to_string(),
            remote_user: "user".to_string(),
            barrier_port: 24800,
            barrier_agent: "com.github.barrier.server".to_string(),
            barrier_process: Some("barriers".to_string()),
            remote_km_service: "input-leap-client.service".to_string(),
            ssh_local_forward: "11436:127.0.0.1:11434".to_string(),
            ssh_remote_forward: "18796:127.0.0.1:18789".to_string(),
            smb_share: None,
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            open_browser: true,
            refresh_secs: 10,
            command_timeout_secs: 10,
            probe_timeout_secs: 15,
            repair_timeout_secs: 30,
            tunnel_settle_ms: 1000,
            log_file: None,
        }
    }
}

impl Config {
    /// Get default config path: ~/.config/relink/config.yaml
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("relink").join("config.yaml"))
    }

    /// Load config from path, falling back to defaults if not found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| Self::default_path().unwrap_or_default());

        if config_path.is_file() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
                RelinkError::Config(format!("{}: {}", config_path.display(), e))
            })?;
            tracing::debug!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from file, apply `RELINK_*` overrides, then validate
    pub fn resolve(path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to path
    pub fn save(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("REMOTE_HOST") {
            self.remote_host = value;
        }
        if let Some(value) = var("REMOTE_USER") {
            self.remote_user = value;
        }
        if let Some(value) = var("BARRIER_PORT") {
            self.barrier_port = parse_env("BARRIER_PORT", &value)?;
        }
        if let Some(value) = var("BARRIER_AGENT") {
            self.barrier_agent = value;
        }
        if let Some(value) = var("BARRIER_PROCESS") {
            self.barrier_process = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = var("REMOTE_KM_SERVICE") {
            self.remote_km_service = value;
        }
        if let Some(value) = var("SSH_LOCAL_FWD") {
            self.ssh_local_forward = value;
        }
        if let Some(value) = var("SSH_REMOTE_FWD") {
            self.ssh_remote_forward = value;
        }
        if let Some(value) = var("SMB_SHARE") {
            self.smb_share = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = var("BIND_ADDRESS") {
            self.bind_address = value;
        }
        if let Some(value) = var("PORT") {
            self.port = parse_env("PORT", &value)?;
        }
        if let Some(value) = var("OPEN_BROWSER") {
            self.open_browser = parse_env_bool("OPEN_BROWSER", &value)?;
        }

        Ok(())
    }

    /// Check the settings that would otherwise fail at probe or repair time
    pub fn validate(&self) -> Result<()> {
        validate_word("remote_host", &self.remote_host)?;
        validate_word("remote_user", &self.remote_user)?;
        validate_word("barrier_agent", &self.barrier_agent)?;
        validate_word("remote_km_service", &self.remote_km_service)?;
        validate_forward("ssh_local_forward", &self.ssh_local_forward)?;
        validate_forward("ssh_remote_forward", &self.ssh_remote_forward)?;

        let addr: IpAddr = self.bind_address.parse().map_err(|_| {
            RelinkError::Config(format!("bind_address '{}' is not an IP address", self.bind_address))
        })?;
        if !addr.is_loopback() {
            return Err(RelinkError::Config(format!(
                "bind_address '{}' must be a loopback address; the API has no authentication",
                self.bind_address
            ))
            .into());
        }

        for (name, value) in [
            ("refresh_secs", self.refresh_secs),
            ("command_timeout_secs", self.command_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("repair_timeout_secs", self.repair_timeout_secs),
        ] {
            if value == 0 {
                return Err(RelinkError::Config(format!("{} must be greater than zero", name)).into());
            }
        }

        Ok(())
    }

    /// `user@host` destination used for every ssh invocation
    pub fn ssh_destination(&self) -> String {
        format!("{}@{}", self.remote_user, self.remote_host)
    }

    /// `pgrep -f` pattern matching the managed tunnel process
    pub fn tunnel_signature(&self) -> String {
        format!("ssh -N.*{}", self.remote_host)
    }

    /// Arguments for the long-running `ssh` tunnel process
    ///
    /// The tunnel runs without a terminal, so it must never prompt: a
    /// password or host-key question fails fast instead of leaving a stopped
    /// process that still matches the tunnel signature.
    pub fn tunnel_args(&self) -> Vec<String> {
        vec![
            "-N".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ExitOnForwardFailure=yes".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=30".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
            "-L".to_string(),
            self.ssh_local_forward.clone(),
            "-R".to_string(),
            self.ssh_remote_forward.clone(),
            self.ssh_destination(),
        ]
    }

    /// URL handed to the desktop shell to open the share
    pub fn smb_url(&self) -> String {
        match self.smb_share.as_deref() {
            Some(share) => format!(
                "smb://{}/{}",
                self.ssh_destination(),
                share.trim_start_matches('/')
            ),
            None => format!("smb://{}", self.ssh_destination()),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn repair_timeout(&self) -> Duration {
        Duration::from_secs(self.repair_timeout_secs)
    }

    pub fn tunnel_settle(&self) -> Duration {
        Duration::from_millis(self.tunnel_settle_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        RelinkError::Config(format!("{}{} has invalid value '{}'", ENV_PREFIX, name, value)).into()
    })
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RelinkError::Config(format!(
            "{}{} has invalid value '{}'",
            ENV_PREFIX, name, value
        ))
        .into()),
    }
}

fn validate_word(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RelinkError::Config(format!("{} cannot be empty", name)).into());
    }
    if value.chars().any(char::is_whitespace) {
        return Err(RelinkError::Config(format!("{} cannot contain whitespace", name)).into());
    }
    Ok(())
}

/// Forward specs look like `11436:127.0.0.1:11434`
fn validate_forward(name: &str, spec: &str) -> Result<()> {
    let invalid = || RelinkError::Config(format!("{} '{}' is not of the form port:host:port", name, spec));

    let (listen, rest) = spec.split_once(':').ok_or_else(invalid)?;
    let (host, target) = rest.rsplit_once(':').ok_or_else(invalid)?;

    if listen.parse::<u16>().is_err() || target.parse::<u16>().is_err() || host.is_empty() {
        return Err(invalid().into());
    }
    Ok(())
}
