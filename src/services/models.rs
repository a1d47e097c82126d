// Managed service data models

use crate::error::RelinkError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one of the three managed services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceId {
    /// Keyboard/mouse sharing link
    Barrier,
    /// Port-forwarding SSH tunnel
    SshTunnel,
    /// Network file share mount
    Smb,
}

impl ServiceId {
    pub const ALL: [ServiceId; 3] = [ServiceId::Barrier, ServiceId::SshTunnel, ServiceId::Smb];

    /// Canonical identifier used in URLs and JSON keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::Barrier => "barrier",
            ServiceId::SshTunnel => "ssh_tunnel",
            ServiceId::Smb => "smb",
        }
    }

    /// Get display label for the service
    pub fn label(&self) -> &'static str {
        match self {
            ServiceId::Barrier => "Barrier",
            ServiceId::SshTunnel => "SSH Tunnel",
            ServiceId::Smb => "File Access",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceId {
    type Err = RelinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "barrier" => Ok(ServiceId::Barrier),
            "ssh_tunnel" | "ssh-tunnel" | "ssh" => Ok(ServiceId::SshTunnel),
            "smb" => Ok(ServiceId::Smb),
            _ => Err(RelinkError::UnknownService(s.to_string())),
        }
    }
}

/// Tri-state health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// The probe itself could not run
    Unknown,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Unknown => "unknown",
        }
    }
}

/// Result of a single `check()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub state: HealthState,
    pub detail: String,
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(state: HealthState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: detail.into(),
            checked_at: Utc::now(),
        }
    }

    pub fn healthy(detail: impl Into<String>) -> Self {
        Self::new(HealthState::Healthy, detail)
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self::new(HealthState::Unhealthy, detail)
    }

    /// Probe execution failure; the detail is clipped for display
    pub fn unknown(detail: impl AsRef<str>) -> Self {
        Self::new(HealthState::Unknown, clip_detail(detail.as_ref()))
    }

    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// Result of a completed repair attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectOutcome {
    pub success: bool,
    pub message: String,
    pub completed_at: DateTime<Utc>,
}

impl ReconnectOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            completed_at: Utc::now(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            completed_at: Utc::now(),
        }
    }
}

/// What a caller gets back from `reconnect()`
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectResult {
    Completed(ReconnectOutcome),
    /// Another reconnect for this service was already running; nothing was started
    AlreadyInProgress,
}

impl ReconnectResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ReconnectResult::Completed(outcome) if outcome.success)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, ReconnectResult::AlreadyInProgress)
    }

    pub fn message(&self) -> &str {
        match self {
            ReconnectResult::Completed(outcome) => &outcome.message,
            ReconnectResult::AlreadyInProgress => "Reconnect already in progress",
        }
    }
}

const DETAIL_LIMIT: usize = 80;

/// Trim error text so it fits a dashboard card
pub fn clip_detail(detail: &str) -> String {
    let line = detail.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= DETAIL_LIMIT {
        line.to_string()
    } else {
        let clipped: String = line.chars().take(DETAIL_LIMIT - 1).collect();
        format!("{}…", clipped)
    }
}
