// Engine fakes shared by the server and TUI tests

use crate::services::{
    CheckResult, HealthState, Probe, ReconnectOutcome, Registry, RepairAction, Service, ServiceId,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub struct StaticProbe {
    pub state: HealthState,
    pub detail: &'static str,
}

#[async_trait]
impl Probe for StaticProbe {
    async fn evaluate(&self) -> CheckResult {
        CheckResult::new(self.state, self.detail)
    }
}

pub struct DelayedRepair {
    pub delay: Duration,
    pub success: bool,
    pub message: &'static str,
}

#[async_trait]
impl RepairAction for DelayedRepair {
    async fn perform(&self) -> ReconnectOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.success {
            ReconnectOutcome::success(self.message)
        } else {
            ReconnectOutcome::failure(self.message)
        }
    }
}

fn fake_service(
    id: ServiceId,
    state: HealthState,
    detail: &'static str,
    delay: Duration,
    success: bool,
    message: &'static str,
) -> Service {
    Service::new(
        id,
        Arc::new(StaticProbe { state, detail }),
        Arc::new(DelayedRepair {
            delay,
            success,
            message,
        }),
    )
}

/// Barrier healthy, tunnel down and failing to repair, SMB unknown
pub fn fake_registry(delay: Duration) -> Registry {
    let services = vec![
        fake_service(
            ServiceId::Barrier,
            HealthState::Healthy,
            "Client connected",
            delay,
            true,
            "Server restarted; Client restarted",
        ),
        fake_service(
            ServiceId::SshTunnel,
            HealthState::Unhealthy,
            "SSH reachable, tunnel process not running",
            delay,
            false,
            "Failed to start tunnel: ssh not found",
        ),
        fake_service(
            ServiceId::Smb,
            HealthState::Unknown,
            "Mount check failed: mount timed out",
            delay,
            true,
            "SMB share open requested",
        ),
    ];

    match Registry::new(services) {
        Ok(registry) => registry,
        Err(e) => panic!("fake registry is incomplete: {}", e),
    }
}
