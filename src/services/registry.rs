// Fixed registry of managed services and the engine's public contract

use crate::config::Config;
use crate::error::{RelinkError, Result};
use crate::services::capability::Capabilities;
use crate::services::models::{CheckResult, ReconnectResult, ServiceId};
use crate::services::probe::{BarrierProbe, SmbProbe, TunnelProbe};
use crate::services::repair::{BarrierRepair, SmbRepair, TunnelRepair};
use crate::services::service::Service;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Owns exactly one `Service` per `ServiceId`; never resized after construction
#[derive(Debug)]
pub struct Registry {
    services: BTreeMap<ServiceId, Service>,
}

impl Registry {
    /// Build from an explicit service list; every id must appear exactly once
    pub fn new(services: Vec<Service>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for service in services {
            let id = service.id();
            if map.insert(id, service).is_some() {
                return Err(RelinkError::Registry(format!("service '{}' registered twice", id)).into());
            }
        }

        if let Some(missing) = ServiceId::ALL.iter().find(|id| !map.contains_key(*id)) {
            return Err(RelinkError::Registry(format!("service '{}' is missing", missing)).into());
        }

        Ok(Self { services: map })
    }

    /// Wire the three services from configuration and injected capabilities
    pub fn from_config(config: &Config, caps: &Capabilities) -> Self {
        let probe_timeout = config.probe_timeout();
        let repair_timeout = config.repair_timeout();

        let barrier = Service::new(
            ServiceId::Barrier,
            Arc::new(BarrierProbe::new(caps.connections.clone(), config.barrier_port)),
            Arc::new(BarrierRepair::new(
                caps.processes.clone(),
                caps.remote.clone(),
                config.barrier_agent.clone(),
                config.barrier_process.clone(),
                config.remote_km_service.clone(),
            )),
        );

        let tunnel = Service::new(
            ServiceId::SshTunnel,
            Arc::new(TunnelProbe::new(
                caps.processes.clone(),
                caps.remote.clone(),
                config.tunnel_signature(),
            )),
            Arc::new(TunnelRepair::new(
                caps.processes.clone(),
                config.tunnel_signature(),
                config.tunnel_args(),
                config.tunnel_settle(),
            )),
        );

        let smb = Service::new(
            ServiceId::Smb,
            Arc::new(SmbProbe::new(caps.mounts.clone(), config.remote_host.clone())),
            Arc::new(SmbRepair::new(caps.processes.clone(), config.smb_url())),
        );

        let services = [barrier, tunnel, smb]
            .into_iter()
            .map(|s| (s.id(), s.with_timeouts(probe_timeout, repair_timeout)))
            .collect();

        Self { services }
    }

    /// Registry backed by the real OS commands
    pub fn system(config: &Config) -> Self {
        Self::from_config(config, &Capabilities::system(config))
    }

    pub fn get(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(&id)
    }

    pub fn is_busy(&self, id: ServiceId) -> bool {
        self.get(id).map(Service::is_busy).unwrap_or(false)
    }

    /// Check every service concurrently
    pub async fn status_all(&self) -> BTreeMap<ServiceId, CheckResult> {
        let checks = self
            .services
            .iter()
            .map(|(id, service)| async move { (*id, service.check().await) });

        join_all(checks).await.into_iter().collect()
    }

    /// Reconnect one service, subject to its busy guard
    pub async fn reconnect(&self, id: ServiceId) -> Result<ReconnectResult> {
        let service = self
            .get(id)
            .ok_or_else(|| RelinkError::ServiceNotRegistered(id.to_string()))?;
        Ok(service.reconnect().await)
    }

    /// Reconnect by textual id, failing with `UnknownService` outside the closed set
    pub async fn reconnect_by_name(&self, name: &str) -> Result<ReconnectResult> {
        let id: ServiceId = name.parse()?;
        self.reconnect(id).await
    }

    /// Reconnect every service concurrently
    pub async fn reconnect_all(&self) -> BTreeMap<ServiceId, ReconnectResult> {
        let attempts = self
            .services
            .iter()
            .map(|(id, service)| async move { (*id, service.reconnect().await) });

        join_all(attempts).await.into_iter().collect()
    }
}
