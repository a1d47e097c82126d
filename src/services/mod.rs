// Health-check and reconnect engine

pub mod capability;
pub mod models;
pub mod probe;
pub mod registry;
pub mod repair;
pub mod report;
pub mod service;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{
    Capabilities, CommandOutput, ConnectionInspector, MountEntry, MountInspector,
    ProcessControl, RemoteExecutor, SocketEntry, SocketState,
};
pub use models::{CheckResult, HealthState, ReconnectOutcome, ReconnectResult, ServiceId};
pub use probe::{BarrierProbe, Probe, SmbProbe, TunnelProbe};
pub use registry::Registry;
pub use repair::{BarrierRepair, RepairAction, SmbRepair, TunnelRepair};
pub use report::{reconnect_report, reconnect_view, status_report, ReconnectView, ServiceStatusView, StatusReport};
pub use service::Service;
