// A managed service: one probe, one repair, one busy flag

use crate::services::models::{CheckResult, ReconnectOutcome, ReconnectResult, ServiceId};
use crate::services::probe::Probe;
use crate::services::repair::RepairAction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_REPAIR_TIMEOUT: Duration = Duration::from_secs(30);

/// Clears the busy flag when dropped, whatever way the repair ended
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Non-blocking: `None` if a repair already holds the flag
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Service {
    id: ServiceId,
    probe: Arc<dyn Probe>,
    repair: Arc<dyn RepairAction>,
    busy: Arc<AtomicBool>,
    probe_timeout: Duration,
    repair_timeout: Duration,
}

impl Service {
    pub fn new(id: ServiceId, probe: Arc<dyn Probe>, repair: Arc<dyn RepairAction>) -> Self {
        Self {
            id,
            probe,
            repair,
            busy: Arc::new(AtomicBool::new(false)),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            repair_timeout: DEFAULT_REPAIR_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, probe_timeout: Duration, repair_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self.repair_timeout = repair_timeout;
        self
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// True while a reconnect is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run the probe; available whether or not a reconnect is in flight
    pub async fn check(&self) -> CheckResult {
        match tokio::time::timeout(self.probe_timeout, self.probe.evaluate()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} probe timed out after {:?}", self.id, self.probe_timeout);
                CheckResult::unknown(format!(
                    "Check timed out after {}s",
                    self.probe_timeout.as_secs()
                ))
            }
        }
    }

    /// Run the repair unless one is already running for this service.
    ///
    /// The repair executes on its own task: dropping the returned future does
    /// not cancel it, and the busy flag stays set until it finishes or times out.
    pub async fn reconnect(&self) -> ReconnectResult {
        let Some(guard) = BusyGuard::try_acquire(&self.busy) else {
            tracing::warn!("Reconnect of {} rejected: already in progress", self.id);
            return ReconnectResult::AlreadyInProgress;
        };

        tracing::info!("Reconnecting {}", self.id);
        let id = self.id;
        let repair = Arc::clone(&self.repair);
        let limit = self.repair_timeout;

        let task = tokio::spawn(async move {
            let _guard = guard;
            match tokio::time::timeout(limit, repair.perform()).await {
                Ok(outcome) => outcome,
                Err(_) => ReconnectOutcome::failure(format!(
                    "Reconnect timed out after {}s",
                    limit.as_secs()
                )),
            }
        });

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => ReconnectOutcome::failure(format!("Reconnect task aborted: {}", e)),
        };

        if outcome.success {
            tracing::info!("Reconnect of {} succeeded: {}", id, outcome.message);
        } else {
            tracing::warn!("Reconnect of {} failed: {}", id, outcome.message);
        }
        ReconnectResult::Completed(outcome)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("busy", &self.is_busy())
            .finish()
    }
}
