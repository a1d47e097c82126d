// External representation of engine state (JSON bodies for the API and CLI)

use crate::services::models::{CheckResult, HealthState, ReconnectResult, ServiceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One entry of the `status` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusView {
    pub state: HealthState,
    pub detail: String,
    pub checked_at: DateTime<Utc>,
    pub label: &'static str,
    pub busy: bool,
}

/// Body of a `reconnect` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectView {
    pub success: bool,
    pub message: String,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_progress: bool,
}

pub type StatusReport = BTreeMap<ServiceId, ServiceStatusView>;

/// Attach labels and busy flags to a status snapshot
pub fn status_report<F>(results: BTreeMap<ServiceId, CheckResult>, busy: F) -> StatusReport
where
    F: Fn(ServiceId) -> bool,
{
    results
        .into_iter()
        .map(|(id, result)| {
            let view = ServiceStatusView {
                state: result.state,
                detail: result.detail,
                checked_at: result.checked_at,
                label: id.label(),
                busy: busy(id),
            };
            (id, view)
        })
        .collect()
}

pub fn reconnect_view(result: &ReconnectResult) -> ReconnectView {
    match result {
        ReconnectResult::Completed(outcome) => ReconnectView {
            success: outcome.success,
            message: outcome.message.clone(),
            completed_at: outcome.completed_at,
            in_progress: false,
        },
        ReconnectResult::AlreadyInProgress => ReconnectView {
            success: false,
            message: result.message().to_string(),
            completed_at: Utc::now(),
            in_progress: true,
        },
    }
}

pub fn reconnect_report(results: &BTreeMap<ServiceId, ReconnectResult>) -> BTreeMap<ServiceId, ReconnectView> {
    results
        .iter()
        .map(|(id, result)| (*id, reconnect_view(result)))
        .collect()
}
