// Unraid BFF — Mapper Module
//
// Pure functions from loosely shaped upstream GraphQL JSON to the strict,
// camelCase response types the PWA renders. No mapper fails: absent fields
// become placeholders (`-`, 0, empty lists).

mod array;
mod coerce;
mod docker;
mod overview;
mod shares;
mod vms;

use serde::Serialize;
use serde_json::Value;

pub use array::{map_array, ArrayCapacity, ArrayDevice, ArrayResponse, DeviceRole, DiskType};
pub use coerce::{normalize_run_state, RunStatus};
pub use docker::{map_docker, DockerContainer, DockerResponse, DockerSummary};
pub(crate) use docker::{primary_name, ICON_LABEL};
pub use overview::{
    map_overview, AccessUrl, LastParityCheck, NotificationItem, NotificationKind,
    OverviewResponse, UnreadNotifications, UpsDevice, UpsSummary,
};
pub use shares::{map_shares, Share, SharesResponse};
pub use vms::{map_vms, VmSummary, VirtualMachine, VmsResponse};

/// Parity-check progress as reported with the array state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityStatus {
    pub status: String,
    pub progress: u32,
    pub errors: u64,
    pub running: bool,
}

impl ParityStatus {
    pub(crate) fn from_value(parity_check: Option<&Value>) -> Self {
        let get = |key: &str| parity_check.and_then(|value| value.get(key));
        Self {
            status: coerce::string_or(get("status"), "-"),
            progress: coerce::round_percent(coerce::number_or(get("progress"), 0.0)),
            errors: coerce::count_or(get("errors"), 0.0),
            running: coerce::truthy(get("running")),
        }
    }
}
