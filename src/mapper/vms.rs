// Unraid BFF — VM mapping

use serde::Serialize;
use serde_json::Value;

use super::coerce::{array_of, normalize_run_state, string_or, RunStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmsResponse {
    pub summary: VmSummary,
    pub vms: Vec<VirtualMachine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VmSummary {
    pub running: usize,
    pub stopped: usize,
    pub paused: usize,
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub status: RunStatus,
    pub state_label: String,
}

/// Find the VM list across the shapes different releases return.
fn vm_source(data: &Value) -> &[Value] {
    if let Some(list) = data.get("vms").filter(|value| value.is_array()) {
        return array_of(Some(list));
    }
    ["/virtualMachines", "/virtualization/vms", "/vms/domains"]
        .iter()
        .find_map(|path| data.pointer(path).filter(|value| value.is_array()))
        .map(|list| array_of(Some(list)))
        .unwrap_or(&[])
}

pub fn map_vms(data: &Value) -> VmsResponse {
    let vms: Vec<VirtualMachine> = vm_source(data)
        .iter()
        .map(|item| {
            let raw_status = string_or(item.get("status"), &string_or(item.get("state"), "unknown"));
            VirtualMachine {
                id: string_or(item.get("id"), "-"),
                name: string_or(item.get("name"), "-"),
                status: normalize_run_state(&raw_status),
                state_label: string_or(item.get("state"), &string_or(item.get("status"), "UNKNOWN")),
            }
        })
        .collect();

    let summary = vms.iter().fold(VmSummary::default(), |mut summary, vm| {
        match vm.status {
            RunStatus::Running => summary.running += 1,
            RunStatus::Stopped => summary.stopped += 1,
            RunStatus::Unknown if vm.state_label.eq_ignore_ascii_case("paused") => {
                summary.paused += 1
            }
            RunStatus::Unknown => summary.other += 1,
        }
        summary
    });

    VmsResponse { summary, vms }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
