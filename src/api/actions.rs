// Unraid BFF — Write action handlers
//
// Every action runs the same pipeline: resolve the active server, refuse
// known read-only keys, run the mutation chain, then append an audit entry
// for the outcome. Restart is two independent mutations with no rollback.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiError;
use super::validation;
use super::AppState;
use crate::gateway::{
    ArrayAction, ContainerAction, Endpoint, GatewayError, UnraidClient, VmAction,
};
use crate::scopes;
use crate::store::{AuditLog, AuditResult};

const READ_ONLY_KEY: &str = "The active server's API key does not permit write actions.";

enum WriteAction {
    Container { id: String, action: ContainerAction },
    Vm { id: String, action: VmAction },
    Array(ArrayAction),
    ArchiveNotification { id: String },
}

impl WriteAction {
    fn audit_action(&self) -> String {
        match self {
            Self::Container { action, .. } => format!("docker:{}", action),
            Self::Vm { action, .. } => format!("vm:{}", action),
            Self::Array(action) => format!("array:{}", action),
            Self::ArchiveNotification { .. } => "notification:archive".to_string(),
        }
    }

    fn target(&self) -> &str {
        match self {
            Self::Container { id, .. } | Self::Vm { id, .. } | Self::ArchiveNotification { id } => id.as_str(),
            Self::Array(_) => "array",
        }
    }

    fn failure_context(&self) -> &'static str {
        match self {
            Self::Container { .. } => "Container action failed",
            Self::Vm { .. } => "VM action failed",
            Self::Array(_) => "Array action failed",
            Self::ArchiveNotification { .. } => "Archive notification failed",
        }
    }

    async fn execute(&self, client: &UnraidClient, endpoint: &Endpoint<'_>) -> Result<(), GatewayError> {
        match self {
            Self::Container { id, action } => client.run_container_action(endpoint, id, *action).await,
            Self::Vm { id, action } => client.run_vm_action(endpoint, id, *action).await,
            Self::Array(action) => client.run_array_action(endpoint, *action).await,
            Self::ArchiveNotification { id } => client.archive_notification(endpoint, id).await,
        }
    }
}

async fn perform(state: &AppState, action: WriteAction) -> Result<Json<Value>, ApiError> {
    let context = action.failure_context();
    let server = state
        .store
        .load_active()
        .map_err(|e| ApiError::store(context, e))?;

    let outcome = match &server {
        Some(server) => {
            if !scopes::has_write_scopes(&server.scopes) {
                tracing::warn!(
                    server_id = %server.id,
                    action = %action.audit_action(),
                    "Write action refused for read-only key"
                );
                return Err(ApiError::Forbidden(READ_ONLY_KEY));
            }
            action.execute(&state.client, &Endpoint::from(server)).await
        }
        None => Err(GatewayError::NotConfigured),
    };

    let audit_action = action.audit_action();
    let result = if outcome.is_ok() {
        AuditResult::Ok
    } else {
        AuditResult::Failed
    };
    append_audit(&state.audit, audit_action.clone(), action.target().to_string(), result).await;
    tracing::info!(action = %audit_action, target = action.target(), ?result, "Write action finished");

    outcome
        .map(|_| Json(json!({ "ok": true })))
        .map_err(|e| ApiError::upstream(context, e))
}

/// Append on the blocking pool. A failed append is logged and never changes
/// the action's outcome.
async fn append_audit(audit: &AuditLog, action: String, target: String, result: AuditResult) {
    let audit = audit.clone();
    let appended = tokio::task::spawn_blocking(move || {
        audit
            .record(&action, &target, result)
            .map_err(|e| (action, e.to_string()))
    })
    .await;

    match appended {
        Ok(Ok(())) => {}
        Ok(Err((action, error))) => {
            tracing::error!(action = %action, error = %error, "Failed to append audit entry");
        }
        Err(e) => tracing::error!(error = %e, "Audit append task failed"),
    }
}

fn unsupported() -> ApiError {
    ApiError::BadRequest("Unsupported action".to_string())
}

pub async fn docker(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let action: ContainerAction = action.parse().map_err(|_| unsupported())?;
    let id = validation::parse_id(&id, "Container id")?;
    perform(&state, WriteAction::Container { id, action }).await
}

pub async fn vm(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let action: VmAction = action.parse().map_err(|_| unsupported())?;
    let id = validation::parse_id(&id, "VM id")?;
    perform(&state, WriteAction::Vm { id, action }).await
}

pub async fn array(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let action: ArrayAction = action.parse().map_err(|_| unsupported())?;
    perform(&state, WriteAction::Array(action)).await
}

pub async fn archive_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = validation::parse_id(&id, "Notification id")?;
    perform(&state, WriteAction::ArchiveNotification { id }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_labels() {
        let restart = WriteAction::Container {
            id: "plex".into(),
            action: ContainerAction::Restart,
        };
        assert_eq!(restart.audit_action(), "docker:restart");
        assert_eq!(restart.target(), "plex");

        let force_stop = WriteAction::Vm {
            id: "vm-1".into(),
            action: VmAction::ForceStop,
        };
        assert_eq!(force_stop.audit_action(), "vm:forceStop");

        let array = WriteAction::Array(ArrayAction::Start);
        assert_eq!(array.audit_action(), "array:start");
        assert_eq!(array.target(), "array");

        let archive = WriteAction::ArchiveNotification { id: "n1".into() };
        assert_eq!(archive.audit_action(), "notification:archive");
        assert_eq!(archive.failure_context(), "Archive notification failed");
    }

    #[tokio::test]
    async fn test_append_audit_writes_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let audit = AuditLog::in_dir(dir.path());

        append_audit(&audit, "vm:reboot".into(), "vm-1".into(), AuditResult::Failed).await;

        let entries = audit.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "vm:reboot");
        assert_eq!(entries[0].target, "vm-1");
        assert_eq!(entries[0].result, AuditResult::Failed);
    }

    #[tokio::test]
    async fn test_append_audit_failure_is_swallowed() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened for append.
        let audit = AuditLog::new(dir.path().to_path_buf());

        append_audit(&audit, "array:start".into(), "array".into(), AuditResult::Ok).await;
        assert!(dir.path().is_dir());
    }
}
