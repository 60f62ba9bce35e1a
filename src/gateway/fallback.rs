// Unraid BFF — Fallback chains
//
// Unraid releases disagree on schema shape, so most reads and writes try an
// ordered list of candidate documents until one succeeds.

use std::future::Future;

use super::GatewayError;

/// Run `attempt` over `candidates` in order and return the first success.
///
/// When every candidate fails, the error carries each failure message in
/// attempt order.
pub async fn first_success<C, T, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Result<T, GatewayError>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, attempt = failures.len() + 1, "Candidate failed");
                failures.push(e.to_string());
            }
        }
    }
    Err(GatewayError::AllCandidatesFailed(failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let calls = AtomicUsize::new(0);
        let result = first_success(["a", "b", "c"], |candidate| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if candidate == "b" {
                    Ok(candidate.to_uppercase())
                } else {
                    Err(GatewayError::Graphql(format!("{} failed", candidate)))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "B");
        assert_eq!(calls.load(Ordering::SeqCst), 2, "c must never be attempted");
    }

    #[tokio::test]
    async fn test_aggregates_failures_in_order() {
        let result: Result<(), _> = first_success(["one", "two"], |candidate| async move {
            Err(GatewayError::Graphql(format!("{} failed", candidate)))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "one failed | two failed");
    }
}
