// Unraid BFF — Gateway error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Server not configured yet.")]
    NotConfigured,

    #[error("Unable to reach Unraid GraphQL endpoint: {0}")]
    Unreachable(String),

    #[error("Unraid request failed: {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: String },

    #[error("{0}")]
    Graphql(String),

    #[error("No data returned by Unraid GraphQL API.")]
    MissingData,

    /// Every candidate in a fallback chain failed, in attempt order.
    #[error("{}", .0.join(" | "))]
    AllCandidatesFailed(Vec<String>),

    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" ({})", detail)
    }
}
