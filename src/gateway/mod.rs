// Unraid BFF — Gateway Module
//
// GraphQL client for the Unraid API. Absorbs transport failures, per-server
// TLS trust and schema drift between Unraid releases.

mod actions;
mod client;
mod error;
mod fallback;
mod queries;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{ArrayAction, ContainerAction, ParseActionError, VmAction};
pub use client::{ConnectionTest, UnraidClient};
pub use error::GatewayError;
pub use fallback::first_success;
pub use transport::{Endpoint, GraphqlResponse, GraphqlTransport, ImageAsset};
