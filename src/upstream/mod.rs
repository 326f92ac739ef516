//! Upstream API access subsystem.
//!
//! # Data Flow
//! ```text
//! aggregator
//!     → Upstream::fetch(uri, headers)
//!     → client.rs (URI check, reqwest GET with timeouts, JSON decode)
//!     → UpstreamOutcome::Http { status, payload } | UpstreamOutcome::Failed(TransportError)
//! ```
//!
//! # Design Decisions
//! - Transport failures are a separate variant, never a fake status code
//! - A non-JSON body is not a transport failure; it yields `payload: None`
//! - Every call is bounded by the configured request timeout

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{HttpUpstream, Upstream};
pub use types::{TransportError, UpstreamOutcome};
