//! Response aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest
//!     → registry.rs (endpoint name → Aggregator)
//!     → fetch.rs (expand URI templates, issue both upstream calls)
//!     → resource_with_subscribers.rs (merge into one document)
//!     → Ok(serialized payload) | Err(AggregationError)
//! ```
//!
//! # Design Decisions
//! - Endpoints are registered, not matched in a conditional chain
//! - Every upstream call of an endpoint must answer 200 or the whole aggregation fails
//! - Upstream payloads are decoded into typed records; shape mismatches are errors, not panics

pub mod fetch;
pub mod registry;
pub mod resource_with_subscribers;
pub mod types;

pub use registry::{Aggregator, AggregatorRegistry};
pub use resource_with_subscribers::{ResourceSummary, ResourceWithSubscribers};
pub use types::AggregationError;
