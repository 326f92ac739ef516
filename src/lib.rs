//! Caching aggregation proxy for an event-management API.
//!
//! A request such as `GET : /resource-with-subscribers/42/` is parsed,
//! validated against allow-lists, answered from a time-bounded cache, or
//! resolved by fanning out to the upstream API and merging the results.

pub mod admin;
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod request;
pub mod upstream;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Dispatch, ProxyEngine, ProxyResponse};
