//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! request text
//!     → parse (400 on failure)
//!     → validate (400 on failure)
//!     → cache lookup ── hit ──→ cached snapshot (served_from_cache = true)
//!         │ miss
//!         ▼
//!     aggregator registry → resolve (200 | 401 | 501)
//!     → cache store (200 and 401)
//!     → response (served_from_cache = false)
//! ```
//!
//! # Design Decisions
//! - Request state lives only inside one `handle` call; engines are shared freely
//! - Failed aggregations (401) are cached like successes
//! - Unsupported operations (501) are never cached

pub mod engine;
pub mod types;

pub use engine::ProxyEngine;
pub use types::{Dispatch, ProxyError, ProxyResponse};
