//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest (endpoint, param)
//!     → key.rs (composite CacheKey)
//!     → response_cache.rs (DashMap lookup, expiry check)
//!     → hit: Arc<ProxyResponse> snapshot | miss: aggregate, then insert
//! ```
//!
//! # Design Decisions
//! - Keys are a struct, never a concatenated string
//! - Values are immutable snapshots shared through `Arc`
//! - Time-based expiry only; an optional capacity bound evicts the entry closest to expiry
//! - Entries are not invalidated by mutating commands (none are implemented yet)

pub mod key;
pub mod response_cache;

pub use key::CacheKey;
pub use response_cache::{CacheStats, ResponseCache};
