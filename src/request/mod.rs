//! Request text decoding subsystem.
//!
//! # Data Flow
//! ```text
//! "GET : /resource-with-subscribers/42/"
//!     → parser.rs (split command / URI, extract endpoint + parameter)
//!     → validator.rs (command and endpoint allow-lists)
//!     → ParsedRequest (immutable, owned by one call)
//! ```
//!
//! # Design Decisions
//! - Ambiguous URIs are rejected, never guessed
//! - Parse and validation failures are distinct internally, all 400 externally

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::RequestParser;
pub use types::{Headers, ParsedRequest, RequestError};
pub use validator::RequestValidator;
