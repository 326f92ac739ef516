//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (allowed endpoints have definitions)
//! - Validate value ranges (timeouts > 0, 0 < ttl <= 30 days)
//! - Check URI templates carry the parameter placeholder
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{EndpointKind, ProxyConfig};

/// Placeholder substituted with the endpoint parameter in URI templates.
pub const PARAM_PLACEHOLDER: &str = "{0}";

/// Longest accepted cache lifetime: 30 days.
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoAllowedCommands,
    NoAllowedEndpoints,
    UndefinedEndpoint(String),
    WrongUriCount { endpoint: String, expected: usize, actual: usize },
    MissingPlaceholder { endpoint: String, uri: String },
    ZeroTtl,
    TtlTooLarge(u64),
    ZeroTimeout(&'static str),
    ZeroCapacity,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoAllowedCommands => write!(f, "allowed_commands is empty"),
            ValidationError::NoAllowedEndpoints => write!(f, "allowed_endpoints is empty"),
            ValidationError::UndefinedEndpoint(name) => {
                write!(f, "endpoint '{}' is allowed but has no definition", name)
            }
            ValidationError::WrongUriCount { endpoint, expected, actual } => write!(
                f,
                "endpoint '{}' needs {} uri templates, found {}",
                endpoint, expected, actual
            ),
            ValidationError::MissingPlaceholder { endpoint, uri } => write!(
                f,
                "uri '{}' of endpoint '{}' has no {} placeholder",
                uri, endpoint, PARAM_PLACEHOLDER
            ),
            ValidationError::ZeroTtl => write!(f, "cache.ttl_secs must be greater than 0"),
            ValidationError::TtlTooLarge(ttl) => write!(
                f,
                "cache.ttl_secs is {}, the maximum is {}",
                ttl, MAX_TTL_SECS
            ),
            ValidationError::ZeroTimeout(field) => write!(f, "{} must be greater than 0", field),
            ValidationError::ZeroCapacity => write!(f, "cache.max_entries must be greater than 0"),
        }
    }
}

/// Number of upstream URI templates a strategy consumes.
pub fn required_uris(kind: EndpointKind) -> usize {
    match kind {
        EndpointKind::ResourceWithSubscribers => 2,
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.allowed_commands.is_empty() {
        errors.push(ValidationError::NoAllowedCommands);
    }
    if config.allowed_endpoints.is_empty() {
        errors.push(ValidationError::NoAllowedEndpoints);
    }

    for name in &config.allowed_endpoints {
        if !config.endpoints.contains_key(name) {
            errors.push(ValidationError::UndefinedEndpoint(name.clone()));
        }
    }

    for (name, endpoint) in &config.endpoints {
        let expected = required_uris(endpoint.kind);
        if endpoint.uris.len() != expected {
            errors.push(ValidationError::WrongUriCount {
                endpoint: name.clone(),
                expected,
                actual: endpoint.uris.len(),
            });
        }
        for uri in &endpoint.uris {
            if !uri.contains(PARAM_PLACEHOLDER) {
                errors.push(ValidationError::MissingPlaceholder {
                    endpoint: name.clone(),
                    uri: uri.clone(),
                });
            }
        }
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl);
    } else if config.cache.ttl_secs > MAX_TTL_SECS {
        errors.push(ValidationError::TtlTooLarge(config.cache.ttl_secs));
    }
    if config.cache.max_entries == Some(0) {
        errors.push(ValidationError::ZeroCapacity);
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.request_timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.connect_timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
