//! Allow-list validation of parsed requests.

use std::collections::HashSet;

use crate::request::types::{ParsedRequest, RequestError};

/// Checks commands and endpoints against the configured allow-lists.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    commands: HashSet<String>,
    endpoints: HashSet<String>,
}

impl RequestValidator {
    pub fn new<C, E>(commands: C, endpoints: E) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        }
    }

    /// Command is checked first; the first failing check wins.
    pub fn validate(&self, request: &ParsedRequest) -> Result<(), RequestError> {
        if !self.commands.contains(&request.command) {
            return Err(RequestError::InvalidCommand(request.command.clone()));
        }
        if !self.endpoints.contains(&request.endpoint) {
            return Err(RequestError::InvalidEndpoint(request.endpoint.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(command: &str, endpoint: &str) -> ParsedRequest {
        ParsedRequest {
            command: command.into(),
            endpoint: endpoint.into(),
            endpoint_param: "1".into(),
            headers: Arc::default(),
        }
    }

    #[test]
    fn test_validate() {
        let validator = RequestValidator::new(["GET"], ["resource-with-subscribers"]);

        assert_eq!(validator.validate(&request("GET", "resource-with-subscribers")), Ok(()));
        assert_eq!(
            validator.validate(&request("GE_T", "resource-with-subscribers")),
            Err(RequestError::InvalidCommand("GE_T".into()))
        );
        assert_eq!(
            validator.validate(&request("GET", "events")),
            Err(RequestError::InvalidEndpoint("events".into()))
        );
    }

    #[test]
    fn test_command_checked_before_endpoint() {
        let validator = RequestValidator::new(["GET"], ["resource-with-subscribers"]);
        assert_eq!(
            validator.validate(&request("get", "nope")),
            Err(RequestError::InvalidCommand("get".into()))
        );
    }
}
