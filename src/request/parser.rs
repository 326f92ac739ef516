//! Request text parser.
//!
//! Expected form: `<COMMAND> : /<endpoint>/<endpoint_param>/`. Whitespace
//! around the colon and around slashes is ignored.

use crate::request::types::{Headers, ParsedRequest, RequestError};

fn is_uri_trim(c: char) -> bool {
    c == '/' || c.is_whitespace()
}

/// `.` and `..` would be resolved as relative path steps upstream.
fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// Turns raw request text into a [`ParsedRequest`].
#[derive(Debug, Clone)]
pub struct RequestParser {
    headers: Headers,
}

impl RequestParser {
    /// Create a parser that attaches `headers` to every request.
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }

    /// Parse request text.
    pub fn parse(&self, text: &str) -> Result<ParsedRequest, RequestError> {
        let mut parts = text.split(':');
        let (command, uri) = match (parts.next(), parts.next(), parts.next()) {
            (Some(command), Some(uri), None) => (command.trim(), uri),
            _ => return Err(RequestError::MalformedCommand),
        };

        let uri = uri.trim_matches(is_uri_trim);
        let segments: Vec<&str> = uri.split('/').map(str::trim).collect();
        let (endpoint, endpoint_param) = match segments.as_slice() {
            [endpoint, param]
                if !endpoint.is_empty() && !param.is_empty() && !is_dot_segment(param) =>
            {
                (*endpoint, *param)
            }
            _ => return Err(RequestError::MalformedUri(uri.to_string())),
        };

        Ok(ParsedRequest {
            command: command.to_string(),
            endpoint: endpoint.to_string(),
            endpoint_param: endpoint_param.to_string(),
            headers: self.headers.clone(),
        })
    }
}
