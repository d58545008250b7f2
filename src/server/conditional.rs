//! Conditional request headers

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;

/// `If-Match` / `If-None-Match` values of a request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConditionalHeaders {
    if_match: Option<String>,
    if_none_match: Option<String>,
}

impl ConditionalHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_match = headers
            .get(header::IF_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            if_match,
            if_none_match,
        }
    }

    /// Version the client expects to overwrite
    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// Version the client already holds
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }
}

impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders::from_headers(&parts.headers))
    }
}
