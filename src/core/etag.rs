//! Optimistic-concurrency version tokens
//!
//! A [`VersionToken`] is the quoted ISO-8601 (millisecond, UTC) rendering of a
//! record's last-modified timestamp. Tokens are derived on every read and
//! never stored; two tokens denote the same version iff they are byte-equal.
//!
//! ```rust,ignore
//! let token = VersionToken::generate(record.last_modified_date());
//! assert_eq!(token.as_str(), "\"2025-05-29T07:53:44.000Z\"");
//! validate_if_match(headers.if_match(), &token)?;
//! ```

use crate::core::error::{PreconditionError, TokenError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the caller's expected version on update/delete
pub const IF_MATCH: &str = "If-Match";

/// Header carrying a version the caller believes is absent on create
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// Wildcard accepted by `If-Match`
pub const WILDCARD: &str = "*";

/// Opaque version token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Derive the token for a modification timestamp
    pub fn generate(timestamp: DateTime<Utc>) -> Self {
        Self(format!(
            "\"{}\"",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        ))
    }

    /// Recover the timestamp a token was derived from
    pub fn parse(token: &str) -> Result<DateTime<Utc>, TokenError> {
        let stripped: String = token.chars().filter(|c| *c != '"').collect();
        DateTime::parse_from_rfc3339(stripped.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| TokenError::InvalidFormat {
                token: token.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Timestamp of this token
    pub fn timestamp(&self) -> Result<DateTime<Utc>, TokenError> {
        Self::parse(&self.0)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<VersionToken> for String {
    fn from(token: VersionToken) -> Self {
        token.0
    }
}

/// Check an `If-Match` value against the current version
///
/// Absent → `Required`; `*` always matches; any other value must be
/// byte-equal to the current token.
pub fn validate_if_match(
    supplied: Option<&str>,
    current: &VersionToken,
) -> Result<(), PreconditionError> {
    let Some(supplied) = supplied else {
        return Err(PreconditionError::Required {
            header: IF_MATCH.to_string(),
        });
    };

    if supplied == WILDCARD || supplied == current.as_str() {
        Ok(())
    } else {
        Err(PreconditionError::Failed {
            header: IF_MATCH.to_string(),
        })
    }
}

/// Check an `If-None-Match` value against an existing version
///
/// Fails only when both values are present and equal.
pub fn validate_if_none_match(
    supplied: Option<&str>,
    existing: Option<&VersionToken>,
) -> Result<(), PreconditionError> {
    match (supplied, existing) {
        (Some(supplied), Some(existing)) if supplied == existing.as_str() => {
            Err(PreconditionError::Failed {
                header: IF_NONE_MATCH.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Whether the current version is newer than the one the client holds
///
/// Missing or malformed tokens on either side count as modified.
pub fn is_modified_since(current: Option<&str>, client: Option<&str>) -> bool {
    let (Some(current), Some(client)) = (current, client) else {
        return true;
    };

    match (VersionToken::parse(current), VersionToken::parse(client)) {
        (Ok(current), Ok(client)) => current > client,
        _ => true,
    }
}
