//! Type-safe wrappers using new-type pattern
//!
//! This module provides type-safe wrappers for the values exchanged with the
//! platform signing service: status codes and timestamp settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::{self, status};
use crate::infra::error::{SigningError, SigningResult};

/// 32-bit status code returned by the signing service and by `sign_file`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(i32);

impl HResult {
    #[must_use]
    pub const fn from_u32(code: u32) -> Self {
        HResult(code as i32)
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        HResult(code)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Only `S_OK` counts as success.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == status::S_OK
    }

    /// Convert into a `Result`, wrapping failures as `ServiceFailure`.
    pub fn ok(self) -> SigningResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SigningError::ServiceFailure(self))
        }
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.as_u32())
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult(0x{:08X})", self.as_u32())
    }
}

/// Type-safe wrapper for timestamp URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> SigningResult<Self> {
        let url = url.as_ref();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_url(url: &str) -> SigningResult<()> {
        let Some(host_and_path) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        else {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must start with http:// or https://, got: {url}"
            )));
        };

        if host_and_path.is_empty() {
            return Err(SigningError::ValidationError(
                "Timestamp URL too short".to_string(),
            ));
        }

        for pattern in ["javascript:", "file:", "data:"] {
            if url.contains(pattern) {
                return Err(SigningError::ValidationError(format!(
                    "Timestamp URL contains suspicious pattern '{pattern}': {url}"
                )));
            }
        }

        let host = host_and_path.split('/').next().unwrap_or_default();
        if !host.contains('.') {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must contain a valid domain: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp protocol requested from the signing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    #[default]
    None,
    Authenticode,
    Rfc3161,
}

impl TimestampKind {
    /// Service timestamp flag for this kind (`0` when no timestamp is wanted).
    #[must_use]
    pub const fn flags(self) -> u32 {
        match self {
            TimestampKind::None => 0,
            TimestampKind::Authenticode => constants::SIGNER_TIMESTAMP_AUTHENTICODE,
            TimestampKind::Rfc3161 => constants::SIGNER_TIMESTAMP_RFC3161,
        }
    }
}

impl FromStr for TimestampKind {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TimestampKind::None),
            "authenticode" => Ok(TimestampKind::Authenticode),
            "rfc3161" => Ok(TimestampKind::Rfc3161),
            other => Err(SigningError::ValidationError(format!(
                "Unknown timestamp kind '{other}'. Expected none, authenticode or rfc3161"
            ))),
        }
    }
}

/// How (and whether) the signing service timestamps the signature.
///
/// Invariant: `url` is present exactly when `kind` is not `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimestampConfiguration {
    kind: TimestampKind,
    url: Option<TimestampUrl>,
}

impl TimestampConfiguration {
    /// No timestamp.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticode(url: TimestampUrl) -> Self {
        Self {
            kind: TimestampKind::Authenticode,
            url: Some(url),
        }
    }

    #[must_use]
    pub fn rfc3161(url: TimestampUrl) -> Self {
        Self {
            kind: TimestampKind::Rfc3161,
            url: Some(url),
        }
    }

    /// Build from loosely typed parts, enforcing the kind/url invariant.
    pub fn new(kind: TimestampKind, url: Option<TimestampUrl>) -> SigningResult<Self> {
        match (kind, url) {
            (TimestampKind::None, _) => Ok(Self::none()),
            (kind, Some(url)) => Ok(Self {
                kind,
                url: Some(url),
            }),
            (kind, None) => Err(SigningError::ValidationError(format!(
                "Timestamp kind {kind:?} requires a timestamp server URL"
            ))),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TimestampKind {
        self.kind
    }

    #[must_use]
    pub fn url(&self) -> Option<&TimestampUrl> {
        self.url.as_ref()
    }
}
