//! Error types and result definitions for signing operations.

use thiserror::Error;

use crate::domain::constants::status;
use crate::domain::types::HResult;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Comprehensive error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Certificate chain could not be built: {0}")]
    #[diagnostic(help("supply the missing intermediate or root certificates as extra certificates"))]
    ChainBuildError(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Signing service failed with status {0}")]
    ServiceFailure(HResult),

    #[error("Could not allocate {0} bytes for the signature buffer")]
    AllocationFailure(usize),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Private key error: {0}")]
    KeyError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl SigningError {
    /// Status code reported to the signing service (or returned from
    /// `sign_file`) when this error ends a per-call operation.
    #[must_use]
    pub fn hresult(&self) -> HResult {
        match self {
            Self::UnsupportedAlgorithm(_) => status::NTE_BAD_ALGID,
            Self::AllocationFailure(_) => status::E_OUTOFMEMORY,
            Self::ServiceFailure(code) => *code,
            Self::ValidationError(_) => status::E_INVALIDARG,
            _ => status::E_FAIL,
        }
    }
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::CryptographicError(error.to_string())
    }
}
