//! Authenticode Signer Library
//!
//! Signs files through a platform signing service while keeping the private
//! key on this side of the boundary: the service computes the digest and calls
//! back into [`DigestSignCallback`] for the signature.
//!
//! Layers:
//! - `domain`: algorithm registry, certificate chain/store, status codes
//! - `services`: chain building, digest signing, request assembly, orchestration
//! - `adapters`: private keys and the signing service seam
//! - `infra`: errors and configuration

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::{
    DigestSignCallback, PackageState, ServiceResponse, SignCall, SignerContext, SigningKey,
    SigningService,
};
pub use domain::constants::status;
pub use domain::crypto::{
    digest_to_algorithm_code, digest_to_oid, digest_to_oid_nul, load_certificates, AlgorithmCode,
    CertificateChain, CertificateStore, DigestAlgorithm, SignatureBuffer, Thumbprint,
};
pub use domain::types::{HResult, TimestampConfiguration, TimestampKind, TimestampUrl};
pub use infra::config::{ConfigManager, SignerConfiguration, SigningDefaults};
pub use infra::error::{SigningError, SigningResult};
pub use services::{
    AuthenticodeSigner, ChainBuilder, ChainPolicy, ChainVerificationFlags, DigestSigner, FileKind,
    PackageClientData, SigningIdentity, SigningRequest, SigningRequestBuilder,
};
