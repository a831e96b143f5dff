//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - The digest algorithm registry (names, algorithm codes, object identifiers)
//! - Certificate chains and the in-memory certificate store
//! - Signature buffers handed across the signing service boundary

mod algorithm;
mod cert;
mod signature;

pub use algorithm::{
    digest_to_algorithm_code, digest_to_oid, digest_to_oid_nul, AlgorithmCode, DigestAlgorithm,
};
pub use cert::{load_certificates, CertificateChain, CertificateStore, Thumbprint};
pub(crate) use cert::describe;
pub use signature::SignatureBuffer;
