//! Service layer module root.
//! Contains chain building, digest signing, request assembly and the signing
//! orchestrator.

pub mod chain_builder;
pub mod digest_signer;
pub mod file_kind;
pub mod request_builder;
pub mod signing;

pub use chain_builder::{ChainBuilder, ChainPolicy, ChainVerificationFlags};
pub use digest_signer::{DigestSigner, SigningIdentity};
pub use file_kind::FileKind;
pub use request_builder::{
    CertificateDescriptor, DigestCallbackVersion, PackageClientData, SignatureMetadata,
    SigningRequest, SigningRequestBuilder, StrongSignPolicy, SubjectDescriptor,
    TimestampDescriptor, TIMESTAMP_DIGEST_ALGORITHM,
};
pub use signing::AuthenticodeSigner;
