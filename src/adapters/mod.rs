//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - Private key material (RSA and elliptic-curve keys via OpenSSL)
//! - The platform signing service and its digest-sign callback

pub mod key;
pub mod signing_service;

pub use key::SigningKey;
pub use signing_service::{
    DigestSignCallback, PackageState, ServiceResponse, SignCall, SignerContext, SigningService,
};
