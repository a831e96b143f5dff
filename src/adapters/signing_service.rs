//! Seam to the platform signing service.
//!
//! The service owns the file format work: it hashes the subject, asks the
//! registered [`DigestSignCallback`] to sign the digest, embeds the returned
//! signature and chain, and optionally timestamps the result. This module
//! defines the request/response shapes and the callback trampoline; the
//! platform binding itself is supplied by the embedding application.

use std::fmt;
use std::sync::{Arc, Weak};

use openssl::x509::{X509Ref, X509};

use crate::domain::constants::status;
use crate::domain::crypto::{describe, AlgorithmCode, CertificateStore, SignatureBuffer};
use crate::domain::types::HResult;
use crate::services::digest_signer::DigestSigner;
use crate::services::request_builder::{PackageClientData, SigningRequest};

/// Opaque signer context returned by a successful service call.
///
/// Not `Clone`: releasing consumes it, so it can be released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct SignerContext(u64);

impl SignerContext {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        SignerContext(raw)
    }

    #[must_use]
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Opaque package-subsystem state populated for package bundles.
#[derive(Debug, PartialEq, Eq)]
pub struct PackageState(u64);

impl PackageState {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        PackageState(raw)
    }

    #[must_use]
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Everything handed to [`SigningService::sign`] for one file.
pub struct SignCall<'a> {
    pub request: &'a SigningRequest,
    pub certificate_store: &'a CertificateStore,
    pub signing_certificate: &'a X509Ref,
    /// Present only for package bundles.
    pub package: Option<&'a PackageClientData>,
    pub callback: &'a DigestSignCallback,
}

impl fmt::Debug for SignCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignCall")
            .field("request", self.request)
            .field("certificate_store", self.certificate_store)
            .field("package", &self.package)
            .finish_non_exhaustive()
    }
}

/// Result of a service call: status plus any handles the caller must release.
#[derive(Debug)]
pub struct ServiceResponse {
    pub status: HResult,
    pub signer_context: Option<SignerContext>,
    pub package_state: Option<PackageState>,
}

impl ServiceResponse {
    /// A response carrying no handles.
    #[must_use]
    pub fn status_only(status: HResult) -> Self {
        Self {
            status,
            signer_context: None,
            package_state: None,
        }
    }
}

/// Platform signing service.
///
/// `sign` runs synchronously; any callback invocation happens on the calling
/// thread before it returns.
pub trait SigningService {
    /// Sign one file, calling back into `call.callback` for the private-key
    /// operation.
    fn sign(&self, call: SignCall<'_>) -> ServiceResponse;

    /// Release a signer context returned by `sign`.
    fn free_signer_context(&self, context: SignerContext);

    /// Release package state returned by `sign`.
    fn release_package_state(&self, state: PackageState);
}

/// Digest-sign callback handed to the signing service.
///
/// Holds only a weak reference to the signer: once the owning registration is
/// dropped every invocation fails with `E_HANDLE` instead of reaching a
/// torn-down signer. Services may clone and keep it.
#[derive(Clone)]
pub struct DigestSignCallback {
    target: Weak<DigestSigner>,
}

impl DigestSignCallback {
    /// Sign `digest` on behalf of the service.
    ///
    /// The digest is borrowed for the duration of the call only; the returned
    /// buffer is newly allocated and owned by the caller from here on.
    pub fn invoke(
        &self,
        signing_certificate: &X509Ref,
        _metadata: Option<&[u8]>,
        algorithm: AlgorithmCode,
        digest: &[u8],
    ) -> Result<SignatureBuffer, HResult> {
        let Some(signer) = self.target.upgrade() else {
            log::warn!("Digest-sign callback invoked after the signer was disposed");
            return Err(status::E_HANDLE);
        };

        log::debug!(
            "Digest-sign callback: {} byte digest, algorithm {algorithm}, certificate {}",
            digest.len(),
            describe(signing_certificate)
        );

        signer.sign_with_code(algorithm, digest).map_err(|e| {
            log::warn!("Digest signing failed: {e}");
            e.hresult()
        })
    }

    /// Whether the signer behind this callback is still alive.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for DigestSignCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestSignCallback(registered={})", self.is_registered())
    }
}

/// Owning side of the callback: keeps the signer alive while registered.
pub(crate) struct CallbackRegistration {
    signer: Arc<DigestSigner>,
    callback: DigestSignCallback,
}

impl CallbackRegistration {
    pub(crate) fn register(signer: DigestSigner) -> Self {
        let signer = Arc::new(signer);
        let callback = DigestSignCallback {
            target: Arc::downgrade(&signer),
        };
        Self { signer, callback }
    }

    pub(crate) fn signer(&self) -> &DigestSigner {
        &self.signer
    }

    pub(crate) fn callback(&self) -> &DigestSignCallback {
        &self.callback
    }

    pub(crate) fn signing_certificate(&self) -> &X509 {
        self.signer.identity().certificate()
    }
}
