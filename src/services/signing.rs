//! High-level signing service orchestrating the Authenticode signing workflow.
//!
//! Provides [`AuthenticodeSigner`], which:
//! - builds and holds the certificate chain and in-memory store
//! - registers the digest-sign callback for the platform signing service
//! - assembles one [`SigningRequest`] per file and picks the plain-file or
//!   package-bundle payload
//! - releases the handles the service returns
//!
//! `sign_file` never returns `Err`: every failure, including one raised by
//! the callback inside the service, is reported as the returned status code.

use std::path::Path;

use openssl::x509::X509;

use crate::adapters::key::SigningKey;
use crate::adapters::signing_service::{
    CallbackRegistration, ServiceResponse, SignCall, SigningService,
};
use crate::domain::constants::status;
use crate::domain::crypto::{
    describe, CertificateChain, CertificateStore, DigestAlgorithm, Thumbprint,
};
use crate::domain::types::{HResult, TimestampConfiguration};
use crate::infra::config::{SignerConfiguration, SigningDefaults};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::chain_builder::{ChainBuilder, ChainPolicy};
use crate::services::digest_signer::{DigestSigner, SigningIdentity};
use crate::services::file_kind::FileKind;
use crate::services::request_builder::SigningRequestBuilder;

/// Chain state kept alive for the signer's lifetime.
struct ChainState {
    chain: CertificateChain,
    store: CertificateStore,
    leaf_thumbprint: Thumbprint,
}

/// Signs files through a [`SigningService`] without handing it the key.
pub struct AuthenticodeSigner<S: SigningService> {
    service: S,
    timestamp: TimestampConfiguration,
    defaults: SigningDefaults,
    registration: Option<CallbackRegistration>,
    chain: Option<ChainState>,
}

impl<S: SigningService> AuthenticodeSigner<S> {
    /// Create a signer, building the certificate chain up front.
    ///
    /// # Errors
    /// `ChainBuildError` when no chain can be built, `KeyError` when the key
    /// does not belong to the certificate. Nothing is left registered on
    /// failure.
    pub fn new(
        service: S,
        identity: SigningIdentity,
        timestamp: TimestampConfiguration,
        policy: &ChainPolicy,
    ) -> SigningResult<Self> {
        Self::check_key_matches_certificate(&identity)?;

        let (chain, store) = ChainBuilder::build(identity.certificate(), policy)?;
        let leaf_thumbprint = Thumbprint::of(chain.leaf())?;

        log::info!(
            "Signer ready: {} key, {} digest, certificate {}",
            identity.key().kind_name(),
            identity.digest_algorithm(),
            describe(identity.certificate())
        );

        Ok(Self {
            service,
            timestamp,
            defaults: SigningDefaults::default(),
            registration: Some(CallbackRegistration::register(DigestSigner::new(identity))),
            chain: Some(ChainState {
                chain,
                store,
                leaf_thumbprint,
            }),
        })
    }

    /// Create a signer from a loaded configuration file.
    ///
    /// The file's description, description URL and page hashing become the
    /// signer's defaults for [`sign_configured`](Self::sign_configured).
    pub fn from_configuration(
        service: S,
        key: SigningKey,
        certificate: X509,
        config: &SignerConfiguration,
    ) -> SigningResult<Self> {
        let identity = SigningIdentity::new(key, certificate, config.digest_algorithm()?);
        let signer = Self::new(
            service,
            identity,
            config.timestamp_configuration()?,
            &config.chain_policy()?,
        )?;
        Ok(signer.with_defaults(config.signing_defaults()))
    }

    /// Replace the defaults used by [`sign_configured`](Self::sign_configured).
    #[must_use]
    pub fn with_defaults(mut self, defaults: SigningDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    fn check_key_matches_certificate(identity: &SigningIdentity) -> SigningResult<()> {
        if matches!(identity.key(), SigningKey::Unsupported { .. }) {
            log::warn!("Private key type is not supported; signing calls will fail");
            return Ok(());
        }
        let certificate_key = identity.certificate().public_key()?;
        if identity.key().public_key()?.public_eq(&certificate_key) {
            Ok(())
        } else {
            Err(SigningError::KeyError(format!(
                "private key does not match certificate {}",
                describe(identity.certificate())
            )))
        }
    }

    /// Authenticode-sign `path` through the signing service.
    ///
    /// `page_hashing` asks for page hashes on plain files; package bundles
    /// always exclude them. Returns the service status unmodified, or
    /// `E_HANDLE` after [`dispose`](Self::dispose), or the mapped error when
    /// the request cannot be assembled.
    pub fn sign_file(
        &self,
        path: impl AsRef<Path>,
        description: Option<&str>,
        description_url: Option<&str>,
        page_hashing: bool,
    ) -> HResult {
        let path = path.as_ref();
        let (Some(registration), Some(chain)) = (&self.registration, &self.chain) else {
            log::warn!("sign_file called on a disposed signer");
            return status::E_HANDLE;
        };

        let file_kind = FileKind::classify(path);
        log::info!("Signing {} as {file_kind}", path.display());

        let request = match SigningRequestBuilder::new(path)
            .description(description)
            .description_url(description_url)
            .page_hashing(page_hashing)
            .digest_algorithm(registration.signer().identity().digest_algorithm())
            .timestamp(&self.timestamp)
            .signing_certificate(chain.leaf_thumbprint)
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Could not assemble signing request: {e}");
                return e.hresult();
            }
        };

        let package = request.package_client_data();
        let response = self.service.sign(SignCall {
            request: &request,
            certificate_store: &chain.store,
            signing_certificate: registration.signing_certificate(),
            package: package.as_ref(),
            callback: registration.callback(),
        });

        self.reclaim(response)
    }

    /// Sign `path` with the signer's defaults.
    ///
    /// # Errors
    /// `ServiceFailure` carrying the status when it is not `S_OK`.
    pub fn sign_configured(&self, path: impl AsRef<Path>) -> SigningResult<()> {
        self.sign_file(
            path,
            self.defaults.description.as_deref(),
            self.defaults.description_url.as_deref(),
            self.defaults.page_hashing,
        )
        .ok()
    }

    /// Release service handles and hand back the status.
    fn reclaim(&self, response: ServiceResponse) -> HResult {
        let ServiceResponse {
            status,
            signer_context,
            package_state,
        } = response;

        if status.is_success() {
            if let Some(context) = signer_context {
                self.service.free_signer_context(context);
            }
            if let Some(state) = package_state {
                self.service.release_package_state(state);
            }
            log::info!("Signing succeeded");
        } else {
            if signer_context.is_some() || package_state.is_some() {
                log::warn!("Signing service returned handles alongside failure {status}; not releasing them");
            }
            log::warn!("Signing service failed with {status}");
        }
        status
    }

    /// Release the callback registration and the certificate chain.
    ///
    /// Safe to call repeatedly; after the first call the signer only answers
    /// `E_HANDLE`.
    pub fn dispose(&mut self) {
        let released_callback = self.registration.take().is_some();
        let released_chain = self.chain.take().is_some();
        if released_callback || released_chain {
            log::debug!("Signer disposed");
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.registration.is_none() && self.chain.is_none()
    }

    #[must_use]
    pub fn certificate_chain(&self) -> Option<&CertificateChain> {
        self.chain.as_ref().map(|state| &state.chain)
    }

    #[must_use]
    pub fn certificate_store(&self) -> Option<&CertificateStore> {
        self.chain.as_ref().map(|state| &state.store)
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.registration
            .as_ref()
            .map(|r| r.signer().identity().digest_algorithm())
    }

    #[must_use]
    pub fn defaults(&self) -> &SigningDefaults {
        &self.defaults
    }

    #[must_use]
    pub fn timestamp_configuration(&self) -> &TimestampConfiguration {
        &self.timestamp
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }
}

impl<S: SigningService> Drop for AuthenticodeSigner<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
