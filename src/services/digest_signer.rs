//! Digest signing service.
//!
//! Performs the private-key operation the signing service delegates to the
//! callback: the service computes the to-be-signed digest, this module turns
//! it into raw signature bytes.
//!
//! - RSA keys sign with PKCS#1 v1.5; the digest algorithm selects the
//!   `DigestInfo` hash identifier.
//! - EC keys sign the raw digest; the result is `r || s`, each half padded to
//!   the curve's field size.
//!
//! The signer holds no mutable state, so one instance may serve any number of
//! sequential or concurrent calls.

use openssl::ecdsa::EcdsaSig;
use openssl::pkey::PKey;
use openssl::pkey_ctx::PkeyCtx;
use openssl::rsa::Padding;
use openssl::x509::X509;

use crate::adapters::key::SigningKey;
use crate::domain::crypto::{AlgorithmCode, DigestAlgorithm, SignatureBuffer};
use crate::infra::error::{SigningError, SigningResult};

/// Key, certificate and file digest algorithm of one signer.
#[derive(Debug)]
pub struct SigningIdentity {
    key: SigningKey,
    certificate: X509,
    digest_algorithm: DigestAlgorithm,
}

impl SigningIdentity {
    #[must_use]
    pub fn new(key: SigningKey, certificate: X509, digest_algorithm: DigestAlgorithm) -> Self {
        Self {
            key,
            certificate,
            digest_algorithm,
        }
    }

    #[must_use]
    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    #[must_use]
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }
}

/// Signs precomputed digests with the identity's private key.
#[derive(Debug)]
pub struct DigestSigner {
    identity: SigningIdentity,
}

impl DigestSigner {
    #[must_use]
    pub fn new(identity: SigningIdentity) -> Self {
        Self { identity }
    }

    #[must_use]
    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Sign `digest`, which must be a complete `algorithm` digest.
    ///
    /// # Errors
    /// `UnsupportedAlgorithm` for a digest of the wrong length or a key type
    /// other than RSA/EC, `AllocationFailure` if the output buffer cannot be
    /// reserved.
    pub fn sign(&self, digest: &[u8], algorithm: DigestAlgorithm) -> SigningResult<SignatureBuffer> {
        if digest.len() != algorithm.digest_size() {
            return Err(SigningError::UnsupportedAlgorithm(format!(
                "{} byte digest does not match {algorithm} ({} bytes)",
                digest.len(),
                algorithm.digest_size()
            )));
        }

        let signature = match &self.identity.key {
            SigningKey::Rsa(rsa) => {
                let pkey = PKey::from_rsa(rsa.clone())?;
                let mut ctx = PkeyCtx::new(&pkey)?;
                ctx.sign_init()?;
                ctx.set_rsa_padding(Padding::PKCS1)?;
                ctx.set_signature_md(algorithm.md())?;
                let mut signature = Vec::new();
                ctx.sign_to_vec(digest, &mut signature)?;
                signature
            }
            SigningKey::Ec(ec) => {
                let sig = EcdsaSig::sign(digest, ec)?;
                let field_len = (ec.group().degree() as i32 + 7) / 8;
                let mut signature = sig.r().to_vec_padded(field_len)?;
                signature.extend_from_slice(&sig.s().to_vec_padded(field_len)?);
                signature
            }
            SigningKey::Unsupported { kind } => {
                return Err(SigningError::UnsupportedAlgorithm(format!(
                    "private key type {kind:?} cannot sign digests"
                )));
            }
        };

        log::debug!(
            "Signed {} digest with {} key: {} byte signature",
            algorithm,
            self.identity.key.kind_name(),
            signature.len()
        );

        SignatureBuffer::copy_from(&signature)
    }

    /// Sign a digest identified by the service's algorithm code.
    ///
    /// The code must name a known algorithm; the signature itself always uses
    /// the configured digest algorithm as the hash identifier.
    pub fn sign_with_code(
        &self,
        code: AlgorithmCode,
        digest: &[u8],
    ) -> SigningResult<SignatureBuffer> {
        let requested = DigestAlgorithm::from_algorithm_code(code)?;
        let configured = self.identity.digest_algorithm;
        if requested != configured {
            log::debug!("Service requested {requested}, signing with configured {configured}");
        }
        self.sign(digest, configured)
    }
}
