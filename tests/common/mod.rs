//! Shared helpers for integration tests.
//!
//! - An in-memory PKI (root, intermediate, RSA or EC leaf) built with OpenSSL.
//! - [`RecordingService`], a signing service double that behaves like the
//!   platform one: it digests the subject, calls back for the signature,
//!   verifies it against the signing certificate and hands out handles.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use authenticode_signer::{
    status, AlgorithmCode, DigestAlgorithm, DigestSignCallback, HResult, PackageClientData,
    PackageState, ServiceResponse, SignCall, SignerContext, SigningIdentity, SigningKey,
    SigningRequest, SigningService, Thumbprint,
};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::Verifier;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509NameBuilder, X509Ref, X509};

static SERIAL: AtomicU32 = AtomicU32::new(1);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

/// Validity window in days relative to now.
#[derive(Clone, Copy)]
pub struct Validity {
    pub not_before: u32,
    pub expired: bool,
}

impl Validity {
    pub const CURRENT: Validity = Validity {
        not_before: 0,
        expired: false,
    };
    pub const EXPIRED: Validity = Validity {
        not_before: 0,
        expired: true,
    };
}

/// Issue a certificate for `key`, self-signed when `issuer` is `None`.
pub fn issue(
    common_name: &str,
    key: &PKey<Private>,
    issuer: Option<(&X509Ref, &PKey<Private>)>,
    ca: bool,
    validity: Validity,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.append_entry_by_text("O", "Authenticode Signer Tests").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(SERIAL.fetch_add(1, Ordering::Relaxed)).unwrap();
    builder
        .set_serial_number(&Asn1Integer::from_bn(&serial).unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some((cert, _)) => builder.set_issuer_name(cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }

    if validity.expired {
        // 2001-01-01 .. 2002-01-01
        builder
            .set_not_before(&Asn1Time::from_unix(978_307_200).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::from_unix(1_009_843_200).unwrap())
            .unwrap();
    } else {
        builder
            .set_not_before(&Asn1Time::days_from_now(validity.not_before).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
    }
    builder.set_pubkey(key).unwrap();

    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    } else {
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(KeyUsage::new().digital_signature().build().unwrap())
            .unwrap();
        builder
            .append_extension(ExtendedKeyUsage::new().code_signing().build().unwrap())
            .unwrap();
    }

    let signing_key = issuer.map_or(key, |(_, issuer_key)| issuer_key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Root, intermediate and leaf, with the leaf's private key.
pub struct TestPki {
    pub root: X509,
    pub root_key: PKey<Private>,
    pub intermediate: X509,
    pub intermediate_key: PKey<Private>,
    pub leaf: X509,
    pub leaf_key: PKey<Private>,
}

impl TestPki {
    pub fn rsa() -> Self {
        Self::with_leaf_key(rsa_key(), Validity::CURRENT)
    }

    pub fn ec() -> Self {
        Self::with_leaf_key(ec_key(), Validity::CURRENT)
    }

    pub fn with_expired_leaf() -> Self {
        Self::with_leaf_key(rsa_key(), Validity::EXPIRED)
    }

    fn with_leaf_key(leaf_key: PKey<Private>, leaf_validity: Validity) -> Self {
        let root_key = rsa_key();
        let root = issue("Test Root CA", &root_key, None, true, Validity::CURRENT);
        let intermediate_key = rsa_key();
        let intermediate = issue(
            "Test Code Signing CA",
            &intermediate_key,
            Some((&root, &root_key)),
            true,
            Validity::CURRENT,
        );
        let leaf = issue(
            "Test Publisher",
            &leaf_key,
            Some((&intermediate, &intermediate_key)),
            false,
            leaf_validity,
        );
        Self {
            root,
            root_key,
            intermediate,
            intermediate_key,
            leaf,
            leaf_key,
        }
    }

    pub fn identity(&self, algorithm: DigestAlgorithm) -> SigningIdentity {
        SigningIdentity::new(
            SigningKey::from_pkey(self.leaf_key.clone()).unwrap(),
            self.leaf.clone(),
            algorithm,
        )
    }

    pub fn intermediates(&self) -> Vec<X509> {
        vec![self.intermediate.clone()]
    }

    pub fn chain_certificates(&self) -> Vec<X509> {
        vec![self.intermediate.clone(), self.root.clone()]
    }
}

/// Verify a raw callback signature against `cert`'s public key.
pub fn verify_signature(
    cert: &X509Ref,
    algorithm: DigestAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> bool {
    let public = cert.public_key().unwrap();
    if let Ok(ec) = public.ec_key() {
        let half = signature.len() / 2;
        let r = BigNum::from_slice(&signature[..half]).unwrap();
        let s = BigNum::from_slice(&signature[half..]).unwrap();
        let sig = EcdsaSig::from_private_components(r, s).unwrap();
        return sig.verify(digest, &ec).unwrap();
    }

    // PKCS#1 v1.5; the DigestInfo hash must be `algorithm`.
    let mut verifier = openssl::pkey_ctx::PkeyCtx::new(&public).unwrap();
    verifier.verify_init().unwrap();
    verifier.set_rsa_padding(Padding::PKCS1).unwrap();
    verifier.set_signature_md(algorithm.md()).unwrap();
    verifier.verify(digest, signature).unwrap_or(false)
}

/// Verify a signature over the original message, as a relying party would.
pub fn verify_message(
    cert: &X509Ref,
    algorithm: DigestAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let public = cert.public_key().unwrap();
    if public.ec_key().is_ok() {
        let digest = algorithm.digest(message).unwrap();
        return verify_signature(cert, algorithm, &digest, signature);
    }
    let mut verifier = Verifier::new(algorithm.message_digest(), &public).unwrap();
    verifier.update(message).unwrap();
    verifier.verify(signature).unwrap()
}

/// What the service saw on one `sign` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: PathBuf,
    pub flags: u32,
    pub algorithm_code: AlgorithmCode,
    pub timestamp_flags: u32,
    pub timestamp_url: Option<String>,
    pub certificate_policy: u32,
    pub signing_thumbprint: Thumbprint,
    pub store_thumbprints: Vec<Thumbprint>,
    pub package: Option<PackageClientData>,
    pub description: Option<String>,
    pub description_url: Option<String>,
    pub callback_status: Option<HResult>,
    pub signature: Option<Vec<u8>>,
    pub signature_verified: bool,
}

/// Behaviour of the next `sign` calls.
#[derive(Debug, Clone, Copy)]
pub struct Script {
    /// Status returned when the callback succeeds.
    pub status: HResult,
    /// Skip the callback entirely.
    pub skip_callback: bool,
    /// Return handles even when the status is a failure.
    pub handles_on_failure: bool,
    /// Algorithm code passed to the callback; defaults to the request's.
    pub algorithm_override: Option<AlgorithmCode>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            status: status::S_OK,
            skip_callback: false,
            handles_on_failure: false,
            algorithm_override: None,
        }
    }
}

/// Signing service double.
#[derive(Default)]
pub struct RecordingService {
    pub script: Cell<Script>,
    pub calls: RefCell<Vec<RecordedCall>>,
    pub freed_contexts: RefCell<Vec<u64>>,
    pub released_states: RefCell<Vec<u64>>,
    pub stashed_callback: RefCell<Option<DigestSignCallback>>,
    next_handle: Cell<u64>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: Script) -> Self {
        let service = Self::default();
        service.script.set(script);
        service
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls.borrow().last().cloned().expect("no sign call recorded")
    }

    fn handle(&self) -> u64 {
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        next
    }

    fn subject_digest(request: &SigningRequest, algorithm: DigestAlgorithm) -> Vec<u8> {
        let content = fs::read(request.subject().path()).unwrap_or_default();
        algorithm.digest(&content).unwrap()
    }
}

impl SigningService for RecordingService {
    fn sign(&self, call: SignCall<'_>) -> ServiceResponse {
        let script = self.script.get();
        let request = call.request;
        *self.stashed_callback.borrow_mut() = Some(call.callback.clone());

        let mut recorded = RecordedCall {
            path: request.subject().path().to_path_buf(),
            flags: request.flags(),
            algorithm_code: request.signature().algorithm_code(),
            timestamp_flags: request.timestamp().flags(),
            timestamp_url: request.timestamp().url().map(|u| u.as_str().to_string()),
            certificate_policy: request.certificate().policy(),
            signing_thumbprint: *request.certificate().signing_certificate(),
            store_thumbprints: call.certificate_store.thumbprints().copied().collect(),
            package: call.package.cloned(),
            description: request.signature().description().map(str::to_string),
            description_url: request.signature().description_url().map(str::to_string),
            callback_status: None,
            signature: None,
            signature_verified: false,
        };

        let mut status = script.status;
        if !script.skip_callback {
            let algorithm = request.signature().algorithm();
            let code = script.algorithm_override.unwrap_or(algorithm.algorithm_code());
            let digest = Self::subject_digest(request, algorithm);
            match call
                .callback
                .invoke(call.signing_certificate, None, code, &digest)
            {
                Ok(signature) => {
                    recorded.signature_verified = verify_signature(
                        call.signing_certificate,
                        algorithm,
                        &digest,
                        signature.as_slice(),
                    );
                    recorded.callback_status = Some(status::S_OK);
                    recorded.signature = Some(signature.into_boxed_slice().into_vec());
                }
                Err(callback_status) => {
                    recorded.callback_status = Some(callback_status);
                    status = callback_status;
                }
            }
        }
        self.calls.borrow_mut().push(recorded);

        if status.is_success() || script.handles_on_failure {
            ServiceResponse {
                status,
                signer_context: Some(SignerContext::from_raw(self.handle())),
                package_state: call.package.map(|_| PackageState::from_raw(self.handle())),
            }
        } else {
            ServiceResponse::status_only(status)
        }
    }

    fn free_signer_context(&self, context: SignerContext) {
        self.freed_contexts.borrow_mut().push(context.into_raw());
    }

    fn release_package_state(&self, state: PackageState) {
        self.released_states.borrow_mut().push(state.into_raw());
    }
}

/// Write `content` to `name` inside `dir`.
pub fn write_subject(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
