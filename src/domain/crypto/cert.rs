//! Certificate identity, chain and store types.
//!
//! Certificates are identified by their SHA-1 thumbprint. The store keeps
//! chain order and holds each certificate once.

use std::fmt;

use openssl::hash::MessageDigest;
use openssl::x509::{X509Ref, X509};

use crate::infra::error::{SigningError, SigningResult};

/// SHA-1 certificate thumbprint, the identity used for store de-duplication.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Thumbprint([u8; 20]);

impl Thumbprint {
    pub fn of(cert: &X509Ref) -> SigningResult<Self> {
        let digest = cert.digest(MessageDigest::sha1())?;
        let bytes = <[u8; 20]>::try_from(&digest[..]).map_err(|_| {
            SigningError::CertificateError("unexpected thumbprint length".to_string())
        })?;
        Ok(Thumbprint(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbprint({self})")
    }
}

/// Ordered certificate chain: leaf first, root last.
#[derive(Clone)]
pub struct CertificateChain {
    elements: Vec<X509>,
}

impl CertificateChain {
    /// Invariant: `elements` is non-empty and ordered leaf to root.
    pub(crate) fn from_elements(elements: Vec<X509>) -> SigningResult<Self> {
        if elements.is_empty() {
            return Err(SigningError::ChainBuildError(
                "chain has no elements".to_string(),
            ));
        }
        Ok(Self { elements })
    }

    #[must_use]
    pub fn leaf(&self) -> &X509 {
        &self.elements[0]
    }

    #[must_use]
    pub fn root(&self) -> &X509 {
        &self.elements[self.elements.len() - 1]
    }

    #[must_use]
    pub fn elements(&self) -> &[X509] {
        &self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// In-memory, non-persistent certificate collection.
///
/// Keeps insertion order and rejects duplicates by thumbprint.
#[derive(Clone, Default)]
pub struct CertificateStore {
    entries: Vec<(Thumbprint, X509)>,
}

impl CertificateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate; returns `false` when it was already present.
    pub fn add(&mut self, cert: &X509Ref) -> SigningResult<bool> {
        let thumbprint = Thumbprint::of(cert)?;
        if self.contains(&thumbprint) {
            return Ok(false);
        }
        self.entries.push((thumbprint, cert.to_owned()));
        Ok(true)
    }

    #[must_use]
    pub fn contains(&self, thumbprint: &Thumbprint) -> bool {
        self.entries.iter().any(|(t, _)| t == thumbprint)
    }

    pub fn certificates(&self) -> impl Iterator<Item = &X509> {
        self.entries.iter().map(|(_, cert)| cert)
    }

    pub fn thumbprints(&self) -> impl Iterator<Item = &Thumbprint> {
        self.entries.iter().map(|(t, _)| t)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one or more certificates from PEM (any number of blocks) or a
/// single DER certificate.
pub fn load_certificates(data: &[u8]) -> SigningResult<Vec<X509>> {
    let is_pem = data
        .windows(b"-----BEGIN".len())
        .any(|w| w == b"-----BEGIN");

    let certs = if is_pem {
        X509::stack_from_pem(data)
            .map_err(|e| SigningError::CertificateError(format!("Invalid PEM certificate: {e}")))?
    } else {
        vec![X509::from_der(data)
            .map_err(|e| SigningError::CertificateError(format!("Invalid DER certificate: {e}")))?]
    };

    if certs.is_empty() {
        return Err(SigningError::CertificateError(
            "No certificates found in input".to_string(),
        ));
    }
    Ok(certs)
}

/// Human readable subject for log lines.
pub(crate) fn describe(cert: &X509Ref) -> String {
    let subject = cert
        .subject_name()
        .entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = entry.data().as_utf8().ok()?;
            Some(format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ");
    if subject.is_empty() {
        "<empty subject>".to_string()
    } else {
        subject
    }
}

impl fmt::Debug for CertificateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subjects: Vec<String> = self.elements.iter().map(|c| describe(c)).collect();
        f.debug_struct("CertificateChain")
            .field("elements", &subjects)
            .finish()
    }
}

impl fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateStore(len={})", self.entries.len())
    }
}
