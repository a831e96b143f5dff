//! Private-key capability used by the digest signer.
//!
//! The key is a tagged variant so dispatch is an exhaustive `match` rather
//! than a runtime type probe. Keys of any other type are carried as
//! `Unsupported` and rejected when a signature is requested.

use std::fmt;

use openssl::ec::EcKey;
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::Rsa;

use crate::infra::error::{SigningError, SigningResult};

pub enum SigningKey {
    /// RSA key, signs with PKCS#1 v1.5 padding.
    Rsa(Rsa<Private>),
    /// Elliptic-curve key, signs the raw digest with ECDSA.
    Ec(EcKey<Private>),
    /// Any other key type; kept so the failure surfaces at signing time.
    Unsupported { kind: Id },
}

impl SigningKey {
    /// Classify an OpenSSL private key.
    pub fn from_pkey(pkey: PKey<Private>) -> SigningResult<Self> {
        match pkey.id() {
            Id::RSA => Ok(SigningKey::Rsa(pkey.rsa()?)),
            Id::EC => Ok(SigningKey::Ec(pkey.ec_key()?)),
            kind => Ok(SigningKey::Unsupported { kind }),
        }
    }

    /// Load a private key from PEM (PKCS#8 or traditional).
    pub fn from_pem(pem: &[u8]) -> SigningResult<Self> {
        let pkey = PKey::private_key_from_pem(pem)
            .map_err(|e| SigningError::KeyError(format!("Invalid PEM private key: {e}")))?;
        Self::from_pkey(pkey)
    }

    /// Load a private key from DER.
    pub fn from_der(der: &[u8]) -> SigningResult<Self> {
        let pkey = PKey::private_key_from_der(der)
            .map_err(|e| SigningError::KeyError(format!("Invalid DER private key: {e}")))?;
        Self::from_pkey(pkey)
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            SigningKey::Rsa(_) => "RSA",
            SigningKey::Ec(_) => "EC",
            SigningKey::Unsupported { .. } => "unsupported",
        }
    }

    /// Public half, for matching against the signing certificate.
    pub fn public_key(&self) -> SigningResult<PKey<Public>> {
        match self {
            SigningKey::Rsa(rsa) => {
                let public = Rsa::from_public_components(rsa.n().to_owned()?, rsa.e().to_owned()?)?;
                Ok(PKey::from_rsa(public)?)
            }
            SigningKey::Ec(ec) => {
                let public = EcKey::from_public_key(ec.group(), ec.public_key())?;
                Ok(PKey::from_ec_key(public)?)
            }
            SigningKey::Unsupported { kind } => Err(SigningError::UnsupportedAlgorithm(format!(
                "private key type {kind:?}"
            ))),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Rsa(rsa) => write!(f, "SigningKey::Rsa(bits={})", rsa.size() * 8),
            SigningKey::Ec(ec) => write!(f, "SigningKey::Ec(degree={})", ec.group().degree()),
            SigningKey::Unsupported { kind } => write!(f, "SigningKey::Unsupported({kind:?})"),
        }
    }
}
