//! Digest algorithm registry.
//!
//! Maps digest algorithm names to the numeric algorithm codes (`ALG_ID`) and
//! ASN.1 object identifiers the signing service understands. SHA-1 is kept
//! for legacy dual-signing; SHA-2 family members are the usual choice.

use std::fmt;
use std::str::FromStr;

use openssl::hash::MessageDigest;
use openssl::md::{Md, MdRef};

use crate::infra::error::{SigningError, SigningResult};

/// Numeric algorithm identifier (`ALG_ID`) used by the signing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmCode(u32);

impl AlgorithmCode {
    pub const CALG_SHA1: AlgorithmCode = AlgorithmCode(0x0000_8004);
    pub const CALG_SHA_256: AlgorithmCode = AlgorithmCode(0x0000_800C);
    pub const CALG_SHA_384: AlgorithmCode = AlgorithmCode(0x0000_800D);
    pub const CALG_SHA_512: AlgorithmCode = AlgorithmCode(0x0000_800E);

    #[must_use]
    pub const fn new(code: u32) -> Self {
        AlgorithmCode(code)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AlgorithmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Supported file digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        }
    }

    #[must_use]
    pub const fn digest_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    #[must_use]
    pub const fn algorithm_code(self) -> AlgorithmCode {
        match self {
            DigestAlgorithm::Sha1 => AlgorithmCode::CALG_SHA1,
            DigestAlgorithm::Sha256 => AlgorithmCode::CALG_SHA_256,
            DigestAlgorithm::Sha384 => AlgorithmCode::CALG_SHA_384,
            DigestAlgorithm::Sha512 => AlgorithmCode::CALG_SHA_512,
        }
    }

    /// Dotted object identifier.
    #[must_use]
    pub const fn oid(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "1.3.14.3.2.26",
            DigestAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            DigestAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            DigestAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Dotted object identifier as NUL-terminated ASCII, as handed to the
    /// service for the timestamp digest.
    #[must_use]
    pub const fn oid_nul_terminated(self) -> &'static [u8] {
        match self {
            DigestAlgorithm::Sha1 => b"1.3.14.3.2.26\0",
            DigestAlgorithm::Sha256 => b"2.16.840.1.101.3.4.2.1\0",
            DigestAlgorithm::Sha384 => b"2.16.840.1.101.3.4.2.2\0",
            DigestAlgorithm::Sha512 => b"2.16.840.1.101.3.4.2.3\0",
        }
    }

    /// Reverse lookup of a service algorithm code.
    pub fn from_algorithm_code(code: AlgorithmCode) -> SigningResult<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.algorithm_code() == code)
            .ok_or_else(|| {
                SigningError::UnsupportedAlgorithm(format!("algorithm code {code}"))
            })
    }

    #[must_use]
    pub fn message_digest(self) -> MessageDigest {
        match self {
            DigestAlgorithm::Sha1 => MessageDigest::sha1(),
            DigestAlgorithm::Sha256 => MessageDigest::sha256(),
            DigestAlgorithm::Sha384 => MessageDigest::sha384(),
            DigestAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    #[must_use]
    pub fn md(self) -> &'static MdRef {
        match self {
            DigestAlgorithm::Sha1 => Md::sha1(),
            DigestAlgorithm::Sha256 => Md::sha256(),
            DigestAlgorithm::Sha384 => Md::sha384(),
            DigestAlgorithm::Sha512 => Md::sha512(),
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(self, data: &[u8]) -> SigningResult<Vec<u8>> {
        let bytes = openssl::hash::hash(self.message_digest(), data)?;
        Ok(bytes.to_vec())
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| SigningError::UnsupportedAlgorithm(s.to_string()))
    }
}

/// Object identifier for a digest algorithm name.
pub fn digest_to_oid(name: &str) -> SigningResult<&'static str> {
    Ok(name.parse::<DigestAlgorithm>()?.oid())
}

/// NUL-terminated object identifier for a digest algorithm name.
pub fn digest_to_oid_nul(name: &str) -> SigningResult<&'static [u8]> {
    Ok(name.parse::<DigestAlgorithm>()?.oid_nul_terminated())
}

/// Service algorithm code for a digest algorithm name.
pub fn digest_to_algorithm_code(name: &str) -> SigningResult<AlgorithmCode> {
    Ok(name.parse::<DigestAlgorithm>()?.algorithm_code())
}
