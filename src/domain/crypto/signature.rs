use std::fmt;

use crate::infra::error::{SigningError, SigningResult};

/// Signature bytes produced by the digest-sign callback.
///
/// The buffer is allocated fresh for every signing call and sized exactly to
/// the signature. Handing it to the signing service moves it: the service owns
/// and releases it, the signer keeps no copy.
#[derive(Clone, Eq, PartialEq)]
pub struct SignatureBuffer {
    bytes: Box<[u8]>,
}

impl SignatureBuffer {
    /// Copy `signature` into a newly allocated buffer of exactly its length.
    pub fn copy_from(signature: &[u8]) -> SigningResult<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(signature.len())
            .map_err(|_| SigningError::AllocationFailure(signature.len()))?;
        bytes.extend_from_slice(signature);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Give up the buffer to the receiving side.
    #[must_use]
    pub fn into_boxed_slice(self) -> Box<[u8]> {
        self.bytes
    }
}

impl fmt::Debug for SignatureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBuffer(len={})", self.bytes.len())
    }
}
