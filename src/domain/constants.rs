//! Centralized constants shared with the platform signing service.
//! Flag values, status codes and policy identifiers used when assembling
//! signing requests. Keep this intentionally small; only literals that cross
//! the service boundary should live here.

use super::types::HResult;

// === Sign flags (SIGNER_SIGN_FLAGS) ===

/// Exclude page hashes from the signature.
pub const SPC_EXC_PE_PAGE_HASHES_FLAG: u32 = 0x0000_0010;

/// Include page hashes in the signature.
pub const SPC_INC_PE_PAGE_HASHES_FLAG: u32 = 0x0000_0100;

/// The private key operation is delegated to a digest-sign callback.
pub const SPC_DIGEST_SIGN_FLAG: u32 = 0x0000_0400;

// === Timestamp flags (SIGNER_TIMESTAMP_FLAGS) ===

/// Legacy Authenticode timestamp protocol.
pub const SIGNER_TIMESTAMP_AUTHENTICODE: u32 = 0x1;

/// RFC 3161 timestamp protocol.
pub const SIGNER_TIMESTAMP_RFC3161: u32 = 0x2;

// === Certificate descriptor ===

/// Embed the whole chain found in the certificate store.
pub const SIGNER_CERT_POLICY_CHAIN: u32 = 0x2;

// === Strong signing policy ===

/// `CERT_STRONG_SIGN_PARA` choice selecting a policy OID.
pub const CERT_STRONG_SIGN_OID_INFO_CHOICE: u32 = 2;

/// Policy OID requiring algorithms the current OS considers strong.
pub const SZ_OID_CERT_STRONG_SIGN_OS_CURRENT: &str = "1.3.6.1.4.1.311.72.1.2";

// === Status codes ===

pub mod status {
    use super::HResult;

    pub const S_OK: HResult = HResult::from_u32(0x0000_0000);
    pub const E_FAIL: HResult = HResult::from_u32(0x8000_4005);
    pub const E_HANDLE: HResult = HResult::from_u32(0x8007_0006);
    pub const E_OUTOFMEMORY: HResult = HResult::from_u32(0x8007_000E);
    pub const E_INVALIDARG: HResult = HResult::from_u32(0x8007_0057);
    pub const NTE_BAD_ALGID: HResult = HResult::from_u32(0x8009_0008);
}

/// Upper bound on chain length; longer paths are treated as malformed.
pub const MAX_CHAIN_DEPTH: usize = 16;
