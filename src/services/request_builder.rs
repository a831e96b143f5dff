//! Signing request assembly.
//!
//! Collects subject, certificate, signature metadata, timestamp and
//! strong-signing policy into one immutable [`SigningRequest`]. The request is
//! the same for plain files and package bundles; package bundles additionally
//! derive a [`PackageClientData`] payload from it.

use std::path::{Path, PathBuf};

use crate::domain::constants::{
    CERT_STRONG_SIGN_OID_INFO_CHOICE, SIGNER_CERT_POLICY_CHAIN, SPC_DIGEST_SIGN_FLAG,
    SPC_EXC_PE_PAGE_HASHES_FLAG, SPC_INC_PE_PAGE_HASHES_FLAG, SZ_OID_CERT_STRONG_SIGN_OS_CURRENT,
};
use crate::domain::crypto::{AlgorithmCode, DigestAlgorithm, Thumbprint};
use crate::domain::types::{TimestampConfiguration, TimestampUrl};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::file_kind::FileKind;

/// Digest used by the timestamp request, independent of the file digest.
pub const TIMESTAMP_DIGEST_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

/// The file being signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDescriptor {
    path: PathBuf,
    index: u32,
}

impl SubjectDescriptor {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signature index within the subject; always zero for a fresh signature.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Which certificate signs and how much of the store gets embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDescriptor {
    policy: u32,
    signing_certificate: Thumbprint,
}

impl CertificateDescriptor {
    #[must_use]
    pub fn policy(&self) -> u32 {
        self.policy
    }

    #[must_use]
    pub fn signing_certificate(&self) -> &Thumbprint {
        &self.signing_certificate
    }
}

/// Authenticode signature attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMetadata {
    description: Option<String>,
    description_url: Option<String>,
    algorithm: DigestAlgorithm,
}

impl SignatureMetadata {
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn description_url(&self) -> Option<&str> {
        self.description_url.as_deref()
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn algorithm_code(&self) -> AlgorithmCode {
        self.algorithm.algorithm_code()
    }
}

/// Timestamp flags, server and digest. `url` is `None` when `flags` is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampDescriptor {
    flags: u32,
    url: Option<TimestampUrl>,
    digest_oid: &'static [u8],
}

impl TimestampDescriptor {
    fn from_configuration(config: &TimestampConfiguration) -> Self {
        let flags = config.kind().flags();
        Self {
            flags,
            url: if flags == 0 { None } else { config.url().cloned() },
            digest_oid: TIMESTAMP_DIGEST_ALGORITHM.oid_nul_terminated(),
        }
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn url(&self) -> Option<&TimestampUrl> {
        self.url.as_ref()
    }

    /// NUL-terminated OID of the timestamp digest.
    #[must_use]
    pub fn digest_oid(&self) -> &'static [u8] {
        self.digest_oid
    }
}

/// Strong-signing policy pinned to the OS-current policy OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrongSignPolicy {
    choice: u32,
    oid: &'static str,
}

impl Default for StrongSignPolicy {
    fn default() -> Self {
        Self {
            choice: CERT_STRONG_SIGN_OID_INFO_CHOICE,
            oid: SZ_OID_CERT_STRONG_SIGN_OS_CURRENT,
        }
    }
}

impl StrongSignPolicy {
    #[must_use]
    pub fn choice(&self) -> u32 {
        self.choice
    }

    #[must_use]
    pub fn oid(&self) -> &'static str {
        self.oid
    }
}

/// Callback shape the package signing subsystem expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestCallbackVersion {
    V2,
}

/// Extra payload handed to the service for package bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageClientData {
    flags: u32,
    timestamp: TimestampDescriptor,
    callback_version: DigestCallbackVersion,
}

impl PackageClientData {
    /// Package signing never includes page hashes.
    pub const FLAGS: u32 = SPC_DIGEST_SIGN_FLAG | SPC_EXC_PE_PAGE_HASHES_FLAG;

    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn timestamp(&self) -> &TimestampDescriptor {
        &self.timestamp
    }

    #[must_use]
    pub fn callback_version(&self) -> DigestCallbackVersion {
        self.callback_version
    }
}

/// Everything the signing service needs for one `sign_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    flags: u32,
    file_kind: FileKind,
    subject: SubjectDescriptor,
    certificate: CertificateDescriptor,
    signature: SignatureMetadata,
    timestamp: TimestampDescriptor,
    strong_sign_policy: StrongSignPolicy,
}

impl SigningRequest {
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn includes_page_hashes(&self) -> bool {
        self.flags & SPC_INC_PE_PAGE_HASHES_FLAG != 0
    }

    #[must_use]
    pub fn file_kind(&self) -> FileKind {
        self.file_kind
    }

    #[must_use]
    pub fn subject(&self) -> &SubjectDescriptor {
        &self.subject
    }

    #[must_use]
    pub fn certificate(&self) -> &CertificateDescriptor {
        &self.certificate
    }

    #[must_use]
    pub fn signature(&self) -> &SignatureMetadata {
        &self.signature
    }

    #[must_use]
    pub fn timestamp(&self) -> &TimestampDescriptor {
        &self.timestamp
    }

    #[must_use]
    pub fn strong_sign_policy(&self) -> &StrongSignPolicy {
        &self.strong_sign_policy
    }

    /// Package payload, present only for package bundles.
    #[must_use]
    pub fn package_client_data(&self) -> Option<PackageClientData> {
        self.file_kind.is_package().then(|| PackageClientData {
            flags: PackageClientData::FLAGS,
            timestamp: self.timestamp.clone(),
            callback_version: DigestCallbackVersion::V2,
        })
    }
}

/// Builder for [`SigningRequest`].
#[derive(Debug, Clone, Default)]
pub struct SigningRequestBuilder {
    path: PathBuf,
    description: Option<String>,
    description_url: Option<String>,
    page_hashing: bool,
    algorithm: Option<DigestAlgorithm>,
    timestamp: TimestampConfiguration,
    signing_certificate: Option<Thumbprint>,
}

impl SigningRequestBuilder {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    #[must_use]
    pub fn description_url(mut self, url: Option<&str>) -> Self {
        self.description_url = url.map(str::to_string);
        self
    }

    #[must_use]
    pub fn page_hashing(mut self, enabled: bool) -> Self {
        self.page_hashing = enabled;
        self
    }

    #[must_use]
    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, config: &TimestampConfiguration) -> Self {
        self.timestamp = config.clone();
        self
    }

    #[must_use]
    pub fn signing_certificate(mut self, thumbprint: Thumbprint) -> Self {
        self.signing_certificate = Some(thumbprint);
        self
    }

    /// Validate and freeze the request.
    ///
    /// # Errors
    /// `ValidationError` for an empty path or missing signing certificate,
    /// `UnsupportedAlgorithm` when no digest algorithm was set.
    pub fn build(self) -> SigningResult<SigningRequest> {
        if self.path.as_os_str().is_empty() {
            return Err(SigningError::ValidationError(
                "File path cannot be empty".to_string(),
            ));
        }
        let algorithm = self.algorithm.ok_or_else(|| {
            SigningError::UnsupportedAlgorithm("no digest algorithm configured".to_string())
        })?;
        let signing_certificate = self.signing_certificate.ok_or_else(|| {
            SigningError::ValidationError("No signing certificate selected".to_string())
        })?;

        let file_kind = FileKind::classify(&self.path);
        // Package bundles never include page hashes.
        let page_flag = if self.page_hashing && !file_kind.is_package() {
            SPC_INC_PE_PAGE_HASHES_FLAG
        } else {
            SPC_EXC_PE_PAGE_HASHES_FLAG
        };

        Ok(SigningRequest {
            flags: SPC_DIGEST_SIGN_FLAG | page_flag,
            file_kind,
            subject: SubjectDescriptor {
                path: self.path,
                index: 0,
            },
            certificate: CertificateDescriptor {
                policy: SIGNER_CERT_POLICY_CHAIN,
                signing_certificate,
            },
            signature: SignatureMetadata {
                description: self.description,
                description_url: self.description_url,
                algorithm,
            },
            timestamp: TimestampDescriptor::from_configuration(&self.timestamp),
            strong_sign_policy: StrongSignPolicy::default(),
        })
    }
}
