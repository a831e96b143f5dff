//! Certificate chain building service.
//!
//! Builds the chain that gets embedded next to the signature. The chain is
//! assembled for embedding, not for a trust decision, so by default every
//! verification check that would reject an offline or private chain is
//! relaxed: revocation is never consulted, validity periods are ignored and
//! the root does not have to be a known trust anchor. A path to *some* root
//! is still required.
//!
//! Issuer candidates come from the trust anchors, the extra certificates and
//! the local OpenSSL default store (`SSL_CERT_FILE` or the built-in CA file).
//! The search backtracks, so a dead-end candidate such as a cross-signed
//! intermediate whose root is unavailable does not hide a working path.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use openssl::asn1::Asn1Time;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Ref, X509};

use crate::domain::constants::MAX_CHAIN_DEPTH;
use crate::domain::crypto::{describe, CertificateChain, CertificateStore, Thumbprint};
use crate::infra::error::{SigningError, SigningResult};

/// Checks applied on top of path construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainVerificationFlags {
    /// Reject elements outside their validity period.
    pub check_time: bool,
    /// Require the root to be one of the policy's trust anchors.
    pub require_trusted_root: bool,
}

impl ChainVerificationFlags {
    /// Every check relaxed.
    pub const RELAXED: Self = Self {
        check_time: false,
        require_trusted_root: false,
    };
}

/// Certificates available for path completion plus verification flags.
#[derive(Clone)]
pub struct ChainPolicy {
    extra: Vec<X509>,
    anchors: Vec<X509>,
    flags: ChainVerificationFlags,
    local_store: bool,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            extra: Vec::new(),
            anchors: Vec::new(),
            flags: ChainVerificationFlags::RELAXED,
            local_store: true,
        }
    }
}

impl ChainPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplemental certificates; they complete paths but confer no trust.
    #[must_use]
    pub fn with_extra_certificates(mut self, certs: impl IntoIterator<Item = X509>) -> Self {
        self.extra.extend(certs);
        self
    }

    #[must_use]
    pub fn with_trust_anchors(mut self, certs: impl IntoIterator<Item = X509>) -> Self {
        self.anchors.extend(certs);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ChainVerificationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether the local OpenSSL default store is searched for issuers.
    /// Enabled by default.
    #[must_use]
    pub fn with_local_store(mut self, enabled: bool) -> Self {
        self.local_store = enabled;
        self
    }

    #[must_use]
    pub fn extra_certificates(&self) -> &[X509] {
        &self.extra
    }

    #[must_use]
    pub fn trust_anchors(&self) -> &[X509] {
        &self.anchors
    }

    #[must_use]
    pub fn flags(&self) -> ChainVerificationFlags {
        self.flags
    }

    #[must_use]
    pub fn uses_local_store(&self) -> bool {
        self.local_store
    }

    /// Anchors, then extras, then the local store.
    fn candidates(&self) -> SigningResult<Vec<X509>> {
        let mut candidates: Vec<X509> = self.anchors.iter().chain(&self.extra).cloned().collect();
        if self.local_store {
            candidates.extend(local_store_certificates()?);
        }
        Ok(candidates)
    }
}

impl fmt::Debug for ChainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainPolicy")
            .field("extra", &self.extra.len())
            .field("anchors", &self.anchors.len())
            .field("flags", &self.flags)
            .field("local_store", &self.local_store)
            .finish()
    }
}

/// Certificates loaded by OpenSSL's default verify paths.
fn local_store_certificates() -> SigningResult<Vec<X509>> {
    let mut builder = X509StoreBuilder::new()?;
    builder.set_default_paths()?;
    let store = builder.build();

    let certs: Vec<X509> = store
        .objects()
        .iter()
        .filter_map(|object| object.x509().map(X509Ref::to_owned))
        .collect();
    log::debug!("Local certificate store holds {} certificate(s)", certs.len());
    Ok(certs)
}

/// Path search state: the partial chain plus the reason the last dead end
/// was abandoned.
struct Search<'a> {
    policy: &'a ChainPolicy,
    candidates: Vec<X509>,
    path: Vec<X509>,
    on_path: HashSet<Thumbprint>,
    dead_end: Option<SigningError>,
}

pub struct ChainBuilder;

impl ChainBuilder {
    /// Build the chain for `leaf` and the store holding its elements.
    ///
    /// # Errors
    /// `ChainBuildError` when no path from `leaf` to a self-signed root can be
    /// constructed from the available certificates within `MAX_CHAIN_DEPTH`
    /// elements, or when every such path is rejected by an enabled
    /// verification flag.
    pub fn build(
        leaf: &X509Ref,
        policy: &ChainPolicy,
    ) -> SigningResult<(CertificateChain, CertificateStore)> {
        log::debug!("Building certificate chain for {}", describe(leaf));

        let mut search = Search {
            policy,
            candidates: policy.candidates()?,
            path: vec![leaf.to_owned()],
            on_path: HashSet::from([Thumbprint::of(leaf)?]),
            dead_end: None,
        };

        if !Self::extend(&mut search)? {
            return Err(search.dead_end.unwrap_or_else(|| {
                SigningError::ChainBuildError(format!("no issuer found for {}", describe(leaf)))
            }));
        }

        let chain = CertificateChain::from_elements(search.path)?;
        let mut store = CertificateStore::new();
        for cert in chain.elements() {
            store.add(cert)?;
        }

        log::info!(
            "Built certificate chain with {} element(s), root: {}",
            chain.len(),
            describe(chain.root())
        );
        Ok((chain, store))
    }

    /// Depth-first extension of `search.path`; `Ok(false)` means every path
    /// through the current element was a dead end.
    fn extend(search: &mut Search<'_>) -> SigningResult<bool> {
        let current = search.path[search.path.len() - 1].clone();

        if Self::is_self_issued(&current)? {
            return match Self::accept_root(search) {
                Ok(()) => Ok(true),
                Err(reason) => {
                    log::debug!("  rejected path: {reason}");
                    search.dead_end = Some(reason);
                    Ok(false)
                }
            };
        }

        if search.path.len() >= MAX_CHAIN_DEPTH {
            search.dead_end = Some(SigningError::ChainBuildError(format!(
                "chain exceeds {MAX_CHAIN_DEPTH} certificates"
            )));
            return Ok(false);
        }

        let issuers = Self::issuers_of(&current, &search.candidates)?;
        if issuers.is_empty() {
            search.dead_end = Some(SigningError::ChainBuildError(format!(
                "no issuer found for {}",
                describe(&current)
            )));
            return Ok(false);
        }

        for issuer in issuers {
            let thumbprint = Thumbprint::of(&issuer)?;
            if !search.on_path.insert(thumbprint) {
                search.dead_end = Some(SigningError::ChainBuildError(format!(
                    "certificate loop at {}",
                    describe(&issuer)
                )));
                continue;
            }
            log::debug!("  {} issued by {}", describe(&current), describe(&issuer));
            search.path.push(issuer);

            if Self::extend(search)? {
                return Ok(true);
            }

            search.path.pop();
            search.on_path.remove(&thumbprint);
        }
        Ok(false)
    }

    fn is_self_issued(cert: &X509Ref) -> SigningResult<bool> {
        Ok(cert.subject_name().try_cmp(cert.issuer_name())? == Ordering::Equal)
    }

    /// Root checks plus the policy's verification flags for the full path.
    fn accept_root(search: &Search<'_>) -> Result<(), SigningError> {
        let root = &search.path[search.path.len() - 1];
        let key = root.public_key()?;
        if !root.verify(&key)? {
            return Err(SigningError::ChainBuildError(format!(
                "root certificate {} has an invalid self-signature",
                describe(root)
            )));
        }
        Self::apply_flags(&search.path, search.policy)
    }

    // Issuer = subject name matches the subject's issuer name and its key
    // verifies the subject's signature.
    fn issuers_of(subject: &X509Ref, candidates: &[X509]) -> SigningResult<Vec<X509>> {
        let mut issuers = Vec::new();
        let mut seen = HashSet::new();
        for candidate in candidates {
            if candidate.subject_name().try_cmp(subject.issuer_name())? != Ordering::Equal {
                continue;
            }
            let verified = candidate
                .public_key()
                .and_then(|key| subject.verify(&key))
                .unwrap_or(false);
            if verified && seen.insert(Thumbprint::of(candidate)?) {
                issuers.push(candidate.clone());
            }
        }
        Ok(issuers)
    }

    fn apply_flags(path: &[X509], policy: &ChainPolicy) -> SigningResult<()> {
        let flags = policy.flags();
        let root = &path[path.len() - 1];

        if flags.require_trusted_root {
            let root_thumbprint = Thumbprint::of(root)?;
            let mut trusted = false;
            for anchor in policy.trust_anchors() {
                if Thumbprint::of(anchor)? == root_thumbprint {
                    trusted = true;
                    break;
                }
            }
            if !trusted {
                return Err(SigningError::ChainBuildError(format!(
                    "root {} is not a trust anchor",
                    describe(root)
                )));
            }
        }

        if flags.check_time {
            let now = Asn1Time::days_from_now(0)?;
            for cert in path {
                let started = now.compare(cert.not_before())?.is_ge();
                let unexpired = now.compare(cert.not_after())?.is_le();
                if !(started && unexpired) {
                    return Err(SigningError::ChainBuildError(format!(
                        "{} is outside its validity period",
                        describe(cert)
                    )));
                }
            }
        }

        Ok(())
    }
}
