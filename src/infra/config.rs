//! Configuration management infrastructure.
//!
//! This module provides configuration file support, allowing users to save
//! and load the digest algorithm, timestamp settings, signature attributes and
//! chain-building preferences used to construct a signer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::crypto::{load_certificates, DigestAlgorithm};
use crate::domain::types::{TimestampConfiguration, TimestampKind, TimestampUrl};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::chain_builder::{ChainPolicy, ChainVerificationFlags};

/// Signer configuration with all signing preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfiguration {
    /// File digest algorithm (SHA1, SHA256, SHA384, SHA512)
    pub digest_algorithm: String,

    /// Ask for page hashes when signing plain files
    pub page_hashing: bool,

    /// Signature description attribute
    pub description: Option<String>,

    /// Signature description URL attribute
    pub description_url: Option<String>,

    /// Timestamp settings
    pub timestamp: TimestampSettings,

    /// Certificate chain settings
    pub chain: ChainSettings,
}

/// Timestamp configuration as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampSettings {
    /// none, authenticode or rfc3161
    pub kind: TimestampKind,

    /// Timestamp server URL, required unless kind is none
    pub url: Option<String>,
}

/// Certificate chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// PEM or DER files with intermediates used to complete the chain
    pub additional_certificates: Vec<PathBuf>,

    /// PEM or DER files with trusted roots
    pub trust_anchors: Vec<PathBuf>,

    /// Reject chain elements outside their validity period
    pub check_time: bool,

    /// Require the chain to end in one of the trust anchors
    pub require_trusted_root: bool,

    /// Search the local OpenSSL default store for issuers
    pub use_local_store: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            additional_certificates: Vec::new(),
            trust_anchors: Vec::new(),
            check_time: false,
            require_trusted_root: false,
            use_local_store: true,
        }
    }
}

impl Default for SignerConfiguration {
    fn default() -> Self {
        Self {
            digest_algorithm: "SHA256".to_string(),
            page_hashing: false,
            description: None,
            description_url: None,
            timestamp: TimestampSettings::default(),
            chain: ChainSettings::default(),
        }
    }
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            kind: TimestampKind::Rfc3161,
            url: Some("http://timestamp.digicert.com".to_string()),
        }
    }
}

impl SignerConfiguration {
    pub fn digest_algorithm(&self) -> SigningResult<DigestAlgorithm> {
        self.digest_algorithm.parse()
    }

    pub fn timestamp_configuration(&self) -> SigningResult<TimestampConfiguration> {
        let url = match (&self.timestamp.kind, &self.timestamp.url) {
            (TimestampKind::None, _) | (_, None) => None,
            (_, Some(url)) => Some(TimestampUrl::new(url)?),
        };
        TimestampConfiguration::new(self.timestamp.kind, url)
    }

    /// Load the configured certificate files into a chain policy.
    pub fn chain_policy(&self) -> SigningResult<ChainPolicy> {
        Ok(ChainPolicy::new()
            .with_extra_certificates(read_certificate_files(&self.chain.additional_certificates)?)
            .with_trust_anchors(read_certificate_files(&self.chain.trust_anchors)?)
            .with_flags(ChainVerificationFlags {
                check_time: self.chain.check_time,
                require_trusted_root: self.chain.require_trusted_root,
            })
            .with_local_store(self.chain.use_local_store))
    }

    /// Description, description URL and page hashing used by
    /// `AuthenticodeSigner::sign_configured`.
    #[must_use]
    pub fn signing_defaults(&self) -> SigningDefaults {
        SigningDefaults {
            description: self.description.clone(),
            description_url: self.description_url.clone(),
            page_hashing: self.page_hashing,
        }
    }
}

fn read_certificate_files(paths: &[PathBuf]) -> SigningResult<Vec<openssl::x509::X509>> {
    let mut certs = Vec::new();
    for path in paths {
        let data = fs::read(path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read certificate file {}: {}",
                path.display(),
                e
            ))
        })?;
        certs.extend(load_certificates(&data)?);
    }
    Ok(certs)
}

/// Per-file signature attributes applied when the caller gives none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SigningDefaults {
    pub description: Option<String>,
    pub description_url: Option<String>,
    pub page_hashing: bool,
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("authenticode-signer").join("config.toml"))
        } else {
            Ok(PathBuf::from("authenticode-signer.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SignerConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SignerConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SignerConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SignerConfiguration) -> SigningResult<()> {
        Self::validate_config(config)?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate configuration values
    fn validate_config(config: &SignerConfiguration) -> SigningResult<()> {
        config.digest_algorithm().map_err(|_| {
            SigningError::ConfigurationError(format!(
                "Invalid digest algorithm: {}",
                config.digest_algorithm
            ))
        })?;

        config.timestamp_configuration().map_err(|e| {
            SigningError::ConfigurationError(format!("Invalid timestamp settings: {e}"))
        })?;

        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load()?;

        match key {
            "digest_algorithm" => config.digest_algorithm = value.to_string(),
            "page_hashing" => {
                config.page_hashing = value.parse().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid boolean value: {value}"))
                })?;
            }
            "description" => config.description = Some(value.to_string()),
            "description_url" => config.description_url = Some(value.to_string()),
            "timestamp.kind" => config.timestamp.kind = value.parse()?,
            "timestamp.url" => config.timestamp.url = Some(value.to_string()),
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
