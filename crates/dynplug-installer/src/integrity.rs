//! SRI (Subresource Integrity) verification for plugin archives.
//!
//! Descriptors have the exact form `<algorithm>-<base64 digest>` with the
//! algorithm drawn from `sha512`, `sha384` and `sha256`. Anything else,
//! including well-known but weaker algorithms, is rejected.

use base64::Engine;
use sha2::{Digest, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::{InstallError, InstallResult};
use crate::plugin::PluginDefinition;

/// Accepted digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityAlgorithm {
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl IntegrityAlgorithm {
    /// Look up an algorithm by its descriptor prefix.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Descriptor prefix for this algorithm.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Raw digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for IntegrityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed `<algorithm>-<base64>` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityDescriptor {
    algorithm: IntegrityAlgorithm,
    digest: String,
}

impl IntegrityDescriptor {
    /// Parse and validate a descriptor string.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::MalformedIntegrity`] if the string is not two
    /// `-`-separated parts or the digest is not valid base64, and
    /// [`InstallError::UnsupportedAlgorithm`] for algorithms outside the
    /// accepted set.
    pub fn parse(descriptor: &str, package: &str) -> InstallResult<Self> {
        let malformed = |message: String| InstallError::MalformedIntegrity {
            package: package.to_string(),
            message,
        };

        let parts: Vec<&str> = descriptor.split('-').collect();
        let [algorithm, digest] = parts.as_slice() else {
            return Err(malformed(format!(
                "expected '<algorithm>-<base64>', got '{descriptor}'"
            )));
        };
        if algorithm.is_empty() || digest.is_empty() {
            return Err(malformed(format!(
                "expected '<algorithm>-<base64>', got '{descriptor}'"
            )));
        }

        let algorithm =
            IntegrityAlgorithm::from_name(algorithm).ok_or_else(|| {
                InstallError::UnsupportedAlgorithm {
                    package: package.to_string(),
                    algorithm: (*algorithm).to_string(),
                }
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(digest)
            .map_err(|e| malformed(format!("invalid base64 in integrity hash: {e}")))?;

        Ok(Self {
            algorithm,
            digest: (*digest).to_string(),
        })
    }

    /// The digest algorithm.
    #[must_use]
    pub fn algorithm(&self) -> IntegrityAlgorithm {
        self.algorithm
    }

    /// Check `data` against this descriptor.
    ///
    /// The freshly computed digest is base64-encoded and compared byte for
    /// byte, in constant time, with the descriptor's digest text.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::IntegrityMismatch`] if the digests differ.
    pub fn verify(&self, data: &[u8], package: &str) -> InstallResult<()> {
        let actual = base64::engine::general_purpose::STANDARD.encode(self.algorithm.digest(data));

        if !bool::from(actual.as_bytes().ct_eq(self.digest.as_bytes())) {
            return Err(InstallError::IntegrityMismatch {
                package: package.to_string(),
                expected: self.to_string(),
            });
        }
        debug!(package, algorithm = %self.algorithm, "integrity verified");
        Ok(())
    }
}

impl std::fmt::Display for IntegrityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.algorithm, self.digest)
    }
}

/// Verify `data` against the descriptor string `sri`.
///
/// # Errors
///
/// Any error from [`IntegrityDescriptor::parse`] or
/// [`IntegrityDescriptor::verify`].
pub fn verify_integrity(sri: &str, data: &[u8], package: &str) -> InstallResult<()> {
    IntegrityDescriptor::parse(sri, package)?.verify(data, package)
}

/// Decides whether a plugin needs verification and with what descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityPolicy {
    /// Skip verification for every package.
    pub skip_check: bool,
}

impl IntegrityPolicy {
    /// Create a policy.
    #[must_use]
    pub fn new(skip_check: bool) -> Self {
        Self { skip_check }
    }

    /// Resolve the descriptor `plugin` must be verified against.
    ///
    /// Returns `Ok(None)` for local packages and when checking is disabled;
    /// both bypasses are logged.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::MissingIntegrity`] for a registry package
    /// without a descriptor, or any parse error of a present descriptor.
    pub fn descriptor_for(
        &self,
        plugin: &PluginDefinition,
    ) -> InstallResult<Option<IntegrityDescriptor>> {
        if plugin.is_local() {
            warn!(package = %plugin.package, "local package, skipping integrity check");
            return Ok(None);
        }
        if self.skip_check {
            warn!(
                package = %plugin.package,
                "integrity checking disabled, skipping integrity check"
            );
            return Ok(None);
        }

        let sri = plugin
            .integrity
            .as_deref()
            .ok_or_else(|| InstallError::MissingIntegrity {
                package: plugin.package.clone(),
            })?;
        IntegrityDescriptor::parse(sri, &plugin.package).map(Some)
    }
}
