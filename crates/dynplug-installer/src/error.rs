//! Installer error types.

use std::fmt;
use std::path::PathBuf;

/// Errors from the installer pipeline.
///
/// Every variant is fatal: the run stops at the first error and nothing is
/// rolled back.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The root manifest or an include could not be read or has the wrong
    /// shape.
    #[error("manifest error in {path}: {message}")]
    Manifest {
        /// Manifest file that failed.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// An included manifest does not exist.
    #[error("included manifest {path} does not exist")]
    MissingInclude {
        /// The include path as resolved on disk.
        path: PathBuf,
    },

    /// A registry package has no integrity descriptor.
    #[error("no integrity hash provided for package {package}")]
    MissingIntegrity {
        /// Package that lacks a descriptor.
        package: String,
    },

    /// The integrity descriptor is not `<algorithm>-<base64>`.
    #[error("invalid integrity descriptor for {package}: {message}")]
    MalformedIntegrity {
        /// Package whose descriptor is malformed.
        package: String,
        /// Description of the problem.
        message: String,
    },

    /// The descriptor names an algorithm outside the accepted set.
    #[error(
        "unsupported integrity algorithm '{algorithm}' for {package}; expected one of: sha512, sha384, sha256"
    )]
    UnsupportedAlgorithm {
        /// Package whose descriptor was rejected.
        package: String,
        /// The algorithm as written.
        algorithm: String,
    },

    /// The archive digest does not match the descriptor.
    #[error("integrity mismatch for {package}: expected {expected}")]
    IntegrityMismatch {
        /// Package that failed verification.
        package: String,
        /// The descriptor the archive was checked against.
        expected: String,
    },

    /// An archive entry lives outside the required top-level prefix.
    #[error("archive entry {path} is outside the '{prefix}' prefix")]
    PathOutsidePrefix {
        /// Offending entry path.
        path: String,
        /// The prefix every entry must start with.
        prefix: String,
    },

    /// An archive entry declares more bytes than allowed.
    #[error("zip bomb detected: entry {path} declares {size} bytes (limit: {limit} bytes)")]
    EntryTooLarge {
        /// Offending entry path.
        path: String,
        /// Declared size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// Path traversal detected in an archive entry.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },

    /// Unsafe entry type in archive (e.g. symlink, hardlink, device node).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The entry type that was rejected.
        entry_type: String,
        /// The path of the entry.
        path: String,
    },

    /// The archive could not be decoded or written out.
    #[error("extraction error: {message}")]
    Extraction {
        /// Description of the extraction failure.
        message: String,
    },

    /// Two plugins set the same configuration key to different values.
    #[error("config key '{key}' defined differently by two plugins: {existing} vs {incoming}")]
    ConfigConflict {
        /// Dot-joined key path.
        key: String,
        /// Value already in the global configuration.
        existing: String,
        /// Value the current plugin tried to set.
        incoming: String,
    },

    /// The package packer could not produce an archive.
    #[error("failed to fetch package {package}: {message}")]
    Fetch {
        /// Package that could not be fetched.
        package: String,
        /// Packer diagnostics (usually captured stderr).
        message: String,
    },

    /// The merged configuration could not be rendered as YAML.
    #[error("failed to serialize configuration: {message}")]
    Serialization {
        /// Serializer diagnostics.
        message: String,
    },

    /// Filesystem failure outside archive extraction.
    #[error("I/O error on {path}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Manifest or include problems.
    Manifest,
    /// Integrity descriptor or digest problems.
    Integrity,
    /// Hostile or malformed archive contents.
    ArchiveSecurity,
    /// Conflicting plugin configuration.
    ConfigConflict,
    /// Package packer failure.
    Fetch,
    /// Other filesystem failures.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest error"),
            Self::Integrity => write!(f, "integrity error"),
            Self::ArchiveSecurity => write!(f, "archive security error"),
            Self::ConfigConflict => write!(f, "config conflict"),
            Self::Fetch => write!(f, "fetch error"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl InstallError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Manifest { .. } | Self::MissingInclude { .. } => ErrorKind::Manifest,
            Self::MissingIntegrity { .. }
            | Self::MalformedIntegrity { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::IntegrityMismatch { .. } => ErrorKind::Integrity,
            Self::PathOutsidePrefix { .. }
            | Self::EntryTooLarge { .. }
            | Self::PathTraversal { .. }
            | Self::UnsafeEntryType { .. } => ErrorKind::ArchiveSecurity,
            Self::ConfigConflict { .. } => ErrorKind::ConfigConflict,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Extraction { .. } | Self::Serialization { .. } | Self::Io { .. } => {
                ErrorKind::Io
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;
