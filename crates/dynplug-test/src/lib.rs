//! Shared test utilities for the dynamic plugins installer.
//!
//! Provides archive builders (well-formed and deliberately malformed) and
//! integrity descriptor helpers, used as a dev-dependency by the installer
//! crate.
//!
//! ```rust,ignore
//! use dynplug_test::{npm_tarball, sri_sha256};
//!
//! let tgz = npm_tarball(&[("package/package.json", b"{}")]);
//! let integrity = sri_sha256(&tgz);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::arithmetic_side_effects, clippy::missing_panics_doc)]

mod archive;
mod sri;

pub use archive::{RawEntry, gzip, npm_tarball, raw_tarball};
pub use sri::{sri_sha256, sri_sha384, sri_sha512};
