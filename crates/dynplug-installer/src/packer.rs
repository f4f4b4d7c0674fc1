//! Producing plugin archives from package references.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Turns a package reference into a `.tgz` archive on disk.
pub trait PackagePacker {
    /// Pack `reference` into `destination` and return the archive path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Fetch`] if no archive could be produced.
    fn pack(&self, reference: &str, destination: &Path) -> InstallResult<PathBuf>;
}

impl<P: PackagePacker + ?Sized> PackagePacker for &P {
    fn pack(&self, reference: &str, destination: &Path) -> InstallResult<PathBuf> {
        (**self).pack(reference, destination)
    }
}

/// Packs with `npm pack`, which understands both registry references and
/// local directories.
#[derive(Debug, Clone)]
pub struct NpmPacker {
    program: OsString,
}

impl Default for NpmPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl NpmPacker {
    /// Packer running `npm` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: OsString::from("npm"),
        }
    }

    /// Packer running a different executable with npm's CLI contract.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PackagePacker for NpmPacker {
    fn pack(&self, reference: &str, destination: &Path) -> InstallResult<PathBuf> {
        let fetch_error = |message: String| InstallError::Fetch {
            package: reference.to_string(),
            message,
        };

        debug!(package = reference, cwd = %destination.display(), "running npm pack");
        let output = Command::new(&self.program)
            .arg("pack")
            .arg(reference)
            .current_dir(destination)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                fetch_error(format!(
                    "failed to run {}: {e}",
                    self.program.to_string_lossy()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(package = reference, stderr = %stderr.trim(), "npm pack failed");
            let detail = one_line(&stderr);
            let message = if detail.is_empty() {
                format!("npm pack exited with {}", output.status)
            } else {
                format!("npm pack exited with {}: {detail}", output.status)
            };
            return Err(fetch_error(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let name = archive_name(&stdout)
            .ok_or_else(|| fetch_error("npm pack did not report an archive name".to_string()))?;
        Ok(destination.join(name))
    }
}

/// The archive file name npm prints as the last non-empty stdout line.
fn archive_name(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
}

/// Non-empty lines of `text` joined with `"; "`.
fn one_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_is_last_non_empty_line() {
        let stdout = "npm notice 📦  foo@1.0.0\nnpm notice total files: 3\nacme-foo-1.0.0.tgz\n\n";
        assert_eq!(archive_name(stdout), Some("acme-foo-1.0.0.tgz"));
    }

    #[test]
    fn archive_name_of_blank_output_is_none() {
        assert_eq!(archive_name(""), None);
        assert_eq!(archive_name("\n  \n"), None);
    }

    #[test]
    fn missing_program_is_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let packer = NpmPacker::with_program("definitely-not-a-real-npm-binary");
        let err = packer.pack("@acme/foo@1.0.0", tmp.path()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Fetch);
        assert!(err.to_string().contains("@acme/foo@1.0.0"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let packer = NpmPacker::with_program("false");
        let err = packer.pack("@acme/foo@1.0.0", tmp.path()).unwrap_err();
        assert!(matches!(err, InstallError::Fetch { .. }));
        assert!(err.to_string().contains("npm pack exited"));
    }

    #[test]
    fn multi_line_output_collapses_to_one_line() {
        assert_eq!(
            one_line("npm ERR! code E404\n\n  npm ERR! 404 not found\n"),
            "npm ERR! code E404; npm ERR! 404 not found"
        );
        assert_eq!(one_line(" \n"), "");
    }

    #[cfg(unix)]
    #[test]
    fn multi_line_stderr_yields_single_line_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fake-npm");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'npm ERR! code E404' >&2\necho 'npm ERR! 404 not found' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let packer = NpmPacker::with_program(&script);
        let err = packer.pack("@acme/missing@1.0.0", tmp.path()).unwrap_err();
        let message = err.to_string();

        assert_eq!(err.kind(), crate::ErrorKind::Fetch);
        assert!(!message.contains('\n'), "got: {message}");
        assert!(message.contains("E404; npm ERR! 404 not found"), "got: {message}");
    }
}
