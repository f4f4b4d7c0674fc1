//! Bridge from `dynplug_config::InstallerConfig` to domain types.

use std::path::Path;

use dynplug_config::InstallerConfig;
use dynplug_installer::InstallOptions;
use dynplug_telemetry::{LogConfig, LogFormat};

/// Convert config to [`LogConfig`]. Logs always go to stderr; `ansi`
/// follows the terminal styling decision so `NO_COLOR` covers both.
pub(crate) fn to_log_config(cfg: &InstallerConfig, ansi: bool) -> LogConfig {
    let log =
        LogConfig::new(&cfg.logging.level).with_format(LogFormat::from_name(&cfg.logging.format));
    if ansi { log } else { log.without_ansi() }
}

/// Convert config plus the command-line paths to [`InstallOptions`].
pub(crate) fn to_install_options(
    cfg: &InstallerConfig,
    root_dir: &Path,
    manifest: &Path,
) -> InstallOptions {
    InstallOptions::new(root_dir, cfg.max_entry_size)
        .with_manifest(manifest)
        .with_skip_integrity_check(cfg.skip_integrity_check)
}
