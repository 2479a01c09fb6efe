//! Config path resolution
//!
//! Handles resolving the settings and permissions file paths from the base
//! directory the host keeps its data in.

use std::path::{Path, PathBuf};

use super::EngineConfig;

/// File name of the engine settings
pub const SETTINGS_FILE: &str = "settings.toml";

/// Returns the path of the settings file.
///
/// Path: `{base_dir}/settings.toml`
pub fn settings_path(base_dir: &Path) -> PathBuf {
    base_dir.join(SETTINGS_FILE)
}

/// Returns the path of the permissions document named by `config`.
///
/// Path: `{base_dir}/{config.permissions_file}`
pub fn permissions_path(base_dir: &Path, config: &EngineConfig) -> PathBuf {
    base_dir.join(&config.permissions_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_format() {
        let base = PathBuf::from("/srv/game/plugins/groupperms");
        assert!(settings_path(&base).ends_with("groupperms/settings.toml"));

        let config = EngineConfig {
            permissions_file: "perms.toml".to_string(),
            ..EngineConfig::default()
        };
        assert!(permissions_path(&base, &config).ends_with("groupperms/perms.toml"));
    }
}
