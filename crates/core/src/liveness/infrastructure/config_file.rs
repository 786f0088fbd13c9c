use std::fs;
use std::path::{Path, PathBuf};

use crate::liveness::domain::liveness_config::{ConfigError, LivenessConfig};
use crate::shared::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};

/// `<config_dir>/PadLiveness/config.json`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Reads and validates a JSON config. Missing keys take their defaults.
pub fn load(path: &Path) -> Result<LivenessConfig, ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: LivenessConfig =
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// An explicit path must load. Otherwise the per-user file is used when it
/// exists, falling back to built-in defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<LivenessConfig, ConfigError> {
    if let Some(path) = explicit {
        return load(path);
    }
    match default_path() {
        Some(path) if path.is_file() => {
            log::info!("Using config {}", path.display());
            load(&path)
        }
        _ => Ok(LivenessConfig::default()),
    }
}

pub fn save(config: &LivenessConfig, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| write_err(e.into()))?;
    fs::write(path, json).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::domain::liveness_config::GapPolicy;

    #[test]
    fn test_default_path_ends_with_app_file() {
        if let Some(path) = default_path() {
            assert!(path.ends_with("PadLiveness/config.json"));
        }
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"decision": {"min_person_regions": 4}}"#).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.decision.min_person_regions, 4);
        assert_eq!(config.decision.avg_color_ratio, 0.16988);
        assert_eq!(config.window_size, 100);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ window_size: ").unwrap();
        assert!(matches!(load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"window_size": 0}"#).unwrap();
        assert!(matches!(load(&path), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_explicit_path_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{"gap_policy": "discard_previous"}"#).unwrap();
        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.gap_policy, GapPolicy::DiscardPrevious);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = LivenessConfig {
            window_size: 42,
            ..LivenessConfig::default()
        };
        save(&config, &path).unwrap();
        assert_eq!(load(&path).unwrap(), config);
    }
}
