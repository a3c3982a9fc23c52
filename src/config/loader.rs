use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::types::{ConfigFile, DefinitionFile, Settings};

pub const DEFAULT_CONFIG_FILE: &str = "maintrack.yaml";

/// Load engine settings.
///
/// - If `path` is a file, parse it.
/// - If `path` is a directory, look for `maintrack.yaml` inside it.
/// - If nothing is found, fall back to defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let file = if path.is_dir() {
        path.join(DEFAULT_CONFIG_FILE)
    } else {
        path.to_path_buf()
    };

    if !file.is_file() {
        tracing::debug!(path = %file.display(), "No config file, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read config file: {}", file.display()))?;
    let settings = parse_settings(&content)
        .with_context(|| format!("Invalid config file: {}", file.display()))?;
    tracing::info!(path = %file.display(), "Loaded settings");
    Ok(settings)
}

/// Parse `maintrack.yaml` content.
pub fn parse_settings(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let config: ConfigFile =
        serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;
    Ok(config.settings)
}

/// Load a catalog/template definition file.
pub fn load_definitions(path: &Path) -> Result<DefinitionFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file: {}", path.display()))?;
    parse_definitions(&content)
        .with_context(|| format!("Failed to parse YAML in: {}", path.display()))
}

pub fn parse_definitions(content: &str) -> Result<DefinitionFile> {
    let definitions: DefinitionFile =
        serde_yaml::from_str(content).context("Failed to parse definition file")?;
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::Priority;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.database, ".maintrack/maintrack.db");
        assert!(settings.resume_on_delay_resolved);
        assert!(!settings.include_optional_items);
    }

    #[test]
    fn test_partial_settings() {
        let settings = parse_settings(
            "settings:\n  include_optional_items: true\n  default_priority: High\n",
        )
        .unwrap();
        assert!(settings.include_optional_items);
        assert_eq!(settings.default_priority, Priority::High);
        assert!(settings.resume_on_delay_resolved);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.database, ".maintrack/maintrack.db");
    }

    #[test]
    fn test_bad_priority_is_rejected() {
        assert!(parse_settings("settings:\n  default_priority: urgent\n").is_err());
    }
}
