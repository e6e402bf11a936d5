//! TOML configuration file loading.
//!
//! The file is optional.  When present, its values replace the defaults in
//! [`AgentConfig`]; command-line arguments are applied afterwards in
//! `main.rs`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::AgentConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed or contained unknown keys.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses configuration from TOML text.  Missing keys take their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid TOML, unknown keys, or values of
/// the wrong type.
pub fn parse_config(text: &str) -> Result<AgentConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::dispatch::UnknownCommandPolicy;

    #[test]
    fn test_empty_file_yields_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_full_file_overrides_every_field() {
        // Arrange
        let text = r#"
            bind_addr = "127.0.0.1:9000"
            max_message_size = 4096
            unknown_commands = "reject"

            [tools]
            xdotool = "/opt/bin/xdotool"
            scrot = "/opt/bin/scrot"
            screenshot_path = "/tmp/shot.png"
        "#;

        // Act
        let cfg = parse_config(text).unwrap();

        // Assert
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.max_message_size, 4096);
        assert_eq!(cfg.unknown_commands, UnknownCommandPolicy::Reject);
        assert_eq!(cfg.tools.xdotool, PathBuf::from("/opt/bin/xdotool"));
        assert_eq!(cfg.tools.scrot, PathBuf::from("/opt/bin/scrot"));
        assert_eq!(cfg.tools.screenshot_path, PathBuf::from("/tmp/shot.png"));
    }

    #[test]
    fn test_partial_tools_table_keeps_other_defaults() {
        let cfg = parse_config("[tools]\nscreenshot_path = \"out.png\"\n").unwrap();
        assert_eq!(cfg.tools.screenshot_path, PathBuf::from("out.png"));
        assert_eq!(cfg.tools.xdotool, PathBuf::from("xdotool"));
        assert_eq!(cfg.bind_addr, AgentConfig::default().bind_addr);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_config("bind_address = \"0.0.0.0:1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let err = parse_config("unknown_commands = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_bind_addr_is_rejected() {
        assert!(parse_config("bind_addr = \"not an address\"\n").is_err());
    }

    /// A path under the temp dir that no other test run will collide with.
    fn unique_temp_path(prefix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{prefix}-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_missing_file_returns_io_error() {
        let path = unique_temp_path("agent-ws-missing");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("agent-ws-missing-"));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let path = unique_temp_path("agent-ws");
        std::fs::write(&path, "max_message_size = 2048\n").unwrap();

        // Act
        let result = load_config(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(result.unwrap().max_message_size, 2048);
    }
}
