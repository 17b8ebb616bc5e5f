//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid PORT value {0:?}")]
    Port(String),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply overrides and
/// validate the result.
///
/// Port precedence: `cli_port`, then `PORT`, then the file.
pub fn load_config(path: Option<&Path>, cli_port: Option<u16>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_port_override(&mut config, std::env::var(PORT_ENV).ok().as_deref())?;
    if let Some(port) = cli_port {
        config.listener.port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply a `PORT` value to the configuration. Empty values are ignored.
pub fn apply_port_override(config: &mut ServiceConfig, port: Option<&str>) -> Result<(), ConfigError> {
    match port.map(str::trim) {
        None | Some("") => Ok(()),
        Some(raw) => {
            config.listener.port = raw.parse().map_err(|_| ConfigError::Port(raw.to_string()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_override() {
        let mut config = ServiceConfig::default();
        apply_port_override(&mut config, Some("8081")).unwrap();
        assert_eq!(config.listener.port, 8081);

        apply_port_override(&mut config, Some("")).unwrap();
        apply_port_override(&mut config, None).unwrap();
        assert_eq!(config.listener.port, 8081);
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = ServiceConfig::default();
        let err = apply_port_override(&mut config, Some("http")).unwrap_err();
        assert!(matches!(err, ConfigError::Port(ref v) if v == "http"));
        assert_eq!(config.listener.port, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("favicon-resolver-{}.toml", std::process::id()));
        fs::write(&path, "[fetch]\ntimeout_secs = 3\n").unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.fetch.timeout_secs, 3);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_cli_port_wins_and_is_validated() {
        let config = load_config(None, Some(4100)).unwrap();
        assert_eq!(config.listener.port, 4100);

        let err = load_config(None, Some(0)).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref errors) if errors.contains(&ValidationError::Zero { field: "listener.port" })),
            "got {err}"
        );
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = parse_config("[fetch]\ntimeout_secs = \"ten\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
