//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ConfigIssue>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(issues) => {
                write!(f, "Validation failed: ")?;
                for (i, issue) in issues.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", issue)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::time::Duration;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), ProxyConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [control]
            bind_address = "127.0.0.1:9000"
            api_key = "secret"

            [breaker]
            failure_threshold = 0.25
            cooldown_ms = 1500

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.control.api_key.as_deref(), Some("secret"));
        assert_eq!(config.breaker.min_samples, 10);
        assert_eq!(config.observability.log_format, LogFormat::Json);

        let options = config.registry_options();
        assert_eq!(options.timeline.failure_threshold, 0.25);
        assert_eq!(options.timeline.cooldown, Duration::from_millis(1500));
        assert!(options.host_fallback);
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("[breaker\n"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            parse_config("[breaker]\nmin_samples = 0\n"),
            Err(ConfigError::Validation(issues)) if issues.len() == 1
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("breaker-proxy-{}.toml", std::process::id()));
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:18080\"\n").unwrap();
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:18080");

        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
