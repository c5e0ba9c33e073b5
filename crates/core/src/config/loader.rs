//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, a standard location, or defaults
    ///
    /// An explicit path that does not exist is an error; a missing file in the
    /// standard locations is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        Ok(Self {
            schema: toml::from_str(content)?,
            path: None,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let candidates = [".droidplan.toml", "droidplan.toml", ".config/droidplan.toml"];

    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {}", path.display()))?;

    let schema = toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Loaded tool configuration");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineKind, InlineSecretPolicy};
    use crate::error::ErrorCode;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.env.store_password, "STORE_PASSWORD");
        assert_eq!(config.schema.signing.inline_secrets, InlineSecretPolicy::Warn);
        assert_eq!(config.schema.descriptor.path, "build-descriptor.toml");
    }

    #[test]
    fn test_config_from_str_partial() {
        let config: Config = r#"
            [signing]
            inline_secrets = "deny"

            [env]
            key_alias = "UPLOAD_KEY_ALIAS"

            [engine]
            kind = "gradle"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.schema.signing.inline_secrets, InlineSecretPolicy::Deny);
        assert_eq!(config.schema.env.key_alias, "UPLOAD_KEY_ALIAS");
        assert_eq!(config.schema.env.key_password, "KEY_PASSWORD");
        assert_eq!(config.schema.engine.kind, EngineKind::Gradle);
    }

    #[test]
    fn test_config_rejects_unknown_section() {
        let err = "[mystery]\nvalue = 1\n".parse::<Config>().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_config_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_config_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("droidplan.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\njson = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
        assert_eq!(config.schema.logging.level, "debug");
        assert!(config.schema.logging.json);
    }
}
