//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSchema {
    /// `[descriptor]` section
    #[serde(default)]
    pub descriptor: DescriptorConfig,

    /// `[env]` section
    #[serde(default)]
    pub env: EnvConfig,

    /// `[signing]` section
    #[serde(default)]
    pub signing: SigningConfig,

    /// `[logging]` section
    #[serde(default)]
    pub logging: LoggingConfig,

    /// `[engine]` section
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Where the build descriptor lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Descriptor path, relative to the working directory
    #[serde(default = "default_descriptor_path")]
    pub path: String,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            path: default_descriptor_path(),
        }
    }
}

fn default_descriptor_path() -> String {
    "build-descriptor.toml".to_string()
}

/// Names of the environment variables that override signing fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Overrides `signing.storeFile`
    #[serde(default = "default_store_file_var")]
    pub store_file: String,

    /// Overrides `signing.storePassword`
    #[serde(default = "default_store_password_var")]
    pub store_password: String,

    /// Overrides `signing.keyAlias`
    #[serde(default = "default_key_alias_var")]
    pub key_alias: String,

    /// Overrides `signing.keyPassword`
    #[serde(default = "default_key_password_var")]
    pub key_password: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            store_file: default_store_file_var(),
            store_password: default_store_password_var(),
            key_alias: default_key_alias_var(),
            key_password: default_key_password_var(),
        }
    }
}

fn default_store_file_var() -> String {
    "STORE_FILE".to_string()
}

fn default_store_password_var() -> String {
    "STORE_PASSWORD".to_string()
}

fn default_key_alias_var() -> String {
    "KEY_ALIAS".to_string()
}

fn default_key_password_var() -> String {
    "KEY_PASSWORD".to_string()
}

/// How to treat passwords written directly into the descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineSecretPolicy {
    /// Accept silently
    Allow,
    /// Accept, but report a warning
    #[default]
    Warn,
    /// Ignore them; only the environment may supply secrets
    Deny,
}

/// Signing policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Treatment of passwords written in the descriptor
    #[serde(default)]
    pub inline_secrets: InlineSecretPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `DROIDPLAN_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// External build engine that consumes the plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// `flutter build`
    #[default]
    Flutter,
    /// The project's Gradle wrapper
    Gradle,
}

/// Artifact the engine should produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Installable APK
    #[default]
    Apk,
    /// Play Store app bundle
    Bundle,
}

/// Engine hand-off configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which engine to invoke
    #[serde(default)]
    pub kind: EngineKind,

    /// What the engine should produce
    #[serde(default)]
    pub artifact: ArtifactKind,

    /// Directory the engine runs in, relative to the working directory
    #[serde(default)]
    pub project_dir: Option<String>,
}
