//! Signing profiles and secret handling
//!
//! A signing profile is assembled from two layers: the descriptor's `signing`
//! block and environment overrides. A non-empty environment value always wins.
//! Passwords are wrapped in [`Secret`] so they never leak through `Debug` or
//! serialized output.

use crate::environment::Environment;
use droidplan_core::config::{EnvConfig, InlineSecretPolicy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Profile name used when the descriptor does not name one
pub const DEFAULT_PROFILE: &str = "release";

/// Placeholder emitted wherever a secret would be rendered
pub const REDACTED: &str = "<redacted>";

/// A credential whose value is never displayed
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value, e.g. to pass it to the build engine
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Where a signing value came from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Origin {
    /// An environment variable override
    Environment {
        /// Variable name
        variable: String,
    },
    /// The descriptor's `signing` block
    Descriptor,
    /// Nowhere
    Absent,
}

/// A signing value together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    /// Resolved value, if any
    pub value: Option<T>,
    /// Where the value came from
    pub origin: Origin,
}

impl<T> Sourced<T> {
    fn absent() -> Self {
        Self {
            value: None,
            origin: Origin::Absent,
        }
    }

    /// Whether a value is present
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the value was written into the descriptor
    pub fn is_inline(&self) -> bool {
        self.origin == Origin::Descriptor
    }
}

/// Pick the environment value when present and non-empty, else the descriptor's
fn layer<T>(
    env: &Environment,
    variable: &str,
    descriptor: Option<&str>,
    wrap: impl Fn(&str) -> T,
) -> Sourced<T> {
    if let Some(value) = env.non_empty(variable) {
        tracing::debug!(variable, "Signing value taken from environment");
        return Sourced {
            value: Some(wrap(value)),
            origin: Origin::Environment {
                variable: variable.to_string(),
            },
        };
    }

    match descriptor.filter(|v| !v.trim().is_empty()) {
        Some(value) => Sourced {
            value: Some(wrap(value)),
            origin: Origin::Descriptor,
        },
        None => Sourced::absent(),
    }
}

/// The `signing` block exactly as written in the descriptor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawSigning {
    /// Profile name; defaults to `release`
    pub name: Option<String>,
    /// Keystore path, relative to the descriptor
    pub store_file: Option<String>,
    /// Keystore password
    pub store_password: Option<String>,
    /// Key alias inside the keystore
    pub key_alias: Option<String>,
    /// Key password
    pub key_password: Option<String>,
}

impl RawSigning {
    fn is_empty(&self) -> bool {
        self.store_file.is_none()
            && self.store_password.is_none()
            && self.key_alias.is_none()
            && self.key_password.is_none()
    }
}

/// Credentials needed to sign a release artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningProfile {
    /// Profile name referenced by build variants
    pub name: String,
    /// Key store file
    pub store_file: Sourced<PathBuf>,
    /// Key store password
    pub store_password: Sourced<Secret>,
    /// Key alias inside the store
    pub key_alias: Sourced<String>,
    /// Key password
    pub key_password: Sourced<Secret>,
    /// Policy in force when the profile was merged
    pub inline_secrets: InlineSecretPolicy,
}

impl SigningProfile {
    /// Merge the descriptor block with environment overrides
    ///
    /// Returns `None` when neither layer supplies anything. `base_dir` anchors
    /// a relative `storeFile` written in the descriptor.
    pub fn merge(
        raw: Option<&RawSigning>,
        env: &Environment,
        names: &EnvConfig,
        policy: InlineSecretPolicy,
        base_dir: Option<&Path>,
    ) -> Option<Self> {
        let empty = RawSigning::default();
        let raw = raw.unwrap_or(&empty);

        let (store_password, key_password) = match policy {
            InlineSecretPolicy::Deny => {
                if raw.store_password.is_some() || raw.key_password.is_some() {
                    tracing::warn!("Ignoring passwords written in the descriptor; inline secrets are denied");
                }
                (None, None)
            }
            InlineSecretPolicy::Allow | InlineSecretPolicy::Warn => {
                (raw.store_password.as_deref(), raw.key_password.as_deref())
            }
        };

        let mut store_file = layer(env, &names.store_file, raw.store_file.as_deref(), expand_path);
        if store_file.is_inline() {
            if let (Some(path), Some(base)) = (store_file.value.as_mut(), base_dir) {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }

        let profile = Self {
            name: raw.name.clone().unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            store_file,
            store_password: layer(env, &names.store_password, store_password, |v: &str| Secret::new(v)),
            key_alias: layer(env, &names.key_alias, raw.key_alias.as_deref(), str::to_string),
            key_password: layer(env, &names.key_password, key_password, |v: &str| Secret::new(v)),
            inline_secrets: policy,
        };

        if raw.is_empty() && !profile.any_set() {
            return None;
        }
        Some(profile)
    }

    fn any_set(&self) -> bool {
        self.store_file.is_set()
            || self.store_password.is_set()
            || self.key_alias.is_set()
            || self.key_password.is_set()
    }

    /// Descriptor field names that have no value
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.store_file.is_set() {
            missing.push("storeFile");
        }
        if !self.store_password.is_set() {
            missing.push("storePassword");
        }
        if !self.key_alias.is_set() {
            missing.push("keyAlias");
        }
        if !self.key_password.is_set() {
            missing.push("keyPassword");
        }
        missing
    }

    /// Descriptor field names whose secret value was written inline
    pub fn inline_secret_fields(&self) -> Vec<&'static str> {
        let mut inline = Vec::new();
        if self.store_password.is_inline() {
            inline.push("storePassword");
        }
        if self.key_password.is_inline() {
            inline.push("keyPassword");
        }
        inline
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_full() -> RawSigning {
        RawSigning {
            name: None,
            store_file: Some("keystore.jks".into()),
            store_password: Some("fallback".into()),
            key_alias: Some("upload".into()),
            key_password: Some("fallback".into()),
        }
    }

    #[test]
    fn test_environment_wins_over_descriptor() {
        let env = Environment::empty().with("STORE_PASSWORD", "secret");
        let profile = SigningProfile::merge(
            Some(&raw_full()),
            &env,
            &EnvConfig::default(),
            InlineSecretPolicy::Warn,
            None,
        )
        .unwrap();

        assert_eq!(profile.store_password.value.as_ref().unwrap().expose(), "secret");
        assert_eq!(
            profile.store_password.origin,
            Origin::Environment {
                variable: "STORE_PASSWORD".into()
            }
        );
        assert_eq!(profile.key_password.origin, Origin::Descriptor);
    }

    #[test]
    fn test_empty_environment_value_falls_back() {
        let env = Environment::empty().with("KEY_ALIAS", "");
        let profile = SigningProfile::merge(
            Some(&raw_full()),
            &env,
            &EnvConfig::default(),
            InlineSecretPolicy::Allow,
            None,
        )
        .unwrap();

        assert_eq!(profile.key_alias.value.as_deref(), Some("upload"));
        assert_eq!(profile.key_alias.origin, Origin::Descriptor);
    }

    #[test]
    fn test_deny_policy_discards_inline_passwords() {
        let profile = SigningProfile::merge(
            Some(&raw_full()),
            &Environment::empty(),
            &EnvConfig::default(),
            InlineSecretPolicy::Deny,
            None,
        )
        .unwrap();

        assert_eq!(profile.missing_fields(), vec!["storePassword", "keyPassword"]);
        assert!(profile.inline_secret_fields().is_empty());
    }

    #[test]
    fn test_custom_variable_names() {
        let names = EnvConfig {
            key_alias: "UPLOAD_ALIAS".into(),
            ..EnvConfig::default()
        };
        let env = Environment::empty().with("UPLOAD_ALIAS", "ci-key").with("KEY_ALIAS", "ignored");
        let profile =
            SigningProfile::merge(None, &env, &names, InlineSecretPolicy::Warn, None).unwrap();

        assert_eq!(profile.key_alias.value.as_deref(), Some("ci-key"));
        assert_eq!(profile.name, DEFAULT_PROFILE);
    }

    #[test]
    fn test_nothing_supplied_yields_none() {
        let profile = SigningProfile::merge(
            None,
            &Environment::empty(),
            &EnvConfig::default(),
            InlineSecretPolicy::Warn,
            None,
        );
        assert!(profile.is_none());
    }

    #[test]
    fn test_relative_store_file_anchored_to_base_dir() {
        let profile = SigningProfile::merge(
            Some(&raw_full()),
            &Environment::empty(),
            &EnvConfig::default(),
            InlineSecretPolicy::Allow,
            Some(Path::new("/work/android/app")),
        )
        .unwrap();

        assert_eq!(
            profile.store_file.value.as_deref(),
            Some(Path::new("/work/android/app/keystore.jks"))
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"<redacted>\"");
    }
}
