//! Build descriptor model and parsing
//!
//! A descriptor is read from TOML or JSON text. Keys follow the names used in
//! Gradle's Android DSL (`applicationId`, `minSdk`, `buildTypes`, ...). The raw
//! document is first read into a loosely typed [`RawDescriptor`]; numeric
//! fields are kept as untyped values so that a missing value and a
//! non-numeric value can be reported with distinct error codes.

use crate::dependency::{DependencyDecl, RawDependency, CLASSPATH_CONFIGURATION};
use crate::environment::Environment;
use crate::signing::{RawSigning, SigningProfile};
use droidplan_core::config::{EnvConfig, InlineSecretPolicy};
use droidplan_core::error::{Error, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Repositories used when the descriptor lists none
pub const DEFAULT_REPOSITORIES: [&str; 2] = ["google", "mavenCentral"];

/// Repositories searched for build plugins when `[buildscript]` lists none
pub const DEFAULT_PLUGIN_REPOSITORIES: [&str; 3] = ["google", "mavenCentral", "gradlePluginPortal"];

/// Input format of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.toml`, and anything unrecognized
    Toml,
    /// `.json`
    Json,
}

impl Format {
    /// Pick a format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Java compilation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompileOptions {
    /// Java source level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_compatibility: Option<String>,
    /// Java bytecode level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compatibility: Option<String>,
    /// Core library desugaring
    #[serde(
        default,
        alias = "coreLibraryDesugaringEnabled",
        alias = "isCoreLibraryDesugaringEnabled"
    )]
    pub core_library_desugaring: bool,
}

/// Location of the Flutter module wrapped by the Android shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlutterSource {
    /// Flutter project root, relative to the Android project
    #[serde(default = "default_flutter_source")]
    pub source: String,
    /// Dart entry point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

fn default_flutter_source() -> String {
    "../..".to_string()
}

/// The `[buildscript]` table: where build plugins come from
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawBuildscript {
    /// Plugin coordinates, `group:artifact:version`
    #[serde(default)]
    pub classpath: Vec<String>,
    /// Plugin repositories; defaults to [`DEFAULT_PLUGIN_REPOSITORIES`]
    pub repositories: Option<Vec<String>>,
}

/// Build plugin classpath, passed explicitly rather than shared between projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buildscript {
    /// Plugin coordinates in declaration order
    pub classpath: Vec<DependencyDecl>,
    /// Plugin repositories in search order
    pub repositories: Vec<String>,
}

impl Buildscript {
    fn from_raw(raw: RawBuildscript) -> Self {
        Self {
            classpath: raw
                .classpath
                .iter()
                .map(|text| DependencyDecl::parse(CLASSPATH_CONFIGURATION, text))
                .collect(),
            repositories: raw.repositories.unwrap_or_else(|| {
                DEFAULT_PLUGIN_REPOSITORIES.iter().map(|r| r.to_string()).collect()
            }),
        }
    }
}

/// A build type as written under `buildTypes`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawVariant {
    /// Code shrinking
    #[serde(default, alias = "isMinifyEnabled", alias = "minifyEnabled")]
    pub minify: bool,
    /// Unused resource removal
    #[serde(default, alias = "isShrinkResources")]
    pub shrink_resources: bool,
    /// Explicit release flag; otherwise inferred from the name
    pub release: Option<bool>,
    /// Signing profile name
    pub signing_config: Option<String>,
    /// Optimization rule files
    #[serde(default)]
    pub proguard_files: Vec<String>,
}

/// The descriptor document before normalization
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptor {
    /// Unique application id
    pub application_id: Option<String>,
    /// Code namespace; defaults to the application id
    pub namespace: Option<String>,
    /// Lowest supported platform level (number or numeric string)
    pub min_sdk: Option<Value>,
    /// Platform level the app is tested against
    pub target_sdk: Option<Value>,
    /// Platform level compiled against
    pub compile_sdk: Option<Value>,
    /// Monotonic build number
    pub version_code: Option<Value>,
    /// User-visible version
    pub version_name: Option<String>,
    /// Multi-dex packaging
    #[serde(alias = "multiDex")]
    pub multi_dex_enabled: Option<bool>,
    /// Target architectures
    pub abi_filters: Option<Vec<String>>,
    /// Build plugin identifiers, order significant
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Release signing block
    pub signing: Option<RawSigning>,
    /// Build types by name
    #[serde(default)]
    pub build_types: BTreeMap<String, RawVariant>,
    /// Library dependencies
    #[serde(default)]
    pub dependencies: Vec<RawDependency>,
    /// Java compile options
    #[serde(default)]
    pub compile_options: CompileOptions,
    /// Kotlin JVM target
    pub jvm_target: Option<String>,
    /// Build feature toggles
    #[serde(default)]
    pub build_features: BTreeMap<String, bool>,
    /// Packaging exclusion globs
    #[serde(default)]
    pub packaging_excludes: Vec<String>,
    /// Flutter sources
    pub flutter: Option<FlutterSource>,
    /// Library repositories; defaults to [`DEFAULT_REPOSITORIES`]
    pub repositories: Option<Vec<String>>,
    /// Build plugin classpath
    #[serde(default)]
    pub buildscript: RawBuildscript,
    /// Keys this version does not recognize
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl RawDescriptor {
    /// Parse descriptor text
    pub fn parse(text: &str, format: Format) -> Result<Self> {
        let value: Value = match format {
            Format::Json => serde_json::from_str(text)?,
            Format::Toml => {
                let mut doc: toml::Value = toml::from_str(text)?;
                stringify_non_finite(&mut doc);
                serde_json::to_value(doc)?
            }
        };

        if !value.is_object() {
            return Err(Error::new(
                ErrorCode::ConfigParseError,
                "Descriptor must be a table/object at the top level",
            ));
        }

        let raw: Self = serde_json::from_value(value)?;
        for key in raw.unknown.keys() {
            tracing::debug!(key, "Ignoring unrecognized descriptor key");
        }
        Ok(raw)
    }
}

/// A named build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVariant {
    /// Variant name, e.g. `release`
    pub name: String,
    /// Whether release signing rules apply
    pub release: bool,
    /// Code shrinking / obfuscation
    pub minify: bool,
    /// Unused resource removal
    pub shrink_resources: bool,
    /// Name of the signing profile to use
    pub signing_config: Option<String>,
    /// Optimization rule files, in order
    pub proguard_files: Vec<String>,
}

/// The whole configuration unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    /// Unique application id
    pub application_id: String,
    /// Code namespace
    pub namespace: String,
    /// Lowest supported platform level
    pub min_sdk: u32,
    /// Platform level the app is tested against
    pub target_sdk: u32,
    /// Platform level compiled against
    pub compile_sdk: u32,
    /// Monotonic build number
    pub version_code: u32,
    /// User-visible version
    pub version_name: String,
    /// Multi-dex packaging
    pub multi_dex: bool,
    /// Target architectures, deduplicated and sorted
    pub abi_filters: BTreeSet<String>,
    /// Build plugin identifiers, in declaration order
    pub plugins: Vec<String>,
    /// Release signing profile, with environment overrides merged
    pub signing: Option<SigningProfile>,
    /// Build variants, sorted by name
    pub variants: Vec<BuildVariant>,
    /// Library dependencies, as declared
    pub dependencies: Vec<DependencyDecl>,
    /// Java compile options
    pub compile_options: CompileOptions,
    /// Kotlin JVM target
    pub jvm_target: Option<String>,
    /// Build feature toggles
    pub build_features: BTreeMap<String, bool>,
    /// Packaging exclusion globs
    pub packaging_excludes: Vec<String>,
    /// Flutter sources
    pub flutter: Option<FlutterSource>,
    /// Library repositories in search order
    pub repositories: Vec<String>,
    /// Build plugin classpath
    pub buildscript: Buildscript,
}

/// Settings that shape how a raw descriptor is normalized
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Environment variable names for signing overrides
    pub env_names: EnvConfig,
    /// Treatment of passwords written in the descriptor
    pub inline_secrets: InlineSecretPolicy,
    /// Directory that anchors relative paths in the descriptor
    pub base_dir: Option<std::path::PathBuf>,
}

impl BuildDescriptor {
    /// Normalize a raw descriptor, merging environment overrides
    pub fn from_raw(raw: RawDescriptor, env: &Environment, options: &LoadOptions) -> Result<Self> {
        let application_id = required_string(raw.application_id, "applicationId")?;
        let min_sdk = required_number(raw.min_sdk.as_ref(), "minSdk")?;
        let target_sdk = required_number(raw.target_sdk.as_ref(), "targetSdk")?;
        let compile_sdk = required_number(raw.compile_sdk.as_ref(), "compileSdk")?;
        let version_code = required_number(raw.version_code.as_ref(), "versionCode")?;
        let version_name = required_string(raw.version_name, "versionName")?;

        let abi_filters: BTreeSet<String> = raw
            .abi_filters
            .ok_or_else(|| Error::missing_field("abiFilters"))?
            .into_iter()
            .map(|abi| abi.trim().to_string())
            .filter(|abi| !abi.is_empty())
            .collect();
        if abi_filters.is_empty() {
            return Err(Error::invalid_value(
                "abiFilters",
                "at least one native architecture is required",
            ));
        }

        let signing = SigningProfile::merge(
            raw.signing.as_ref(),
            env,
            &options.env_names,
            options.inline_secrets,
            options.base_dir.as_deref(),
        );
        let default_profile = signing
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| crate::signing::DEFAULT_PROFILE.to_string());

        let variants = raw
            .build_types
            .into_iter()
            .map(|(name, v)| {
                let release = v.release.unwrap_or(name == "release");
                let signing_config = match v.signing_config {
                    Some(reference) => Some(reference),
                    None if release => Some(default_profile.clone()),
                    None => None,
                };
                BuildVariant {
                    name,
                    release,
                    minify: v.minify,
                    shrink_resources: v.shrink_resources,
                    signing_config,
                    proguard_files: v.proguard_files,
                }
            })
            .collect();

        Ok(Self {
            namespace: raw.namespace.unwrap_or_else(|| application_id.clone()),
            application_id,
            min_sdk,
            target_sdk,
            compile_sdk,
            version_code,
            version_name,
            multi_dex: raw.multi_dex_enabled.unwrap_or(false),
            abi_filters,
            plugins: raw.plugins,
            signing,
            variants,
            dependencies: raw.dependencies.iter().map(DependencyDecl::from_raw).collect(),
            compile_options: raw.compile_options,
            jvm_target: raw.jvm_target,
            build_features: raw.build_features,
            packaging_excludes: raw.packaging_excludes,
            flutter: raw.flutter,
            repositories: raw
                .repositories
                .unwrap_or_else(|| DEFAULT_REPOSITORIES.iter().map(|r| r.to_string()).collect()),
            buildscript: Buildscript::from_raw(raw.buildscript),
        })
    }

    /// Look up a variant by name
    pub fn variant(&self, name: &str) -> Option<&BuildVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// The signing profile with the given name
    pub fn profile(&self, name: &str) -> Option<&SigningProfile> {
        self.signing.as_ref().filter(|p| p.name == name)
    }
}

/// JSON has no `nan` or `inf`; keep them as text so they stay visible
fn stringify_non_finite(value: &mut toml::Value) {
    if let toml::Value::Float(f) = *value {
        if !f.is_finite() {
            *value = toml::Value::String(f.to_string());
        }
        return;
    }
    match value {
        toml::Value::Array(items) => items.iter_mut().for_each(stringify_non_finite),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| stringify_non_finite(v)),
        _ => {}
    }
}

fn required_string(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(Error::missing_field(field)),
    }
}

/// Accept a non-negative integer or a string of decimal digits
fn required_number(value: Option<&Value>, field: &str) -> Result<u32> {
    let value = match value {
        None | Some(Value::Null) => return Err(Error::missing_field(field)),
        Some(v) => v,
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<u32>().ok()
            } else {
                None
            }
        }
        _ => None,
    };

    parsed.ok_or_else(|| Error::invalid_numeric(field, value))
}
