//! The normalized build plan handed to the external build engine
//!
//! A plan is plain data with a stable field order, so rendering the same plan
//! twice yields identical bytes. Signing secrets are never part of a plan;
//! only their provenance is recorded.

use crate::dependency::Dependency;
use crate::descriptor::{CompileOptions, FlutterSource};
use crate::signing::Origin;
use droidplan_core::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Version of the plan document layout
pub const PLAN_SCHEMA_VERSION: u32 = 1;

/// Application identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPlan {
    /// Application id
    pub id: String,
    /// Code namespace
    pub namespace: String,
    /// Monotonic build number
    pub version_code: u32,
    /// User-visible version
    pub version_name: String,
    /// Multi-dex packaging
    pub multi_dex: bool,
}

/// SDK levels, already checked for ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkPlan {
    /// Lowest supported level
    pub min: u32,
    /// Tested level
    pub target: u32,
    /// Compile level
    pub compile: u32,
}

/// Signing inputs for one variant, without secret values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPlan {
    /// Signing profile name
    pub profile: String,
    /// Keystore path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<String>,
    /// Where the keystore path came from
    pub store_file_origin: Origin,
    /// Key alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    /// Where the key alias came from
    pub key_alias_origin: Origin,
    /// Where the keystore password came from
    pub store_password_origin: Origin,
    /// Where the key password came from
    pub key_password_origin: Origin,
}

/// One build variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPlan {
    /// Variant name
    pub name: String,
    /// Release signing rules apply
    pub release: bool,
    /// Code shrinking
    pub minify: bool,
    /// Unused resource removal
    pub shrink_resources: bool,
    /// Optimization rule files
    pub proguard_files: Vec<String>,
    /// Signing inputs, when the variant is signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningPlan>,
}

/// One dependency after de-duplication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPlan {
    /// Gradle configuration
    pub configuration: String,
    /// `group:artifact[:version]`
    pub coordinate: String,
    /// Declared as a platform (BOM)
    pub platform: bool,
}

impl From<&Dependency> for DependencyPlan {
    fn from(dep: &Dependency) -> Self {
        Self {
            configuration: dep.configuration.clone(),
            coordinate: dep.coordinate(),
            platform: dep.platform,
        }
    }
}

/// Build plugin classpath and the repositories it resolves from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildscriptPlan {
    /// Plugin repositories in search order
    pub repositories: Vec<String>,
    /// Plugin coordinates after de-duplication
    pub classpath: Vec<String>,
}

/// The normalized, validated output of the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    /// [`PLAN_SCHEMA_VERSION`] at the time of rendering
    pub schema_version: u32,
    /// Application identity
    pub application: ApplicationPlan,
    /// SDK levels
    pub sdk: SdkPlan,
    /// Target architectures, sorted
    pub abi_filters: Vec<String>,
    /// Build plugins in declaration order
    pub plugins: Vec<String>,
    /// Library repositories
    pub repositories: Vec<String>,
    /// Build plugin classpath
    pub buildscript: BuildscriptPlan,
    /// Java compile options
    pub compile_options: CompileOptions,
    /// Kotlin JVM target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<String>,
    /// Build feature toggles
    pub build_features: BTreeMap<String, bool>,
    /// Packaging exclusion globs
    pub packaging_excludes: Vec<String>,
    /// Flutter sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutter: Option<FlutterSource>,
    /// Variants sorted by name
    pub variants: Vec<VariantPlan>,
    /// Library dependencies after de-duplication
    pub dependencies: Vec<DependencyPlan>,
}

impl BuildPlan {
    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// TOML rendering
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// SHA-256 of the JSON rendering, hex encoded
    pub fn digest(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(hex::encode(Sha256::digest(json.as_bytes())))
    }

    /// Look up a variant by name
    pub fn variant(&self, name: &str) -> Option<&VariantPlan> {
        self.variants.iter().find(|v| v.name == name)
    }
}
