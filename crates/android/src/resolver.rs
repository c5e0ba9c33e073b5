//! Configuration resolver: load, validate, plan
//!
//! ```text
//! descriptor text ──load──▶ BuildDescriptor ──validate──▶ violations
//!        ▲                        │
//!   Environment                   └──resolve_plan──▶ BuildPlan
//! ```
//!
//! [`Resolver::resolve`] runs all three steps and yields either a complete
//! plan or the full list of violations, never a partial plan.

use crate::dependency::{dedup_last_wins, Dependency, DependencyDecl, DESUGARING_CONFIGURATION};
use crate::descriptor::{BuildDescriptor, Format, LoadOptions, RawDescriptor};
use crate::environment::Environment;
use crate::plan::{
    ApplicationPlan, BuildPlan, BuildscriptPlan, DependencyPlan, SdkPlan, SigningPlan,
    VariantPlan, PLAN_SCHEMA_VERSION,
};
use crate::signing::SigningProfile;
use droidplan_core::config::{ConfigSchema, InlineSecretPolicy};
use droidplan_core::error::{Error, Result, ResultExt};
use droidplan_core::validation::{ValidationResult, Validator, Violation, ViolationKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Architectures the Android toolchain knows how to package
pub const KNOWN_ABIS: [&str; 4] = ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"];

static MAVEN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid regex"));

/// Where descriptor text comes from
#[derive(Debug, Clone)]
pub enum DescriptorSource {
    /// A file; the extension selects the format
    File(PathBuf),
    /// In-memory text
    Text {
        /// Descriptor contents
        content: String,
        /// Format of `content`
        format: Format,
    },
}

impl DescriptorSource {
    /// In-memory TOML
    pub fn toml(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            format: Format::Toml,
        }
    }

    fn read(&self) -> Result<(String, Format, Option<PathBuf>)> {
        match self {
            Self::File(path) => {
                if !path.exists() {
                    return Err(Error::file_not_found(path)
                        .with_suggestion("Pass --descriptor or set [descriptor] path in .droidplan.toml"));
                }
                let content = std::fs::read_to_string(path)
                    .map_err(Error::from)
                    .context(format!("Failed to read descriptor {}", path.display()))?;
                let base = path.parent().map(Path::to_path_buf);
                Ok((content, Format::from_path(path), base))
            }
            Self::Text { content, format } => Ok((content.clone(), *format, None)),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Text { .. } => "<inline descriptor>".to_string(),
        }
    }
}

/// Why [`Resolver::resolve`] produced no plan
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The descriptor could not be read or normalized
    #[error(transparent)]
    Load(#[from] Error),
    /// The descriptor loaded but failed validation
    #[error("descriptor rejected with {} violation(s)", .0.errors().len())]
    Rejected(ValidationResult),
}

/// Resolver settings, passed explicitly instead of read from process state
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: LoadOptions,
}

impl Resolver {
    /// Resolver with default variable names and policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver configured from the tool configuration
    pub fn from_config(schema: &ConfigSchema) -> Self {
        Self {
            options: LoadOptions {
                env_names: schema.env.clone(),
                inline_secrets: schema.signing.inline_secrets,
                base_dir: None,
            },
        }
    }

    /// Override the inline secret policy
    pub fn with_inline_secrets(mut self, policy: InlineSecretPolicy) -> Self {
        self.options.inline_secrets = policy;
        self
    }

    /// Read a descriptor and merge environment overrides
    pub fn load(&self, source: &DescriptorSource, env: &Environment) -> Result<BuildDescriptor> {
        let (content, format, file_base) = source.read()?;

        let mut options = self.options.clone();
        if file_base.is_some() {
            options.base_dir = file_base;
        }

        let raw = RawDescriptor::parse(&content, format)
            .context(format!("While loading {}", source.label()))?;
        let descriptor = BuildDescriptor::from_raw(raw, env, &options)
            .context(format!("While loading {}", source.label()))?;

        tracing::debug!(
            application_id = %descriptor.application_id,
            variants = descriptor.variants.len(),
            dependencies = descriptor.dependencies.len(),
            "Descriptor loaded"
        );
        Ok(descriptor)
    }

    /// Load, validate and plan in one step
    pub fn resolve(
        &self,
        source: &DescriptorSource,
        env: &Environment,
    ) -> std::result::Result<(BuildPlan, ValidationResult), ResolveError> {
        let descriptor = self.load(source, env)?;
        let report = validate(&descriptor);
        if !report.is_valid() {
            tracing::debug!(errors = report.errors().len(), "Descriptor rejected");
            return Err(ResolveError::Rejected(report));
        }
        Ok((resolve_plan(&descriptor), report))
    }
}

/// Check a descriptor, collecting every violation
pub fn validate(descriptor: &BuildDescriptor) -> ValidationResult {
    Validator::new()
        .ordered("minSdk", descriptor.min_sdk, "targetSdk", descriptor.target_sdk)
        .ordered("targetSdk", descriptor.target_sdk, "compileSdk", descriptor.compile_sdk)
        .merge(validate_signing(descriptor))
        .merge(validate_coordinates("dependencies", &descriptor.dependencies))
        .merge(validate_coordinates(
            "buildscript.classpath",
            &descriptor.buildscript.classpath,
        ))
        .merge(validate_advisories(descriptor))
        .validate()
}

fn validate_signing(descriptor: &BuildDescriptor) -> ValidationResult {
    let mut validator = Validator::new();

    for variant in &descriptor.variants {
        let reference = variant.signing_config.as_deref();
        let profile = reference.and_then(|name| descriptor.profile(name));

        if variant.release {
            match profile {
                Some(profile) => {
                    for field in profile.missing_fields() {
                        validator = validator.error(
                            Violation::new(
                                ViolationKind::MissingSigningCredential,
                                format!("signing.{}", field),
                                format!(
                                    "Release variant `{}` needs `{}` from the environment or descriptor",
                                    variant.name, field
                                ),
                            )
                            .actual("absent"),
                        );
                    }
                }
                None => {
                    let name = reference.unwrap_or("<none>");
                    for field in ["storeFile", "storePassword", "keyAlias", "keyPassword"] {
                        validator = validator.error(Violation::new(
                            ViolationKind::MissingSigningCredential,
                            format!("signing.{}", field),
                            format!(
                                "Release variant `{}` references signing profile `{}`, which is not defined",
                                variant.name, name
                            ),
                        ));
                    }
                }
            }
        } else if let (Some(name), None) = (reference, profile) {
            validator = validator.error(
                Violation::new(
                    ViolationKind::MissingField,
                    format!("buildTypes.{}.signingConfig", variant.name),
                    format!("Signing profile `{}` is not defined", name),
                )
                .actual(name),
            );
        }
    }

    if let Some(profile) = &descriptor.signing {
        if profile.inline_secrets == InlineSecretPolicy::Warn {
            for field in profile.inline_secret_fields() {
                let path = format!("signing.{}", field);
                tracing::warn!(field = %path, "Signing secret is written in the descriptor");
                validator = validator.warn_if(
                    ViolationKind::InlineSecret,
                    &path,
                    true,
                    "Secret is written in the descriptor; supply it through the environment instead",
                );
            }
        }
    }

    validator.validate()
}

/// The parsed entries of a coordinate list as they will appear in the plan
fn planned(decls: &[DependencyDecl]) -> Vec<Dependency> {
    let parsed: Vec<_> = decls
        .iter()
        .filter_map(DependencyDecl::parsed)
        .cloned()
        .collect();
    dedup_last_wins(&parsed)
}

fn validate_coordinates(list: &str, decls: &[DependencyDecl]) -> ValidationResult {
    // Version-less entries are only safe if a platform survives into the plan
    let has_platform = planned(decls).iter().any(|d| d.platform);

    let mut validator = Validator::new();
    for (index, decl) in decls.iter().enumerate() {
        let path = format!("{}[{}]", list, index);
        let dep = match decl {
            DependencyDecl::Parsed(dep) => dep,
            DependencyDecl::Unparseable { text, reason, .. } => {
                validator = validator.error(
                    Violation::new(ViolationKind::MalformedDependencyCoordinate, &path, reason.clone())
                        .expected("group:artifact:version")
                        .actual(text.clone()),
                );
                continue;
            }
        };

        for (segment, value) in [("group", &dep.group), ("artifact", &dep.artifact)] {
            let field = format!("{}.{}", path, segment);
            if value.is_empty() {
                validator = validator.error(
                    Violation::new(
                        ViolationKind::MalformedDependencyCoordinate,
                        &field,
                        format!("Empty {} in `{}`", segment, dep.coordinate()),
                    )
                    .actual(dep.coordinate()),
                );
            } else {
                validator = validator.pattern(
                    ViolationKind::MalformedDependencyCoordinate,
                    &field,
                    value,
                    &MAVEN_ID,
                    "letters, digits, '.', '_' or '-'",
                );
            }
        }

        let version_field = format!("{}.version", path);
        match dep.version.as_deref() {
            Some(version) => {
                validator = validator.required(
                    ViolationKind::MalformedDependencyCoordinate,
                    &version_field,
                    Some(version),
                );
            }
            None if dep.platform => {
                validator = validator.error(Violation::new(
                    ViolationKind::MalformedDependencyCoordinate,
                    &version_field,
                    format!("Platform `{}` must pin a version", dep.coordinate()),
                ));
            }
            None if !has_platform => {
                validator = validator.error(Violation::new(
                    ViolationKind::MalformedDependencyCoordinate,
                    &version_field,
                    format!(
                        "`{}` has no version and no platform declares one",
                        dep.coordinate()
                    ),
                ));
            }
            None => {}
        }
    }
    validator.validate()
}

fn validate_advisories(descriptor: &BuildDescriptor) -> ValidationResult {
    let mut validator = Validator::new();

    for abi in &descriptor.abi_filters {
        validator = validator.warn_if(
            ViolationKind::UnknownAbi,
            "abiFilters",
            !KNOWN_ABIS.contains(&abi.as_str()),
            &format!("Unknown architecture `{}` is passed through unchanged", abi),
        );
    }

    let has_desugaring_lib = planned(&descriptor.dependencies)
        .iter()
        .any(|d| d.configuration == DESUGARING_CONFIGURATION);
    validator
        .warn_if(
            ViolationKind::DesugaringWithoutLibrary,
            "compileOptions.coreLibraryDesugaring",
            descriptor.compile_options.core_library_desugaring && !has_desugaring_lib,
            "Desugaring is enabled but no coreLibraryDesugaring dependency is declared",
        )
        .validate()
}

/// Normalize a descriptor into a plan
///
/// Pure: the same descriptor always produces the same plan. Entries that
/// [`validate`] would reject (unparseable dependencies) are left out.
pub fn resolve_plan(descriptor: &BuildDescriptor) -> BuildPlan {
    let mut variants: Vec<VariantPlan> = descriptor
        .variants
        .iter()
        .map(|variant| VariantPlan {
            name: variant.name.clone(),
            release: variant.release,
            minify: variant.minify,
            shrink_resources: variant.shrink_resources,
            proguard_files: variant.proguard_files.clone(),
            signing: variant
                .signing_config
                .as_deref()
                .and_then(|name| descriptor.profile(name))
                .map(signing_plan),
        })
        .collect();
    variants.sort_by(|a, b| a.name.cmp(&b.name));

    let plan = BuildPlan {
        schema_version: PLAN_SCHEMA_VERSION,
        application: ApplicationPlan {
            id: descriptor.application_id.clone(),
            namespace: descriptor.namespace.clone(),
            version_code: descriptor.version_code,
            version_name: descriptor.version_name.clone(),
            multi_dex: descriptor.multi_dex,
        },
        sdk: SdkPlan {
            min: descriptor.min_sdk,
            target: descriptor.target_sdk,
            compile: descriptor.compile_sdk,
        },
        abi_filters: descriptor.abi_filters.iter().cloned().collect(),
        plugins: descriptor.plugins.clone(),
        repositories: descriptor.repositories.clone(),
        buildscript: BuildscriptPlan {
            repositories: descriptor.buildscript.repositories.clone(),
            classpath: planned(&descriptor.buildscript.classpath)
                .iter()
                .map(Dependency::coordinate)
                .collect(),
        },
        compile_options: descriptor.compile_options.clone(),
        jvm_target: descriptor.jvm_target.clone(),
        build_features: descriptor.build_features.clone(),
        packaging_excludes: descriptor.packaging_excludes.clone(),
        flutter: descriptor.flutter.clone(),
        variants,
        dependencies: planned(&descriptor.dependencies)
            .iter()
            .map(DependencyPlan::from)
            .collect(),
    };

    tracing::info!(
        application_id = %plan.application.id,
        variants = plan.variants.len(),
        dependencies = plan.dependencies.len(),
        "Build plan resolved"
    );
    plan
}

fn signing_plan(profile: &SigningProfile) -> SigningPlan {
    SigningPlan {
        profile: profile.name.clone(),
        store_file: profile
            .store_file
            .value
            .as_ref()
            .map(|p| p.display().to_string()),
        store_file_origin: profile.store_file.origin.clone(),
        key_alias: profile.key_alias.value.clone(),
        key_alias_origin: profile.key_alias.origin.clone(),
        store_password_origin: profile.store_password.origin.clone(),
        key_password_origin: profile.key_password.origin.clone(),
    }
}
