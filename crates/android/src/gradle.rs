//! Hand-off to the external build engine
//!
//! Turns a resolved plan into a Flutter or Gradle command line. Signing
//! secrets travel to the child process as environment variables only, so the
//! command line itself is safe to print.

use crate::plan::{BuildPlan, VariantPlan};
use crate::signing::SigningProfile;
use droidplan_core::config::{ArtifactKind, EngineConfig, EngineKind, EnvConfig};
use droidplan_core::error::{Error, ErrorCode, Result};
use droidplan_core::process::run_command_streaming_with_env;
use std::path::Path;

/// Flutter build modes that map onto Android build types
const FLUTTER_MODES: [&str; 3] = ["debug", "profile", "release"];

/// Map an Android ABI onto Flutter's `--target-platform` name
pub fn flutter_platform(abi: &str) -> Option<&'static str> {
    match abi {
        "armeabi-v7a" => Some("android-arm"),
        "arm64-v8a" => Some("android-arm64"),
        "x86_64" => Some("android-x64"),
        "x86" => Some("android-x86"),
        _ => None,
    }
}

/// Gradle wrapper for the current platform
pub fn gradle_wrapper() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "./gradlew"
    }
}

/// A ready-to-run engine command
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    env: Vec<(String, String)>,
    engine: EngineKind,
}

impl Invocation {
    /// Build the engine command for one variant of a plan
    ///
    /// `signing` supplies the secret values that the plan only references.
    pub fn for_variant(
        plan: &BuildPlan,
        variant: &str,
        engine: &EngineConfig,
        env_names: &EnvConfig,
        signing: Option<&SigningProfile>,
    ) -> Result<Self> {
        let variant_plan = plan.variant(variant).ok_or_else(|| {
            let known: Vec<_> = plan.variants.iter().map(|v| v.name.as_str()).collect();
            Error::invalid_input(format!("Unknown build variant: {}", variant))
                .with_suggestion(format!("Known variants: {}", known.join(", ")))
        })?;

        let (program, args) = match engine.kind {
            EngineKind::Flutter => ("flutter".to_string(), flutter_args(plan, variant_plan, engine.artifact)?),
            EngineKind::Gradle => (gradle_wrapper().to_string(), vec![gradle_task(variant, engine.artifact)]),
        };

        let env = match (&variant_plan.signing, signing) {
            (Some(_), Some(profile)) => signing_env(profile, env_names),
            _ => Vec::new(),
        };

        Ok(Self {
            program,
            args,
            env,
            engine: engine.kind,
        })
    }

    /// Names of the environment variables passed to the engine
    pub fn env_names(&self) -> impl Iterator<Item = &str> {
        self.env.iter().map(|(k, _)| k.as_str())
    }

    /// Printable command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the engine in `dir`, streaming its output
    ///
    /// A non-zero exit is reported as [`ErrorCode::FlutterError`] or
    /// [`ErrorCode::GradleError`].
    pub fn run(&self, dir: &Path) -> Result<()> {
        tracing::info!(command = %self.command_line(), "Handing plan to build engine");
        match run_command_streaming_with_env(&self.program, &self.args, &self.env, dir)? {
            0 => Ok(()),
            status => {
                let code = match self.engine {
                    EngineKind::Flutter => ErrorCode::FlutterError,
                    EngineKind::Gradle => ErrorCode::GradleError,
                };
                Err(Error::engine_failed(code, &self.program, status))
            }
        }
    }
}

fn flutter_args(plan: &BuildPlan, variant: &VariantPlan, artifact: ArtifactKind) -> Result<Vec<String>> {
    if !FLUTTER_MODES.contains(&variant.name.as_str()) {
        return Err(Error::invalid_input(format!(
            "Flutter cannot build variant `{}`",
            variant.name
        ))
        .with_suggestion("Use one of debug, profile, release, or set [engine] kind = \"gradle\""));
    }

    let mut args = vec![
        "build".to_string(),
        match artifact {
            ArtifactKind::Apk => "apk",
            ArtifactKind::Bundle => "appbundle",
        }
        .to_string(),
        format!("--{}", variant.name),
    ];

    let platforms: Vec<&str> = plan
        .abi_filters
        .iter()
        .filter_map(|abi| {
            let mapped = flutter_platform(abi);
            if mapped.is_none() {
                tracing::warn!(abi = %abi, "No Flutter target platform for architecture");
            }
            mapped
        })
        .collect();
    if !platforms.is_empty() {
        args.push("--target-platform".to_string());
        args.push(platforms.join(","));
    }

    if let Some(target) = plan.flutter.as_ref().and_then(|f| f.target.as_ref()) {
        args.push("--target".to_string());
        args.push(target.clone());
    }

    args.push("--build-number".to_string());
    args.push(plan.application.version_code.to_string());
    args.push("--build-name".to_string());
    args.push(plan.application.version_name.clone());

    Ok(args)
}

fn gradle_task(variant: &str, artifact: ArtifactKind) -> String {
    let mut chars = variant.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    match artifact {
        ArtifactKind::Apk => format!("assemble{}", capitalized),
        ArtifactKind::Bundle => format!("bundle{}", capitalized),
    }
}

fn signing_env(profile: &SigningProfile, names: &EnvConfig) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if let Some(path) = &profile.store_file.value {
        env.push((names.store_file.clone(), path.display().to_string()));
    }
    if let Some(secret) = &profile.store_password.value {
        env.push((names.store_password.clone(), secret.expose().to_string()));
    }
    if let Some(alias) = &profile.key_alias.value {
        env.push((names.key_alias.clone(), alias.clone()));
    }
    if let Some(secret) = &profile.key_password.value {
        env.push((names.key_password.clone(), secret.expose().to_string()));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::BuildDescriptor;
    use crate::environment::Environment;
    use crate::resolver::{resolve_plan, DescriptorSource, Resolver};

    const APP: &str = r#"
        applicationId = "com.example.app"
        minSdk = 23
        targetSdk = 35
        compileSdk = 35
        versionCode = 12
        versionName = "1.4.0"
        abiFilters = ["armeabi-v7a", "arm64-v8a"]

        [signing]
        storeFile = "/keys/upload.jks"
        keyAlias = "upload"

        [buildTypes.release]
        minify = true

        [buildTypes.debug]

        [buildTypes.staging]

        [flutter]
        target = "lib/main.dart"
    "#;

    fn descriptor() -> BuildDescriptor {
        let env = Environment::empty()
            .with("STORE_PASSWORD", "s3cret")
            .with("KEY_PASSWORD", "k3y");
        Resolver::new().load(&DescriptorSource::toml(APP), &env).unwrap()
    }

    #[test]
    fn test_flutter_release_apk() {
        let d = descriptor();
        let plan = resolve_plan(&d);
        let inv = Invocation::for_variant(
            &plan,
            "release",
            &EngineConfig::default(),
            &EnvConfig::default(),
            d.signing.as_ref(),
        )
        .unwrap();

        assert_eq!(inv.program, "flutter");
        assert_eq!(
            inv.command_line(),
            "flutter build apk --release --target-platform android-arm64,android-arm \
             --target lib/main.dart --build-number 12 --build-name 1.4.0"
        );
        let names: Vec<_> = inv.env_names().collect();
        assert_eq!(names, vec!["STORE_FILE", "STORE_PASSWORD", "KEY_ALIAS", "KEY_PASSWORD"]);
        assert!(!inv.command_line().contains("s3cret"));
    }

    #[test]
    fn test_debug_variant_gets_no_secrets() {
        let d = descriptor();
        let plan = resolve_plan(&d);
        let inv = Invocation::for_variant(
            &plan,
            "debug",
            &EngineConfig::default(),
            &EnvConfig::default(),
            d.signing.as_ref(),
        )
        .unwrap();
        assert_eq!(inv.env_names().count(), 0);
    }

    #[test]
    fn test_gradle_bundle_task() {
        let d = descriptor();
        let plan = resolve_plan(&d);
        let engine = EngineConfig {
            kind: EngineKind::Gradle,
            artifact: ArtifactKind::Bundle,
            project_dir: None,
        };
        let inv =
            Invocation::for_variant(&plan, "staging", &engine, &EnvConfig::default(), None).unwrap();

        assert_eq!(inv.program, gradle_wrapper());
        assert_eq!(inv.args, vec!["bundleStaging"]);
    }

    #[test]
    fn test_flutter_rejects_custom_variant() {
        let d = descriptor();
        let plan = resolve_plan(&d);
        let err = Invocation::for_variant(
            &plan,
            "staging",
            &EngineConfig::default(),
            &EnvConfig::default(),
            None,
        )
        .unwrap_err();
        assert!(err.message.contains("staging"));
    }

    #[test]
    fn test_unknown_variant() {
        let plan = resolve_plan(&descriptor());
        let err = Invocation::for_variant(
            &plan,
            "qa",
            &EngineConfig::default(),
            &EnvConfig::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.suggestion.unwrap().contains("release"));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_failure_is_a_coded_error() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 4".to_string()],
            env: Vec::new(),
            engine: EngineKind::Gradle,
        };

        let err = inv.run(dir.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::GradleError);
        assert!(err.message.contains("code 4"));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_success() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 0".to_string()],
            env: Vec::new(),
            engine: EngineKind::Flutter,
        };
        assert!(inv.run(dir.path()).is_ok());
    }

    #[test]
    fn test_flutter_platform_mapping() {
        assert_eq!(flutter_platform("arm64-v8a"), Some("android-arm64"));
        assert_eq!(flutter_platform("x86_64"), Some("android-x64"));
        assert_eq!(flutter_platform("mips"), None);
    }
}
