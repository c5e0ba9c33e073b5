//! End-to-end tests for the droidplan binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SIGNING_VARS: [&str; 4] = ["STORE_FILE", "STORE_PASSWORD", "KEY_ALIAS", "KEY_PASSWORD"];

const APP: &str = r#"
applicationId = "com.example.app"
minSdk = 23
targetSdk = 35
compileSdk = 35
versionCode = 7
versionName = "2.1.0"
abiFilters = ["arm64-v8a", "armeabi-v7a"]
plugins = ["com.android.application", "kotlin-android", "dev.flutter.flutter-gradle-plugin"]
dependencies = [
    "androidx.core:core-ktx:1.13.1",
    { configuration = "coreLibraryDesugaring", coordinate = "com.android.tools:desugar_jdk_libs:2.1.2" },
]

[signing]
storeFile = "keys/upload.jks"
keyAlias = "upload"

[buildTypes.release]
minify = true

[buildTypes.debug]

[compileOptions]
coreLibraryDesugaringEnabled = true
"#;

/// A project directory holding `build-descriptor.toml`
fn project(descriptor: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("build-descriptor.toml"), descriptor).unwrap();
    dir
}

/// The binary running inside `dir` with a clean signing environment
fn droidplan(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("droidplan").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DROIDPLAN_DESCRIPTOR")
        .env_remove("DROIDPLAN_LOG")
        .arg("--no-color");
    for var in SIGNING_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn with_passwords(mut cmd: Command) -> Command {
    cmd.env("STORE_PASSWORD", "hunter2-store")
        .env("KEY_PASSWORD", "hunter2-key");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    droidplan(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_validate_accepts_complete_descriptor() {
    let dir = project(APP);
    with_passwords(droidplan(&dir))
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_validate_reports_missing_passwords() {
    let dir = project(APP);
    droidplan(&dir)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MissingSigningCredential"))
        .stderr(predicate::str::contains("signing.storePassword"))
        .stderr(predicate::str::contains("signing.keyPassword"));
}

#[test]
fn test_validate_reports_sdk_ordering() {
    let dir = project(&APP.replace("minSdk = 23", "minSdk = 36"));
    with_passwords(droidplan(&dir))
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SdkOrderingViolation"))
        .stderr(predicate::str::contains("minSdk"));
}

#[test]
fn test_validate_json_report() {
    let dir = project(&APP.replace("minSdk = 23", "minSdk = 36"));
    let output = with_passwords(droidplan(&dir))
        .args(["validate", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    assert_eq!(report["errors"][0]["kind"], "SdkOrderingViolation");
}

#[test]
fn test_non_numeric_version_code_is_a_load_error() {
    let dir = project(&APP.replace("versionCode = 7", "versionCode = \"seven\""));
    with_passwords(droidplan(&dir))
        .arg("validate")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("E3006"))
        .stderr(predicate::str::contains("versionCode"));
}

#[test]
fn test_missing_descriptor() {
    let dir = TempDir::new().unwrap();
    droidplan(&dir)
        .arg("validate")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("build-descriptor.toml"));
}

#[test]
fn test_plan_to_stdout_excludes_secrets() {
    let dir = project(APP);
    let output = with_passwords(droidplan(&dir)).arg("plan").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("hunter2"));

    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(plan["schemaVersion"], 1);
    assert_eq!(plan["sdk"]["target"], 35);
    assert_eq!(plan["abiFilters"][0], "arm64-v8a");
    assert_eq!(plan["abiFilters"][1], "armeabi-v7a");
    assert_eq!(plan["plugins"][2], "dev.flutter.flutter-gradle-plugin");
}

#[test]
fn test_plan_is_deterministic() {
    let dir = project(APP);
    let first = with_passwords(droidplan(&dir)).arg("plan").output().unwrap();
    let second = with_passwords(droidplan(&dir)).arg("plan").output().unwrap();
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_plan_toml_output_file() {
    let dir = project(APP);
    let out = dir.path().join("plan.toml");
    with_passwords(droidplan(&dir))
        .args(["plan", "--format", "toml", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("sha256"));

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("schemaVersion = 1"));
    assert!(!written.contains("hunter2"));
}

#[test]
fn test_plan_rejected_descriptor_writes_nothing() {
    let dir = project(APP);
    droidplan(&dir)
        .arg("plan")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No plan produced"));
}

#[test]
fn test_descriptor_flag_and_json_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    std::fs::write(
        &path,
        r#"{
            "applicationId": "com.example.json",
            "minSdk": "21",
            "targetSdk": 34,
            "compileSdk": 34,
            "versionCode": 3,
            "versionName": "0.3",
            "abiFilters": ["x86_64"],
            "buildTypes": { "debug": {} }
        }"#,
    )
    .unwrap();

    droidplan(&dir)
        .arg("--descriptor")
        .arg(&path)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.json"));
}

#[test]
fn test_build_dry_run_prints_command_without_secrets() {
    let dir = project(APP);
    with_passwords(droidplan(&dir))
        .args(["build", "--variant", "release", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "flutter build apk --release --target-platform android-arm64,android-arm",
        ))
        .stdout(predicate::str::contains("env STORE_PASSWORD=<redacted>"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_build_unknown_variant() {
    let dir = project(APP);
    with_passwords(droidplan(&dir))
        .args(["build", "--variant", "qa", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown build variant"));
}

#[test]
fn test_config_selects_gradle_engine() {
    let dir = project(APP);
    std::fs::write(
        dir.path().join(".droidplan.toml"),
        "[engine]\nkind = \"gradle\"\nartifact = \"bundle\"\n",
    )
    .unwrap();

    with_passwords(droidplan(&dir))
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bundleRelease"));
}

#[test]
fn test_deny_policy_ignores_descriptor_passwords() {
    let descriptor = APP.replace(
        "keyAlias = \"upload\"",
        "keyAlias = \"upload\"\nstorePassword = \"inline\"\nkeyPassword = \"inline\"",
    );
    let dir = project(&descriptor);
    std::fs::write(
        dir.path().join(".droidplan.toml"),
        "[signing]\ninline_secrets = \"deny\"\n",
    )
    .unwrap();

    droidplan(&dir)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MissingSigningCredential"));
}

#[test]
fn test_explicit_missing_config() {
    let dir = project(APP);
    droidplan(&dir)
        .args(["--config", "nope.toml", "validate"])
        .assert()
        .code(3);
}
