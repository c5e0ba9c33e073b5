//! Android build descriptor resolution
//!
//! This crate turns a declarative description of an Android (Flutter shell)
//! build into a validated, normalized plan for an external build engine:
//! - Descriptor parsing (TOML or JSON)
//! - Signing profile assembly from descriptor values and environment overrides
//! - Validation that reports every violation in one pass
//! - Deterministic plan rendering and digests
//! - Hand-off to Flutter or Gradle
//!
//! # Example
//!
//! ```rust
//! use droidplan_android::{DescriptorSource, Environment, Resolver};
//!
//! let descriptor = r#"
//!     applicationId = "com.example.app"
//!     minSdk = 23
//!     targetSdk = 35
//!     compileSdk = 35
//!     versionCode = 1
//!     versionName = "1.0"
//!     abiFilters = ["arm64-v8a"]
//! "#;
//!
//! let (plan, _warnings) = Resolver::new()
//!     .resolve(&DescriptorSource::toml(descriptor), &Environment::empty())
//!     .expect("descriptor is valid");
//! assert_eq!(plan.sdk.target, 35);
//! ```

#![warn(missing_docs)]

pub mod dependency;
#[allow(missing_docs)]
pub mod descriptor;
pub mod environment;
pub mod gradle;
#[allow(missing_docs)]
pub mod plan;
pub mod resolver;
pub mod signing;

pub use descriptor::{BuildDescriptor, BuildVariant, Format};
pub use environment::Environment;
pub use plan::BuildPlan;
pub use resolver::{resolve_plan, validate, DescriptorSource, ResolveError, Resolver};
pub use signing::{Secret, SigningProfile};
