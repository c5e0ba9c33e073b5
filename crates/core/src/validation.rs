//! Violation collection for descriptor validation
//!
//! Validation never fails fast. Each check appends a [`Violation`] to a
//! [`ValidationResult`] so that every problem in a descriptor surfaces in a
//! single pass.
//!
//! # Example
//!
//! ```rust
//! use droidplan_core::validation::{Validator, ViolationKind};
//!
//! let result = Validator::new()
//!     .ordered("minSdk", 23, "targetSdk", 35)
//!     .required(ViolationKind::MissingSigningCredential, "signing.keyAlias", Some("upload"))
//!     .validate();
//!
//! assert!(result.is_valid());
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A required value is absent
    MissingField,
    /// `minSdk <= targetSdk <= compileSdk` does not hold
    SdkOrderingViolation,
    /// A release variant lacks a signing credential
    MissingSigningCredential,
    /// A dependency coordinate is incomplete or unparseable
    MalformedDependencyCoordinate,
    /// A signing secret was written into the descriptor itself
    InlineSecret,
    /// An ABI filter names an architecture the engine does not know
    UnknownAbi,
    /// Core library desugaring is enabled without a desugaring library
    DesugaringWithoutLibrary,
}

impl ViolationKind {
    /// Stable identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "MissingField",
            Self::SdkOrderingViolation => "SdkOrderingViolation",
            Self::MissingSigningCredential => "MissingSigningCredential",
            Self::MalformedDependencyCoordinate => "MalformedDependencyCoordinate",
            Self::InlineSecret => "InlineSecret",
            Self::UnknownAbi => "UnknownAbi",
            Self::DesugaringWithoutLibrary => "DesugaringWithoutLibrary",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// What went wrong
    pub kind: ViolationKind,
    /// Field paths involved, e.g. `["minSdk", "targetSdk"]`
    pub fields: Vec<String>,
    /// Human-readable message
    pub message: String,
    /// Expected value (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Actual value (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Violation {
    /// Create a violation touching one field
    pub fn new(kind: ViolationKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            fields: vec![field.into()],
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Create a violation touching several fields
    pub fn spanning<I, S>(kind: ViolationKind, fields: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Record the expected value
    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Record the actual value
    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Whether this violation references the given field path
    pub fn touches(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.fields.join(", "), self.kind, self.message)
    }
}

/// Validation result: blocking errors plus advisory warnings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }

    /// Get all warnings
    pub fn warnings(&self) -> &[Violation] {
        &self.warnings
    }

    /// Errors of one kind
    pub fn errors_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.errors.iter().filter(move |v| v.kind == kind)
    }

    /// Warnings of one kind
    pub fn warnings_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.warnings.iter().filter(move |v| v.kind == kind)
    }

    /// Add an error
    pub fn add_error(&mut self, error: Violation) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: Violation) {
        self.warnings.push(warning);
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Fluent validator builder
#[derive(Debug, Default)]
pub struct Validator {
    result: ValidationResult,
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that a value is present and not blank
    pub fn required(mut self, kind: ViolationKind, field: &str, value: Option<&str>) -> Self {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.result.add_error(
                Violation::new(kind, field, "Value is required")
                    .expected("non-empty value")
                    .actual(if value.is_some() { "empty" } else { "absent" }),
            );
        }
        self
    }

    /// Validate that `lower <= upper`, reporting both fields on failure
    pub fn ordered<T: PartialOrd + fmt::Display>(
        mut self,
        lower_field: &str,
        lower: T,
        upper_field: &str,
        upper: T,
    ) -> Self {
        if lower > upper {
            self.result.add_error(
                Violation::spanning(
                    ViolationKind::SdkOrderingViolation,
                    [lower_field, upper_field],
                    format!("{} ({}) must not exceed {} ({})", lower_field, lower, upper_field, upper),
                )
                .expected(format!("{} <= {}", lower_field, upper_field))
                .actual(format!("{} > {}", lower, upper)),
            );
        }
        self
    }

    /// Validate against a regex pattern
    pub fn pattern(
        mut self,
        kind: ViolationKind,
        field: &str,
        value: &str,
        pattern: &Regex,
        description: &str,
    ) -> Self {
        if !pattern.is_match(value) {
            self.result.add_error(
                Violation::new(kind, field, format!("Must match {}", description))
                    .expected(description)
                    .actual(value),
            );
        }
        self
    }

    /// Add a warning (non-blocking)
    pub fn warn_if(mut self, kind: ViolationKind, field: &str, condition: bool, message: &str) -> Self {
        if condition {
            self.result.add_warning(Violation::new(kind, field, message));
        }
        self
    }

    /// Push a prepared violation as an error
    pub fn error(mut self, violation: Violation) -> Self {
        self.result.add_error(violation);
        self
    }

    /// Fold in findings from a nested validator
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.result.merge(other);
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}
