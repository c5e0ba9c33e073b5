//! Dependency declarations
//!
//! Entries are written either as coordinate strings (`group:artifact:version`),
//! as platform markers (`platform(group:artifact:version)`) that pin the
//! versions of a bill of materials, or as tables naming a Gradle
//! configuration explicitly:
//!
//! ```toml
//! dependencies = [
//!     "androidx.core:core-ktx:1.16.0",
//!     "platform(com.google.firebase:firebase-bom:33.15.0)",
//!     "com.google.firebase:firebase-analytics-ktx",
//!     { configuration = "coreLibraryDesugaring", coordinate = "com.android.tools:desugar_jdk_libs:2.1.4" },
//! ]
//! ```
//!
//! Parsing is lenient: a string that cannot be split into a coordinate is kept
//! as [`DependencyDecl::Unparseable`] so validation can report it alongside
//! every other problem.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Gradle configuration used when an entry does not name one
pub const DEFAULT_CONFIGURATION: &str = "implementation";

/// Gradle configuration that carries the core library desugaring runtime
pub const DESUGARING_CONFIGURATION: &str = "coreLibraryDesugaring";

/// Configuration of build plugin artifacts on the buildscript classpath
pub const CLASSPATH_CONFIGURATION: &str = "classpath";

/// A dependency entry as written in the descriptor
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDependency {
    /// `"group:artifact:version"` or `"platform(...)"`
    Coordinate(String),
    /// `{ configuration = "...", coordinate = "..." }`
    Declared {
        /// Gradle configuration
        configuration: Option<String>,
        /// Coordinate string
        coordinate: String,
    },
}

/// A parsed Maven coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Gradle configuration, e.g. `implementation`
    pub configuration: String,
    /// Maven group id
    pub group: String,
    /// Maven artifact id
    pub artifact: String,
    /// Version; `None` when managed by a platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Bill-of-materials marker
    pub platform: bool,
}

impl Dependency {
    /// Identity used for de-duplication
    ///
    /// A platform entry and a plain entry for the same artifact are distinct,
    /// as are declarations under different configurations.
    pub fn key(&self) -> (&str, bool, &str, &str) {
        (&self.configuration, self.platform, &self.group, &self.artifact)
    }

    /// `group:artifact[:version]`
    pub fn coordinate(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{}:{}", self.group, self.artifact, version),
            None => format!("{}:{}", self.group, self.artifact),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platform {
            write!(f, "{}(platform({}))", self.configuration, self.coordinate())
        } else {
            write!(f, "{}({})", self.configuration, self.coordinate())
        }
    }
}

/// One entry of the descriptor's dependency list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyDecl {
    /// A coordinate that split cleanly
    Parsed(Dependency),
    /// A string that is not a coordinate at all
    Unparseable {
        /// Gradle configuration
        configuration: String,
        /// Text as written
        text: String,
        /// Why it could not be parsed
        reason: String,
    },
}

impl DependencyDecl {
    /// Parse a raw descriptor entry
    pub fn from_raw(raw: &RawDependency) -> Self {
        match raw {
            RawDependency::Coordinate(text) => Self::parse(DEFAULT_CONFIGURATION, text),
            RawDependency::Declared {
                configuration,
                coordinate,
            } => Self::parse(
                configuration.as_deref().unwrap_or(DEFAULT_CONFIGURATION),
                coordinate,
            ),
        }
    }

    /// Parse a coordinate string under the given configuration
    pub fn parse(configuration: &str, text: &str) -> Self {
        let trimmed = text.trim();
        let (platform, body) = match trimmed
            .strip_prefix("platform(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (true, inner.trim()),
            None => (false, trimmed),
        };

        let unparseable = |reason: &str| Self::Unparseable {
            configuration: configuration.to_string(),
            text: text.to_string(),
            reason: reason.to_string(),
        };

        if body.contains(char::is_whitespace) {
            return unparseable("coordinate contains whitespace");
        }

        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            [group, artifact] => Self::Parsed(Dependency {
                configuration: configuration.to_string(),
                group: group.to_string(),
                artifact: artifact.to_string(),
                version: None,
                platform,
            }),
            [group, artifact, version] => Self::Parsed(Dependency {
                configuration: configuration.to_string(),
                group: group.to_string(),
                artifact: artifact.to_string(),
                version: Some(version.to_string()),
                platform,
            }),
            _ => unparseable("expected group:artifact[:version]"),
        }
    }

    /// The parsed dependency, if any
    pub fn parsed(&self) -> Option<&Dependency> {
        match self {
            Self::Parsed(dep) => Some(dep),
            Self::Unparseable { .. } => None,
        }
    }
}

/// Drop earlier declarations with the same [`Dependency::key`]
///
/// The last declaration survives, at its own position in the list.
pub fn dedup_last_wins(deps: &[Dependency]) -> Vec<Dependency> {
    let mut last_index: HashMap<(&str, bool, &str, &str), usize> = HashMap::new();
    for (index, dep) in deps.iter().enumerate() {
        last_index.insert(dep.key(), index);
    }

    deps.iter()
        .enumerate()
        .filter(|(index, dep)| {
            let keep = last_index.get(&dep.key()) == Some(index);
            if !keep {
                tracing::debug!(dependency = %dep, "Dropping superseded dependency declaration");
            }
            keep
        })
        .map(|(_, dep)| dep.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Dependency {
        match DependencyDecl::parse(DEFAULT_CONFIGURATION, text) {
            DependencyDecl::Parsed(dep) => dep,
            other => panic!("expected a coordinate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_full_coordinate() {
        let dep = parsed("androidx.core:core-ktx:1.16.0");
        assert_eq!(dep.group, "androidx.core");
        assert_eq!(dep.artifact, "core-ktx");
        assert_eq!(dep.version.as_deref(), Some("1.16.0"));
        assert!(!dep.platform);
    }

    #[test]
    fn test_parse_platform_marker() {
        let dep = parsed("platform(com.google.firebase:firebase-bom:33.15.0)");
        assert!(dep.platform);
        assert_eq!(dep.artifact, "firebase-bom");
        assert_eq!(dep.to_string(), "implementation(platform(com.google.firebase:firebase-bom:33.15.0))");
    }

    #[test]
    fn test_parse_versionless_coordinate() {
        let dep = parsed("com.google.firebase:firebase-analytics-ktx");
        assert_eq!(dep.version, None);
        assert_eq!(dep.coordinate(), "com.google.firebase:firebase-analytics-ktx");
    }

    #[test]
    fn test_parse_keeps_empty_segments_for_validation() {
        let dep = parsed("androidx.core::1.0");
        assert_eq!(dep.artifact, "");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for text in ["androidx.core", "a:b:c:d", "a b:c:1"] {
            assert!(
                matches!(
                    DependencyDecl::parse(DEFAULT_CONFIGURATION, text),
                    DependencyDecl::Unparseable { .. }
                ),
                "{} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_declared_table_keeps_configuration() {
        let raw = RawDependency::Declared {
            configuration: Some(DESUGARING_CONFIGURATION.into()),
            coordinate: "com.android.tools:desugar_jdk_libs:2.1.4".into(),
        };
        let decl = DependencyDecl::from_raw(&raw);
        assert_eq!(decl.parsed().unwrap().configuration, DESUGARING_CONFIGURATION);
    }

    #[test]
    fn test_dedup_keeps_last_declared_version() {
        let deps = vec![
            parsed("androidx.appcompat:appcompat:1.6.0"),
            parsed("androidx.core:core-ktx:1.16.0"),
            parsed("androidx.appcompat:appcompat:1.7.1"),
        ];

        let deduped = dedup_last_wins(&deps);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].artifact, "core-ktx");
        assert_eq!(deduped[1].version.as_deref(), Some("1.7.1"));
    }

    #[test]
    fn test_dedup_keeps_platform_and_plain_entries_apart() {
        let deps = vec![
            parsed("platform(com.google.firebase:firebase-bom:33.15.0)"),
            parsed("com.google.firebase:firebase-analytics-ktx"),
            parsed("com.google.firebase:firebase-bom:33.16.0"),
        ];

        let deduped = dedup_last_wins(&deps);
        assert_eq!(deduped.len(), 3);
        assert!(deduped[0].platform);
        assert!(!deduped[2].platform);
    }

    #[test]
    fn test_dedup_keeps_configurations_apart() {
        let desugar = match DependencyDecl::parse(
            DESUGARING_CONFIGURATION,
            "com.android.tools:desugar_jdk_libs:2.1.4",
        ) {
            DependencyDecl::Parsed(dep) => dep,
            other => panic!("expected a coordinate, got {:?}", other),
        };
        let deps = vec![desugar, parsed("com.android.tools:desugar_jdk_libs:2.1.4")];

        let deduped = dedup_last_wins(&deps);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].configuration, DESUGARING_CONFIGURATION);
        assert_eq!(deduped[1].configuration, DEFAULT_CONFIGURATION);
    }
}
