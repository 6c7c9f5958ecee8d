//! Version constraints
//!
//! Recipes declare requirements as conda match-spec fragments:
//! `name [version-spec [build]]`. This module splits requirement strings and
//! evaluates the constraint part against concrete versions and build numbers.

use std::fmt;
use std::str::FromStr;

use rattler_conda_types::{ParseStrictness, Version, VersionSpec};
use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// Marker used by recipes to pin a variable to the build matrix value
const MATRIX_PIN: &str = "x.x";

/// Version constraint attached to a requirement
///
/// An empty constraint accepts every version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionConstraint(String);

impl VersionConstraint {
    /// Create a constraint from its textual form
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Constraint that accepts every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Textual form, empty for "any"
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this constraint accepts every version
    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the version is pinned to the build matrix (`x.x`)
    pub fn is_matrix_pin(&self) -> bool {
        self.0.split_whitespace().any(|token| token == MATRIX_PIN)
    }

    /// Check a concrete version and build number against this constraint
    ///
    /// The first token is a conda version spec. An optional second token is
    /// either an exact build number or a build string whose trailing `_N`
    /// must equal the build number.
    pub fn matches(&self, version: &str, build_number: u64) -> Result<bool, VersionError> {
        if self.is_any() || self.is_matrix_pin() {
            return Ok(true);
        }

        let mut tokens = self.0.split_whitespace();
        let Some(spec) = tokens.next() else {
            return Ok(true);
        };

        let spec = parse_spec(spec)?;
        let version = parse_version(version)?;
        if !spec.matches(&version) {
            return Ok(false);
        }

        Ok(tokens
            .next()
            .map_or(true, |build| build_matches(build, build_number)))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "any version")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for VersionConstraint {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Split a requirement string into package name and constraint
///
/// Returns `None` for blank strings.
///
/// # Examples
/// ```
/// use fanout::core::version::parse_requirement;
///
/// let (name, constraint) = parse_requirement("numpy >=1.11").unwrap();
/// assert_eq!(name, "numpy");
/// assert_eq!(constraint.as_str(), ">=1.11");
/// ```
pub fn parse_requirement(requirement: &str) -> Option<(String, VersionConstraint)> {
    let mut tokens = requirement.split_whitespace();
    let name = tokens.next()?;
    let rest: Vec<&str> = tokens.collect();
    Some((name.to_string(), VersionConstraint::new(rest.join(" "))))
}

/// Parse a conda version
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    Version::from_str(version).map_err(|e| VersionError::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a conda version spec
pub fn parse_spec(spec: &str) -> Result<VersionSpec, VersionError> {
    VersionSpec::from_str(spec, ParseStrictness::Lenient).map_err(|e| {
        VersionError::InvalidConstraint {
            constraint: spec.to_string(),
            reason: e.to_string(),
        }
    })
}

fn build_matches(build: &str, build_number: u64) -> bool {
    if let Ok(number) = build.parse::<u64>() {
        return number == build_number;
    }
    build
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        == Some(build_number)
}
