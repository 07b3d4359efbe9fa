//! Typed capability entries parsed from export/import headers.
//!
//! Header attribute values arrive as untyped text; the version attribute is
//! resolved into a typed constraint here, at parse time, so later stages
//! never re-parse strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::header::HeaderClause;
use crate::version::{MalformedVersionError, Version, VersionRange};

/// Legacy alias for the `version` attribute, kept for old-schema manifests.
const SPECIFICATION_VERSION: &str = "specification-version";

/// Error raised when a capability clause carries a malformed version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version on capability '{name}': {source}")]
pub struct CapabilityVersionError {
    /// The capability (package or service) name the bad version was on.
    pub name: String,
    #[source]
    pub source: MalformedVersionError,
}

/// The version side of a capability: an exact version for exports, a range
/// for imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionConstraint {
    /// A concrete provided version.
    Exact(Version),
    /// An accepted interval of versions.
    Range(VersionRange),
}

impl VersionConstraint {
    /// Whether `v` satisfies this constraint.
    pub fn matches(&self, v: &Version) -> bool {
        match self {
            Self::Exact(exact) => exact == v,
            Self::Range(range) => range.contains(v),
        }
    }
}

impl std::fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(v) => v.fmt(f),
            Self::Range(r) => r.fmt(f),
        }
    }
}

/// One declared capability: a package or service name with its version
/// constraint and, for imports, the optionality flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub name: String,
    pub constraint: VersionConstraint,
    #[serde(default)]
    pub optional: bool,
}

fn version_text(clause: &HeaderClause) -> Option<&str> {
    clause
        .attribute("version")
        .or_else(|| clause.attribute(SPECIFICATION_VERSION))
}

/// Expand export clauses into one entry per key.
///
/// The version defaults to the zero version when absent.
///
/// # Errors
///
/// Returns [`CapabilityVersionError`] when a version attribute does not
/// parse.
pub fn exports_from_clauses(
    clauses: &[HeaderClause],
) -> Result<Vec<CapabilityEntry>, CapabilityVersionError> {
    let mut entries = Vec::new();
    for clause in clauses {
        for key in &clause.keys {
            let version = match version_text(clause) {
                None => Version::zero(),
                Some(text) => Version::parse(text).map_err(|source| CapabilityVersionError {
                    name: key.clone(),
                    source,
                })?,
            };
            entries.push(CapabilityEntry {
                name: key.clone(),
                constraint: VersionConstraint::Exact(version),
                optional: false,
            });
        }
    }
    Ok(entries)
}

/// Expand import clauses into one entry per key.
///
/// The range defaults to "any version" when absent; the
/// `resolution:=optional` directive marks the import optional.
///
/// # Errors
///
/// Returns [`CapabilityVersionError`] when a version attribute does not
/// parse as a version range.
pub fn imports_from_clauses(
    clauses: &[HeaderClause],
) -> Result<Vec<CapabilityEntry>, CapabilityVersionError> {
    let mut entries = Vec::new();
    for clause in clauses {
        let optional = clause.directive("resolution") == Some("optional");
        for key in &clause.keys {
            let range = match version_text(clause) {
                None => VersionRange::any(),
                Some(text) => VersionRange::parse(text).map_err(|source| {
                    CapabilityVersionError {
                        name: key.clone(),
                        source,
                    }
                })?,
            };
            entries.push(CapabilityEntry {
                name: key.clone(),
                constraint: VersionConstraint::Range(range),
                optional,
            });
        }
    }
    Ok(entries)
}
