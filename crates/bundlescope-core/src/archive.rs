//! Archive records and the registry they are loaded into.
//!
//! One [`Archive`] per input jar: identity and version derived from file
//! name plus manifest metadata, declared export/import maps parsed from the
//! capability headers, and the bytecode-derived [`CapabilityModel`]. The
//! [`ArchiveSetBuilder`] performs the single load pass and publishes an
//! [`ArchiveSet`] ordered and indexed for resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

use thiserror::Error;
use tracing::{debug, warn};

use crate::capability::{
    exports_from_clauses, imports_from_clauses, CapabilityVersionError, VersionConstraint,
};
use crate::classfile::ClassAnalysisError;
use crate::header::{parse_header, HeaderClause, HeaderSyntaxError};
use crate::model::{CapabilityModel, ReferenceCollector};
use crate::version::{Version, VersionRange};
use crate::{ClassName, PackageName};

/// Manifest attribute naming the archive's stable symbolic identity.
pub const SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
/// Manifest attribute carrying the archive version.
pub const BUNDLE_VERSION: &str = "Bundle-Version";
/// Manifest attribute naming the declared activator class.
pub const BUNDLE_ACTIVATOR: &str = "Bundle-Activator";
/// Manifest attribute distinguishing legacy from modern metadata.
pub const MANIFEST_SCHEMA: &str = "Bundle-ManifestVersion";
/// Package capability headers.
pub const EXPORT_PACKAGE: &str = "Export-Package";
pub const IMPORT_PACKAGE: &str = "Import-Package";
/// Service capability headers.
pub const EXPORT_SERVICE: &str = "Export-Service";
pub const IMPORT_SERVICE: &str = "Import-Service";

/// Errors raised during the load pass. Any of them aborts the whole load;
/// no partial registry is published.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Modern-schema metadata without the required identity attribute.
    #[error("archive '{file_name}' declares a modern manifest schema but no symbolic name")]
    MissingIdentity { file_name: String },

    /// The combined input collections contained no archives at all.
    #[error("no input archives were found")]
    NoArchives,

    /// A capability header did not parse.
    #[error("invalid header in '{file_name}': {source}")]
    Header {
        file_name: String,
        #[source]
        source: HeaderSyntaxError,
    },

    /// A version or version range in the metadata did not parse.
    #[error("invalid version in '{file_name}': {source}")]
    Version {
        file_name: String,
        #[source]
        source: CapabilityVersionError,
    },

    /// A class in the archive could not be decoded.
    #[error("failed to analyze class '{class_entry}' in '{file_name}': {source}")]
    Class {
        file_name: String,
        class_entry: String,
        #[source]
        source: ClassAnalysisError,
    },
}

/// Stable handle for one archive within its [`ArchiveSet`].
///
/// Ids are assigned after the load pass sorts archives by
/// `(identity, version)`, so id order is the deterministic iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveId(pub usize);

/// One declared import: accepted version range plus optionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub range: VersionRange,
    pub optional: bool,
}

/// The loader's input boundary: everything the engine needs to know about
/// one archive, with all file and zip mechanics already done by the caller.
#[derive(Debug, Default)]
pub struct ArchiveInput {
    /// File name the archive was loaded from, e.g. `core-1.0.0.jar`.
    pub file_name: String,
    /// Main manifest attributes.
    pub metadata: BTreeMap<String, String>,
    /// `(entry name, class bytes)` for every compiled class in the archive.
    pub classes: Vec<(String, Vec<u8>)>,
}

/// One loaded, analyzed archive.
#[derive(Debug)]
pub struct Archive {
    pub file_name: String,
    pub base_name: String,
    /// Symbolic identity, or the derived base name for legacy metadata.
    pub identity: String,
    pub version: Version,
    pub declared_activator: Option<ClassName>,
    pub exports: BTreeMap<PackageName, Version>,
    pub imports: BTreeMap<PackageName, ImportSpec>,
    pub service_exports: BTreeMap<String, Version>,
    pub service_imports: BTreeMap<String, ImportSpec>,
    /// Bytecode-derived capabilities.
    pub model: CapabilityModel,

    // Populated exclusively by the resolver; cleared on every run.
    /// Provider archive -> capability names it can satisfy for this archive.
    pub providers: BTreeMap<ArchiveId, BTreeSet<String>>,
    /// Providers of packages this archive does not itself export: the
    /// compile-time dependencies.
    pub ct_providers: BTreeMap<ArchiveId, BTreeSet<PackageName>>,
    /// Consumer archive -> capability names this archive supplies to it.
    pub provided_to: BTreeMap<ArchiveId, BTreeSet<String>>,
    /// Imports no loaded archive satisfies.
    pub unresolved: BTreeMap<String, VersionRange>,
}

impl Archive {
    /// Build an archive record from its boundary input: derive names,
    /// parse capability headers, analyze classes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] on malformed metadata, headers, or class
    /// data; the archive (and with it the whole load) is abandoned.
    pub fn from_input(input: ArchiveInput) -> Result<Self, ArchiveError> {
        let ArchiveInput {
            file_name,
            metadata,
            classes,
        } = input;

        let metadata_version = match metadata.get(BUNDLE_VERSION) {
            None => None,
            Some(raw) => Some(Version::parse(raw).map_err(|source| ArchiveError::Version {
                file_name: file_name.clone(),
                source: CapabilityVersionError {
                    name: BUNDLE_VERSION.to_string(),
                    source,
                },
            })?),
        };
        let (base_name, version) = derive_base_name(&file_name, metadata_version.as_ref());

        let modern_schema = metadata
            .get(MANIFEST_SCHEMA)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .is_some_and(|schema| schema >= 2);

        let identity = match metadata.get(SYMBOLIC_NAME) {
            Some(raw) => symbolic_name(raw).map_err(|source| ArchiveError::Header {
                file_name: file_name.clone(),
                source,
            })?,
            None if modern_schema => {
                return Err(ArchiveError::MissingIdentity { file_name });
            }
            None => base_name.clone(),
        };

        let parse = |header: &str| -> Result<Vec<HeaderClause>, ArchiveError> {
            match metadata.get(header) {
                None => Ok(Vec::new()),
                Some(raw) => parse_header(header, raw).map_err(|source| ArchiveError::Header {
                    file_name: file_name.clone(),
                    source,
                }),
            }
        };
        let versioned = |source: CapabilityVersionError| ArchiveError::Version {
            file_name: file_name.clone(),
            source,
        };

        let mut exports = BTreeMap::new();
        for entry in exports_from_clauses(&parse(EXPORT_PACKAGE)?).map_err(versioned)? {
            if let VersionConstraint::Exact(v) = entry.constraint {
                exports.insert(entry.name, v);
            }
        }
        let mut service_exports = BTreeMap::new();
        for entry in exports_from_clauses(&parse(EXPORT_SERVICE)?).map_err(versioned)? {
            if let VersionConstraint::Exact(v) = entry.constraint {
                service_exports.insert(entry.name, v);
            }
        }
        let mut imports = BTreeMap::new();
        for entry in imports_from_clauses(&parse(IMPORT_PACKAGE)?).map_err(versioned)? {
            if let VersionConstraint::Range(range) = entry.constraint {
                imports.insert(
                    entry.name,
                    ImportSpec {
                        range,
                        optional: entry.optional,
                    },
                );
            }
        }
        let mut service_imports = BTreeMap::new();
        for entry in imports_from_clauses(&parse(IMPORT_SERVICE)?).map_err(versioned)? {
            if let VersionConstraint::Range(range) = entry.constraint {
                service_imports.insert(
                    entry.name,
                    ImportSpec {
                        range,
                        optional: entry.optional,
                    },
                );
            }
        }

        let mut collector = ReferenceCollector::new();
        for (class_entry, bytes) in &classes {
            collector
                .analyze(bytes)
                .map_err(|source| ArchiveError::Class {
                    file_name: file_name.clone(),
                    class_entry: class_entry.clone(),
                    source,
                })?;
        }

        debug!(
            archive = %identity,
            version = %version,
            exports = exports.len(),
            imports = imports.len(),
            classes = classes.len(),
            "loaded archive"
        );

        Ok(Self {
            file_name,
            base_name,
            identity,
            version,
            declared_activator: metadata
                .get(BUNDLE_ACTIVATOR)
                .map(|raw| raw.trim().to_string()),
            exports,
            imports,
            service_exports,
            service_imports,
            model: collector.into_model(),
            providers: BTreeMap::new(),
            ct_providers: BTreeMap::new(),
            provided_to: BTreeMap::new(),
            unresolved: BTreeMap::new(),
        })
    }

    /// The total-order key used for registry membership and iteration.
    pub fn key(&self) -> (&str, &Version) {
        (&self.identity, &self.version)
    }

    /// Drop all resolver-populated state ahead of a (re-)run.
    pub(crate) fn clear_resolution(&mut self) {
        self.providers.clear();
        self.ct_providers.clear();
        self.provided_to.clear();
        self.unresolved.clear();
    }
}

/// Extract the identity from a raw symbolic-name header, dropping any
/// attached directives (`com.x.core;singleton:=true` -> `com.x.core`).
fn symbolic_name(raw: &str) -> Result<String, HeaderSyntaxError> {
    let clauses = parse_header(SYMBOLIC_NAME, raw)?;
    Ok(clauses
        .first()
        .and_then(|clause| clause.keys.first())
        .cloned()
        .unwrap_or_default())
}

/// Derive `(base name, version)` from a file name and the metadata version.
///
/// Canonical case: the stem ends in `-<version>`. Fallback: scan the
/// dash-separated segments from the right for one that parses as a version
/// and numerically matches the metadata version (qualifiers often differ
/// between file name and metadata). Final fallback: the whole stem.
fn derive_base_name(file_name: &str, metadata_version: Option<&Version>) -> (String, Version) {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _ext)| stem);

    if let Some((head, tail)) = stem.rsplit_once('-') {
        if let Ok(parsed) = Version::parse(tail) {
            let version = metadata_version.cloned().unwrap_or(parsed);
            return (head.to_string(), version);
        }
    }

    if let Some(metadata_version) = metadata_version {
        let segments: Vec<&str> = stem.split('-').collect();
        for idx in (1..segments.len()).rev() {
            if let Ok(parsed) = Version::parse(segments[idx]) {
                if numerically_equal(&parsed, metadata_version) {
                    return (segments[..idx].join("-"), metadata_version.clone());
                }
            }
        }
    }

    (
        stem.to_string(),
        metadata_version.cloned().unwrap_or_default(),
    )
}

fn numerically_equal(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.micro == b.micro
}

/// Accumulates archives over one load pass.
#[derive(Debug, Default)]
pub struct ArchiveSetBuilder {
    archives: Vec<Archive>,
}

impl ArchiveSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one archive.
    ///
    /// # Errors
    ///
    /// Propagates any [`ArchiveError`] from analysis; see
    /// [`Archive::from_input`].
    pub fn add_input(&mut self, input: ArchiveInput) -> Result<(), ArchiveError> {
        self.archives.push(Archive::from_input(input)?);
        Ok(())
    }

    /// Load a whole input collection. An empty collection is skipped with a
    /// warning; whether *everything* was empty is checked by [`Self::build`].
    ///
    /// # Errors
    ///
    /// Propagates any [`ArchiveError`] from analysis.
    pub fn add_collection(
        &mut self,
        label: &str,
        inputs: impl IntoIterator<Item = ArchiveInput>,
    ) -> Result<(), ArchiveError> {
        let mut any = false;
        for input in inputs {
            any = true;
            self.add_input(input)?;
        }
        if !any {
            warn!(collection = label, "input collection contains no archives, skipping");
        }
        Ok(())
    }

    /// Publish the registry: sort by `(identity, version)`, assign ids,
    /// index by base name and identity.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoArchives`] when nothing was loaded.
    pub fn build(mut self) -> Result<ArchiveSet, ArchiveError> {
        if self.archives.is_empty() {
            return Err(ArchiveError::NoArchives);
        }

        self.archives
            .sort_by(|a, b| a.key().cmp(&b.key()).then_with(|| a.file_name.cmp(&b.file_name)));

        let mut by_base_name: BTreeMap<String, Vec<ArchiveId>> = BTreeMap::new();
        let mut by_identity: BTreeMap<String, Vec<ArchiveId>> = BTreeMap::new();
        for (idx, archive) in self.archives.iter().enumerate() {
            let id = ArchiveId(idx);
            by_base_name
                .entry(archive.base_name.clone())
                .or_default()
                .push(id);
            by_identity
                .entry(archive.identity.clone())
                .or_default()
                .push(id);
        }

        Ok(ArchiveSet {
            archives: self.archives,
            by_base_name,
            by_identity,
        })
    }
}

/// The published registry of loaded archives.
///
/// Archives are stored in `(identity, version)` order; per-name registry
/// entries therefore list co-installed versions oldest first.
#[derive(Debug)]
pub struct ArchiveSet {
    archives: Vec<Archive>,
    by_base_name: BTreeMap<String, Vec<ArchiveId>>,
    by_identity: BTreeMap<String, Vec<ArchiveId>>,
}

impl ArchiveSet {
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ArchiveId> {
        (0..self.archives.len()).map(ArchiveId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchiveId, &Archive)> {
        self.archives
            .iter()
            .enumerate()
            .map(|(idx, archive)| (ArchiveId(idx), archive))
    }

    pub(crate) fn get_mut(&mut self, id: ArchiveId) -> &mut Archive {
        &mut self.archives[id.0]
    }

    /// Prune every archive's uses map so it only mentions packages a
    /// consumer can see: this archive's provided plus imported packages,
    /// minus the always-available prefixes.
    pub fn post_process_uses(&mut self, remove_prefixes: &[String]) {
        for archive in &mut self.archives {
            let retain: BTreeSet<PackageName> = archive
                .model
                .provided_packages()
                .iter()
                .cloned()
                .chain(archive.imports.keys().cloned())
                .collect();
            archive.model.post_process_uses(remove_prefixes, &retain);
        }
    }

    /// All loaded versions of an identity, oldest first.
    pub fn by_identity(&self, identity: &str) -> &[ArchiveId] {
        self.by_identity
            .get(identity)
            .map_or(&[], Vec::as_slice)
    }

    /// All loaded versions of a base name, oldest first.
    pub fn by_base_name(&self, base_name: &str) -> &[ArchiveId] {
        self.by_base_name
            .get(base_name)
            .map_or(&[], Vec::as_slice)
    }
}

impl Index<ArchiveId> for ArchiveSet {
    type Output = Archive;

    fn index(&self, id: ArchiveId) -> &Archive {
        &self.archives[id.0]
    }
}

#[cfg(test)]
pub(crate) mod testsupport {
    use super::{ArchiveInput, ArchiveSet, ArchiveSetBuilder};

    /// Input built from manifest attributes alone.
    pub(crate) fn input(file_name: &str, metadata: &[(&str, &str)]) -> ArchiveInput {
        ArchiveInput {
            file_name: file_name.to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            classes: Vec::new(),
        }
    }

    /// A registry loaded from `(file name, manifest attributes)` pairs.
    pub(crate) fn archive_set(specs: &[(&str, &[(&str, &str)])]) -> ArchiveSet {
        let mut builder = ArchiveSetBuilder::new();
        for (file_name, metadata) in specs {
            builder.add_input(input(file_name, metadata)).unwrap();
        }
        builder.build().unwrap()
    }
}
