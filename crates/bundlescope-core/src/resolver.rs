//! Cross-archive resolution.
//!
//! Two phases with a hard barrier between them: every archive's exports are
//! folded into an [`ExportIndex`] first, then every archive's imports are
//! matched against the finished index. The builder is consumed by
//! [`ExportIndexBuilder::finish`], so nothing can write to an index that is
//! already being read.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::archive::{ArchiveId, ArchiveSet};
use crate::version::{Version, VersionRange};

type VersionedProviders = BTreeMap<Version, BTreeSet<ArchiveId>>;

/// Write phase of the export index.
#[derive(Debug, Default)]
pub struct ExportIndexBuilder {
    packages: BTreeMap<String, VersionedProviders>,
    services: BTreeMap<String, VersionedProviders>,
}

impl ExportIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, name: &str, version: Version, provider: ArchiveId) {
        self.packages
            .entry(name.to_string())
            .or_default()
            .entry(version)
            .or_default()
            .insert(provider);
    }

    pub fn add_service(&mut self, name: &str, version: Version, provider: ArchiveId) {
        self.services
            .entry(name.to_string())
            .or_default()
            .entry(version)
            .or_default()
            .insert(provider);
    }

    /// Fold every archive's exported capabilities into the builder.
    pub fn add_archives(&mut self, archives: &ArchiveSet) {
        for (id, archive) in archives.iter() {
            for (name, version) in &archive.exports {
                self.add_package(name, version.clone(), id);
            }
            for (name, version) in &archive.service_exports {
                self.add_service(name, version.clone(), id);
            }
        }
    }

    /// Seal the index for the read phase.
    pub fn finish(self) -> ExportIndex {
        ExportIndex {
            packages: self.packages,
            services: self.services,
        }
    }
}

/// Read-only capability index: name -> version -> providing archives.
#[derive(Debug)]
pub struct ExportIndex {
    packages: BTreeMap<String, VersionedProviders>,
    services: BTreeMap<String, VersionedProviders>,
}

impl ExportIndex {
    pub fn package_versions(&self, name: &str) -> Option<&VersionedProviders> {
        self.packages.get(name)
    }

    pub fn service_versions(&self, name: &str) -> Option<&VersionedProviders> {
        self.services.get(name)
    }
}

/// One import-to-export match found during the read phase.
struct Edge {
    consumer: ArchiveId,
    provider: ArchiveId,
    name: String,
    /// Package the consumer does not itself export: a compile-time
    /// dependency that must appear on the consumer's build path.
    compile_time: bool,
}

/// Resolve every archive's imports against every archive's exports.
///
/// Starts from a clean slate: all provider / provided-to / unresolved state
/// is cleared first, so repeated runs over the same set are idempotent and
/// a run after loading more archives sees everything. All matching
/// providers are recorded, not just one; output determinism comes from the
/// sorted maps, not from resolution order.
pub fn resolve_all(archives: &mut ArchiveSet) {
    for id in archives.ids().collect::<Vec<_>>() {
        archives.get_mut(id).clear_resolution();
    }

    let mut builder = ExportIndexBuilder::new();
    builder.add_archives(archives);
    let index = builder.finish();

    let mut edges: Vec<Edge> = Vec::new();
    let mut unresolved: Vec<(ArchiveId, String, VersionRange)> = Vec::new();

    for (consumer, archive) in archives.iter() {
        for (name, import) in &archive.imports {
            let mut matched = false;
            if let Some(versions) = index.package_versions(name) {
                for (version, providers) in versions {
                    if !import.range.contains(version) {
                        continue;
                    }
                    for &provider in providers {
                        matched = true;
                        edges.push(Edge {
                            consumer,
                            provider,
                            name: name.clone(),
                            compile_time: !archive.exports.contains_key(name),
                        });
                    }
                }
            }
            if !matched {
                unresolved.push((consumer, name.clone(), import.range.clone()));
            }
        }

        for (name, import) in &archive.service_imports {
            let mut matched = false;
            if let Some(versions) = index.service_versions(name) {
                for (version, providers) in versions {
                    if !import.range.contains(version) {
                        continue;
                    }
                    for &provider in providers {
                        matched = true;
                        edges.push(Edge {
                            consumer,
                            provider,
                            name: name.clone(),
                            compile_time: false,
                        });
                    }
                }
            }
            if !matched {
                unresolved.push((consumer, name.clone(), import.range.clone()));
            }
        }
    }

    debug!(
        archives = archives.len(),
        edges = edges.len(),
        unresolved = unresolved.len(),
        "resolution finished"
    );

    for (consumer, name, range) in unresolved {
        archives.get_mut(consumer).unresolved.insert(name, range);
    }
    for edge in edges {
        let consumer = archives.get_mut(edge.consumer);
        consumer
            .providers
            .entry(edge.provider)
            .or_default()
            .insert(edge.name.clone());
        if edge.compile_time {
            consumer
                .ct_providers
                .entry(edge.provider)
                .or_default()
                .insert(edge.name.clone());
        }
        archives
            .get_mut(edge.provider)
            .provided_to
            .entry(edge.consumer)
            .or_default()
            .insert(edge.name);
    }
}
