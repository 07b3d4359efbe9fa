//! Minimal provider selection.
//!
//! Picks, for one archive, a small non-redundant set of providers covering
//! every compile-time package it needs. Greedy approximate set cover:
//! redundancy-free with respect to earlier picks, not guaranteed optimal.

use std::collections::BTreeSet;

use tracing::debug;

use crate::archive::{ArchiveId, ArchiveSet};
use crate::PackageName;

/// Select providers for `consumer`'s compile-time dependencies.
///
/// Candidates are partitioned into preferred providers (interface-only:
/// exports packages, declares no activator) and the rest. Each partition is
/// ordered fewest-contributed-packages-first so narrow, unambiguous
/// providers are picked before broad ones; ties keep `(identity, version)`
/// order. A newly picked provider evicts earlier picks whose whole
/// contribution it subsumes, and selection stops as soon as every needed
/// package is covered.
///
/// Returns the picks in selection order, each with the package set that
/// justifies it.
pub fn select_providers(
    archives: &ArchiveSet,
    consumer: ArchiveId,
) -> Vec<(ArchiveId, BTreeSet<PackageName>)> {
    let archive = &archives[consumer];

    let mut needed: BTreeSet<&PackageName> =
        archive.ct_providers.values().flatten().collect();

    let mut preferred = Vec::new();
    let mut other = Vec::new();
    for (&candidate, packages) in &archive.ct_providers {
        let provider = &archives[candidate];
        let interface_only =
            provider.declared_activator.is_none() && !provider.exports.is_empty();
        if interface_only {
            preferred.push((candidate, packages));
        } else {
            other.push((candidate, packages));
        }
    }
    // Stable sort: equal sizes keep the map's (identity, version) order.
    preferred.sort_by_key(|(_, packages)| packages.len());
    other.sort_by_key(|(_, packages)| packages.len());

    let mut selected: Vec<(ArchiveId, BTreeSet<PackageName>)> = Vec::new();
    for (candidate, packages) in preferred.into_iter().chain(other) {
        if needed.is_empty() {
            break;
        }
        if !packages.iter().any(|package| needed.contains(package)) {
            continue;
        }
        for package in packages {
            needed.remove(package);
        }
        selected.retain(|(kept, contribution)| {
            if contribution.is_subset(packages) {
                debug!(
                    evicted = %archives[*kept].identity,
                    by = %archives[candidate].identity,
                    "dropping subsumed provider"
                );
                false
            } else {
                true
            }
        });
        selected.push((candidate, packages.clone()));
    }

    selected
}
