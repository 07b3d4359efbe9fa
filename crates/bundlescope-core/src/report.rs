//! Boundary output for collaborator layers.
//!
//! Serializable summaries of an analyzed, resolved archive set, plus the
//! suggested export header a manifest generator would write. The engine
//! never prints or persists anything itself.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::archive::{Archive, ArchiveId, ArchiveSet};
use crate::header::{render_header, HeaderClause};
use crate::model::ActivatorDetection;
use crate::selector::select_providers;
use crate::version::Version;

/// Activator status of one archive.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActivatorReport {
    /// No activator detected or declared.
    None,
    /// Exactly one detected candidate; safe to auto-declare.
    Unique { class: String },
    /// Several candidates; needs a manual declaration.
    Ambiguous { candidates: Vec<String> },
}

impl From<ActivatorDetection> for ActivatorReport {
    fn from(detection: ActivatorDetection) -> Self {
        match detection {
            ActivatorDetection::None => Self::None,
            ActivatorDetection::Unique(class) => Self::Unique { class },
            ActivatorDetection::Ambiguous(candidates) => Self::Ambiguous {
                candidates: candidates.into_iter().collect(),
            },
        }
    }
}

/// One provider/consumer edge, by identity rather than internal id.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeReport {
    pub archive: String,
    pub version: String,
    pub capabilities: Vec<String>,
}

/// An import no loaded archive satisfies.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedReport {
    pub name: String,
    pub range: String,
}

/// Everything a collaborator needs to know about one archive.
#[derive(Debug, Serialize)]
pub struct ArchiveReport {
    pub identity: String,
    pub version: String,
    pub file_name: String,
    pub provided_packages: Vec<String>,
    pub activator: ActivatorReport,
    /// Referenced but not self-provided packages, always-available prefixes
    /// removed: the raw material for an import header.
    pub unprovided_referenced_packages: Vec<String>,
    pub providers: Vec<EdgeReport>,
    pub provided_to: Vec<EdgeReport>,
    pub unresolved_imports: Vec<UnresolvedReport>,
    /// Minimal build-dependency cover, in selection order.
    pub selected_dependencies: Vec<EdgeReport>,
}

/// Whole-run summary, one entry per archive in registry order.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub archives: Vec<ArchiveReport>,
}

impl AnalysisReport {
    /// Summarize a resolved archive set.
    ///
    /// `ignore_prefixes` names the always-available package namespaces left
    /// out of the unprovided-packages listing.
    pub fn from_archives(archives: &ArchiveSet, ignore_prefixes: &[String]) -> Self {
        let edge = |id: ArchiveId, capabilities: &BTreeSet<String>| -> EdgeReport {
            let provider = &archives[id];
            EdgeReport {
                archive: provider.identity.clone(),
                version: provider.version.to_string(),
                capabilities: capabilities.iter().cloned().collect(),
            }
        };

        let reports = archives
            .iter()
            .map(|(id, archive)| ArchiveReport {
                identity: archive.identity.clone(),
                version: archive.version.to_string(),
                file_name: archive.file_name.clone(),
                provided_packages: archive.model.provided_packages().iter().cloned().collect(),
                activator: archive.model.detect_activator().into(),
                unprovided_referenced_packages: archive
                    .model
                    .unprovided_referenced_packages(ignore_prefixes)
                    .into_iter()
                    .collect(),
                providers: archive
                    .providers
                    .iter()
                    .map(|(&provider, capabilities)| edge(provider, capabilities))
                    .collect(),
                provided_to: archive
                    .provided_to
                    .iter()
                    .map(|(&consumer, capabilities)| edge(consumer, capabilities))
                    .collect(),
                unresolved_imports: archive
                    .unresolved
                    .iter()
                    .map(|(name, range)| UnresolvedReport {
                        name: name.clone(),
                        range: range.to_string(),
                    })
                    .collect(),
                selected_dependencies: select_providers(archives, id)
                    .into_iter()
                    .map(|(provider, packages)| edge(provider, &packages))
                    .collect(),
            })
            .collect();

        Self { archives: reports }
    }
}

/// Render the export header a manifest generator would write for this
/// archive: each exported package with its version and, where the
/// post-processed uses map has entries, the uses directive.
pub fn suggested_export_header(archive: &Archive) -> Option<String> {
    if archive.exports.is_empty() {
        return None;
    }

    let clauses: Vec<HeaderClause> = archive
        .exports
        .iter()
        .map(|(package, version)| {
            let mut clause = HeaderClause::key(package.clone());
            if *version != Version::zero() {
                clause
                    .attributes
                    .insert("version".to_string(), version.to_string());
            }
            if let Some(used) = archive.model.uses().get(package) {
                let joined = used.iter().cloned().collect::<Vec<_>>().join(",");
                clause.directives.insert("uses".to_string(), joined);
            }
            clause
        })
        .collect();

    Some(render_header(&clauses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testsupport::archive_set;
    use crate::archive::{BUNDLE_VERSION, EXPORT_PACKAGE, IMPORT_PACKAGE, SYMBOLIC_NAME};
    use crate::header::parse_header;
    use crate::resolver::resolve_all;

    #[test]
    fn report_carries_edges_and_unresolved() {
        let mut set = archive_set(&[
            (
                "core-1.0.0.jar",
                &[
                    (SYMBOLIC_NAME, "core"),
                    (BUNDLE_VERSION, "1.0.0"),
                    (EXPORT_PACKAGE, "util;version=1.0.0"),
                ],
            ),
            (
                "app-1.0.0.jar",
                &[
                    (SYMBOLIC_NAME, "app"),
                    (BUNDLE_VERSION, "1.0.0"),
                    (IMPORT_PACKAGE, "util,gone.pkg;version=\"[9.0,10.0)\""),
                ],
            ),
        ]);
        resolve_all(&mut set);

        let report = AnalysisReport::from_archives(&set, &[]);
        let app = report
            .archives
            .iter()
            .find(|a| a.identity == "app")
            .unwrap();

        assert_eq!(app.providers.len(), 1);
        assert_eq!(app.providers[0].archive, "core");
        assert_eq!(app.providers[0].capabilities, vec!["util"]);
        assert_eq!(app.unresolved_imports.len(), 1);
        assert_eq!(app.unresolved_imports[0].name, "gone.pkg");
        assert_eq!(app.selected_dependencies.len(), 1);
        assert_eq!(app.selected_dependencies[0].archive, "core");

        let core = report
            .archives
            .iter()
            .find(|a| a.identity == "core")
            .unwrap();
        assert_eq!(core.provided_to.len(), 1);
        assert_eq!(core.provided_to[0].archive, "app");

        // The whole report serializes.
        serde_json::to_string(&report).unwrap();
    }

    #[test]
    fn suggested_header_round_trips_through_the_parser() {
        let set = archive_set(&[(
            "core-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "core"),
                (BUNDLE_VERSION, "1.0.0"),
                (EXPORT_PACKAGE, "com.x.util;version=2.0.0,com.x.io"),
            ],
        )]);
        let core = &set[set.by_identity("core")[0]];

        let header = suggested_export_header(core).unwrap();
        let clauses = parse_header(EXPORT_PACKAGE, &header).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].keys, vec!["com.x.io"]);
        assert_eq!(clauses[1].attribute("version"), Some("2.0.0"));
    }

    #[test]
    fn archives_without_exports_suggest_nothing() {
        let set = archive_set(&[(
            "app-1.0.0.jar",
            &[(SYMBOLIC_NAME, "app"), (BUNDLE_VERSION, "1.0.0")],
        )]);
        assert!(suggested_export_header(&set[set.by_identity("app")[0]]).is_none());
    }
}
