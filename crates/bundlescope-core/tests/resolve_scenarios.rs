//! Full-pipeline scenarios: load from boundary inputs, resolve, select.

use std::collections::BTreeMap;

use bundlescope_core::archive::{
    ArchiveInput, ArchiveSet, ArchiveSetBuilder, BUNDLE_VERSION, EXPORT_PACKAGE, IMPORT_PACKAGE,
    SYMBOLIC_NAME,
};
use bundlescope_core::resolver::resolve_all;
use bundlescope_core::selector::select_providers;

fn input(file_name: &str, metadata: &[(&str, &str)]) -> ArchiveInput {
    ArchiveInput {
        file_name: file_name.to_string(),
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        classes: Vec::new(),
    }
}

fn resolved(inputs: Vec<ArchiveInput>) -> ArchiveSet {
    let mut builder = ArchiveSetBuilder::new();
    for i in inputs {
        builder.add_input(i).unwrap();
    }
    let mut archives = builder.build().unwrap();
    resolve_all(&mut archives);
    archives
}

#[test]
fn provider_and_consumer_see_each_other() {
    let archives = resolved(vec![
        input(
            "core-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "core"),
                (BUNDLE_VERSION, "1.0.0"),
                (EXPORT_PACKAGE, "util;version=1.0.0"),
            ],
        ),
        input(
            "app-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "app"),
                (BUNDLE_VERSION, "1.0.0"),
                (IMPORT_PACKAGE, "util;version=\"[1.0.0,2.0.0)\""),
            ],
        ),
    ]);

    let app = archives.by_identity("app")[0];
    let core = archives.by_identity("core")[0];

    assert!(archives[app].providers[&core].contains("util"));
    assert!(archives[core].provided_to[&app].contains("util"));
    assert!(archives[app].unresolved.is_empty());
}

#[test]
fn unsatisfied_import_is_data_not_an_error() {
    let archives = resolved(vec![
        input(
            "core-1.0.0.jar",
            &[(SYMBOLIC_NAME, "core"), (BUNDLE_VERSION, "1.0.0")],
        ),
        input(
            "app-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "app"),
                (BUNDLE_VERSION, "1.0.0"),
                (IMPORT_PACKAGE, "missing.pkg;version=\"[1.0.0,1.0.0]\""),
            ],
        ),
    ]);

    let app = archives.by_identity("app")[0];
    assert_eq!(archives[app].unresolved.len(), 1);
    assert_eq!(
        archives[app].unresolved["missing.pkg"].to_string(),
        "[1.0.0,1.0.0]"
    );
    assert!(archives[app].providers.is_empty());
}

#[test]
fn equivalent_providers_yield_a_single_build_dependency() {
    let archives = resolved(vec![
        input(
            "apiA-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "apiA"),
                (BUNDLE_VERSION, "1.0.0"),
                (EXPORT_PACKAGE, "x;version=1.0.0"),
            ],
        ),
        input(
            "apiB-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "apiB"),
                (BUNDLE_VERSION, "1.0.0"),
                (EXPORT_PACKAGE, "x;version=1.0.0"),
            ],
        ),
        input(
            "consumer-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "consumer"),
                (BUNDLE_VERSION, "1.0.0"),
                (IMPORT_PACKAGE, "x"),
            ],
        ),
    ]);

    let consumer = archives.by_identity("consumer")[0];
    // Both providers are recorded in the graph...
    assert_eq!(archives[consumer].providers.len(), 2);
    // ...but only one becomes a declared build dependency.
    assert_eq!(select_providers(&archives, consumer).len(), 1);
}

#[test]
fn two_versions_of_one_identity_coexist() {
    let archives = resolved(vec![
        input(
            "lib-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "lib"),
                (BUNDLE_VERSION, "1.0.0"),
                (EXPORT_PACKAGE, "lib.api;version=1.0.0"),
            ],
        ),
        input(
            "lib-2.0.0.jar",
            &[
                (SYMBOLIC_NAME, "lib"),
                (BUNDLE_VERSION, "2.0.0"),
                (EXPORT_PACKAGE, "lib.api;version=2.0.0"),
            ],
        ),
        input(
            "old-client-1.0.0.jar",
            &[
                (SYMBOLIC_NAME, "old-client"),
                (BUNDLE_VERSION, "1.0.0"),
                (IMPORT_PACKAGE, "lib.api;version=\"[1.0.0,2.0.0)\""),
            ],
        ),
    ]);

    let versions = archives.by_identity("lib");
    assert_eq!(versions.len(), 2);

    // Only the in-range version provides to the old client.
    let client = archives.by_identity("old-client")[0];
    assert_eq!(archives[client].providers.len(), 1);
    let (&provider, _) = archives[client].providers.iter().next().unwrap();
    assert_eq!(archives[provider].version.to_string(), "1.0.0");
}
