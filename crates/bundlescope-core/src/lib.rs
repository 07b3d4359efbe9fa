//! bundlescope-core - capability extraction and cross-archive resolution.
//!
//! The engine is batch-oriented and pure: callers hand it per-archive
//! metadata, declared capability headers, and compiled class bytes; it hands
//! back export/import models, a cross-archive provider graph, and a minimal
//! provider cover per archive. All file, zip, and terminal concerns live in
//! the collaborator layer (`bundlescope-cli`).

pub mod archive;
pub mod capability;
pub mod classfile;
pub mod header;
pub mod model;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod version;

pub use archive::{Archive, ArchiveId, ArchiveInput, ArchiveSet, ArchiveSetBuilder};
pub use capability::{CapabilityEntry, VersionConstraint};
pub use header::HeaderClause;
pub use model::{ActivatorDetection, CapabilityModel};
pub use version::{Version, VersionRange};

/// A dot-separated package name, e.g. `org.example.util`.
pub type PackageName = String;

/// A dot-separated fully qualified class name, e.g. `org.example.util.Sets`.
pub type ClassName = String;
