//! Per-archive package capability model.
//!
//! Aggregates what an archive's classes provide and what they reach for,
//! reduced to package granularity. Populated by [`ReferenceCollector`]
//! replaying class files, then post-processed so the uses map only mentions
//! packages meaningful to a consumer.

use std::collections::{BTreeMap, BTreeSet};

use crate::classfile::{parse_class, ClassAnalysisError, ClassVisitor};
use crate::{ClassName, PackageName};

/// Interfaces whose implementors are treated as archive activators.
pub const ACTIVATOR_INTERFACES: &[&str] = &["org.osgi.framework.BundleActivator"];

/// Convert an internal `a/b/C` name to its dotted `a.b.C` form.
pub fn dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

/// The package a dotted class name lives in; `None` for the default package.
pub fn package_of(class: &str) -> Option<&str> {
    class.rsplit_once('.').map(|(package, _)| package)
}

/// The immediately enclosing class of a nested class name, if any.
pub fn outer_class_of(class: &str) -> Option<&str> {
    class.rsplit_once('$').map(|(outer, _)| outer)
}

/// Outcome of activator detection over an archive's classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivatorDetection {
    /// No class implements an activator interface.
    None,
    /// Exactly one candidate; safe to auto-declare.
    Unique(ClassName),
    /// Several candidates; the declaration has to be made by hand.
    Ambiguous(BTreeSet<ClassName>),
}

/// Sorted capability sets for one archive.
#[derive(Debug, Clone, Default)]
pub struct CapabilityModel {
    provided_classes: BTreeSet<ClassName>,
    provided_packages: BTreeSet<PackageName>,
    activator_classes: BTreeSet<ClassName>,
    referenced_classes: BTreeSet<ClassName>,
    referenced_packages: BTreeSet<PackageName>,
    uses: BTreeMap<PackageName, BTreeSet<PackageName>>,
}

impl CapabilityModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a class this archive defines; its package becomes provided.
    pub fn add_provided_class(&mut self, class: &str) {
        if let Some(package) = package_of(class) {
            self.provided_packages.insert(package.to_string());
        }
        self.provided_classes.insert(class.to_string());
    }

    pub fn add_provided_package(&mut self, package: &str) {
        self.provided_packages.insert(package.to_string());
    }

    pub fn add_provided_activator_class(&mut self, class: &str) {
        self.activator_classes.insert(class.to_string());
    }

    /// Record a reference from `from_package` (None for the default
    /// package) to `class`. Default-package targets contribute no package
    /// bookkeeping.
    pub fn add_referenced_class(&mut self, from_package: Option<&str>, class: &str) {
        self.referenced_classes.insert(class.to_string());
        if let Some(package) = package_of(class) {
            self.referenced_packages.insert(package.to_string());
            if let Some(from) = from_package {
                self.uses
                    .entry(from.to_string())
                    .or_default()
                    .insert(package.to_string());
            }
        }
    }

    pub fn provided_classes(&self) -> &BTreeSet<ClassName> {
        &self.provided_classes
    }

    pub fn provided_packages(&self) -> &BTreeSet<PackageName> {
        &self.provided_packages
    }

    pub fn activator_classes(&self) -> &BTreeSet<ClassName> {
        &self.activator_classes
    }

    pub fn referenced_classes(&self) -> &BTreeSet<ClassName> {
        &self.referenced_classes
    }

    pub fn referenced_packages(&self) -> &BTreeSet<PackageName> {
        &self.referenced_packages
    }

    /// Per-package uses map: which packages code in a given package touches.
    pub fn uses(&self) -> &BTreeMap<PackageName, BTreeSet<PackageName>> {
        &self.uses
    }

    /// The 3-way activator decision for the caller: auto-declare, leave
    /// absent, or flag for manual resolution.
    pub fn detect_activator(&self) -> ActivatorDetection {
        let mut candidates = self.activator_classes.iter();
        match (candidates.next(), candidates.next()) {
            (None, _) => ActivatorDetection::None,
            (Some(single), None) => ActivatorDetection::Unique(single.clone()),
            (Some(_), Some(_)) => ActivatorDetection::Ambiguous(self.activator_classes.clone()),
        }
    }

    /// Prune the uses map for export annotation: drop self-references, drop
    /// always-available packages (prefix match), and keep only packages in
    /// `retain` (this archive's provided plus imported packages).
    pub fn post_process_uses(&mut self, remove_prefixes: &[String], retain: &BTreeSet<PackageName>) {
        let pruned: BTreeMap<PackageName, BTreeSet<PackageName>> = std::mem::take(&mut self.uses)
            .into_iter()
            .map(|(package, used)| {
                let kept: BTreeSet<PackageName> = used
                    .into_iter()
                    .filter(|target| {
                        *target != package
                            && !matches_prefix(target, remove_prefixes)
                            && retain.contains(target)
                    })
                    .collect();
                (package, kept)
            })
            .filter(|(_, kept)| !kept.is_empty())
            .collect();
        self.uses = pruned;
    }

    /// Packages this archive references but does not itself provide, with
    /// always-available packages removed. The raw material for an import
    /// header.
    pub fn unprovided_referenced_packages(
        &self,
        ignore_prefixes: &[String],
    ) -> BTreeSet<PackageName> {
        self.referenced_packages
            .iter()
            .filter(|package| {
                !self.provided_packages.contains(*package)
                    && !matches_prefix(package, ignore_prefixes)
            })
            .cloned()
            .collect()
    }
}

/// Whether `package` equals a prefix entry or sits below it.
fn matches_prefix(package: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        package == prefix
            || (package.len() > prefix.len()
                && package.starts_with(prefix)
                && package.as_bytes()[prefix.len()] == b'.')
    })
}

/// [`ClassVisitor`] that feeds a [`CapabilityModel`].
///
/// One collector is reused across all classes of an archive; `visit_class`
/// switches the referencing package.
#[derive(Debug, Default)]
pub struct ReferenceCollector {
    model: CapabilityModel,
    current_package: Option<PackageName>,
    current_class: Option<ClassName>,
}

impl ReferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one class and fold its capabilities into the model.
    ///
    /// # Errors
    ///
    /// Returns [`ClassAnalysisError`] on malformed class data; the caller
    /// aborts the archive's analysis.
    pub fn analyze(&mut self, class_bytes: &[u8]) -> Result<(), ClassAnalysisError> {
        parse_class(class_bytes, self)
    }

    pub fn into_model(self) -> CapabilityModel {
        self.model
    }

    fn reference(&mut self, internal_name: &str) {
        let class = dotted(internal_name);
        self.model
            .add_referenced_class(self.current_package.as_deref(), &class);
        if let Some(outer) = outer_class_of(&class) {
            self.model
                .add_referenced_class(self.current_package.as_deref(), outer);
        }
    }
}

impl ClassVisitor for ReferenceCollector {
    fn visit_class(&mut self, name: &str, _access_flags: u16) {
        let class = dotted(name);
        self.model.add_provided_class(&class);
        self.current_package = package_of(&class).map(str::to_string);
        self.current_class = Some(class);
    }

    fn visit_superclass(&mut self, name: &str) {
        self.reference(name);
    }

    fn visit_interface(&mut self, name: &str) {
        let interface = dotted(name);
        if ACTIVATOR_INTERFACES.contains(&interface.as_str()) {
            if let Some(class) = self.current_class.clone() {
                self.model.add_provided_activator_class(&class);
            }
        }
        self.reference(name);
    }

    fn visit_type_ref(&mut self, name: &str) {
        self.reference(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::testutil::ClassFileBuilder;

    fn analyzed(builders: Vec<ClassFileBuilder>) -> CapabilityModel {
        let mut collector = ReferenceCollector::new();
        for builder in builders {
            collector.analyze(&builder.build()).unwrap();
        }
        collector.into_model()
    }

    #[test]
    fn provided_and_referenced_packages() {
        let mut class = ClassFileBuilder::new("com/x/Widget", "java/lang/Object");
        class.add_field("items", "Ljava/util/List;");
        class.add_method("run", "(Lcom/y/Input;)V");
        let model = analyzed(vec![class]);

        assert!(model.provided_packages().contains("com.x"));
        assert!(model.provided_classes().contains("com.x.Widget"));
        for package in ["java.lang", "java.util", "com.y"] {
            assert!(model.referenced_packages().contains(package), "{package}");
        }
        let uses = model.uses().get("com.x").unwrap();
        assert!(uses.contains("java.util"));
        assert!(uses.contains("com.y"));
    }

    #[test]
    fn activator_interface_is_detected() {
        let mut class = ClassFileBuilder::new("com/x/Main", "java/lang/Object");
        class.add_interface("org/osgi/framework/BundleActivator");
        let model = analyzed(vec![class]);

        assert_eq!(
            model.detect_activator(),
            ActivatorDetection::Unique("com.x.Main".to_string())
        );
    }

    #[test]
    fn several_activators_are_ambiguous() {
        let mut a = ClassFileBuilder::new("com/x/A", "java/lang/Object");
        a.add_interface("org/osgi/framework/BundleActivator");
        let mut b = ClassFileBuilder::new("com/x/B", "java/lang/Object");
        b.add_interface("org/osgi/framework/BundleActivator");
        let model = analyzed(vec![a, b]);

        match model.detect_activator() {
            ActivatorDetection::Ambiguous(candidates) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn no_activator_by_default() {
        let class = ClassFileBuilder::new("com/x/Quiet", "java/lang/Object");
        assert_eq!(analyzed(vec![class]).detect_activator(), ActivatorDetection::None);
    }

    #[test]
    fn nested_class_reference_includes_outer() {
        let mut class = ClassFileBuilder::new("com/x/User", "java/lang/Object");
        class.add_field("entry", "Lcom/y/Outer$Inner;");
        let model = analyzed(vec![class]);

        assert!(model.referenced_classes().contains("com.y.Outer$Inner"));
        assert!(model.referenced_classes().contains("com.y.Outer"));
    }

    #[test]
    fn default_package_contributes_no_package() {
        let mut class = ClassFileBuilder::new("Standalone", "java/lang/Object");
        class.add_field("peer", "LOther;");
        let model = analyzed(vec![class]);

        assert!(model.provided_packages().is_empty());
        assert!(model.referenced_classes().contains("Other"));
        assert!(!model.referenced_packages().iter().any(|p| p.is_empty()));
        assert!(model.uses().is_empty());
    }

    #[test]
    fn post_process_prunes_uses() {
        let mut model = CapabilityModel::new();
        model.add_provided_class("com.x.A");
        model.add_referenced_class(Some("com.x"), "com.x.B"); // self
        model.add_referenced_class(Some("com.x"), "java.util.List"); // always available
        model.add_referenced_class(Some("com.x"), "com.y.C"); // retained
        model.add_referenced_class(Some("com.x"), "com.z.D"); // outside retain set

        let retain: BTreeSet<String> = ["com.x", "com.y"].iter().map(|s| s.to_string()).collect();
        model.post_process_uses(&["java".to_string()], &retain);

        assert_eq!(
            model.uses().get("com.x"),
            Some(&["com.y".to_string()].into_iter().collect())
        );
    }

    #[test]
    fn prefix_match_does_not_cross_segments() {
        assert!(matches_prefix("java.util", &["java".to_string()]));
        assert!(matches_prefix("java", &["java".to_string()]));
        assert!(!matches_prefix("javax.swing", &["java".to_string()]));
    }

    #[test]
    fn unprovided_referenced_packages_excludes_own() {
        let mut class = ClassFileBuilder::new("com/x/Widget", "java/lang/Object");
        class.add_field("peer", "Lcom/x/Peer;");
        class.add_field("input", "Lcom/y/Input;");
        let model = analyzed(vec![class]);

        let unprovided = model.unprovided_referenced_packages(&["java".to_string()]);
        assert_eq!(
            unprovided,
            ["com.y".to_string()].into_iter().collect::<BTreeSet<_>>()
        );
    }
}
