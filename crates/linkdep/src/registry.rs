//! Module registry
//!
//! The registry is the single source of truth for module names, attributes
//! and declared dependencies. Registration must be complete before any
//! resolution starts; resolution only ever borrows the registry immutably.

use crate::attribute::{Attribute, Attributes};
use crate::module::{ModuleRecord, ModuleRef};
use crate::overrides::Overrides;
use crate::resolver::{LinkOrder, LinkOrderResolver, ResolverError};
use crate::tree::DependencyTree;
use crate::verify::{verify_order, Verification};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while registering modules
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A module name was registered twice
    #[error("Module {0} was already registered")]
    DuplicateModule(String),

    /// The module was never registered
    #[error("Module {0} was not registered")]
    UnknownModule(String),
}

/// Registered modules, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: IndexMap<String, ModuleRecord>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module
    ///
    /// Fails with [`RegistryError::DuplicateModule`] if the name is taken.
    /// Unknown attribute tokens are logged and kept.
    pub fn register(&mut self, record: ModuleRecord) -> Result<(), RegistryError> {
        if self.modules.contains_key(&record.name) {
            return Err(RegistryError::DuplicateModule(record.name));
        }

        warn_unknown(&record.name, &record.attributes);
        if record.attributes.contains(&Attribute::External) {
            warn!(
                "Module '{}' is registered with attribute 'external', which has no effect at registration",
                record.name
            );
        }
        for dependency in &record.dependencies {
            warn_unknown(dependency.name(), dependency.attributes());
        }

        debug!(
            "Registered '{}' with {} dependencies",
            record.name,
            record.dependencies.len()
        );
        self.modules.insert(record.name.clone(), record);
        Ok(())
    }

    /// Register a module from its parts
    pub fn register_module<I, D>(
        &mut self,
        name: impl Into<String>,
        dependencies: I,
        attributes: Attributes,
    ) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = D>,
        D: Into<ModuleRef>,
    {
        self.register(
            ModuleRecord::new(name)
                .with_dependencies(dependencies)
                .with_attributes(attributes),
        )
    }

    /// Append dependencies to an already registered module
    ///
    /// Used when a module declares an interface and the implementation is
    /// chosen after registration.
    pub fn add_dependencies<I, D>(&mut self, name: &str, dependencies: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = D>,
        D: Into<ModuleRef>,
    {
        let record = self
            .modules
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;

        for dependency in dependencies {
            let dependency = dependency.into();
            warn_unknown(dependency.name(), dependency.attributes());
            record.dependencies.push(dependency);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All records in registration order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    /// Attributes the module was registered with
    pub fn attributes_of(&self, name: &str) -> Option<&Attributes> {
        self.modules.get(name).map(|record| &record.attributes)
    }

    /// Declared dependencies (empty for unregistered modules)
    pub fn dependencies_of(&self, name: &str) -> &[ModuleRef] {
        self.modules
            .get(name)
            .map(|record| record.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Declared dependencies with overrides applied
    pub fn overridden_dependencies_of(&self, name: &str, overrides: &Overrides) -> Vec<ModuleRef> {
        overrides.apply(self.dependencies_of(name))
    }

    /// Dependencies marked `always_link`, with overrides applied
    pub fn always_link_dependencies_of(&self, name: &str, overrides: &Overrides) -> Vec<ModuleRef> {
        let Some(record) = self.modules.get(name) else {
            return Vec::new();
        };
        record
            .dependencies_with(&Attribute::AlwaysLink)
            .filter_map(|dependency| overrides.apply_one(dependency))
            .collect()
    }

    /// Resolve the link order for building `roots`
    ///
    /// Each root is started as a `header_only` reference and is never linked
    /// against itself. Fails if a root was never registered.
    pub fn resolve_link_order<I, S>(
        &self,
        roots: I,
        overrides: &Overrides,
    ) -> Result<LinkOrder, ResolverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roots: Vec<String> = roots.into_iter().map(|r| r.as_ref().to_string()).collect();
        if roots.is_empty() {
            return Err(ResolverError::NoRoots);
        }
        if let Some(unknown) = roots.iter().find(|root| !self.contains(root)) {
            return Err(ResolverError::UnknownRoot(unknown.clone()));
        }

        let start: Vec<ModuleRef> = roots
            .iter()
            .map(|root| ModuleRef::new(root.as_str()).with_attribute(Attribute::HeaderOnly))
            .collect();

        Ok(LinkOrderResolver::new(self)
            .with_overrides(overrides.clone())
            .with_roots(roots)
            .resolve_modules(&start))
    }

    /// Check an order against the link-safety rule
    pub fn verify_order(&self, order: &[ModuleRef], overrides: &Overrides) -> Verification {
        verify_order(self, order, overrides)
    }

    /// Render the dependency tree of `roots` as a Mermaid flowchart
    pub fn dependency_tree<I, S>(&self, roots: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DependencyTree::new(self, roots).to_string()
    }
}

fn warn_unknown(name: &str, attributes: &Attributes) {
    let unknown = attributes.unknown();
    if !unknown.is_empty() {
        warn!("'{}' has unknown attributes {:?}", name, unknown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(modules: &[ModuleRef]) -> Vec<&str> {
        modules.iter().map(ModuleRef::name).collect()
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = Registry::new();
        registry
            .register(ModuleRecord::new("double_lib"))
            .unwrap();

        let err = registry
            .register(ModuleRecord::new("double_lib"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModule("double_lib".to_string()));
        assert!(err.to_string().contains("double_lib"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dependencies_of_unregistered_module() {
        let registry = Registry::new();

        assert!(registry.dependencies_of("bernd").is_empty());
        assert!(registry
            .overridden_dependencies_of("bernd", &Overrides::new())
            .is_empty());
    }

    #[test]
    fn test_overridden_dependencies() {
        let mut registry = Registry::new();
        registry
            .register_module("dep1", ["dep2", "dep3", "dep4"], Attributes::new())
            .unwrap();

        let plain = registry.overridden_dependencies_of("dep1", &Overrides::new());
        assert_eq!(names(&plain), vec!["dep2", "dep3", "dep4"]);

        let elided = registry.overridden_dependencies_of("dep1", &Overrides::new().elide("dep3"));
        assert_eq!(names(&elided), vec!["dep2", "dep4"]);

        let replaced =
            registry.overridden_dependencies_of("dep1", &Overrides::new().replace("dep3", "Joachim"));
        assert_eq!(names(&replaced), vec!["dep2", "Joachim", "dep4"]);
        assert!(replaced[1].has(&Attribute::Overridden));
    }

    #[test]
    fn test_add_dependencies() {
        let mut registry = Registry::new();
        registry.register(ModuleRecord::new("hal")).unwrap();

        registry.add_dependencies("hal", ["hal_stm32"]).unwrap();
        assert_eq!(names(registry.dependencies_of("hal")), vec!["hal_stm32"]);

        let err = registry.add_dependencies("nope", ["x"]).unwrap_err();
        assert_eq!(err, RegistryError::UnknownModule("nope".to_string()));
    }

    #[test]
    fn test_always_link_dependencies_follow_overrides() {
        let mut registry = Registry::new();
        registry
            .register(ModuleRecord::new("app").with_dependencies([
                ModuleRef::new("init").with_attribute(Attribute::AlwaysLink),
                ModuleRef::new("util"),
            ]))
            .unwrap();

        let forced = registry.always_link_dependencies_of("app", &Overrides::new());
        assert_eq!(names(&forced), vec!["init"]);

        let forced = registry.always_link_dependencies_of("app", &Overrides::new().replace("init", "init_mock"));
        assert_eq!(names(&forced), vec!["init_mock"]);

        let forced = registry.always_link_dependencies_of("app", &Overrides::new().elide("init"));
        assert!(forced.is_empty());
    }

    #[test]
    fn test_unknown_attributes_are_accepted() {
        let mut registry = Registry::new();
        registry
            .register_module("odd", Vec::<ModuleRef>::new(), Attributes::parse(["shiny"]))
            .unwrap();

        assert_eq!(registry.attributes_of("odd").unwrap().unknown(), vec!["shiny"]);
    }

    #[test]
    fn test_resolve_unknown_root() {
        let registry = Registry::new();

        let err = registry
            .resolve_link_order(["ghost"], &Overrides::new())
            .unwrap_err();
        assert_eq!(err, ResolverError::UnknownRoot("ghost".to_string()));
    }

    #[test]
    fn test_resolve_without_roots() {
        let registry = Registry::new();

        let err = registry
            .resolve_link_order(Vec::<String>::new(), &Overrides::new())
            .unwrap_err();
        assert_eq!(err, ResolverError::NoRoots);
    }
}
