//! Link order resolution
//!
//! Turns a [`DependencyMap`] into a linear sequence of modules that a
//! single-pass linker can consume. Cycles are broken by emitting a module
//! more than once. The list is accumulated deepest layer first and reversed
//! at the end, so "later in the forward order" means "earlier in the
//! accumulator".

use crate::attribute::Attribute;
use crate::depmap::DependencyMap;
use crate::module::ModuleRef;
use crate::overrides::Overrides;
use crate::registry::Registry;
use crate::unique::UniqueList;
use crate::verify::{verify_order, Verification};
use std::fmt;
use std::ops::Deref;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Errors that can occur when requesting a link order
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// A requested root was never registered
    #[error("Root module {0} was never registered")]
    UnknownRoot(String),

    /// The request named no root at all
    #[error("No root modules given")]
    NoRoots,
}

/// Resolved link order
///
/// Duplicates are expected when the registry contains cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkOrder {
    modules: Vec<ModuleRef>,

    /// Result of the post-condition check, if it ran
    verification: Option<Verification>,
}

impl LinkOrder {
    pub fn new(modules: Vec<ModuleRef>) -> Self {
        Self {
            modules,
            verification: None,
        }
    }

    pub fn as_slice(&self) -> &[ModuleRef] {
        &self.modules
    }

    pub fn into_modules(self) -> Vec<ModuleRef> {
        self.modules
    }

    /// Module names in link order
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(ModuleRef::name).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModuleRef> {
        self.modules.iter()
    }

    /// Outcome of the resolver's own check (`None` if it was disabled)
    pub fn verification(&self) -> Option<&Verification> {
        self.verification.as_ref()
    }
}

impl Deref for LinkOrder {
    type Target = [ModuleRef];

    fn deref(&self) -> &Self::Target {
        &self.modules
    }
}

impl<'a> IntoIterator for &'a LinkOrder {
    type Item = &'a ModuleRef;
    type IntoIter = std::slice::Iter<'a, ModuleRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

/// Reason a module is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dependent<'a> {
    /// Part of the start set without being a declared root
    RootRequirement,

    /// Declared as a dependency of this module
    Module(&'a str),
}

impl fmt::Display for Dependent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependent::RootRequirement => f.write_str("root_requirement"),
            Dependent::Module(name) => f.write_str(name),
        }
    }
}

/// Link order resolver
///
/// Root modules are the targets being built. They are resolved like any
/// other module, but never emitted for linking; each root instead ends up as
/// a single `header_only` entry at the front of the order.
pub struct LinkOrderResolver<'r> {
    registry: &'r Registry,
    overrides: Overrides,
    roots: UniqueList<String>,
    verify: bool,
}

impl<'r> LinkOrderResolver<'r> {
    /// Create a resolver over `registry` without roots or overrides
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            overrides: Overrides::new(),
            roots: UniqueList::new(),
            verify: true,
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Declare a root module
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.insert(root.into());
        self
    }

    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Enable or disable the post-condition check in [`Self::resolve_modules`]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Resolve the link order for a start set
    ///
    /// Overrides are applied to `modules` before traversal. When verification
    /// is enabled, the result is checked with the start set placed both in
    /// front of and behind it, so dependencies pointing back at the start
    /// set are accepted.
    pub fn resolve_modules(&self, modules: &[ModuleRef]) -> LinkOrder {
        let start = self.overrides.apply(modules);
        let map = DependencyMap::build(self.registry, &start, &self.overrides);
        trace!("Dependency map:\n{}", map);

        let mut order = self.resolve(&map);
        debug!("Resolved link order {:?}", order.names());

        if self.verify {
            let bracketed: Vec<ModuleRef> = start
                .iter()
                .chain(order.iter())
                .chain(start.iter())
                .cloned()
                .collect();
            let verification = verify_order(self.registry, &bracketed, &self.overrides);
            if let Some(violation) = verification.first_violation() {
                error!(
                    "Resolved order {:?} is not link-safe: {}",
                    order.names(),
                    violation
                );
            }
            order.verification = Some(verification);
        }

        order
    }

    /// Resolve the link order from a prepared dependency map
    pub fn resolve(&self, map: &DependencyMap) -> LinkOrder {
        let mut list = Vec::new();

        for (depth, modules) in map.layers().iter().rev() {
            trace!("Depth {}", depth);
            for module in modules {
                self.resolve_module(map, module, *depth, &mut list);
            }
        }

        for root in &self.roots {
            list.push(ModuleRef::new(root.as_str()).with_attribute(Attribute::HeaderOnly));
        }

        list.reverse();
        LinkOrder::new(list)
    }

    fn resolve_module(
        &self,
        map: &DependencyMap,
        module: &ModuleRef,
        depth: usize,
        list: &mut Vec<ModuleRef>,
    ) {
        let name = module.name();
        let is_root = self.is_root(name);

        let mut wanted_by = Vec::new();
        if depth == 0 && !is_root {
            wanted_by.push(Dependent::RootRequirement);
        }
        if let Some(dependents) = map.dependents_of(name) {
            wanted_by.extend(dependents.iter().map(|d| Dependent::Module(d.as_str())));
        }
        if wanted_by.is_empty() && !is_root {
            warn!("'{}' is in the dependency map, but wanted by no other module", name);
        }

        let wants = self.registry.overridden_dependencies_of(name, &self.overrides);
        trace!(
            "\t{} wants {:?}, wanted by [{}]",
            module,
            wants.iter().map(ModuleRef::name).collect::<Vec<_>>(),
            wanted_by
                .iter()
                .map(Dependent::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let always = self
            .registry
            .always_link_dependencies_of(name, &self.overrides)
            .into_iter()
            .filter(|dependency| !self.is_root(dependency.name()));
        list.extend(always);

        let window_start = first_position(list, name).unwrap_or(0);
        let mut unsatisfied: UniqueList<ModuleRef> = wants
            .iter()
            .filter(|dependency| !self.is_root(dependency.name()))
            .filter(|dependency| !contains_name(&list[window_start..], dependency.name()))
            .cloned()
            .collect();

        if !unsatisfied.is_empty() {
            self.with_forced_dependencies(&mut unsatisfied);
            trace!("\tAdding unsatisfied dependencies {:?}", unsatisfied);
            list.extend(unsatisfied);
        }

        if is_root {
            return;
        }

        let pending = wanted_by.iter().any(|dependent| match dependent {
            Dependent::RootRequirement => true,
            Dependent::Module(name) => !contains_name(list, name),
        });

        if pending {
            trace!("\tA module that needs '{}' is still to come, adding it", name);
            list.push(module.clone());
        } else if self.is_stale(list, name, &wants) {
            trace!("\tDependencies of '{}' were added behind its last emission, adding it again", name);
            list.push(module.clone());
        } else {
            trace!("\tAll modules that need '{}' were already emitted, skipping", name);
        }
    }

    /// Pull in the `always_link` dependencies of every entry, transitively
    fn with_forced_dependencies(&self, modules: &mut UniqueList<ModuleRef>) {
        let mut index = 0;
        while let Some(module) = modules.get(index) {
            let forced = self
                .registry
                .always_link_dependencies_of(module.name(), &self.overrides);
            for dependency in forced {
                if !self.is_root(dependency.name()) {
                    modules.insert(dependency);
                }
            }
            index += 1;
        }
    }

    /// Whether the module's link-relevant occurrence misses a dependency
    ///
    /// The last entry in the accumulator becomes the first one in the forward
    /// order, and only that one is checked by the verifier.
    fn is_stale(&self, list: &[ModuleRef], name: &str, wants: &[ModuleRef]) -> bool {
        let Some(last) = last_position(list, name) else {
            return false;
        };
        let before = &list[..=last];
        wants
            .iter()
            .filter(|dependency| !self.is_root(dependency.name()))
            .any(|dependency| !contains_name(before, dependency.name()))
    }

    fn is_root(&self, name: &str) -> bool {
        self.roots.contains(name)
    }
}

fn first_position(list: &[ModuleRef], name: &str) -> Option<usize> {
    list.iter().position(|module| module.name() == name)
}

fn last_position(list: &[ModuleRef], name: &str) -> Option<usize> {
    list.iter().rposition(|module| module.name() == name)
}

fn contains_name(list: &[ModuleRef], name: &str) -> bool {
    list.iter().any(|module| module.name() == name)
}
