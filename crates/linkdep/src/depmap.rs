//! Dependency map
//!
//! Breadth-first traversal of the registry from a start set. The forward map
//! tags every reachable module with the minimum depth it was reached at; the
//! reverse map records which modules want each module.
//!
//! Cycles are expected. The traversal stops once a whole round neither
//! discovers a module nor records a new dependent. Cycles that alternate
//! between two modules more than once (`a1 -> b1 -> a2 -> b2`) are only
//! modelled for the first three nodes. Such modules should be merged into a
//! single library instead.

use crate::module::ModuleRef;
use crate::overrides::Overrides;
use crate::registry::Registry;
use crate::unique::UniqueList;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Modules that want a given module
pub type Dependents = UniqueList<String>;

/// Forward and reverse view of the dependencies reachable from a start set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyMap {
    /// Module → minimum depth (0 for the start set)
    forward: IndexMap<ModuleRef, usize>,

    /// Module name → names of the modules that depend on it
    reverse: IndexMap<String, Dependents>,
}

impl DependencyMap {
    /// Traverse the registry starting at `modules`
    ///
    /// Dependencies are override-resolved at every step, so replacements are
    /// followed transitively. The start modules are taken as given.
    pub fn build(registry: &Registry, modules: &[ModuleRef], overrides: &Overrides) -> Self {
        let mut map = DependencyMap::default();
        let mut frontier = UniqueList::new();
        for module in modules {
            frontier.insert(module.clone());
            map.forward.entry(module.clone()).or_insert(0);
        }

        let mut depth = 0;
        loop {
            depth += 1;
            let (discovered, dependents) = next_level(registry, &frontier, overrides);
            trace!("Level {}: discovered {:?}", depth, discovered);

            let known_before = map.forward.len();
            map.merge_level(&discovered, depth);

            let mut added_dependent = false;
            for (module, wanted_by) in dependents {
                for dependent in wanted_by {
                    added_dependent |= map.add_dependent(&module, dependent);
                }
            }

            if map.forward.len() == known_before && !added_dependent {
                debug!(
                    "Dependency map converged after {} levels with {} modules",
                    depth,
                    map.forward.len()
                );
                break;
            }

            frontier = discovered;
        }

        map
    }

    /// Tag each module with `depth` unless it was reached at a smaller depth
    fn merge_level(&mut self, level: &UniqueList<ModuleRef>, depth: usize) {
        for module in level {
            let entry = self.forward.entry(module.clone()).or_insert(depth);
            *entry = (*entry).min(depth);
        }
    }

    /// Record that `dependent` wants `module`, returning `true` if the edge is new
    fn add_dependent(&mut self, module: &str, dependent: String) -> bool {
        self.reverse
            .entry(module.to_string())
            .or_default()
            .insert(dependent)
    }

    /// Minimum depth at which `name` was reached
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.forward.get(name).copied()
    }

    /// Modules that want `name`
    pub fn dependents_of(&self, name: &str) -> Option<&Dependents> {
        self.reverse.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.forward.contains_key(name)
    }

    /// Number of reachable modules
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Reachable modules with their depth, in discovery order
    pub fn forward(&self) -> impl Iterator<Item = (&ModuleRef, usize)> {
        self.forward.iter().map(|(module, depth)| (module, *depth))
    }

    /// Every module with its dependents, in discovery order
    pub fn reverse(&self) -> impl Iterator<Item = (&str, &Dependents)> {
        self.reverse
            .iter()
            .map(|(module, dependents)| (module.as_str(), dependents))
    }

    /// Deepest level reached
    pub fn max_depth(&self) -> Option<usize> {
        self.forward.values().copied().max()
    }

    /// Group modules by depth, keeping discovery order within a layer
    pub fn layers(&self) -> BTreeMap<usize, UniqueList<ModuleRef>> {
        let mut layers: BTreeMap<usize, UniqueList<ModuleRef>> = BTreeMap::new();
        for (module, depth) in &self.forward {
            layers.entry(*depth).or_default().insert(module.clone());
        }
        layers
    }
}

/// Collect the override-resolved dependencies of every module in `frontier`
///
/// Returns the unique dependencies of this level and, per dependency, the
/// frontier modules that want it.
fn next_level(
    registry: &Registry,
    frontier: &UniqueList<ModuleRef>,
    overrides: &Overrides,
) -> (UniqueList<ModuleRef>, IndexMap<String, Dependents>) {
    let mut discovered = UniqueList::new();
    let mut dependents: IndexMap<String, Dependents> = IndexMap::new();

    for module in frontier {
        let dependencies = registry.overridden_dependencies_of(module.name(), overrides);
        if dependencies.is_empty() {
            trace!("'{}' has no dependencies, skipping", module.name());
            continue;
        }

        for dependency in dependencies {
            dependents
                .entry(dependency.name().to_string())
                .or_default()
                .insert(module.name().to_string());
            discovered.insert(dependency);
        }
    }

    (discovered, dependents)
}

impl fmt::Display for DependencyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forward:")?;
        for (module, depth) in &self.forward {
            writeln!(f, "\t{} ({})", module, depth)?;
        }
        writeln!(f, "Reverse:")?;
        for (module, dependents) in &self.reverse {
            let names: Vec<&str> = dependents.iter().map(String::as_str).collect();
            writeln!(f, "\t{} <- {}", module, names.join(", "))?;
        }
        Ok(())
    }
}
