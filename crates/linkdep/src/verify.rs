//! Link order verification
//!
//! A single-pass linker resolves symbols left to right, so every module has
//! to be followed by all of its dependencies. Only the first occurrence of a
//! module name is checked: later duplicates exist to close cycles and are
//! covered by the first one.

use crate::module::ModuleRef;
use crate::overrides::Overrides;
use crate::registry::Registry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

/// A dependency that does not follow the first occurrence of its dependent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The module whose dependency is missing
    pub module: String,

    /// The missing dependency
    pub dependency: String,

    /// Index of the first occurrence of `module` in the checked order
    pub position: usize,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} needs {}, but it is missing", self.module, self.dependency)
    }
}

/// Outcome of checking an order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    violations: Vec<Violation>,
}

impl Verification {
    /// `true` if no dependency is missing
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// Every violation, in order of the checked modules
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

/// Check that every dependency of a module appears at or after the first
/// occurrence of that module
///
/// Dependencies are looked up in `registry` with `overrides` applied.
/// Modules the registry does not know have no dependencies. Works on any
/// order, not only on ones produced by the resolver.
pub fn verify_order(registry: &Registry, order: &[ModuleRef], overrides: &Overrides) -> Verification {
    let mut last_seen: HashMap<&str, usize> = HashMap::new();
    for (index, module) in order.iter().enumerate() {
        last_seen.insert(module.name(), index);
    }

    let mut checked = HashSet::new();
    let mut violations = Vec::new();

    for (position, module) in order.iter().enumerate() {
        if !checked.insert(module.name()) {
            continue;
        }

        for dependency in registry.overridden_dependencies_of(module.name(), overrides) {
            let present = last_seen
                .get(dependency.name())
                .is_some_and(|&last| last >= position);
            if !present {
                let violation = Violation {
                    module: module.name().to_string(),
                    dependency: dependency.name().to_string(),
                    position,
                };
                warn!("{} (at position {})", violation, position);
                violations.push(violation);
            }
        }
    }

    Verification { violations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attributes;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_module("app", ["lib", "util"], Attributes::new())
            .unwrap();
        registry
            .register_module("lib", ["util"], Attributes::new())
            .unwrap();
        registry
    }

    fn order(names: &[&str]) -> Vec<ModuleRef> {
        names.iter().map(|name| ModuleRef::new(*name)).collect()
    }

    #[test]
    fn test_valid_order() {
        let verification = verify_order(&registry(), &order(&["app", "lib", "util"]), &Overrides::new());

        assert!(verification.is_ok());
        assert!(verification.first_violation().is_none());
    }

    #[test]
    fn test_missing_dependency() {
        let verification = verify_order(&registry(), &order(&["util", "app", "lib"]), &Overrides::new());

        assert!(!verification.is_ok());
        let violation = verification.first_violation().unwrap();
        assert_eq!(violation.module, "app");
        assert_eq!(violation.dependency, "util");
        assert_eq!(violation.position, 1);
        assert_eq!(violation.to_string(), "app needs util, but it is missing");
        // lib needs util as well
        assert_eq!(verification.violations().len(), 2);
    }

    #[test]
    fn test_only_first_occurrence_is_checked() {
        let verification = verify_order(
            &registry(),
            &order(&["lib", "util", "lib"]),
            &Overrides::new(),
        );

        assert!(verification.is_ok());
    }

    #[test]
    fn test_overrides_change_requirements() {
        let overrides = Overrides::new().replace("util", "util_mock");

        let verification = verify_order(&registry(), &order(&["lib", "util"]), &overrides);
        assert_eq!(verification.first_violation().unwrap().dependency, "util_mock");

        let verification = verify_order(&registry(), &order(&["lib", "util_mock"]), &overrides);
        assert!(verification.is_ok());
    }

    #[test]
    fn test_empty_order() {
        assert!(verify_order(&registry(), &[], &Overrides::new()).is_ok());
    }
}
