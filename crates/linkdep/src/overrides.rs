//! Module overrides
//!
//! An override substitutes one module name for another, or removes it from
//! every dependency list it appears in. Typical use is swapping an
//! implementation for a test double at link time.

use crate::attribute::Attribute;
use crate::module::ModuleRef;
use indexmap::IndexMap;

/// Mapping from module name to its replacement (`None` removes the module)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    replacements: IndexMap<String, Option<ModuleRef>>,
}

impl Overrides {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `name` with `replacement`
    pub fn replace(mut self, name: impl Into<String>, replacement: impl Into<ModuleRef>) -> Self {
        self.insert(name, Some(replacement.into()));
        self
    }

    /// Remove `name` from every dependency list
    pub fn elide(mut self, name: impl Into<String>) -> Self {
        self.insert(name, None);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, replacement: Option<ModuleRef>) {
        self.replacements.insert(name.into(), replacement);
    }

    /// Look up the override for `name`
    ///
    /// Returns `None` if `name` is not overridden, `Some(None)` if it is removed.
    pub fn get(&self, name: &str) -> Option<Option<&ModuleRef>> {
        self.replacements.get(name).map(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.replacements.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ModuleRef>)> {
        self.replacements
            .iter()
            .map(|(name, replacement)| (name.as_str(), replacement.as_ref()))
    }

    /// Apply the overrides to a single reference
    ///
    /// Substituted references carry [`Attribute::Overridden`] in addition to
    /// the attributes of the replacement.
    pub fn apply_one(&self, module: &ModuleRef) -> Option<ModuleRef> {
        match self.replacements.get(module.name()) {
            None => Some(module.clone()),
            Some(None) => None,
            Some(Some(replacement)) => {
                Some(replacement.clone().with_attribute(Attribute::Overridden))
            }
        }
    }

    /// Apply the overrides to a list of references
    ///
    /// Only the immediate list is rewritten; dependencies of a replacement
    /// are overridden when the traversal reaches them.
    pub fn apply(&self, modules: &[ModuleRef]) -> Vec<ModuleRef> {
        if self.is_empty() {
            return modules.to_vec();
        }
        modules
            .iter()
            .filter_map(|module| self.apply_one(module))
            .collect()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Overrides
where
    K: Into<String>,
    V: Into<ModuleRef>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut overrides = Overrides::new();
        for (name, replacement) in iter {
            overrides.insert(name, replacement.map(Into::into));
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<ModuleRef> {
        names.iter().map(|name| ModuleRef::new(*name)).collect()
    }

    #[test]
    fn test_no_overrides_passes_through() {
        let modules = refs(&["dep2", "dep3", "dep4"]);

        assert_eq!(Overrides::new().apply(&modules), modules);
    }

    #[test]
    fn test_elided_module_is_dropped() {
        let overrides = Overrides::new().elide("dep3");
        let applied = overrides.apply(&refs(&["dep2", "dep3", "dep4"]));

        let names: Vec<_> = applied.iter().map(ModuleRef::name).collect();
        assert_eq!(names, vec!["dep2", "dep4"]);
    }

    #[test]
    fn test_replacement_is_tagged() {
        let overrides = Overrides::new().replace("dep3", "Joachim");
        let applied = overrides.apply(&refs(&["dep2", "dep3", "dep4"]));

        let names: Vec<_> = applied.iter().map(ModuleRef::name).collect();
        assert_eq!(names, vec!["dep2", "Joachim", "dep4"]);
        assert!(applied[1].has(&Attribute::Overridden));
        assert!(!applied[0].has(&Attribute::Overridden));
    }

    #[test]
    fn test_replacement_keeps_its_own_attributes() {
        let overrides = Overrides::new().replace(
            "clock",
            ModuleRef::new("clock_mock").with_attribute(Attribute::AlwaysLink),
        );
        let applied = overrides.apply(&refs(&["clock"]));

        assert!(applied[0].has(&Attribute::AlwaysLink));
        assert!(applied[0].has(&Attribute::Overridden));
    }

    #[test]
    fn test_overrides_are_not_chained() {
        let overrides = Overrides::new().replace("a", "b").replace("b", "c");
        let applied = overrides.apply(&refs(&["a"]));

        assert_eq!(applied[0].name(), "b");
    }

    #[test]
    fn test_from_iterator() {
        let overrides: Overrides = [("dep3", None), ("dep4", Some("dep4_mock"))]
            .into_iter()
            .collect();

        assert_eq!(overrides.get("dep3"), Some(None));
        assert_eq!(overrides.get("dep4").flatten().map(ModuleRef::name), Some("dep4_mock"));
        assert_eq!(overrides.get("dep5"), None);
    }
}
