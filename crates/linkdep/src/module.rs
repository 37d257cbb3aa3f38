//! Module references and registry records

use crate::attribute::{Attribute, Attributes};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A reference to a module by name, qualified by attributes
///
/// Identity is the name alone: two references that differ only in their
/// attributes compare equal and hash the same. This lets ordered sets and
/// maps keyed by `ModuleRef` be looked up with a plain `&str`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRef {
    name: String,

    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
}

impl ModuleRef {
    /// Create a reference without attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute);
        self
    }

    /// Add several attributes
    pub fn with_attributes(mut self, attributes: &Attributes) -> Self {
        self.attributes.merge(attributes);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn has(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ModuleRef {}

impl Hash for ModuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Borrow<str> for ModuleRef {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl From<&str> for ModuleRef {
    fn from(name: &str) -> Self {
        ModuleRef::new(name)
    }
}

impl From<String> for ModuleRef {
    fn from(name: String) -> Self {
        ModuleRef::new(name)
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attributes.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} [{}]", self.name, self.attributes)
        }
    }
}

/// A registered module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    /// Module name (unique within a registry)
    pub name: String,

    /// Declared dependencies, in declaration order
    pub dependencies: Vec<ModuleRef>,

    /// Attributes that apply wherever the module is referenced
    pub attributes: Attributes,
}

impl ModuleRecord {
    /// Create a record without dependencies or attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<ModuleRef>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<ModuleRef>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Dependencies that carry the given attribute
    pub fn dependencies_with<'a>(
        &'a self,
        attribute: &'a Attribute,
    ) -> impl Iterator<Item = &'a ModuleRef> + 'a {
        self.dependencies.iter().filter(move |dep| dep.has(attribute))
    }
}
