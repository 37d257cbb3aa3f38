//! Registry manifest parsing (linkdep.toml)
//!
//! Describes a module registry declaratively:
//!
//! ```toml
//! [settings]
//! verify = true
//!
//! [[module]]
//! name = "hal"
//! dependencies = ["registers", { name = "startup", attributes = ["always_link"] }]
//!
//! [[extend]]
//! module = "hal"
//! dependencies = ["hal_stm32"]
//!
//! [overrides]
//! registers = "registers_mock"
//! startup = ""
//! ```

use crate::attribute::Attributes;
use crate::module::{ModuleRecord, ModuleRef};
use crate::overrides::Overrides;
use crate::registry::{Registry, RegistryError};
use crate::resolver::LinkOrderResolver;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),

    /// The modules could not be registered
    #[error("Failed to build registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Registry manifest (linkdep.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryManifest {
    #[serde(default)]
    pub settings: Settings,

    /// Modules in registration order
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,

    /// Dependencies appended after registration
    #[serde(default, rename = "extend", skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,

    /// Module name → replacement; an empty string removes the module
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: IndexMap<String, String>,
}

/// Resolution settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Check every resolved order (default: true)
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verify: default_verify(),
        }
    }
}

/// A `[[module]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// An `[[extend]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extension {
    /// Module to extend (must be declared in the same manifest)
    pub module: String,

    pub dependencies: Vec<DependencySpec>,
}

/// Dependency specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Bare module name: "hal"
    Simple(String),

    /// Module name with attributes
    Detailed {
        name: String,

        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
}

impl DependencySpec {
    pub fn name(&self) -> &str {
        match self {
            DependencySpec::Simple(name) => name,
            DependencySpec::Detailed { name, .. } => name,
        }
    }

    /// Convert to a module reference
    pub fn to_module_ref(&self) -> ModuleRef {
        match self {
            DependencySpec::Simple(name) => ModuleRef::new(name.as_str()),
            DependencySpec::Detailed { name, attributes } => {
                ModuleRef::new(name.as_str()).with_attributes(attributes)
            }
        }
    }
}

impl RegistryManifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: RegistryManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    ///
    /// Duplicate module names are not rejected here; they surface as
    /// [`RegistryError::DuplicateModule`] from [`Self::build_registry`].
    pub fn validate(&self) -> Result<(), ManifestError> {
        for module in &self.modules {
            if module.name.is_empty() {
                return Err(ManifestError::ValidationError(
                    "Module name cannot be empty".to_string(),
                ));
            }
            validate_dependencies(&module.name, &module.dependencies)?;
        }

        for extension in &self.extensions {
            if !self.modules.iter().any(|m| m.name == extension.module) {
                return Err(ManifestError::ValidationError(format!(
                    "Cannot extend '{}', it is not declared as a module",
                    extension.module
                )));
            }
            validate_dependencies(&extension.module, &extension.dependencies)?;
        }

        if self.overrides.keys().any(String::is_empty) {
            return Err(ManifestError::ValidationError(
                "Override name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Write manifest to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ManifestError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ManifestError::ValidationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Register every module, then apply the extensions
    pub fn build_registry(&self) -> Result<Registry, ManifestError> {
        let mut registry = Registry::new();

        for module in &self.modules {
            registry.register(
                ModuleRecord::new(module.name.as_str())
                    .with_dependencies(module.dependencies.iter().map(DependencySpec::to_module_ref))
                    .with_attributes(module.attributes.clone()),
            )?;
        }

        for extension in &self.extensions {
            registry.add_dependencies(
                &extension.module,
                extension.dependencies.iter().map(DependencySpec::to_module_ref),
            )?;
        }

        debug!("Built registry with {} modules", registry.len());
        Ok(registry)
    }

    /// Overrides declared in `[overrides]`
    pub fn overrides(&self) -> Overrides {
        self.overrides
            .iter()
            .map(|(name, replacement)| {
                let replacement = Some(replacement.as_str()).filter(|r| !r.is_empty());
                (name.as_str(), replacement)
            })
            .collect()
    }

    /// A resolver over `registry` configured from this manifest
    pub fn resolver<'r>(&self, registry: &'r Registry) -> LinkOrderResolver<'r> {
        LinkOrderResolver::new(registry)
            .with_overrides(self.overrides())
            .with_verification(self.settings.verify)
    }
}

fn validate_dependencies(module: &str, dependencies: &[DependencySpec]) -> Result<(), ManifestError> {
    if dependencies.iter().any(|dep| dep.name().is_empty()) {
        return Err(ManifestError::ValidationError(format!(
            "Module '{}' has a dependency with an empty name",
            module
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;

    #[test]
    fn test_parse_minimal_manifest() {
        let toml = r#"
[[module]]
name = "hal"
"#;

        let manifest = RegistryManifest::from_str(toml).unwrap();
        assert_eq!(manifest.modules.len(), 1);
        assert!(manifest.settings.verify);
        assert!(manifest.modules[0].dependencies.is_empty());
    }

    #[test]
    fn test_parse_dependency_forms() {
        let toml = r#"
[[module]]
name = "app"
dependencies = ["hal", { name = "startup", attributes = ["always_link"] }]
"#;

        let manifest = RegistryManifest::from_str(toml).unwrap();
        let deps = &manifest.modules[0].dependencies;

        assert_eq!(deps[0], DependencySpec::Simple("hal".to_string()));
        assert_eq!(deps[1].name(), "startup");
        assert!(deps[1].to_module_ref().has(&Attribute::AlwaysLink));
    }

    #[test]
    fn test_settings() {
        let toml = r#"
[settings]
verify = false
"#;

        let manifest = RegistryManifest::from_str(toml).unwrap();
        assert!(!manifest.settings.verify);
    }

    #[test]
    fn test_empty_module_name() {
        let toml = r#"
[[module]]
name = ""
"#;

        let result = RegistryManifest::from_str(toml);
        assert!(matches!(result, Err(ManifestError::ValidationError(_))));
    }

    #[test]
    fn test_extension_of_undeclared_module() {
        let toml = r#"
[[module]]
name = "hal"

[[extend]]
module = "hall"
dependencies = ["hal_stm32"]
"#;

        let result = RegistryManifest::from_str(toml);
        assert!(matches!(result, Err(ManifestError::ValidationError(_))));
    }

    #[test]
    fn test_overrides() {
        let toml = r#"
[overrides]
clock = "clock_mock"
logger = ""
"#;

        let overrides = RegistryManifest::from_str(toml).unwrap().overrides();
        assert_eq!(overrides.get("clock").flatten().map(ModuleRef::name), Some("clock_mock"));
        assert_eq!(overrides.get("logger"), Some(None));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_duplicate_module_fails_registry() {
        let toml = r#"
[[module]]
name = "double_lib"

[[module]]
name = "double_lib"
"#;

        let manifest = RegistryManifest::from_str(toml).unwrap();
        let err = manifest.build_registry().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Registry(RegistryError::DuplicateModule(ref name)) if name == "double_lib"
        ));
        assert!(err.to_string().contains("double_lib"));
    }
}
