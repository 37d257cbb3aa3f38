//! Link plan
//!
//! Projection of a link order onto what a build step consumes: the libraries
//! to pass to the linker and the modules whose interfaces must be visible to
//! the compiler.

use crate::attribute::Attribute;
use crate::module::ModuleRef;
use crate::overrides::Overrides;
use crate::registry::Registry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// A module whose headers are included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub module: String,

    /// Include as a system header directory
    #[serde(default)]
    pub system: bool,
}

/// Libraries and interfaces derived from a link order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPlan {
    /// Libraries in link order, duplicates kept
    pub libraries: Vec<String>,

    /// Registered modules in order of first appearance
    pub interfaces: Vec<Interface>,
}

impl LinkPlan {
    /// Project `order` onto libraries and interfaces
    ///
    /// The attributes of each entry are merged with the attributes its module
    /// was registered with. Entries marked `header_only` or `no_link` are not
    /// linked. Link overrides are applied to library names, so an override
    /// without replacement drops the library. Modules the registry does not
    /// know are linked as external libraries and contribute no interface.
    pub fn from_order(registry: &Registry, order: &[ModuleRef], overrides: &Overrides) -> Self {
        let mut libraries = Vec::new();
        let mut interfaces: IndexMap<String, bool> = IndexMap::new();

        for module in order {
            let name = module.name();
            let mut attributes = module.attributes().clone();

            match registry.attributes_of(name) {
                Some(registered) => {
                    attributes.merge(registered);
                    let system = interfaces.entry(name.to_string()).or_insert(false);
                    *system |= attributes.contains(&Attribute::System);
                }
                None if !attributes.contains(&Attribute::External) => {
                    warn!(
                        "'{}' was not registered, assuming external library. Add the attribute 'external' to suppress this warning",
                        name
                    );
                }
                None => {}
            }

            if !attributes.is_linked() {
                trace!("Not linking '{}', it is header_only or no_link", name);
                continue;
            }

            match overrides.get(name) {
                None => libraries.push(name.to_string()),
                Some(Some(replacement)) => {
                    trace!("Linking '{}' instead of '{}'", replacement.name(), name);
                    libraries.push(replacement.name().to_string());
                }
                Some(None) => trace!("Link override removes '{}'", name),
            }
        }

        Self {
            libraries,
            interfaces: interfaces
                .into_iter()
                .map(|(module, system)| Interface { module, system })
                .collect(),
        }
    }

    /// Serialize the plan for external build glue
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
