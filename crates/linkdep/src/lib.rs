//! Link order resolution for static libraries
//!
//! This crate computes the order in which a single-pass linker has to see a
//! set of libraries whose dependency graph may contain cycles, including:
//! - Module registry with attribute-qualified dependencies
//! - Overrides (substitution or removal of modules)
//! - Breadth-first dependency map with reverse edges
//! - Link order resolution with duplicate emission to break cycles
//! - Order verification
//! - Link plan projection and Mermaid dependency trees
//! - Registry manifest parsing (linkdep.toml)

pub mod attribute;
pub mod depmap;
pub mod manifest;
pub mod module;
pub mod overrides;
pub mod plan;
pub mod registry;
pub mod resolver;
pub mod tree;
pub mod unique;
pub mod verify;

pub use attribute::{Attribute, Attributes};
pub use depmap::{DependencyMap, Dependents};
pub use manifest::{DependencySpec, Extension, ManifestError, ModuleEntry, RegistryManifest, Settings};
pub use module::{ModuleRecord, ModuleRef};
pub use overrides::Overrides;
pub use plan::{Interface, LinkPlan};
pub use registry::{Registry, RegistryError};
pub use resolver::{LinkOrder, LinkOrderResolver, ResolverError};
pub use tree::{render_dependency_tree, DependencyTree};
pub use unique::UniqueList;
pub use verify::{verify_order, Verification, Violation};
