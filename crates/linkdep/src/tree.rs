//! Mermaid rendering of the dependency graph
//!
//! Diagnostic output only. Paste it into any Mermaid renderer to see how the
//! modules of a build are layered.

use crate::depmap::DependencyMap;
use crate::module::ModuleRef;
use crate::overrides::Overrides;
use crate::registry::Registry;
use crate::unique::UniqueList;
use std::fmt;

/// Flowchart of the modules reachable from a set of roots
pub struct DependencyTree<'r> {
    registry: &'r Registry,
    roots: Vec<ModuleRef>,
    root_name: Option<String>,
}

impl<'r> DependencyTree<'r> {
    /// Without roots, every registered module is rendered
    pub fn new<I, S>(registry: &'r Registry, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            registry,
            roots: roots
                .into_iter()
                .map(|root| ModuleRef::new(root.as_ref()))
                .collect(),
            root_name: None,
        }
    }

    /// Label the subgraph of the roots instead of calling it `layer0`
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Write the layer subgraphs, returning the modules they announced
    fn write_layers(&self, f: &mut fmt::Formatter<'_>) -> Result<UniqueList<String>, fmt::Error> {
        let map = DependencyMap::build(self.registry, &self.roots, &Overrides::new());
        let mut announced = UniqueList::new();
        let mut transitive = UniqueList::new();

        for (depth, modules) in map.layers() {
            match (&self.root_name, depth) {
                (Some(name), 0) => writeln!(f, "subgraph {}", name)?,
                _ => writeln!(f, "subgraph layer{}", depth)?,
            }
            for module in &modules {
                writeln!(f, "{}", module.name())?;
                announced.insert(module.name().to_string());
                for dependency in self.registry.dependencies_of(module.name()) {
                    transitive.insert(dependency.name().to_string());
                }
            }
            writeln!(f, "end\n")?;
        }

        let remaining: Vec<String> = transitive
            .into_iter()
            .filter(|name| !announced.contains(name.as_str()))
            .collect();
        if !remaining.is_empty() {
            writeln!(f, "subgraph transitive")?;
            for name in remaining {
                writeln!(f, "{}", name)?;
                announced.insert(name);
            }
            writeln!(f, "end\n")?;
        }

        Ok(announced)
    }
}

impl fmt::Display for DependencyTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "```mermaid")?;
        writeln!(f, "flowchart\n")?;

        let announced = if self.roots.is_empty() {
            None
        } else {
            Some(self.write_layers(f)?)
        };

        for record in self.registry.modules() {
            match &announced {
                Some(announced) if !announced.contains(record.name.as_str()) => continue,
                Some(_) => {}
                None => writeln!(f, "{}", record.name)?,
            }

            for dependency in &record.dependencies {
                if dependency.attributes().is_empty() {
                    writeln!(f, "{} --> {}", record.name, dependency.name())?;
                } else {
                    writeln!(
                        f,
                        "{} --{}--> {}",
                        record.name,
                        dependency.attributes(),
                        dependency.name()
                    )?;
                }
            }
        }

        writeln!(f, "```")
    }
}

/// Render the dependency tree of `roots` as a Mermaid flowchart
pub fn render_dependency_tree<I, S>(registry: &Registry, roots: I, root_name: Option<&str>) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tree = DependencyTree::new(registry, roots);
    match root_name {
        Some(name) => tree.with_root_name(name).to_string(),
        None => tree.to_string(),
    }
}
