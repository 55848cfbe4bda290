use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::DepError;
use crate::os::Os;
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::steps::{ResolvedSource, RuleEmitter};
use crate::unit::{BuildUnit, UnitConfig};
use crate::vars::Variables;

/// Settings shared by every unit, read from the top-level descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Top of the source tree when building out of tree.
    pub root_src_dir: Option<Path>,
    pub cross_target: Option<String>,
    pub exe_ext: String,
    /// Extension of unix side libraries, empty for PE-only builds.
    pub dll_ext: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_src_dir: None,
            cross_target: None,
            exe_ext: String::new(),
            dll_ext: ".so".into(),
        }
    }
}

impl TreeConfig {
    pub fn from_vars(vars: &dyn Variables) -> Result<Self, DepError> {
        let root_src_dir = vars.get("srcdir")?.filter(|dir| dir != ".");
        let exe_ext = vars.get("EXEEXT")?.unwrap_or_default();
        let dll_ext = if exe_ext == ".exe" { "" } else { ".so" };
        Ok(Self {
            root_src_dir: root_src_dir.map(Path::from),
            cross_target: vars.get("CROSSTARGET")?,
            dll_ext: dll_ext.into(),
            exe_ext,
        })
    }
}

/// A unit seen from the others: what it builds and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub obj_dir: Path,
    pub module: Option<String>,
    pub is_cross: bool,
}

/// Modules built by the tree, looked up by type library imports.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    modules: Vec<ModuleEntry>,
}

impl ModuleIndex {
    pub fn register(&mut self, unit: &BuildUnit) {
        let Some(obj_dir) = unit.obj_dir() else {
            return;
        };
        self.modules.push(ModuleEntry {
            obj_dir: obj_dir.clone(),
            module: unit.config.module.clone(),
            is_cross: unit.is_cross,
        });
    }

    /// The unit under `dlls/` building `name`, with or without `.dll`.
    pub fn find(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|entry| {
            let Some(dir) = entry.obj_dir.as_str().strip_prefix("dlls/") else {
                return false;
            };
            matches!(name.strip_prefix(dir), Some("" | ".dll"))
        })
    }

    /// File a type library built from an import of `name` depends on.
    pub fn importlib_target(&self, name: &str, dll_ext: &str) -> Option<Path> {
        let entry = self.find(name)?;
        let module = entry.module.as_deref()?;
        let module = if !dll_ext.is_empty() && !entry.is_cross {
            format!("{module}.fake")
        } else {
            module.into()
        };
        Some(entry.obj_dir.join(module))
    }
}

/// Every unit of a source tree and the files they share.
pub struct Tree {
    config: TreeConfig,
    registry: SourceRegistry,
    modules: ModuleIndex,
    units: Vec<BuildUnit>,
}

impl Tree {
    pub fn new(os: Rc<dyn Os>, config: TreeConfig) -> Self {
        Self {
            config,
            registry: SourceRegistry::new(os),
            modules: ModuleIndex::default(),
            units: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Registers a unit; its sources are only read by [`Tree::load`].
    pub fn add_unit(&mut self, config: UnitConfig) -> &BuildUnit {
        let unit = BuildUnit::new(config, &self.config);
        self.modules.register(&unit);
        self.units.push(unit);
        &self.units[self.units.len() - 1]
    }

    /// Builds the dependency model of every registered unit, in order.
    pub fn load(&mut self) -> Result<(), DepError> {
        for unit in &mut self.units {
            unit.load(&mut self.registry, &self.modules)?;
        }
        tracing::debug!(
            "{} units loaded, {} files scanned",
            self.units.len(),
            self.registry.len()
        );
        Ok(())
    }

    pub fn units(&self) -> &[BuildUnit] {
        &self.units
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Languages with a message catalog anywhere in the tree.
    pub fn linguas(&self) -> Vec<String> {
        let mut linguas: Vec<String> = Vec::new();
        for lang in self.units.iter().flat_map(|unit| &unit.linguas) {
            if !linguas.contains(lang) {
                linguas.push(lang.clone());
            }
        }
        linguas
    }

    /// Hands every unit and its sources to `emitter`.
    pub fn emit(&self, emitter: &dyn RuleEmitter) {
        for unit in &self.units {
            emitter.begin_unit(unit);
            for rule in &unit.outputs.rules {
                let node = unit.node(rule.source);
                let importlib_deps = node
                    .importlib_deps
                    .iter()
                    .filter_map(|dep| {
                        self.modules
                            .importlib_target(dep.as_str(), &self.config.dll_ext)
                    })
                    .collect();
                let source = ResolvedSource {
                    name: &node.name,
                    filename: node.filename.as_ref(),
                    flags: node
                        .record
                        .map(|r| self.registry.get(r).flags)
                        .unwrap_or_default(),
                    targets: &rule.targets,
                    dependencies: &node.dependencies,
                    importlib_deps,
                };
                emitter.source(unit, &source);
            }
            emitter.end_unit(unit);
        }
    }
}
