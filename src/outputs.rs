use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::DepError;
use crate::generate::dlldata_sources;
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::source::{Flags, IDL_OUTPUTS};
use crate::unit::{BuildUnit, NodeId};

/// Files produced from one source, all depending on it and its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRule {
    pub source: NodeId,
    pub targets: Vec<Path>,
}

/// A manual page built from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManPageOutput {
    /// Generated file, relative to the unit.
    pub file: String,
    /// Page name without section.
    pub page: String,
    pub section: String,
    pub dir: String,
}

/// Per-category file sets of a unit, relative to its output directory
/// unless stated otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    pub rules: Vec<SourceRule>,
    pub object_files: Vec<String>,
    pub crossobj_files: Vec<String>,
    pub unixobj_files: Vec<String>,
    pub implib_objs: Vec<String>,
    pub res_files: Vec<String>,
    pub pot_files: Vec<String>,
    pub font_files: Vec<String>,
    pub in_files: Vec<String>,
    pub man_pages: Vec<ManPageOutput>,
    /// Sources scanned for api documentation, as paths.
    pub c2man_files: Vec<Path>,
    /// Interface files contributing to the shared proxy data file.
    pub dlldata_files: Vec<Path>,
    pub ok_files: Vec<String>,
    pub all_targets: Vec<String>,
    pub clean_files: Vec<String>,
    /// Every dependency of every source, without duplicates.
    pub dependencies: Vec<Path>,
}

fn add_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

impl Outputs {
    /// Sorts the sources of a loaded unit into output categories.
    pub fn collect(unit: &BuildUnit, registry: &SourceRegistry) -> Result<Self, DepError> {
        let mut outputs = Outputs::default();
        for &id in unit.sources() {
            outputs.add_source(unit, registry, id)?;
            for dep in &unit.node(id).dependencies {
                add_unique(&mut outputs.dependencies, dep.clone());
            }
        }
        outputs.dlldata_files = dlldata_sources(unit, registry);

        for target in &unit.config.extra_targets {
            if outputs.dependencies.contains(&unit.obj_dir_path(target)) {
                outputs.clean_files.push(target.clone());
            } else {
                outputs.all_targets.push(target.clone());
            }
        }

        let Outputs {
            clean_files,
            object_files,
            crossobj_files,
            unixobj_files,
            res_files,
            pot_files,
            all_targets,
            ..
        } = &mut outputs;
        for files in [
            &*object_files,
            &*crossobj_files,
            &*unixobj_files,
            &*res_files,
            &*pot_files,
            &*all_targets,
        ] {
            clean_files.extend(files.iter().cloned());
        }
        Ok(outputs)
    }

    fn add_source(
        &mut self,
        unit: &BuildUnit,
        registry: &SourceRegistry,
        id: NodeId,
    ) -> Result<(), DepError> {
        let node = unit.node(id);
        let name = node.name.as_str();
        let record = node.record.map(|r| registry.get(r));
        let flags = record.map(|r| r.flags).unwrap_or_default();
        let Some(ext) = Path::from(name).extension().map(String::from) else {
            return Err(DepError::UnsupportedFile { name: name.into() });
        };
        let obj = &name[..name.len() - ext.len()];
        let obj_path = |suffix: &str| unit.obj_dir_path(&format!("{obj}{suffix}"));
        let mut targets = Vec::new();

        match &ext[1..] {
            "y" => {
                let header = format!("{obj}.tab.h");
                if unit.has_include(&header) {
                    targets.push(unit.obj_dir_path(&header));
                    self.clean_files.push(header);
                }
                targets.push(obj_path(".tab.c"));
            }
            "l" => targets.push(obj_path(".yy.c")),
            "h" | "rh" | "inl" => {
                if flags.contains(Flags::GENERATED) {
                    self.all_targets.push(name.into());
                }
            }
            "rc" => {
                if flags.contains(Flags::GENERATED) {
                    self.clean_files.push(name.into());
                }
                self.res_files.push(format!("{obj}.res"));
                if flags.contains(Flags::RC_PO) {
                    self.pot_files.push(format!("{obj}.pot"));
                    targets.push(obj_path(".pot"));
                }
                targets.push(obj_path(".res"));
            }
            "mc" => {
                self.res_files.push(format!("{obj}.res"));
                self.pot_files.push(format!("{obj}.pot"));
                targets.push(obj_path(".pot"));
                targets.push(obj_path(".res"));
            }
            "res" => self.res_files.push(name.into()),
            "idl" => {
                let mut flags = flags;
                if flags.is_empty() {
                    flags |= Flags::IDL_HEADER | Flags::INSTALL;
                }
                if unit.has_include(&format!("{obj}.h")) {
                    flags |= Flags::IDL_HEADER;
                }
                for (flag, suffix) in IDL_OUTPUTS {
                    if !flags.contains(flag) {
                        continue;
                    }
                    let dest = format!("{obj}{suffix}");
                    targets.push(unit.obj_dir_path(&dest));
                    if unit.find_source(&dest).is_none() {
                        self.clean_files.push(dest);
                    }
                }
            }
            "sfd" => {
                let ttf = format!("{obj}.ttf");
                if unit.config.src_dir.is_none() {
                    targets.push(unit.src_dir_path(&ttf));
                    if !flags.contains(Flags::SFD_FONTS) {
                        self.font_files.push(ttf);
                    }
                }
                if flags.contains(Flags::SFD_FONTS) {
                    for spec in record.map(|r| r.fonts.as_slice()).unwrap_or_default() {
                        if let Some(font) = spec.split_whitespace().next() {
                            self.all_targets.push(font.into());
                        }
                    }
                }
            }
            "po" => {
                self.all_targets.push(format!("{obj}.mo"));
                targets.push(obj_path(".mo"));
            }
            "in" => {
                if let (Some(page), Some(man)) =
                    (obj.strip_suffix(".man"), record.and_then(|r| r.man_page.as_ref()))
                {
                    let section = &man.section;
                    let (page, dir) = match page.split_once('.') {
                        Some((page, lang)) => (page, format!("$(mandir)/{lang}/man{section}")),
                        None => (page, format!("$(mandir)/man{section}")),
                    };
                    self.man_pages.push(ManPageOutput {
                        file: obj.into(),
                        page: page.into(),
                        section: section.clone(),
                        dir,
                    });
                }
                self.in_files.push(obj.into());
                self.all_targets.push(obj.into());
                targets.push(unit.obj_dir_path(obj));
            }
            "x" => targets.push(obj_path(".h")),
            "svg" | "nls" | "desktop" | "spec" => {}
            _ => self.add_object(unit, id, flags, obj, &mut targets),
        }

        if !targets.is_empty() {
            self.rules.push(SourceRule { source: id, targets });
        }
        Ok(())
    }

    /// Compiled sources: native, cross and unix objects.
    fn add_object(
        &mut self,
        unit: &BuildUnit,
        id: NodeId,
        flags: Flags,
        obj: &str,
        targets: &mut Vec<Path>,
    ) {
        let node = unit.node(id);
        let config = &unit.config;
        let tree = unit.tree();
        let unix = flags.contains(Flags::C_UNIX);
        let implib = flags.contains(Flags::C_IMPLIB);
        let generated = flags.contains(Flags::GENERATED);

        let is_dll_src = config.testdll.is_some()
            && node.name.ends_with(".c")
            && unit.find_source(&format!("{obj}.spec")).is_some();
        let need_cross = tree.cross_target.is_some()
            && !unix
            && (unit.is_cross || config.staticlib.is_some() || implib);
        let need_obj = (!tree.dll_ext.is_empty() || !unix)
            && (!need_cross || implib || (config.staticlib.is_some() && config.extlib.is_none()));

        let is_testlist = config.testdll.is_some()
            && node
                .filename
                .as_ref()
                .is_some_and(|f| f.ends_with("testlist.c"));
        if generated && !is_testlist {
            let basename = node.basename.as_deref().unwrap_or(&node.name);
            self.clean_files.push(basename.into());
        }
        if implib {
            self.implib_objs.push(format!("{obj}.o"));
        }

        if need_obj {
            let file = format!("{obj}.o");
            if unix && !tree.dll_ext.is_empty() {
                self.unixobj_files.push(file);
            } else if !is_dll_src && !implib {
                self.object_files.push(file);
            } else {
                self.clean_files.push(file);
            }
            targets.push(unit.obj_dir_path(&format!("{obj}.o")));
        }
        if need_cross {
            let file = format!("{obj}.cross.o");
            if !is_dll_src && !implib {
                self.crossobj_files.push(file);
            } else {
                self.clean_files.push(file);
            }
            targets.push(unit.obj_dir_path(&format!("{obj}.cross.o")));
        }

        if node.name.ends_with(".c") && !generated {
            if let Some(filename) = &node.filename {
                self.c2man_files.push(filename.clone());
            }
            if config.testdll.is_some() && !is_dll_src {
                self.ok_files.push(format!("{obj}.ok"));
            }
        }
    }
}
