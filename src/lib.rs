#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod closure;
pub mod descriptor;
pub mod error;
pub mod generate;
pub mod os;
pub mod outputs;
pub mod path;
pub mod registry;
pub mod resolve;
pub mod scan;
pub mod source;
pub mod steps;
pub mod tree;
pub mod unit;
pub mod vars;

use alloc::rc::Rc;
use alloc::string::String;

use anyhow::Context as _;

use crate::descriptor::{Descriptor, Scope};
use crate::path::Path;
use crate::tree::{Tree, TreeConfig};
use crate::unit::UnitConfig;
use crate::vars::Variables;

/// Name of the per-directory descriptor template.
pub const UNIT_DESCRIPTOR: &str = "Makefile.in";

pub struct Makedep {
    os: Rc<dyn os::Os>,
    emitter: Rc<dyn steps::RuleEmitter>,
    cmdline: Descriptor,
    makefile: String,
}

impl Makedep {
    pub fn new(os: impl os::Os, emitter: impl steps::RuleEmitter) -> Self {
        let os = Rc::new(os);
        let emitter = Rc::new(emitter);
        let cmdline = Descriptor::default();
        let makefile = "Makefile".into();
        Self {
            os,
            emitter,
            cmdline,
            makefile,
        }
    }

    /// Overrides a variable for every descriptor.
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cmdline.set(name, value);
        self
    }

    /// Applies a `NAME=value` argument; returns `false` if it is not one.
    pub fn assignment(&mut self, text: &str) -> bool {
        self.cmdline.assign(text)
    }

    /// Applies the variable assignments found in a `MAKEFLAGS` string.
    pub fn makeflags(&mut self, flags: &str) -> &mut Self {
        self.cmdline.assign_makeflags(flags);
        self
    }

    /// Name of the top-level descriptor, `Makefile` by default.
    pub fn makefile(&mut self, name: impl Into<String>) -> &mut Self {
        self.makefile = name.into();
        self
    }

    fn read_descriptor(&self, path: &Path) -> anyhow::Result<Descriptor> {
        let data = self
            .os
            .read_file(path)
            .with_context(|| alloc::format!("cannot open {path}"))?;
        let text = String::from_utf8_lossy(&data);
        Ok(Descriptor::parse(Some(path.clone()), &text))
    }

    /// Loads the whole tree and hands its rules to the emitter.
    pub fn generate(&self) -> anyhow::Result<()> {
        let top = self.read_descriptor(&Path::from(self.makefile.as_str()))?;
        let scope = Scope {
            cmdline: &self.cmdline,
            unit: &top,
            top: None,
        };
        let config = TreeConfig::from_vars(&scope)?;
        let subdirs = scope.get_list("SUBDIRS")?;
        tracing::debug!("{} subdirectories", subdirs.len());

        let mut tree = Tree::new(self.os.clone(), config);
        for dir in subdirs {
            let obj_dir = Path::from(dir);
            let config = tree.config();
            let src_dir = match &config.root_src_dir {
                Some(root) => root.join(obj_dir.as_str()),
                None => obj_dir.clone(),
            };
            let mut descriptor = self.read_descriptor(&src_dir.join(UNIT_DESCRIPTOR))?;
            let root = config.root_src_dir.clone().unwrap_or_else(|| Path::from("."));
            descriptor.set("top_srcdir", root.as_str());
            descriptor.set("srcdir", src_dir.as_str());

            let scope = Scope {
                cmdline: &self.cmdline,
                unit: &descriptor,
                top: Some(&top),
            };
            let unit = UnitConfig::from_vars(&scope, Some(obj_dir), config.root_src_dir.as_ref())?;
            tree.add_unit(unit);
        }

        tree.load()?;
        tree.emit(&*self.emitter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::os::testing::MemOs;
    use crate::steps::{ResolvedSource, RuleEmitter};
    use crate::unit::BuildUnit;

    #[derive(Clone, Default)]
    struct Rules(Rc<RefCell<Vec<String>>>);

    impl RuleEmitter for Rules {
        fn source(&self, _unit: &BuildUnit, source: &ResolvedSource<'_>) {
            let targets: Vec<_> = source.targets.iter().map(Path::as_str).collect();
            let deps: Vec<_> = source.dependencies.iter().map(Path::as_str).collect();
            self.0
                .borrow_mut()
                .push(format!("{}: {}", targets.join(" "), deps.join(" ")));
        }
    }

    fn tree() -> MemOs {
        MemOs::new()
            .with("Makefile", "SUBDIRS = tools/foo\nsrcdir = .\n### Dependencies\nold: rules\n")
            .with(
                "tools/foo/Makefile.in",
                "PROGRAMS = foo\nC_SRCS = main.c $(EXTRA_C)\n",
            )
            .with("tools/foo/main.c", "#include \"foo.h\"\n#include <stdio.h>\n")
            .with("tools/foo/util.c", "#include \"foo.h\"\n")
            .with("tools/foo/foo.h", "")
    }

    #[test]
    fn generates_rules_for_every_unit() {
        let rules = Rules::default();
        let mut makedep = Makedep::new(tree(), rules.clone());
        makedep.makeflags("-s EXTRA_C=util.c");
        makedep.generate().unwrap();

        assert_eq!(
            *rules.0.borrow(),
            [
                "tools/foo/main.o: tools/foo/foo.h",
                "tools/foo/util.o: tools/foo/foo.h"
            ]
        );
    }

    #[test]
    fn missing_descriptors_are_reported() {
        let mut makedep = Makedep::new(tree(), Rules::default());
        makedep.variable("SUBDIRS", "tools/foo tools/bar");
        let err = makedep.generate().unwrap_err();
        assert_eq!(err.to_string(), "cannot open tools/bar/Makefile.in");

        let mut makedep = Makedep::new(tree(), Rules::default());
        assert!(makedep.assignment("C_SRCS=missing.c"));
        assert!(!makedep.assignment("--help"));
        let err = makedep.generate().unwrap_err();
        assert!(err.to_string().contains("missing.c"));
    }
}
