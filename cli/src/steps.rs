use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use makedep::steps::{self, BuildUnit, ResolvedSource};

/// Collects one `targets: source dependencies` line per source.
#[derive(Clone, Default)]
pub struct Steps {
    rules: Rc<RefCell<String>>,
}

impl Steps {
    pub fn take(&self) -> String {
        self.rules.take()
    }
}

impl steps::RuleEmitter for Steps {
    fn begin_unit(&self, unit: &BuildUnit) {
        let dir = unit.obj_dir().map(|dir| dir.as_str()).unwrap_or(".");
        tracing::debug!("writing rules for {dir}");
    }

    fn source(&self, _unit: &BuildUnit, source: &ResolvedSource<'_>) {
        let mut rules = self.rules.borrow_mut();
        let mut targets = source.targets.iter();
        let Some(first) = targets.next() else {
            return;
        };
        let _ = write!(rules, "{first}");
        for target in targets {
            let _ = write!(rules, " {target}");
        }
        rules.push(':');
        let deps = source
            .filename
            .into_iter()
            .chain(source.dependencies)
            .chain(&source.importlib_deps);
        for dep in deps {
            let _ = write!(rules, " {dep}");
        }
        rules.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use makedep::path::Path;
    use makedep::source::Flags;
    use makedep::steps::RuleEmitter;
    use makedep::tree::TreeConfig;
    use makedep::unit::UnitConfig;

    use super::*;

    #[test]
    fn formats_one_line_per_source() {
        let unit = BuildUnit::new(UnitConfig::new(Some(Path::from("tools/foo"))), &TreeConfig::default());
        let steps = Steps::default();
        let filename = Path::from("tools/foo/main.c");
        let targets = [Path::from("tools/foo/main.o")];
        let deps = [Path::from("tools/foo/foo.h"), Path::from("include/config.h")];
        steps.source(
            &unit,
            &ResolvedSource {
                name: "main.c",
                filename: Some(&filename),
                flags: Flags::empty(),
                targets: &targets,
                dependencies: &deps,
                importlib_deps: vec![],
            },
        );
        steps.source(
            &unit,
            &ResolvedSource {
                name: "foo.spec",
                filename: None,
                flags: Flags::empty(),
                targets: &[],
                dependencies: &[],
                importlib_deps: vec![],
            },
        );
        assert_eq!(
            steps.take(),
            "tools/foo/main.o: tools/foo/main.c tools/foo/foo.h include/config.h\n"
        );
        assert_eq!(steps.take(), "");
    }
}
