use alloc::format;
use alloc::vec::Vec;

use crate::error::{DepError, Location, Note};
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::source::{IncludeKind, SourceId};
use crate::tree::ModuleIndex;
use crate::unit::{BuildUnit, NodeId, Runtime};

/// System headers the msvcrt runtime is allowed to lack.
const MSVCRT_MISSING_HEADERS: [&str; 2] = ["stdarg.h", "x86intrin.h"];

/// Opens `name` in the unit source directory, then in its parent directory.
pub(crate) fn open_local_file(
    unit: &BuildUnit,
    registry: &mut SourceRegistry,
    name: &str,
) -> Result<Option<(SourceId, Path)>, DepError> {
    let path = unit.src_dir_path(name);
    if let Some(id) = registry.load(&path)? {
        return Ok(Some((id, path)));
    }
    if let Some(parent) = &unit.config.parent_dir {
        let path = unit.src_dir_path(&format!("{parent}/{name}"));
        if let Some(id) = registry.load(&path)? {
            return Ok(Some((id, path)));
        }
    }
    Ok(None)
}

/// Opens a file relative to the top of the source tree.
pub(crate) fn open_global_file(
    unit: &BuildUnit,
    registry: &mut SourceRegistry,
    name: &str,
) -> Result<Option<(SourceId, Path)>, DepError> {
    let path = unit.root_path(name);
    Ok(registry.load(&path)?.map(|id| (id, path)))
}

/// Opens a file of the global include directory.
pub(crate) fn open_global_header(
    unit: &BuildUnit,
    registry: &mut SourceRegistry,
    name: &str,
) -> Result<Option<(SourceId, Path)>, DepError> {
    if name.starts_with("../") {
        return Ok(None);
    }
    open_global_file(unit, registry, &format!("include/{name}"))
}

/// Where a node was found, before it is written back to the unit.
#[derive(Default)]
struct Found {
    record: Option<SourceId>,
    filename: Option<Path>,
    source_name: Option<Path>,
    external: bool,
}

impl Found {
    fn file(record: SourceId, filename: Path) -> Self {
        Self {
            record: Some(record),
            filename: Some(filename),
            ..Default::default()
        }
    }

    /// Bound to a file generated from `source`.
    fn generated(record: SourceId, source: Path, filename: Path) -> Self {
        Self {
            record: Some(record),
            filename: Some(filename),
            source_name: Some(source),
            external: false,
        }
    }
}

/// Resolves the include node `id`, recording its path on the node.
///
/// Returns the backing record when there is one. `Ok(None)` covers both
/// targets with no file behind them and tolerated misses.
pub fn resolve(
    unit: &mut BuildUnit,
    id: NodeId,
    registry: &mut SourceRegistry,
    modules: &ModuleIndex,
) -> Result<Option<SourceId>, DepError> {
    let found = search(unit, id, registry, modules)?;
    let node = unit.node_mut(id);
    if let Some(found) = found {
        tracing::trace!(
            "{} -> {}",
            node.name,
            found.filename.as_ref().map(Path::as_str).unwrap_or("-")
        );
        node.filename = found.filename;
        node.source_name = found.source_name;
        node.external |= found.external;
        Ok(found.record)
    } else {
        tracing::trace!("{}: not found", node.name);
        Ok(None)
    }
}

fn search(
    unit: &BuildUnit,
    id: NodeId,
    registry: &mut SourceRegistry,
    modules: &ModuleIndex,
) -> Result<Option<Found>, DepError> {
    let node = unit.node(id);
    let name = Path::from(&node.name);
    let is_header = name.ends_with(".h");

    // header generated from a grammar of this unit
    if name.ends_with(".tab.h") {
        let grammar = name.replace_extension(".tab.h", ".y");
        if let Some((record, source)) = open_local_file(unit, registry, grammar.as_str())? {
            return Ok(Some(Found::generated(
                record,
                source,
                unit.obj_dir_path(name.as_str()),
            )));
        }
    }

    // header generated from an interface file of this unit
    if is_header {
        let idl = name.replace_extension(".h", ".idl");
        if let Some((record, source)) = open_local_file(unit, registry, idl.as_str())? {
            return Ok(Some(Found::generated(
                record,
                source,
                unit.obj_dir_path(name.as_str()),
            )));
        }
    }

    if unit.config.extra_targets.iter().any(|t| *t == node.name) {
        return Ok(Some(Found {
            filename: Some(unit.obj_dir_path(name.as_str())),
            source_name: Some(unit.src_dir_path(name.as_str())),
            ..Default::default()
        }));
    }

    if let Some((record, filename)) = open_local_file(unit, registry, name.as_str())? {
        return Ok(Some(Found::file(record, filename)));
    }

    if node.kind == IncludeKind::ImportLib && modules.find(name.as_str()).is_some() {
        return Ok(Some(Found {
            filename: Some(name),
            ..Default::default()
        }));
    }

    if is_header {
        let global = Path::from(format!("include/{name}"));
        for (old, new) in [(".h", ".idl"), (".h", ".h.in")] {
            let source = name.replace_extension(old, new);
            if let Some((record, source)) = open_global_header(unit, registry, source.as_str())? {
                return Ok(Some(Found::generated(record, source, global)));
            }
        }
        if name.ends_with("tmpl.h") {
            let template = name.replace_extension(".h", ".x");
            if let Some((record, source)) =
                open_global_header(unit, registry, template.as_str())?
            {
                return Ok(Some(Found::generated(record, source, global)));
            }
        }
    }

    if let Some((record, filename)) = open_global_header(unit, registry, name.as_str())? {
        return Ok(Some(Found::file(record, filename)));
    }

    if node.runtime == Runtime::Msvcrt {
        let msvcrt = format!("msvcrt/{name}");
        if let Some((record, filename)) = open_global_header(unit, registry, &msvcrt)? {
            return Ok(Some(Found::file(record, filename)));
        }
    }

    for dir in &unit.config.include_paths {
        let dir = Path::from(dir);
        let (path, external) = match unit.root_src_dir() {
            Some(root) => match dir.strip_dir(root.as_str()) {
                Some(rest) => (root.join(Path::from(rest).join(name.as_str())), false),
                None => (dir.join(name.as_str()), true),
            },
            None => (dir.join(name.as_str()), dir.as_str().starts_with('/')),
        };
        tracing::trace!("{name}: trying {path}");
        if let Some(record) = registry.load(&path)? {
            return Ok(Some(Found {
                external,
                ..Found::file(record, path)
            }));
        }
    }

    let Some(parent_id) = node.included_by else {
        return Ok(None);
    };
    let parent = unit.node(parent_id);

    if node.kind == IncludeKind::System
        && node.runtime == Runtime::Msvcrt
        && !unit.is_external()
        && !parent.external
    {
        if MSVCRT_MISSING_HEADERS.contains(&node.name.as_str())
            || !unit.config.include_paths.is_empty()
        {
            return Ok(None);
        }
        return Err(DepError::IncompatibleHeader {
            location: location_of(unit, parent_id, node.included_line, registry),
            name: node.name.clone(),
        });
    }

    // system headers outside the tree are the compiler's business
    if node.kind == IncludeKind::System {
        return Ok(None);
    }

    if let Some(parent_record) = parent.record {
        let path = registry.get(parent_record).path.with_file_name(name.as_str());
        if let Some(record) = registry.load(&path)? {
            let filename = match &parent.filename {
                Some(filename) => filename.with_file_name(name.as_str()),
                None => path,
            };
            return Ok(Some(Found {
                external: parent.external,
                ..Found::file(record, filename)
            }));
        }
    }

    if unit.is_external() || parent.external {
        tracing::warn!("{}: {name} not found, ignored", parent.name);
        return Ok(None);
    }

    Err(DepError::MissingInclude {
        location: location_of(unit, parent_id, node.included_line, registry),
        name: node.name.clone(),
        notes: include_chain(unit, parent_id, registry),
    })
}

/// Location of a directive found in the file behind `id`.
fn location_of(
    unit: &BuildUnit,
    id: NodeId,
    line: u32,
    registry: &SourceRegistry,
) -> Location {
    let node = unit.node(id);
    let file = match node.record {
        Some(record) => registry.get(record).path.clone(),
        None => Path::from(&node.name),
    };
    Location::new(file, line)
}

/// Notes showing how `id` was reached, innermost first.
fn include_chain(unit: &BuildUnit, mut id: NodeId, registry: &SourceRegistry) -> Vec<Note> {
    let mut notes = Vec::new();
    while let Some(parent) = unit.node(id).included_by {
        let node = unit.node(id);
        let file = match &unit.node(parent).source_name {
            Some(source) => source.clone(),
            None => location_of(unit, parent, 0, registry).file,
        };
        notes.push(Note {
            location: Location::new(file, node.included_line),
            name: node.name.clone(),
        });
        id = parent;
    }
    notes
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};
    use alloc::vec;

    use super::*;
    use crate::os::testing::MemOs;
    use crate::tree::TreeConfig;
    use crate::unit::UnitConfig;

    fn unit(config: UnitConfig) -> BuildUnit {
        BuildUnit::new(config, &TreeConfig::default())
    }

    fn config(dir: &str, sources: &[&str]) -> UnitConfig {
        UnitConfig {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            ..UnitConfig::new(Some(Path::from(dir)))
        }
    }

    fn load(os: MemOs, config: UnitConfig) -> Result<(BuildUnit, SourceRegistry), DepError> {
        let mut registry = SourceRegistry::new(Rc::new(os));
        let mut unit = unit(config);
        unit.load(&mut registry, &ModuleIndex::default())?;
        Ok((unit, registry))
    }

    fn filename(unit: &BuildUnit, name: &str, runtime: Runtime) -> Option<String> {
        let id = unit.find_include(name, runtime)?;
        unit.node(id).filename.as_ref().map(|p| p.to_string())
    }

    #[test]
    fn local_header_shadows_global_one() {
        let os = MemOs::new()
            .with("tools/foo/foo.c", "#include \"bar.h\"\n")
            .with("tools/foo/bar.h", "")
            .with("include/bar.h", "");
        let (unit, _) = load(os, config("tools/foo", &["foo.c"])).unwrap();
        assert_eq!(
            filename(&unit, "bar.h", Runtime::Unix).as_deref(),
            Some("tools/foo/bar.h")
        );
    }

    #[test]
    fn global_headers_and_generators() {
        let os = MemOs::new()
            .with(
                "tools/foo/foo.c",
                "#include \"config.h\"\n#include \"wine/list.h\"\n#include \"oaidl.h\"\n#include \"parser.tab.h\"\n",
            )
            .with("tools/foo/parser.y", "")
            .with("include/config.h.in", "")
            .with("include/wine/list.h", "")
            .with("include/oaidl.idl", "")
            .with("include/rpc.h", "")
            .with("include/rpcndr.h", "");
        let (unit, _) = load(os, config("tools/foo", &["foo.c"])).unwrap();

        let node = unit.node(unit.find_include("config.h", Runtime::Unix).unwrap());
        assert_eq!(node.filename, Some(Path::from("include/config.h")));
        assert_eq!(node.source_name, Some(Path::from("include/config.h.in")));

        let node = unit.node(unit.find_include("oaidl.h", Runtime::Unix).unwrap());
        assert_eq!(node.filename, Some(Path::from("include/oaidl.h")));
        assert_eq!(node.source_name, Some(Path::from("include/oaidl.idl")));

        let node = unit.node(unit.find_include("parser.tab.h", Runtime::Unix).unwrap());
        assert_eq!(node.filename, Some(Path::from("tools/foo/parser.tab.h")));
        assert_eq!(node.source_name, Some(Path::from("tools/foo/parser.y")));

        assert_eq!(
            filename(&unit, "wine/list.h", Runtime::Unix).as_deref(),
            Some("include/wine/list.h")
        );
    }

    #[test]
    fn parent_directory_is_searched() {
        let os = MemOs::new()
            .with("dlls/a/a.c", "#include \"config.h\"\n#include \"shared.h\"\n")
            .with("dlls/b/shared.h", "")
            .with("include/config.h", "");
        let mut config = config("dlls/a", &["a.c"]);
        config.parent_dir = Some("../b".into());
        let (unit, _) = load(os, config).unwrap();
        assert_eq!(
            filename(&unit, "shared.h", Runtime::Unix).as_deref(),
            Some("dlls/b/shared.h")
        );
    }

    #[test]
    fn missing_system_headers_are_ignored() {
        let os = MemOs::new().with("tools/foo/foo.c", "#include <stdio.h>\n");
        let (unit, _) = load(os, config("tools/foo", &["foo.c"])).unwrap();
        assert_eq!(filename(&unit, "stdio.h", Runtime::Unix), None);
    }

    #[test]
    fn msvcrt_units_reject_unknown_system_headers() {
        let os = MemOs::new()
            .with("include/config.h", "")
            .with("include/msvcrt/stdio.h", "")
            .with(
                "dlls/foo/foo.c",
                "#include \"config.h\"\n#include <stdio.h>\n#include <stdarg.h>\n#include <pthread.h>\n",
            );
        let mut config = config("dlls/foo", &["foo.c"]);
        config.module = Some("foo.dll".into());

        let err = load(os.clone(), config.clone()).err().unwrap();
        assert_eq!(
            err.to_string(),
            "dlls/foo/foo.c:4: error: system header pthread.h cannot be used with msvcrt"
        );

        config.include_paths = vec!["/opt/include".into()];
        let (unit, _) = load(os, config).unwrap();
        assert_eq!(
            filename(&unit, "stdio.h", Runtime::Msvcrt).as_deref(),
            Some("include/msvcrt/stdio.h")
        );
        assert_eq!(filename(&unit, "pthread.h", Runtime::Msvcrt), None);
    }

    #[test]
    fn include_paths_outside_the_tree_are_external() {
        let os = MemOs::new()
            .with("libs/z/z.c", "#include \"zconf.h\"\n")
            .with("/usr/include/zlib/zconf.h", "#include \"nowhere.h\"\n");
        let mut config = config("libs/z", &["z.c"]);
        config.include_paths = vec!["/usr/include/zlib".into()];
        let (unit, _) = load(os, config).unwrap();

        let node = unit.node(unit.find_include("zconf.h", Runtime::Unix).unwrap());
        assert!(node.external);
        assert_eq!(filename(&unit, "nowhere.h", Runtime::Unix), None);
    }

    #[test]
    fn missing_include_reports_the_chain() {
        let os = MemOs::new()
            .with("tools/foo/foo.c", "\n#include \"a.h\"\n")
            .with("tools/foo/a.h", "#include \"b.h\"\n")
            .with("tools/foo/b.h", "\n\n#include \"missing.h\"\n");
        let err = load(os, config("tools/foo", &["foo.c"])).err().unwrap();
        assert_eq!(
            err.to_string(),
            "tools/foo/b.h:3: error: missing.h: No such file or directory\n\
             tools/foo/a.h:1: note: b.h was first included here\n\
             tools/foo/foo.c:2: note: a.h was first included here"
        );
    }

    #[test]
    fn same_directory_as_includer() {
        let os = MemOs::new()
            .with("tools/foo/foo.c", "#include \"wine/port.h\"\n")
            .with("include/wine/port.h", "#include \"helper.h\"\n")
            .with("include/wine/helper.h", "");
        let (unit, _) = load(os, config("tools/foo", &["foo.c"])).unwrap();
        assert_eq!(
            filename(&unit, "helper.h", Runtime::Unix).as_deref(),
            Some("include/wine/helper.h")
        );
    }

    #[test]
    fn extra_targets_have_no_file() {
        let os = MemOs::new().with("tools/foo/foo.c", "#include \"gen.h\"\n");
        let mut config = config("tools/foo", &["foo.c"]);
        config.extra_targets = vec!["gen.h".into()];
        let (unit, _) = load(os, config).unwrap();
        let node = unit.node(unit.find_include("gen.h", Runtime::Unix).unwrap());
        assert_eq!(node.filename, Some(Path::from("tools/foo/gen.h")));
        assert_eq!(node.record, None);
    }

    #[test]
    fn external_units_tolerate_missing_headers() {
        let os = MemOs::new()
            .with("libs/z/z.c", "#include \"a.h\"\n#include \"nope.h\"\n")
            .with("libs/z/a.h", "");
        let mut config = config("libs/z", &["z.c"]);
        config.extlib = Some("libz.a".into());
        let (unit, _) = load(os, config).unwrap();

        assert_eq!(filename(&unit, "nope.h", Runtime::Unix), None);
        let source = unit.node(unit.find_source("z.c").unwrap());
        assert!(source.external);
        assert_eq!(source.dependencies, [Path::from("libs/z/a.h")]);
    }

    #[test]
    fn include_paths_under_the_root_are_internal() {
        let os = MemOs::new()
            .with("../src/libs/z/z.c", "#include \"zconf.h\"\n")
            .with("../src/extra/zconf.h", "");
        let mut config = config("libs/z", &["z.c"]);
        config.src_dir = Some(Path::from("../src/libs/z"));
        config.include_paths = vec!["../src/extra".into()];
        let tree = TreeConfig {
            root_src_dir: Some(Path::from("../src")),
            ..TreeConfig::default()
        };
        let mut registry = SourceRegistry::new(Rc::new(os));
        let mut unit = BuildUnit::new(config, &tree);
        unit.load(&mut registry, &ModuleIndex::default()).unwrap();

        let node = unit.node(unit.find_include("zconf.h", Runtime::Unix).unwrap());
        assert_eq!(node.filename, Some(Path::from("../src/extra/zconf.h")));
        assert!(!node.external);
    }
}
