//! Sources implied by other sources: interface compiler outputs, grammar and
//! lexer translation units, test lists and extra objects.

use alloc::format;
use alloc::vec::Vec;

use crate::closure;
use crate::error::DepError;
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::source::{Flags, IncludeKind};
use crate::tree::ModuleIndex;
use crate::unit::{BuildUnit, NodeId, Runtime};

/// Synthesizes every source implied by the explicit sources of `unit`, then
/// resolves and closes the new nodes.
pub fn expand(
    unit: &mut BuildUnit,
    registry: &mut SourceRegistry,
    modules: &ModuleIndex,
) -> Result<(), DepError> {
    let first = unit.sources().len();

    for source in unit.explicit_sources().to_vec() {
        expand_source(unit, registry, source);
    }

    if unit.config.testdll.is_some() {
        synthesize(unit, registry, "testlist.o", Some("testlist.c"), &["wine/test.h"]);
    }

    for obj in unit.config.extra_objs.clone() {
        let name = Path::from(&obj);
        if name.ends_with(".o") {
            let c_file = name.replace_extension(".o", ".c");
            let (id, _) = unit.add_generated_source(registry, &obj, Some(c_file.as_str()));
            if let Some(record) = unit.node(id).record {
                registry.get_mut(record).flags |= Flags::C_UNIX;
            }
            unit.node_mut(id).runtime = Runtime::Unix;
        } else if name.ends_with(".res") {
            let rc = name.replace_extension(".res", ".rc");
            unit.add_generated_source(registry, rc.as_str(), None);
        } else {
            unit.add_generated_source(registry, &obj, None);
        }
    }

    unit.resolve_pending(registry, modules)?;

    let synthesized = unit.sources()[first..].to_vec();
    tracing::debug!("{} synthesized sources", synthesized.len());
    for id in synthesized {
        closure::close(unit, id, registry)?;
    }
    Ok(())
}

fn expand_source(unit: &mut BuildUnit, registry: &mut SourceRegistry, source: NodeId) {
    let name = Path::from(&unit.node(source).name);
    let Some(record) = unit.node(source).record else {
        return;
    };
    let flags = registry.get(record).flags;
    let idl = |ext: &str| name.replace_extension(".idl", ext);
    let header = idl(".h");

    if flags.contains(Flags::IDL_CLIENT) {
        synthesize(unit, registry, idl("_c.c").as_str(), None, &[header.as_str()]);
    }
    if flags.contains(Flags::IDL_SERVER) {
        synthesize(
            unit,
            registry,
            idl("_s.c").as_str(),
            None,
            &["wine/exception.h", header.as_str()],
        );
    }
    if flags.contains(Flags::IDL_IDENT) {
        synthesize(
            unit,
            registry,
            idl("_i.c").as_str(),
            None,
            &["rpc.h", "rpcndr.h", "guiddef.h"],
        );
    }
    if flags.contains(Flags::IDL_PROXY) {
        synthesize(
            unit,
            registry,
            "dlldata.o",
            Some("dlldata.c"),
            &["objbase.h", "rpcproxy.h"],
        );
        synthesize(
            unit,
            registry,
            idl("_p.c").as_str(),
            None,
            &["objbase.h", "rpcproxy.h", "wine/exception.h", header.as_str()],
        );
    }
    for (flag, ext) in [
        (Flags::IDL_TYPELIB, "_l.res"),
        (Flags::IDL_REGTYPELIB, "_t.res"),
        (Flags::IDL_REGISTER, "_r.res"),
    ] {
        if flags.contains(flag) {
            synthesize(unit, registry, idl(ext).as_str(), None, &[]);
        }
    }
    if flags.contains(Flags::IDL_HEADER) || (flags.is_empty() && name.ends_with(".idl")) {
        synthesize_idl_header(unit, registry, source, header.as_str());
    }

    if name.ends_with(".x") {
        let header = name.replace_extension(".x", ".h");
        synthesize(unit, registry, header.as_str(), None, &[]);
    }

    for (ext, generated) in [(".y", ".tab.c"), (".l", ".yy.c")] {
        if !name.ends_with(ext) {
            continue;
        }
        let generated = name.replace_extension(ext, generated);
        let (id, _) = unit.add_generated_source(registry, generated.as_str(), None);
        let children = core::mem::take(&mut unit.node_mut(source).children);
        unit.node_mut(id).children = children;
    }

    if flags.contains(Flags::C_IMPLIB) && unit.static_implib.is_none() {
        if let Some(importlib) = &unit.config.importlib {
            if !unit.tree().dll_ext.is_empty() {
                unit.static_implib = Some(format!("lib{importlib}.a"));
            }
        }
    }

    if name.ends_with(".spec") {
        let obj = name.replace_extension(".spec", "");
        if let Some(imports) = unit.config.spec_imports.get(obj.as_str()) {
            for import in imports {
                if !unit.extra_imports.contains(import) {
                    unit.extra_imports.push(import.clone());
                }
            }
        }
    }

    if name.ends_with(".po") {
        let lang = name.replace_extension(".po", "");
        if !unit.linguas.iter().any(|l| l == lang.as_str()) {
            unit.linguas.push(lang.as_str().into());
        }
    }
}

/// Adds a generated source whose content is known to include `deps`.
fn synthesize(
    unit: &mut BuildUnit,
    registry: &mut SourceRegistry,
    name: &str,
    basename: Option<&str>,
    deps: &[&str],
) -> NodeId {
    let (id, created) = unit.add_generated_source(registry, name, basename);
    if !created || deps.is_empty() {
        return id;
    }
    let Some(record) = unit.node(id).record else {
        return id;
    };
    let file = registry.get_mut(record);
    for dep in deps {
        file.add_directive(*dep, 0, IncludeKind::Local);
    }
    unit.add_all_includes(id, record, registry);
    id
}

/// The header of an interface file includes what the interface imports.
fn synthesize_idl_header(
    unit: &mut BuildUnit,
    registry: &mut SourceRegistry,
    idl: NodeId,
    header: &str,
) {
    let (id, created) = unit.add_generated_source(registry, header, None);
    let Some(record) = unit.node(idl).record else {
        return;
    };
    if created {
        let source_name = unit.node(idl).filename.clone();
        unit.node_mut(id).source_name = source_name;
        unit.add_idl_header_includes(id, record, registry);
    }
}

/// Names of the sources feeding the shared proxy data file, in declaration order.
pub fn dlldata_sources(unit: &BuildUnit, registry: &SourceRegistry) -> Vec<Path> {
    unit.explicit_sources()
        .iter()
        .map(|&id| unit.node(id))
        .filter(|node| {
            node.record
                .is_some_and(|r| registry.get(r).flags.contains(Flags::IDL_PROXY))
        })
        .map(|node| Path::from(&node.name))
        .collect()
}
