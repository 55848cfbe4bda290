use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::error::{DepError, Location};
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::scan::CONFIG_HEADER;
use crate::source::{Flags, IncludeKind};
use crate::unit::{BuildUnit, NodeId};

/// Flattens the include graph below `source` into its dependency lists.
///
/// Nodes are walked depth first in discovery order; a node already stamped
/// with `source` is not walked again, which also ends cycles.
pub fn close(
    unit: &mut BuildUnit,
    source: NodeId,
    registry: &SourceRegistry,
) -> Result<(), DepError> {
    let source_node = unit.node(source);
    let first_child = source_node.children.first().copied();
    let wants_typelib = source_node
        .record
        .is_some_and(|record| registry.get(record).flags.intersects(Flags::IDL_TYPELIBS));
    let config_header = config_header_paths(unit);

    let mut dependencies = Vec::new();
    let mut importlib_deps = Vec::new();
    let mut seen = HashSet::new();

    let mut stack: Vec<NodeId> = source_node.children.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let node = unit.node(id);
        let Some(filename) = node.filename.clone() else {
            continue;
        };
        if id == source || node.owner == Some(source) {
            continue;
        }

        if node.kind == IncludeKind::ImportLib {
            if !wants_typelib {
                continue;
            }
            if !importlib_deps.contains(&filename) {
                importlib_deps.push(filename.clone());
            }
        } else if seen.insert(filename.clone()) {
            dependencies.push(filename.clone());
        }

        if config_header.contains(&filename)
            && Some(id) != first_child
            && !unit.node(source).external
        {
            return Err(config_header_error(unit, source, id, registry));
        }

        let node = unit.node_mut(id);
        node.owner = Some(source);
        stack.extend(node.children.iter().rev());
    }

    tracing::trace!(
        "{}: {} dependencies",
        unit.node(source).name,
        dependencies.len()
    );
    let node = unit.node_mut(source);
    node.dependencies = dependencies;
    node.importlib_deps = importlib_deps;
    Ok(())
}

/// Spellings of the configuration header path as resolved in this unit.
fn config_header_paths(unit: &BuildUnit) -> [Path; 2] {
    let name = alloc::format!("include/{CONFIG_HEADER}");
    [Path::from(name.as_str()), unit.root_path(&name)]
}

fn config_header_error(
    unit: &BuildUnit,
    source: NodeId,
    header: NodeId,
    registry: &SourceRegistry,
) -> DepError {
    let source_node = unit.node(source);
    let name = unit.node(header).name.clone();
    let line = source_node
        .record
        .map(|record| {
            registry
                .get(record)
                .directives
                .iter()
                .filter(|d| d.name == name)
                .map(|d| d.line)
                .last()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    let file = source_node
        .filename
        .clone()
        .unwrap_or_else(|| Path::from(&source_node.name));
    DepError::ConfigHeaderOrder {
        location: Location::new(file, line),
        name,
    }
}
