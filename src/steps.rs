use alloc::vec::Vec;

use crate::path::Path;
use crate::source::Flags;
pub use crate::unit::BuildUnit;

/// One source of a unit with everything needed to write its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource<'a> {
    /// Name as declared, or as synthesized for generated sources.
    pub name: &'a str,
    /// Path of the source, relative to the top of the build tree.
    pub filename: Option<&'a Path>,
    pub flags: Flags,
    /// Files built from this source.
    pub targets: &'a [Path],
    /// Transitive include closure, in discovery order.
    pub dependencies: &'a [Path],
    /// Modules whose type libraries the targets are built against.
    pub importlib_deps: Vec<Path>,
}

/// Output abstraction for dependency rules
///
/// This trait defines the interface for backends that write the resolved
/// dependency model out, usually as makefile rules. The tree calls
/// [`RuleEmitter::begin_unit`], then [`RuleEmitter::source`] once for every
/// source producing targets, then [`RuleEmitter::end_unit`], unit by unit in
/// declaration order.
pub trait RuleEmitter: 'static {
    /// Called before the sources of `unit`.
    ///
    /// # Arguments
    /// * `unit` - The loaded unit, with its configuration and output sets
    fn begin_unit(&self, unit: &BuildUnit) {
        let _ = unit;
    }

    /// Emits the rule of one source
    ///
    /// Every target of `source` depends on the source file itself, on each
    /// of its dependencies and on its type library imports.
    ///
    /// # Arguments
    /// * `unit` - The unit owning the source
    /// * `source` - The source with its targets and resolved dependencies
    fn source(&self, unit: &BuildUnit, source: &ResolvedSource<'_>);

    /// Called after the last source of `unit`.
    fn end_unit(&self, unit: &BuildUnit) {
        let _ = unit;
    }
}
