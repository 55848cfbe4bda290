use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{Equivalent, HashMap};

use crate::error::DepError;
use crate::outputs::Outputs;
use crate::path::Path;
use crate::registry::SourceRegistry;
use crate::source::{Flags, IncludeKind, SourceId};
use crate::tree::{ModuleIndex, TreeConfig};
use crate::vars::Variables;
use crate::{closure, generate, resolve};

/// Source list variables, in the order their files are declared.
pub const SOURCE_VARS: [&str; 15] = [
    "SOURCES",
    "C_SRCS",
    "OBJC_SRCS",
    "RC_SRCS",
    "MC_SRCS",
    "IDL_SRCS",
    "BISON_SRCS",
    "LEX_SRCS",
    "HEADER_SRCS",
    "XTEMPLATE_SRCS",
    "SVG_SRCS",
    "FONT_SRCS",
    "IN_SRCS",
    "PO_SRCS",
    "MANPAGES",
];

/// C runtime a file is compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// The host C library.
    Unix,
    /// The msvcrt headers from the global include tree.
    Msvcrt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// A file as seen from one build unit.
#[derive(Debug, Clone)]
pub struct IncludeNode {
    /// Name as referenced (or as declared, for sources).
    pub name: String,
    /// Resolved path, `None` when nothing provides the name.
    pub filename: Option<Path>,
    /// File output name for synthesized sources.
    pub basename: Option<String>,
    /// Generator input when the file is produced by another rule.
    pub source_name: Option<Path>,
    pub record: Option<SourceId>,
    pub included_by: Option<NodeId>,
    pub included_line: u32,
    pub kind: IncludeKind,
    pub runtime: Runtime,
    pub external: bool,
    /// Last top-level source whose closure walked this node.
    pub owner: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub dependencies: Vec<Path>,
    pub importlib_deps: Vec<Path>,
}

impl IncludeNode {
    fn new(name: impl Into<String>, kind: IncludeKind, runtime: Runtime) -> Self {
        Self {
            name: name.into(),
            filename: None,
            basename: None,
            source_name: None,
            record: None,
            included_by: None,
            included_line: 0,
            kind,
            runtime,
            external: false,
            owner: None,
            children: Vec::new(),
            dependencies: Vec::new(),
            importlib_deps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IncludeKey {
    name: String,
    runtime: Runtime,
}

#[derive(Hash)]
struct IncludeKeyRef<'a> {
    name: &'a str,
    runtime: Runtime,
}

impl Equivalent<IncludeKey> for IncludeKeyRef<'_> {
    fn equivalent(&self, key: &IncludeKey) -> bool {
        self.name == key.name && self.runtime == key.runtime
    }
}

/// Settings of one build directory, read from its descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitConfig {
    /// Output directory relative to the top of the build tree, `None` for the top itself.
    pub obj_dir: Option<Path>,
    pub src_dir: Option<Path>,
    pub parent_dir: Option<String>,
    pub module: Option<String>,
    pub testdll: Option<String>,
    pub sharedlib: Option<String>,
    pub staticlib: Option<String>,
    pub importlib: Option<String>,
    pub extlib: Option<String>,
    pub unixlib: Option<String>,
    pub programs: Vec<String>,
    pub imports: Vec<String>,
    pub delayimports: Vec<String>,
    pub extradllflags: Vec<String>,
    pub extra_targets: Vec<String>,
    pub extra_objs: Vec<String>,
    pub include_paths: Vec<String>,
    pub defines: Vec<String>,
    pub sources: Vec<String>,
    /// Extra defines of single objects, from `<obj>_EXTRADEFS`.
    pub object_defines: HashMap<String, Vec<String>>,
    /// Imports declared for `.spec` sources, from `<obj>_IMPORTS`.
    pub spec_imports: HashMap<String, Vec<String>>,
}

impl UnitConfig {
    pub fn new(obj_dir: Option<Path>) -> Self {
        Self {
            obj_dir,
            ..Default::default()
        }
    }

    pub fn from_vars(
        vars: &dyn Variables,
        obj_dir: Option<Path>,
        root_src_dir: Option<&Path>,
    ) -> Result<Self, DepError> {
        let src_dir = match (&obj_dir, root_src_dir) {
            (Some(obj_dir), Some(root)) => Some(root.join(obj_dir)),
            (None, Some(root)) => Some(root.clone()),
            (_, None) => None,
        };

        let mut config = UnitConfig {
            obj_dir,
            src_dir,
            parent_dir: vars.get("PARENTSRC")?,
            module: vars.get("MODULE")?,
            testdll: vars.get("TESTDLL")?,
            sharedlib: vars.get("SHAREDLIB")?,
            staticlib: vars.get("STATICLIB")?,
            importlib: vars.get("IMPORTLIB")?,
            extlib: vars.get("EXTLIB")?,
            unixlib: vars.get("UNIXLIB")?,
            programs: vars.get_list("PROGRAMS")?,
            imports: vars.get_list("IMPORTS")?,
            delayimports: vars.get_list("DELAYIMPORTS")?,
            extradllflags: vars.get_list("EXTRADLLFLAGS")?,
            extra_targets: vars.get_list("EXTRA_TARGETS")?,
            extra_objs: vars.get_list("EXTRA_OBJS")?,
            ..Default::default()
        };

        if config.extlib.is_some() {
            config.staticlib = config.extlib.clone();
        }
        if config.staticlib.is_some() {
            config.module = config.staticlib.clone();
        }

        if config.extlib.is_none() {
            config.defines.push("-D__WINESRC__".into());
        }
        for arg in vars.get_list("EXTRAINCL")? {
            if let Some(dir) = arg.strip_prefix("-I") {
                if !config.include_paths.iter().any(|d| d == dir) {
                    config.include_paths.push(dir.into());
                }
            } else if (arg.starts_with("-D") || arg.starts_with("-U"))
                && !config.defines.contains(&arg)
            {
                config.defines.push(arg);
            }
        }
        config.defines.extend(vars.get_list("EXTRADEFS")?);

        for var in SOURCE_VARS {
            config.sources.extend(vars.get_list(var)?);
        }
        for source in &config.sources {
            let obj = Path::from(source.as_str());
            let obj = match obj.extension() {
                Some(ext) => &source[..source.len() - ext.len()],
                None => source.as_str(),
            };
            let defines = vars.get_file_local(obj, "EXTRADEFS")?;
            if !defines.is_empty() {
                config.object_defines.insert(obj.into(), defines);
            }
            if source.ends_with(".spec") {
                let imports = vars.get_file_local(obj, "IMPORTS")?;
                if !imports.is_empty() {
                    config.spec_imports.insert(obj.into(), imports);
                }
            }
        }
        Ok(config)
    }

    pub fn is_win16(&self) -> bool {
        self.extradllflags.iter().any(|f| f == "-m16")
    }

    /// Whether sources are built against msvcrt rather than the host libc.
    pub fn use_msvcrt(&self) -> bool {
        (self.module.is_some() || self.testdll.is_some() || self.is_win16())
            && !self.extradllflags.iter().any(|f| f == "-mcygwin")
    }
}

/// One build directory with its sources and the include graph reachable from them.
pub struct BuildUnit {
    pub config: UnitConfig,
    tree: TreeConfig,
    pub runtime: Runtime,
    pub is_cross: bool,
    /// Define selecting the C runtime, for msvcrt units.
    pub crt_define: Option<String>,
    /// Static import library, when some sources belong to the import library.
    pub static_implib: Option<String>,
    pub outputs: Outputs,
    /// Languages of the message catalogs declared here.
    pub linguas: Vec<String>,
    /// Imports requested by the `.spec` sources, on top of `IMPORTS`.
    pub extra_imports: Vec<String>,
    nodes: Vec<IncludeNode>,
    sources: Vec<NodeId>,
    explicit_sources: usize,
    includes: Vec<NodeId>,
    resolved_includes: usize,
    source_index: HashMap<String, NodeId>,
    include_index: HashMap<IncludeKey, NodeId>,
}

impl BuildUnit {
    pub fn new(mut config: UnitConfig, tree: &TreeConfig) -> Self {
        // no unix side library without a unix library extension
        if tree.dll_ext.is_empty() {
            config.unixlib = None;
        }
        let use_msvcrt = config.use_msvcrt();
        Self {
            config,
            tree: tree.clone(),
            runtime: if use_msvcrt {
                Runtime::Msvcrt
            } else {
                Runtime::Unix
            },
            is_cross: tree.cross_target.is_some() && use_msvcrt,
            crt_define: None,
            static_implib: None,
            outputs: Outputs::default(),
            linguas: Vec::new(),
            extra_imports: Vec::new(),
            nodes: Vec::new(),
            sources: Vec::new(),
            explicit_sources: 0,
            includes: Vec::new(),
            resolved_includes: 0,
            source_index: HashMap::new(),
            include_index: HashMap::new(),
        }
    }

    pub fn obj_dir(&self) -> Option<&Path> {
        self.config.obj_dir.as_ref()
    }

    pub fn tree(&self) -> &TreeConfig {
        &self.tree
    }

    pub fn root_src_dir(&self) -> Option<&Path> {
        self.tree.root_src_dir.as_ref()
    }

    pub fn obj_dir_path(&self, name: &str) -> Path {
        self.config.obj_dir.clone().unwrap_or_default().join(name)
    }

    pub fn src_dir_path(&self, name: &str) -> Path {
        match &self.config.src_dir {
            Some(dir) => dir.join(name),
            None => self.obj_dir_path(name),
        }
    }

    pub fn root_path(&self, name: &str) -> Path {
        self.tree.root_src_dir.clone().unwrap_or_default().join(name)
    }

    /// Third-party code: missing local headers are tolerated.
    pub fn is_external(&self) -> bool {
        self.config.extlib.is_some()
    }

    pub fn node(&self, id: NodeId) -> &IncludeNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut IncludeNode {
        &mut self.nodes[id.0 as usize]
    }

    /// All sources: declared ones first, then synthesized ones.
    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub fn explicit_sources(&self) -> &[NodeId] {
        &self.sources[..self.explicit_sources]
    }

    pub fn synthesized_sources(&self) -> &[NodeId] {
        &self.sources[self.explicit_sources..]
    }

    pub fn includes(&self) -> &[NodeId] {
        &self.includes
    }

    pub fn find_source(&self, name: &str) -> Option<NodeId> {
        self.source_index.get(name).copied()
    }

    pub fn find_include(&self, name: &str, runtime: Runtime) -> Option<NodeId> {
        self.include_index
            .get(&IncludeKeyRef { name, runtime })
            .copied()
    }

    /// Whether any include of that name was requested, whatever the runtime.
    pub fn has_include(&self, name: &str) -> bool {
        self.find_include(name, Runtime::Unix).is_some()
            || self.find_include(name, Runtime::Msvcrt).is_some()
    }

    fn push_node(&mut self, node: IncludeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Records that `parent` includes `name`, reusing the unit-wide node for
    /// that name and runtime if there is one.
    pub fn add_include(
        &mut self,
        parent: NodeId,
        name: &str,
        line: u32,
        kind: IncludeKind,
    ) -> NodeId {
        let runtime = self.node(parent).runtime;
        let id = match self.find_include(name, runtime) {
            Some(id) => id,
            None => {
                let mut node = IncludeNode::new(name, kind, runtime);
                node.included_by = Some(parent);
                node.included_line = line;
                let id = self.push_node(node);
                self.includes.push(id);
                self.include_index.insert(
                    IncludeKey {
                        name: name.into(),
                        runtime,
                    },
                    id,
                );
                id
            }
        };
        self.node_mut(parent).children.push(id);
        id
    }

    /// Adds a declared source and scans it. Missing sources are fatal.
    pub fn add_source(
        &mut self,
        registry: &mut SourceRegistry,
        name: &str,
    ) -> Result<NodeId, DepError> {
        if let Some(id) = self.find_source(name) {
            return Ok(id);
        }

        let mut node = IncludeNode::new(name, IncludeKind::Local, self.runtime);
        node.external = self.is_external();
        let id = self.push_node(node);
        self.sources.push(id);
        self.explicit_sources = self.sources.len();
        self.source_index.insert(name.into(), id);

        let Some((record, filename)) = resolve::open_local_file(self, registry, name)? else {
            return Err(DepError::MissingSource { name: name.into() });
        };
        self.node_mut(id).filename = Some(filename);
        self.attach(id, record, registry);
        Ok(id)
    }

    /// Adds a source another rule produces, or returns the existing one.
    ///
    /// The boolean is `true` when the source was created by this call.
    pub fn add_generated_source(
        &mut self,
        registry: &mut SourceRegistry,
        name: &str,
        basename: Option<&str>,
    ) -> (NodeId, bool) {
        if let Some(id) = self.find_source(name) {
            return (id, false);
        }

        let basename = basename.unwrap_or(name);
        let record = registry.synthesize(&Path::from(name), Flags::empty());
        let mut node = IncludeNode::new(name, IncludeKind::Local, self.runtime);
        node.basename = Some(basename.into());
        node.filename = Some(self.obj_dir_path(basename));
        node.record = Some(record);
        let id = self.push_node(node);
        self.sources.push(id);
        self.source_index.insert(name.into(), id);
        (id, true)
    }

    /// Binds a resolved record to its node and queues the files it references.
    pub(crate) fn attach(&mut self, id: NodeId, record: SourceId, registry: &SourceRegistry) {
        let file = registry.get(record);
        let node = self.node_mut(id);
        node.record = Some(record);
        node.children.clear();
        if file.flags.contains(Flags::C_UNIX) {
            node.runtime = Runtime::Unix;
        } else if file.flags.contains(Flags::C_IMPLIB) {
            node.runtime = Runtime::Msvcrt;
        }

        match &node.source_name {
            Some(source) if source.ends_with(".idl") => {
                self.add_idl_header_includes(id, record, registry);
            }
            // generated grammar headers include nothing
            Some(source) if source.ends_with(".y") => {}
            _ => self.add_all_includes(id, record, registry),
        }
    }

    /// Queues every directive of `record` as a child of `id`.
    pub(crate) fn add_all_includes(
        &mut self,
        id: NodeId,
        record: SourceId,
        registry: &SourceRegistry,
    ) {
        for directive in &registry.get(record).directives {
            let kind = match directive.kind {
                IncludeKind::Local | IncludeKind::Import => IncludeKind::Local,
                IncludeKind::ImportLib => IncludeKind::ImportLib,
                IncludeKind::System => IncludeKind::System,
                IncludeKind::CppQuote | IncludeKind::CppQuoteSystem => continue,
            };
            self.add_include(id, &directive.name, directive.line, kind);
        }
    }

    /// Includes of a header generated from the interface file `record`.
    pub(crate) fn add_idl_header_includes(
        &mut self,
        id: NodeId,
        record: SourceId,
        registry: &SourceRegistry,
    ) {
        for rpc in ["rpc.h", "rpcndr.h"] {
            self.add_include(id, rpc, 0, IncludeKind::Local);
        }
        for directive in &registry.get(record).directives {
            match directive.kind {
                IncludeKind::Import => {
                    let name = Path::from(&directive.name);
                    let name = if name.ends_with(".idl") {
                        name.replace_extension(".idl", ".h")
                    } else {
                        name
                    };
                    self.add_include(id, name.as_str(), directive.line, IncludeKind::Local);
                }
                IncludeKind::CppQuote => {
                    self.add_include(id, &directive.name, directive.line, IncludeKind::Local);
                }
                IncludeKind::CppQuoteSystem => {
                    self.add_include(id, &directive.name, directive.line, IncludeKind::System);
                }
                IncludeKind::Local | IncludeKind::System | IncludeKind::ImportLib => {}
            }
        }
    }

    /// Resolves every queued include, including those discovered on the way.
    pub fn resolve_pending(
        &mut self,
        registry: &mut SourceRegistry,
        modules: &ModuleIndex,
    ) -> Result<(), DepError> {
        while let Some(&id) = self.includes.get(self.resolved_includes) {
            self.resolved_includes += 1;
            if let Some(record) = resolve::resolve(self, id, registry, modules)? {
                self.attach(id, record, registry);
            }
        }
        Ok(())
    }

    /// Builds the complete dependency model of the unit.
    ///
    /// `modules` must already know every unit of the tree, since interface
    /// files can reference type libraries built elsewhere.
    pub fn load(
        &mut self,
        registry: &mut SourceRegistry,
        modules: &ModuleIndex,
    ) -> Result<(), DepError> {
        tracing::debug!(
            "loading {} ({} sources)",
            self.obj_dir().map(Path::as_str).unwrap_or("."),
            self.config.sources.len()
        );

        if self.runtime == Runtime::Msvcrt {
            let define = crt_define(&self.config)?;
            self.config.defines.push(define.clone());
            self.crt_define = Some(define);
        }

        for name in self.config.sources.clone() {
            self.add_source(registry, &name)?;
        }
        self.resolve_pending(registry, modules)?;

        generate::expand(self, registry, modules)?;
        if self.config.unixlib.is_none() {
            self.config.unixlib = self.unix_lib_name(registry);
        }

        for i in 0..self.explicit_sources {
            closure::close(self, self.sources[i], registry)?;
        }

        self.outputs = Outputs::collect(self, registry)?;
        Ok(())
    }

    /// Unix side library, needed as soon as one source belongs to it.
    fn unix_lib_name(&self, registry: &SourceRegistry) -> Option<String> {
        let dll_ext = &self.tree.dll_ext;
        if dll_ext.is_empty() {
            return None;
        }
        let module = self.config.module.as_deref()?;
        let has_unix_source = self.sources.iter().any(|&id| {
            self.node(id)
                .record
                .is_some_and(|r| registry.get(r).flags.contains(Flags::C_UNIX))
        });
        has_unix_source.then(|| format!("{}{dll_ext}", Path::from(module).base_name()))
    }
}

fn is_crt_module(name: &str) -> bool {
    name.starts_with("msvcr") || name.starts_with("ucrt") || name == "crtdll.dll"
}

fn default_crt(config: &UnitConfig) -> Option<&str> {
    if !config.use_msvcrt() {
        return None;
    }
    if config.module.as_deref().is_some_and(is_crt_module) {
        return None;
    }
    if config.testdll.is_none() && (config.staticlib.is_none() || config.extlib.is_some()) {
        Some("ucrtbase")
    } else {
        Some("msvcrt")
    }
}

/// Selects the C runtime define from the imports of a msvcrt unit.
pub fn crt_define(config: &UnitConfig) -> Result<String, DepError> {
    let mut crt_dll: Option<&str> = None;
    for import in &config.imports {
        if !is_crt_module(import) {
            continue;
        }
        if let Some(first) = crt_dll {
            return Err(DepError::ConflictingRuntime {
                first: first.into(),
                second: import.clone(),
            });
        }
        crt_dll = Some(import);
    }

    let crt_dll = match crt_dll {
        Some(dll) => dll,
        None if config.extradllflags.iter().any(|f| f == "-nodefaultlibs") => {
            return Ok("-D_MSVCR_VER=0".into());
        }
        None => match default_crt(config).or(config.module.as_deref()) {
            Some(dll) => dll,
            None => return Ok("-D_MSVCR_VER=0".into()),
        },
    };

    if crt_dll.starts_with("ucrt") {
        return Ok("-D_UCRT".into());
    }
    let version: u32 = crt_dll
        .strip_prefix("msvcr")
        .map(|rest| {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            rest[..digits].parse().unwrap_or(0)
        })
        .unwrap_or(0);
    Ok(format!("-D_MSVCR_VER={version}"))
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;
    use crate::os::testing::MemOs;

    fn config(module: &str, imports: &[&str]) -> UnitConfig {
        UnitConfig {
            module: Some(module.into()),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            ..UnitConfig::new(Some(Path::from("dlls/x")))
        }
    }

    #[test]
    fn runtime_follows_module_kind() {
        assert!(config("x.dll", &[]).use_msvcrt());
        let mut cygwin = config("x.dll", &[]);
        cygwin.extradllflags = vec!["-mcygwin".into()];
        assert!(!cygwin.use_msvcrt());
        assert!(!UnitConfig::new(Some(Path::from("tools/widl"))).use_msvcrt());
    }

    #[test]
    fn crt_define_selection() {
        assert_eq!(crt_define(&config("x.dll", &[])).unwrap(), "-D_UCRT");
        assert_eq!(
            crt_define(&config("x.dll", &["kernel32", "msvcr100"])).unwrap(),
            "-D_MSVCR_VER=100"
        );
        assert_eq!(
            crt_define(&config("msvcrt.dll", &[])).unwrap(),
            "-D_MSVCR_VER=0"
        );
        let mut test = config("x.dll", &[]);
        test.testdll = Some("x.dll".into());
        assert_eq!(crt_define(&test).unwrap(), "-D_MSVCR_VER=0");
    }

    #[test]
    fn two_runtimes_are_rejected() {
        let err = crt_define(&config("x.dll", &["msvcr90", "ucrtbase"])).unwrap_err();
        assert!(matches!(err, DepError::ConflictingRuntime { .. }));
    }

    #[test]
    fn config_from_variables() {
        let mut vars = HashMap::new();
        for (name, value) in [
            ("EXTLIB", "libz.a"),
            ("EXTRAINCL", "-I/usr/include/zlib -DZ_SOLO -I/usr/include/zlib -Wall"),
            ("C_SRCS", "adler32.c crc32.c"),
            ("HEADER_SRCS", "zlib.h"),
            ("crc32_EXTRADEFS", "-DNO_TABLES"),
        ] {
            vars.insert(name.to_string(), value.to_string());
        }
        let root = Path::from("../src");
        let config =
            UnitConfig::from_vars(&vars, Some(Path::from("libs/zlib")), Some(&root)).unwrap();
        assert_eq!(config.src_dir, Some(Path::from("../src/libs/zlib")));
        assert_eq!(config.module.as_deref(), Some("libz.a"));
        assert_eq!(config.staticlib.as_deref(), Some("libz.a"));
        assert_eq!(config.include_paths, ["/usr/include/zlib"]);
        assert_eq!(config.defines, ["-DZ_SOLO"]);
        assert_eq!(config.sources, ["adler32.c", "crc32.c", "zlib.h"]);
        assert_eq!(config.object_defines.len(), 1);
        assert_eq!(config.object_defines["crc32"], ["-DNO_TABLES"]);
    }

    #[test]
    fn unix_library_follows_unix_sources() {
        let os = MemOs::new()
            .with("dlls/foo/main.c", "")
            .with("dlls/foo/unix.c", "#pragma makedep unix\n");
        let mut config = config("foo.dll", &[]);
        config.obj_dir = Some(Path::from("dlls/foo"));
        config.sources = vec!["main.c".into(), "unix.c".into()];

        let mut registry = SourceRegistry::new(Rc::new(os.clone()));
        let mut unit = BuildUnit::new(config.clone(), &TreeConfig::default());
        unit.load(&mut registry, &ModuleIndex::default()).unwrap();
        assert_eq!(unit.config.unixlib.as_deref(), Some("foo.so"));

        config.sources = vec!["main.c".into()];
        let mut registry = SourceRegistry::new(Rc::new(os.clone()));
        let mut unit = BuildUnit::new(config.clone(), &TreeConfig::default());
        unit.load(&mut registry, &ModuleIndex::default()).unwrap();
        assert_eq!(unit.config.unixlib, None);
    }

    #[test]
    fn pe_only_trees_have_no_unix_library() {
        let os = MemOs::new().with("dlls/foo/unix.c", "#pragma makedep unix\n");
        let mut config = config("foo.dll", &[]);
        config.obj_dir = Some(Path::from("dlls/foo"));
        config.unixlib = Some("foo.so".into());
        config.sources = vec!["unix.c".into()];
        let tree = TreeConfig {
            exe_ext: ".exe".into(),
            dll_ext: String::new(),
            ..TreeConfig::default()
        };

        let mut unit = BuildUnit::new(config, &tree);
        assert_eq!(unit.config.unixlib, None);
        let mut registry = SourceRegistry::new(Rc::new(os));
        unit.load(&mut registry, &ModuleIndex::default()).unwrap();
        assert_eq!(unit.config.unixlib, None);
    }
}
