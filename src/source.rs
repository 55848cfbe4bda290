use alloc::string::String;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::path::Path;

bitflags! {
    /// Classification flags of a source file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        /// Produced by another rule, no file on disk yet.
        const GENERATED      = 0x000001;
        /// Explicitly requested for installation.
        const INSTALL        = 0x000002;
        const IDL_PROXY      = 0x000100;
        const IDL_CLIENT     = 0x000200;
        const IDL_SERVER     = 0x000400;
        const IDL_IDENT      = 0x000800;
        const IDL_REGISTER   = 0x001000;
        const IDL_TYPELIB    = 0x002000;
        const IDL_REGTYPELIB = 0x004000;
        const IDL_HEADER     = 0x008000;
        /// Resource script carrying translations.
        const RC_PO          = 0x010000;
        /// Member of the import library.
        const C_IMPLIB       = 0x020000;
        /// Member of the unix side library.
        const C_UNIX         = 0x040000;
        /// Font definition that also produces bitmap fonts.
        const SFD_FONTS      = 0x080000;

        const IDL_TYPELIBS = Self::IDL_TYPELIB.bits() | Self::IDL_REGTYPELIB.bits();
    }
}

/// Outputs an interface file can produce, with their file suffix.
pub const IDL_OUTPUTS: [(Flags, &str); 8] = [
    (Flags::IDL_TYPELIB, "_l.res"),
    (Flags::IDL_REGTYPELIB, "_t.res"),
    (Flags::IDL_CLIENT, "_c.c"),
    (Flags::IDL_IDENT, "_i.c"),
    (Flags::IDL_PROXY, "_p.c"),
    (Flags::IDL_SERVER, "_s.c"),
    (Flags::IDL_REGISTER, "_r.res"),
    (Flags::IDL_HEADER, ".h"),
];

/// How a file was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `#include "foo.h"`
    Local,
    /// `#include <foo.h>`
    System,
    /// idl `import "foo.idl"`
    Import,
    /// idl `importlib("foo.tlb")`
    ImportLib,
    /// idl `cpp_quote("#include \"foo.h\"")`
    CppQuote,
    /// idl `cpp_quote("#include <foo.h>")`
    CppQuoteSystem,
}

/// One reference found while scanning a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub line: u32,
    pub kind: IncludeKind,
    pub name: String,
}

/// Scanner selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    C,
    ObjC,
    Idl,
    Rc,
    Template,
    FontDef,
    Other,
}

impl FileKind {
    pub fn of(path: &Path) -> FileKind {
        const TABLE: &[(&str, FileKind)] = &[
            (".c", FileKind::C),
            (".h", FileKind::C),
            (".inl", FileKind::C),
            (".l", FileKind::C),
            (".m", FileKind::ObjC),
            (".rh", FileKind::C),
            (".x", FileKind::C),
            (".y", FileKind::C),
            (".idl", FileKind::Idl),
            (".rc", FileKind::Rc),
            (".in", FileKind::Template),
            (".sfd", FileKind::FontDef),
        ];
        TABLE
            .iter()
            .find(|(ext, _)| path.ends_with(ext))
            .map(|&(_, kind)| kind)
            .unwrap_or(FileKind::Other)
    }
}

/// Program name and section read from a manual page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManPage {
    pub program: String,
    pub section: String,
}

/// One physical (or synthesized) file, shared by every build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub path: Path,
    pub directives: Vec<Directive>,
    pub flags: Flags,
    pub man_page: Option<ManPage>,
    /// `font` pragma payloads: output name followed by generator arguments.
    pub fonts: Vec<String>,
}

impl SourceRecord {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            directives: Vec::new(),
            flags: Flags::empty(),
            man_page: None,
            fonts: Vec::new(),
        }
    }

    pub fn add_directive(&mut self, name: impl Into<String>, line: u32, kind: IncludeKind) {
        self.directives.push(Directive {
            line,
            kind,
            name: name.into(),
        });
    }

    pub fn kind(&self) -> FileKind {
        FileKind::of(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) u32);
