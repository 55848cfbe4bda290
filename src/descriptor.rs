//! Build descriptors: the variable assignments at the top of a makefile.

use alloc::string::String;

use hashbrown::HashMap;

use crate::error::{DepError, bail_syntax};
use crate::path::Path;
use crate::scan::Lines;
use crate::vars::Variables;

/// Everything after this line is generated.
pub const DEPENDENCY_SEPARATOR: &str = "### Dependencies";

/// Upper bound on `$(...)` substitutions while expanding one value.
const MAX_SUBSTITUTIONS: usize = 4096;

/// Raw (unexpanded) assignments of one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    path: Option<Path>,
    vars: HashMap<String, String>,
}

impl Descriptor {
    pub fn new(path: Option<Path>) -> Self {
        Self {
            path,
            vars: HashMap::new(),
        }
    }

    /// Reads `NAME = value` lines up to the dependency separator.
    ///
    /// Commands (tab-indented lines), comments and anything that is not an
    /// assignment are skipped.
    pub fn parse(path: Option<Path>, text: &str) -> Self {
        let mut descriptor = Self::new(path);
        for (_, line) in Lines::new(text) {
            if line.starts_with(DEPENDENCY_SEPARATOR) {
                break;
            }
            if line.starts_with('\t') {
                continue;
            }
            let line = line.trim_start();
            if line.starts_with('#') {
                continue;
            }
            descriptor.assign(line);
        }
        descriptor
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn raw(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Applies one `NAME=value` assignment; returns `false` if `text` is not one.
    pub fn assign(&mut self, text: &str) -> bool {
        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        if name_len == 0 {
            return false;
        }
        let (name, rest) = text.split_at(name_len);
        let Some(value) = rest.trim_start().strip_prefix('=') else {
            return false;
        };
        self.set(name, value.trim_start());
        true
    }

    /// Applies the assignments of a `MAKEFLAGS` string.
    ///
    /// Words are separated by whitespace; a backslash escapes the next
    /// character.
    pub fn assign_makeflags(&mut self, flags: &str) {
        let mut chars = flags.chars().peekable();
        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let mut word = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                match c {
                    '\\' => word.push(chars.next().unwrap_or('\\')),
                    c => word.push(c),
                }
            }
            if word.is_empty() {
                break;
            }
            self.assign(&word);
        }
    }
}

/// Variable lookup for one unit: command line, then the unit descriptor,
/// then the top-level one.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub cmdline: &'a Descriptor,
    pub unit: &'a Descriptor,
    pub top: Option<&'a Descriptor>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        self.cmdline
            .raw(name)
            .or_else(|| self.unit.raw(name))
            .or_else(|| self.top.and_then(|top| top.raw(name)))
    }

    /// Expands `$(NAME)` references; `${...}` and `$$` are kept for make.
    pub fn expand(&self, value: &str) -> Result<String, DepError> {
        let file = self.unit.path().cloned();
        let mut expanded = String::from(value);
        let mut pos = 0;
        let mut substitutions = 0;

        while let Some(offset) = expanded[pos..].find('$') {
            let start = pos + offset;
            let rest = &expanded[start + 1..];
            match rest.chars().next() {
                Some('(') => {
                    let Some(end) = rest.find(')') else {
                        bail_syntax!(file, "syntax error in '{}'", expanded);
                    };
                    let name = &rest[1..end];
                    if name.contains(':') {
                        bail_syntax!(file, "pattern replacement not supported for '{}'", name);
                    }
                    substitutions += 1;
                    if substitutions > MAX_SUBSTITUTIONS {
                        bail_syntax!(file, "recursive variable reference in '{}'", value);
                    }
                    let replacement = String::from(self.lookup(name).unwrap_or_default());
                    expanded.replace_range(start..start + end + 2, &replacement);
                    pos = start;
                }
                Some('{') => {
                    let Some(end) = rest.find('}') else {
                        bail_syntax!(file, "syntax error in '{}'", expanded);
                    };
                    pos = start + end + 2;
                }
                Some('$') => pos = start + 2,
                _ => bail_syntax!(file, "syntax error in '{}'", expanded),
            }
        }
        Ok(expanded)
    }
}

impl Variables for Scope<'_> {
    fn get(&self, name: &str) -> Result<Option<String>, DepError> {
        let Some(value) = self.lookup(name) else {
            return Ok(None);
        };
        let expanded = self.expand(value)?;
        Ok((!expanded.trim().is_empty()).then_some(expanded))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    const MAKEFILE: &str = "\
# comment
MODULE    = foo.dll
IMPORTS   = uuid \\
            ole32
C_SRCS = main.c
C_SRCS = $(MODULE:.dll=.c)
all:
\tC_SRCS = ignored.c
EMPTY =
### Dependencies
LATE = too late
";

    #[test]
    fn parse_assignments() {
        let descriptor = Descriptor::parse(Some(Path::from("dlls/foo/Makefile.in")), MAKEFILE);
        assert_eq!(descriptor.raw("MODULE"), Some("foo.dll"));
        assert!(descriptor.raw("IMPORTS").unwrap().ends_with(" ole32"));
        assert_eq!(descriptor.raw("C_SRCS"), Some("$(MODULE:.dll=.c)"));
        assert_eq!(descriptor.raw("EMPTY"), Some(""));
        assert_eq!(descriptor.raw("LATE"), None);
    }

    #[test]
    fn precedence_and_expansion() {
        let mut cmdline = Descriptor::default();
        cmdline.assign_makeflags(" -s  CROSSTARGET=x86_64-w64-mingw32 OPT=a\\ b");
        let mut top = Descriptor::default();
        top.set("srcdir", "../wine");
        top.set("CROSSTARGET", "i686-w64-mingw32");
        let mut unit = Descriptor::default();
        unit.set("top_srcdir", "$(srcdir)");
        unit.set("EXTRAINCL", "-I$(top_srcdir)/include ${HOST} $$PWD");
        unit.set("BLANK", "$(UNDEFINED)  ");

        let scope = Scope {
            cmdline: &cmdline,
            unit: &unit,
            top: Some(&top),
        };
        assert_eq!(
            scope.get("CROSSTARGET").unwrap().as_deref(),
            Some("x86_64-w64-mingw32")
        );
        assert_eq!(scope.get("OPT").unwrap().as_deref(), Some("a b"));
        assert_eq!(
            scope.get_list("EXTRAINCL").unwrap(),
            ["-I../wine/include", "${HOST}", "$$PWD"]
        );
        assert_eq!(scope.get("BLANK").unwrap(), None);
        assert_eq!(scope.get("NOPE").unwrap(), None);
    }

    #[test]
    fn expansion_errors() {
        let cmdline = Descriptor::default();
        let mut unit = Descriptor::new(Some(Path::from("Makefile")));
        unit.set("PATTERN", "$(C_SRCS:.c=.o)");
        unit.set("OPEN", "$(C_SRCS");
        unit.set("DOLLAR", "cost $5");
        unit.set("LOOP", "$(LOOP)");
        let scope = Scope {
            cmdline: &cmdline,
            unit: &unit,
            top: None,
        };

        let err = scope.get("PATTERN").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Makefile: error: pattern replacement not supported for 'C_SRCS:.c=.o'"
        );
        assert!(matches!(scope.get("OPEN"), Err(DepError::Syntax { .. })));
        assert!(matches!(scope.get("DOLLAR"), Err(DepError::Syntax { .. })));
        assert!(matches!(scope.get("LOOP"), Err(DepError::Syntax { .. })));
    }

    #[test]
    fn non_assignments_are_rejected() {
        let mut descriptor = Descriptor::default();
        assert!(!descriptor.assign("-s"));
        assert!(!descriptor.assign("all: foo"));
        assert!(descriptor.assign("V=1"));
        assert_eq!(descriptor.raw("V"), Some("1"));
        assert_eq!(descriptor.path(), None);
    }
}
