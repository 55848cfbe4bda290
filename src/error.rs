use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::path::Path;

/// Where a diagnostic points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Path,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<Path>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One step of an include chain, printed after an unresolved include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub location: Location,
    pub name: String,
}

/// Fatal conditions; any of them aborts the whole run.
#[derive(Debug)]
pub enum DepError {
    /// A directive whose closing quote or bracket never appears.
    Malformed {
        location: Location,
        message: Cow<'static, str>,
    },
    /// A declared source that cannot be opened.
    MissingSource { name: String },
    /// A non-system include that no search location provides.
    MissingInclude {
        location: Location,
        name: String,
        notes: Vec<Note>,
    },
    /// A system header that is not available under the msvcrt runtime.
    IncompatibleHeader { location: Location, name: String },
    /// The configuration header is reachable but not included first.
    ConfigHeaderOrder { location: Location, name: String },
    /// More than one C runtime imported by the same unit.
    ConflictingRuntime { first: String, second: String },
    /// Bad variable reference in a build descriptor.
    Syntax {
        file: Option<Path>,
        message: Cow<'static, str>,
    },
    /// A source whose name has no extension.
    UnsupportedFile { name: String },
}

macro_rules! bail_malformed {
    ($location:expr, $msg:expr, $($arg:tt)*) => {
        return Err($crate::error::DepError::Malformed {
            location: $location,
            message: alloc::format!($msg, $($arg)*).into(),
        })
    };
    ($location:expr, $msg:expr) => {
        return Err($crate::error::DepError::Malformed {
            location: $location,
            message: alloc::borrow::Cow::Borrowed($msg),
        })
    };
}

macro_rules! bail_syntax {
    ($file:expr, $msg:expr, $($arg:tt)*) => {
        return Err($crate::error::DepError::Syntax {
            file: $file,
            message: alloc::format!($msg, $($arg)*).into(),
        })
    };
}

pub(crate) use {bail_malformed, bail_syntax};

impl fmt::Display for DepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DepError::Malformed { location, message } => {
                write!(f, "{location}: error: {message}")
            }
            DepError::MissingSource { name } => {
                write!(f, "open {name}: No such file or directory")
            }
            DepError::MissingInclude {
                location,
                name,
                notes,
            } => {
                write!(f, "{location}: error: {name}: No such file or directory")?;
                for note in notes {
                    write!(
                        f,
                        "\n{}: note: {} was first included here",
                        note.location, note.name
                    )?;
                }
                Ok(())
            }
            DepError::IncompatibleHeader { location, name } => write!(
                f,
                "{location}: error: system header {name} cannot be used with msvcrt"
            ),
            DepError::ConfigHeaderOrder { location, name } => write!(
                f,
                "{location}: error: {name} must be included before other headers"
            ),
            DepError::ConflictingRuntime { first, second } => write!(
                f,
                "More than one C runtime DLL imported: {first} and {second}"
            ),
            DepError::Syntax {
                file: Some(file),
                message,
            } => write!(f, "{file}: error: {message}"),
            DepError::Syntax { file: None, message } => write!(f, "error: {message}"),
            DepError::UnsupportedFile { name } => write!(f, "unsupported file type {name}"),
        }
    }
}

impl core::error::Error for DepError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    #[test]
    fn include_chain_is_rendered_after_the_error() {
        let err = DepError::MissingInclude {
            location: Location::new("dlls/foo/b.h", 3),
            name: "missing.h".into(),
            notes: vec![Note {
                location: Location::new("dlls/foo/a.c", 7),
                name: "b.h".into(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "dlls/foo/b.h:3: error: missing.h: No such file or directory\n\
             dlls/foo/a.c:7: note: b.h was first included here"
        );
    }
}
