use alloc::string::String;
use core::fmt;

/// A `/`-separated path as it appears in build descriptors and directives.
///
/// Paths are kept as plain strings: the registry keys on them verbatim, so
/// two spellings of the same physical file are two different records.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Path(String);

const SEP: char = '/';

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.0)
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path::from(path)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Path::from(path)
    }
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    /// Joins `path` onto `self`, folding leading `..` components into the base.
    ///
    /// An empty base yields `path` (or `.`), an absolute `path` replaces the
    /// base, and a base that already ends in `..` is never folded further.
    pub fn join(&self, path: impl AsRef<str>) -> Self {
        let base = self.0.as_str();
        let mut path = path.as_ref();

        if base.is_empty() {
            return Self::from(if path.is_empty() { "." } else { path });
        }
        if path.is_empty() {
            return self.clone();
        }
        if path.starts_with(SEP) {
            return Self::from(path);
        }

        let bytes = base.as_bytes();
        let mut len = base.trim_end_matches(SEP).len();
        while len > 0 && is_dotdot_prefix(path) {
            let mut i = base[..len].rfind(SEP).map(|i| i + 1).unwrap_or(0);
            if i + 2 == len && &base[i..len] == ".." {
                break;
            }
            if !(i + 1 == len && bytes[i] == b'.') {
                path = path[2..].trim_start_matches(SEP);
            }
            while i > 0 && bytes[i - 1] == b'/' {
                i -= 1;
            }
            len = i;
        }

        if len == 0 && !base.starts_with(SEP) {
            return Self::from(if path.is_empty() { "." } else { path });
        }

        let mut joined = String::from(&base[..len]);
        joined.push(SEP);
        joined.push_str(path);
        Self(joined)
    }

    /// Extension including the dot, ignoring dots that belong to directories.
    pub fn extension(&self) -> Option<&str> {
        let dot = self.0.rfind('.')?;
        if self.0[dot..].contains(SEP) {
            return None;
        }
        Some(&self.0[dot..])
    }

    /// Replaces the `old` suffix by `new`, or appends `new` when `old` is absent.
    pub fn replace_extension(&self, old: &str, new: &str) -> Self {
        let stem = self.0.strip_suffix(old).unwrap_or(&self.0);
        let mut path = String::from(stem);
        path.push_str(new);
        Self(path)
    }

    /// Name without its last extension.
    pub fn base_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(dot) => &self.0[..dot],
            None => &self.0,
        }
    }

    pub fn file_name(&self) -> &str {
        match self.0.rfind(SEP) {
            Some(sep) => &self.0[sep + 1..],
            None => &self.0,
        }
    }

    /// Replaces the last component, keeping the directory part.
    pub fn with_file_name(&self, name: &str) -> Self {
        match self.0.rfind(SEP) {
            Some(sep) => {
                let mut path = String::from(&self.0[..=sep]);
                path.push_str(name);
                Self(path)
            }
            None => Self::from(name),
        }
    }

    /// Returns the remainder of `self` if it lies inside `dir`.
    pub fn strip_dir(&self, dir: &str) -> Option<&str> {
        let dir = dir.trim_end_matches(SEP);
        let rest = self.0.strip_prefix(dir)?;
        if !rest.is_empty() && !rest.starts_with(SEP) {
            return None;
        }
        Some(rest.trim_start_matches(SEP))
    }

    /// Path of `dest` as seen from the directory `self`, `None` when they are the same.
    pub fn relative_to_dir(&self, dest: &str) -> Option<String> {
        let mut from = self.0.as_str();
        if from == "." {
            from = "";
        }
        let mut dest = dest;
        let mut dotdots = 0;

        loop {
            from = from.trim_start_matches(SEP);
            dest = dest.trim_start_matches(SEP);
            if from.is_empty() {
                break;
            }
            let from_elem = from.split(SEP).next().unwrap_or_default();
            let dest_elem = dest.split(SEP).next().unwrap_or_default();
            if from_elem == dest_elem {
                from = &from[from_elem.len()..];
                dest = &dest[dest_elem.len()..];
                continue;
            }
            dotdots = from.split(SEP).filter(|elem| !elem.is_empty()).count();
            break;
        }

        if dest.is_empty() && dotdots == 0 {
            return None;
        }

        let mut ret = String::new();
        for _ in 0..dotdots {
            ret.push_str("../");
        }
        if dest.is_empty() {
            ret.pop();
        } else {
            ret.push_str(dest);
        }
        Some(ret)
    }
}

fn is_dotdot_prefix(path: &str) -> bool {
    path.starts_with("..") && (path.len() == 2 || path.as_bytes()[2] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_folds_parent_components() {
        assert_eq!(Path::from("dlls/foo").join("../bar/x.h"), Path::from("dlls/bar/x.h"));
        assert_eq!(Path::from("dlls/foo").join("../../include/x.h"), Path::from("include/x.h"));
        assert_eq!(Path::from("foo").join(".."), Path::from("."));
        assert_eq!(Path::from("../src").join("../x.c"), Path::from("../x.c"));
        assert_eq!(Path::from("..").join("../x.c"), Path::from("../../x.c"));
        assert_eq!(Path::from("/abs/dir/").join("x.c"), Path::from("/abs/dir/x.c"));
    }

    #[test]
    fn join_handles_empty_and_absolute() {
        assert_eq!(Path::new().join("x.c"), Path::from("x.c"));
        assert_eq!(Path::new().join(""), Path::from("."));
        assert_eq!(Path::from("dir").join(""), Path::from("dir"));
        assert_eq!(Path::from("dir").join("/usr/include"), Path::from("/usr/include"));
    }

    #[test]
    fn extension_ignores_directory_dots() {
        assert_eq!(Path::from("dir.d/file").extension(), None);
        assert_eq!(Path::from("dir.d/file.tab.h").extension(), Some(".h"));
        assert_eq!(Path::from("iface.idl").replace_extension(".idl", "_p.c"), Path::from("iface_p.c"));
        assert_eq!(Path::from("objs").replace_extension(".o", ".c"), Path::from("objs.c"));
    }

    #[test]
    fn file_name_replacement() {
        assert_eq!(Path::from("a/b/c.h").with_file_name("d.h"), Path::from("a/b/d.h"));
        assert_eq!(Path::from("c.h").with_file_name("d.h"), Path::from("d.h"));
        assert_eq!(Path::from("/src/include/x.h").strip_dir("/src"), Some("include/x.h"));
        assert_eq!(Path::from("/srcdir/x.h").strip_dir("/src"), None);
    }

    #[test]
    fn relative_paths() {
        assert_eq!(Path::from("dlls/foo").relative_to_dir("dlls/bar"), Some("../bar".into()));
        assert_eq!(Path::from(".").relative_to_dir("include"), Some("include".into()));
        assert_eq!(Path::from("a/b").relative_to_dir("a/b"), None);
        assert_eq!(Path::from("a/b").relative_to_dir("a"), Some("..".into()));
    }
}
