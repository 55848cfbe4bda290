use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use makedep::descriptor::DEPENDENCY_SEPARATOR;
use tempfile::{Builder, NamedTempFile};

/// A temporary output file that must not outlive an interrupted run.
pub struct PendingFile(Mutex<Option<PathBuf>>);

impl PendingFile {
    pub const fn new() -> Self {
        Self(Mutex::new(None))
    }

    /// Creates a temporary file in `dir` and records it.
    ///
    /// The lock is held until the path is recorded, so [`PendingFile::remove`]
    /// never runs between the two.
    pub fn create_in(&self, dir: &Path) -> anyhow::Result<NamedTempFile> {
        let mut pending = self.0.lock().map_err(|_| anyhow!("temporary file lock poisoned"))?;
        let file = Builder::new()
            .prefix(".makedep")
            .tempfile_in(dir)
            .with_context(|| format!("cannot create temporary file in {}", dir.display()))?;
        *pending = Some(file.path().to_path_buf());
        Ok(file)
    }

    /// Forgets the recorded file once it has been renamed into place.
    pub fn clear(&self) {
        if let Ok(mut pending) = self.0.lock() {
            *pending = None;
        }
    }

    /// Deletes the recorded file, if any.
    pub fn remove(&self) {
        let path = match self.0.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(path) = path {
            let _ = fs::remove_file(path);
        }
    }
}

/// Temporary output file, removed by the signal handler.
static TEMP_FILE: PendingFile = PendingFile::new();

/// Removes a pending temporary file and exits, from the signal handler.
pub fn install_signal_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        TEMP_FILE.remove();
        std::process::exit(1);
    })
    .context("cannot install signal handler")
}

/// Replaces everything after the dependency separator of `content` by `rules`.
pub fn replace_dependencies(content: &str, rules: &str) -> String {
    let mut output = String::new();
    let mut found = false;
    for line in content.split_inclusive('\n') {
        output.push_str(line);
        if line.starts_with(DEPENDENCY_SEPARATOR) {
            found = true;
            break;
        }
    }
    if !found {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push('\n');
        output.push_str(DEPENDENCY_SEPARATOR);
        output.push_str(" (everything below this line is auto-generated; DO NOT EDIT!!)\n");
    } else if !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(rules);
    output
}

/// Rewrites the dependency section of `path`; returns whether it changed.
pub fn update(path: &Path, rules: &str) -> anyhow::Result<bool> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot open {}", path.display()))?;
    let output = replace_dependencies(&content, rules);
    if output == content {
        tracing::debug!("{} is up to date", path.display());
        return Ok(false);
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = TEMP_FILE.create_in(dir)?;

    file.write_all(output.as_bytes())
        .with_context(|| format!("cannot write {}", file.path().display()))?;
    file.persist(path)
        .with_context(|| format!("cannot rename to {}", path.display()))?;

    TEMP_FILE.clear();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn appends_separator_when_missing() {
        let output = replace_dependencies("all:\n\tmake", "a.o: a.c\n");
        assert_eq!(
            output,
            "all:\n\tmake\n\n### Dependencies (everything below this line is auto-generated; DO NOT EDIT!!)\na.o: a.c\n"
        );
    }

    #[test]
    fn rewrites_only_on_change() {
        let dir = tempdir().unwrap();
        let makefile = dir.path().join("Makefile");
        fs::write(&makefile, "SUBDIRS = a\n### Dependencies\nold.o: old.c\n").unwrap();

        assert!(update(&makefile, "a/b.o: a/b.c\n").unwrap());
        assert_eq!(
            fs::read_to_string(&makefile).unwrap(),
            "SUBDIRS = a\n### Dependencies\na/b.o: a/b.c\n"
        );
        assert!(!update(&makefile, "a/b.o: a/b.c\n").unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn interrupted_runs_leave_no_temporary_file() {
        let dir = tempdir().unwrap();
        let pending = PendingFile::new();
        let file = pending.create_in(dir.path()).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(".makedep"));
        let (_, kept) = file.keep().unwrap();

        pending.remove();
        assert!(!kept.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        pending.remove();
    }

    #[test]
    fn missing_descriptor_is_an_error() {
        let dir = tempdir().unwrap();
        let err = update(&dir.path().join("Makefile"), "").unwrap_err();
        assert!(err.to_string().starts_with("cannot open"));
    }
}
