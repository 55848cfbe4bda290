use alloc::vec::Vec;

pub use crate::path::Path;

pub type Result<T> = anyhow::Result<T>;

/// Host services needed by the dependency scanner.
///
/// The library never touches the filesystem directly, so the same code runs
/// from the command-line tool, from a build script, or against an in-memory
/// tree in tests.
pub trait Os: 'static {
    /// Reads a whole file. Any error is treated as "file does not exist".
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::*;

    /// In-memory filesystem that also counts reads per path.
    #[derive(Clone, Default)]
    pub struct MemOs {
        files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
        reads: Rc<RefCell<HashMap<String, usize>>>,
    }

    impl MemOs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, path: &str, content: &str) -> Self {
            self.add(path, content);
            self
        }

        pub fn add(&self, path: &str, content: &str) {
            self.files
                .borrow_mut()
                .insert(path.into(), content.as_bytes().to_vec());
        }

        pub fn reads(&self, path: &str) -> usize {
            self.reads.borrow().get(path).copied().unwrap_or(0)
        }
    }

    impl Os for MemOs {
        fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            *self
                .reads
                .borrow_mut()
                .entry(path.as_str().into())
                .or_default() += 1;
            self.files
                .borrow()
                .get(path.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("{path}: No such file or directory"))
        }
    }
}
