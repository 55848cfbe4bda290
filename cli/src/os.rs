use std::fs;

use makedep::os;

/// Reads files relative to the current directory.
pub struct Os;

impl os::Os for Os {
    fn read_file(&self, path: &os::Path) -> os::Result<Vec<u8>> {
        Ok(fs::read(path.as_str())?)
    }
}
