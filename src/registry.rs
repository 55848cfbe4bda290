use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::error::DepError;
use crate::os::Os;
use crate::path::Path;
use crate::scan;
use crate::source::{Flags, SourceId, SourceRecord};

/// Process-wide cache of scanned files.
///
/// Every path is read and scanned at most once; failed opens are remembered
/// too, since nothing appears on disk while the dependency model is built.
pub struct SourceRegistry {
    os: Rc<dyn Os>,
    index: HashMap<Path, Option<SourceId>>,
    records: Vec<SourceRecord>,
}

impl SourceRegistry {
    pub fn new(os: Rc<dyn Os>) -> Self {
        Self {
            os,
            index: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Returns the record for `path`, scanning the file on first use.
    ///
    /// `Ok(None)` means the file could not be opened; the caller decides
    /// whether that is an error.
    pub fn load(&mut self, path: &Path) -> Result<Option<SourceId>, DepError> {
        if let Some(&id) = self.index.get(path) {
            return Ok(id);
        }

        let Ok(data) = self.os.read_file(path) else {
            tracing::trace!("{path}: not found");
            self.index.insert(path.clone(), None);
            return Ok(None);
        };

        let text = String::from_utf8_lossy(&data);
        let mut record = SourceRecord::new(path.clone());
        scan::scan(&mut record, &text)?;
        tracing::trace!(
            "{path}: {} directives, flags {:?}",
            record.directives.len(),
            record.flags
        );

        let id = self.push(record);
        self.index.insert(path.clone(), Some(id));
        Ok(Some(id))
    }

    /// Creates a record for a file another rule will produce.
    ///
    /// Synthesized records are not indexed: their names are relative to the
    /// unit that generates them.
    pub fn synthesize(&mut self, name: &Path, flags: Flags) -> SourceId {
        let mut record = SourceRecord::new(name.clone());
        record.flags = flags | Flags::GENERATED;
        self.push(record)
    }

    fn push(&mut self, record: SourceRecord) -> SourceId {
        let id = SourceId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    pub fn get(&self, id: SourceId) -> &SourceRecord {
        &self.records[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SourceId) -> &mut SourceRecord {
        &mut self.records[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
