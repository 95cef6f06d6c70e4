//! Pending stop relocations in the order they were made
use crate::model::EditEntry;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EditLogError {
    #[error("no updates to delete")]
    EmptyLog,

    #[error("row number {position} is out of range, the log has {len} rows")]
    IndexOutOfRange { position: usize, len: usize },
}

/// Row numbers are always `0..len`, deleting a row shifts the following rows down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditLog {
    entries: Vec<EditEntry>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: EditEntry) {
        self.entries.push(entry);
    }

    pub fn delete_last(&mut self) -> Result<EditEntry, EditLogError> {
        self.entries.pop().ok_or(EditLogError::EmptyLog)
    }

    pub fn delete_at(&mut self, position: usize) -> Result<EditEntry, EditLogError> {
        if position >= self.entries.len() {
            return Err(EditLogError::IndexOutOfRange {
                position,
                len: self.entries.len(),
            });
        }

        Ok(self.entries.remove(position))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[EditEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a EditLog {
    type Item = &'a EditEntry;
    type IntoIter = std::slice::Iter<'a, EditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<EditEntry> for EditLog {
    fn from_iter<T: IntoIterator<Item = EditEntry>>(iter: T) -> Self {
        EditLog {
            entries: iter.into_iter().collect(),
        }
    }
}
