//! Ordered record ids the operator steps through

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    ids: Vec<String>,
    cursor: usize,
}

impl WorkingSet {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn current(&self) -> Option<&str> {
        self.ids.get(self.cursor).map(String::as_str)
    }

    /// 0-based position of the current record
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Advance; past the last record the cursor stays put
    pub fn next(&mut self) -> EngineResult<&str> {
        if self.cursor + 1 >= self.ids.len() {
            return Err(EngineError::WorkingSetExhausted);
        }
        self.cursor += 1;
        Ok(&self.ids[self.cursor])
    }

    /// Step back; `None` at the first record
    pub fn previous(&mut self) -> Option<&str> {
        if self.cursor == 0 || self.ids.is_empty() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.ids[self.cursor])
    }

    /// Jump to a record; `false` if it is not in the set
    pub fn seek(&mut self, record_id: &str) -> bool {
        match self.ids.iter().position(|id| id == record_id) {
            Some(idx) => {
                self.cursor = idx;
                true
            }
            None => false,
        }
    }
}
