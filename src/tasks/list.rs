//! Select records without changing them

use std::fmt;

use super::has_matching_field;
use crate::marc::MarcRecord;
use crate::models::{make_query, Concept};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTask {
    pub source: Concept,
}

impl ListTask {
    pub fn new(source: Concept) -> Self {
        Self { source }
    }

    pub fn matches(&self, record: &MarcRecord) -> bool {
        has_matching_field(record, self.source.tag, &make_query(&self.source, None))
    }

    pub fn run(&self, _record: &mut MarcRecord) -> usize {
        0
    }
}

impl fmt::Display for ListTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List records having {}", self.source)
    }
}
