//! Add a heading to a record

use std::fmt;

use super::dedup::canonical_key;
use super::{dedupe, RunContext};
use crate::marc::{DataField, MarcRecord, Subfield};
use crate::models::concept::{AUTHORITY_CODE, HEADING_CODES, VOCABULARY_CODE};
use crate::models::{Concept, Query};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTask {
    pub concept: Concept,
}

impl AddTask {
    pub fn new(concept: Concept) -> Self {
        Self { concept }
    }

    /// Adding never selects records on its own
    pub fn matches(&self, _record: &MarcRecord) -> bool {
        false
    }

    /// The field this task writes
    pub fn field(&self) -> DataField {
        let tag = self.concept.tag;
        let mut subfields: Vec<Subfield> = HEADING_CODES
            .iter()
            .filter_map(|code| self.concept.get(*code).map(|v| Subfield::new(*code, v)))
            .collect();
        for code in [VOCABULARY_CODE, AUTHORITY_CODE] {
            if let Some(value) = self.concept.get(code) {
                subfields.push(Subfield::new(code, value));
            }
        }
        DataField::new(tag.as_str(), ' ', tag.default_ind2(), subfields)
    }

    pub fn run(&self, record: &mut MarcRecord, ctx: &mut RunContext<'_>) -> usize {
        let tag = self.concept.tag;
        let field = self.field();
        let key = canonical_key(&field);
        let same_vocabulary = Query::vocabulary(self.concept.vocabulary());
        let existing = record.field_positions(tag.as_str(), |f| same_vocabulary.matches(f));

        if existing
            .iter()
            .any(|idx| canonical_key(&record.data_fields[*idx]) == key)
        {
            ctx.report
                .info(format!("Term was already present on the record: {}", key));
            return 0;
        }

        match existing.last() {
            Some(idx) => record.data_fields.insert(idx + 1, field),
            None => record.data_fields.push(field),
        }
        dedupe(record, tag, self.concept.vocabulary(), ctx);
        1
    }
}

impl fmt::Display for AddTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Add {}", self.field())
    }
}
