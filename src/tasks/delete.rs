//! Remove a heading from a record

use std::fmt;

use super::has_matching_field;
use crate::marc::MarcRecord;
use crate::models::{make_query, Concept};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    pub source: Concept,
}

impl DeleteTask {
    pub fn new(source: Concept) -> Self {
        Self { source }
    }

    pub fn matches(&self, record: &MarcRecord) -> bool {
        has_matching_field(record, self.source.tag, &make_query(&self.source, None))
    }

    pub fn run(&self, record: &mut MarcRecord) -> usize {
        let query = make_query(&self.source, None);
        let before = record.data_fields.len();
        let tag = self.source.tag.as_str();
        record
            .data_fields
            .retain(|f| !(f.tag == tag && query.matches(f)));
        before - record.data_fields.len()
    }
}

impl fmt::Display for DeleteTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delete {}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{concept, record, subject};

    #[test]
    fn test_delete_exact_matches() {
        let task = DeleteTask::new(concept("Monstre"));
        let mut rec = record(vec![
            subject(&[('a', "Monstre"), ('2', "noubomn")]),
            subject(&[('a', "Monstre"), ('x', "Historie"), ('2', "noubomn")]),
            subject(&[('a', "Monstre"), ('2', "humord")]),
        ]);
        assert!(task.matches(&rec));
        assert_eq!(task.run(&mut rec), 1);
        assert_eq!(rec.data_fields.len(), 2);
        assert!(!task.matches(&rec));
        assert_eq!(task.run(&mut rec), 0);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            DeleteTask::new(concept("Monstre")).to_string(),
            "Delete 650 $a Monstre $2 noubomn"
        );
    }
}
