//! Move a heading to another field tag

use std::fmt;

use super::{dedupe, has_matching_field, RunContext};
use crate::marc::MarcRecord;
use crate::models::{make_query, Concept, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTask {
    pub source: Concept,
    pub dest: Tag,
}

impl MoveTask {
    pub fn new(source: Concept, dest: Tag) -> Self {
        Self { source, dest }
    }

    pub fn matches(&self, record: &MarcRecord) -> bool {
        has_matching_field(record, self.source.tag, &make_query(&self.source, None))
    }

    pub fn run(&self, record: &mut MarcRecord, ctx: &mut RunContext<'_>) -> usize {
        let query = make_query(&self.source, None);
        let positions = record.field_positions(self.source.tag.as_str(), |f| query.matches(f));
        for idx in &positions {
            record.data_fields[*idx].tag = self.dest.as_str().to_string();
        }
        dedupe(record, self.dest, self.source.vocabulary(), ctx);
        positions.len()
    }
}

impl fmt::Display for MoveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move {} to {}", self.source, self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::{DataField, Subfield};
    use crate::models::JobReport;
    use crate::services::prompt::DefaultsPrompter;
    use crate::tasks::test_support::{concept, record, subject};

    #[test]
    fn test_move_to_genre() {
        let task = MoveTask::new(concept("Romaner"), Tag::GenreForm);
        let mut rec = record(vec![
            subject(&[('a', "Romaner"), ('2', "noubomn")]),
            DataField::new(
                "655",
                ' ',
                '7',
                vec![Subfield::new('a', "Romaner"), Subfield::new('2', "noubomn")],
            ),
        ]);
        assert!(task.matches(&rec));

        let mut report = JobReport::new();
        let mut ctx = RunContext {
            prompter: &DefaultsPrompter,
            report: &mut report,
        };
        assert_eq!(task.run(&mut rec, &mut ctx), 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(rec.data_fields.len(), 1);
        assert_eq!(rec.data_fields[0].tag, "655");
        assert!(!task.matches(&rec));
    }
}
