//! Replace a subject heading or classification number with another one

use std::fmt;

use super::{dedupe, has_matching_field, RunContext};
use crate::marc::MarcRecord;
use crate::models::{make_component_query, make_query, Concept, Replacement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTask {
    pub source: Concept,
    pub target: Concept,
    /// Also rewrite fields carrying subfields the source does not mention
    pub ignore_extra_components: bool,
}

impl ReplaceTask {
    pub fn new(source: Concept, target: Concept, ignore_extra_components: bool) -> Self {
        Self {
            source,
            target,
            ignore_extra_components,
        }
    }

    pub fn matches(&self, record: &MarcRecord) -> bool {
        // The component query matches everything the exact one does
        let query = if self.ignore_extra_components {
            make_component_query(&self.source, None)
        } else {
            make_query(&self.source, None)
        };
        has_matching_field(record, self.source.tag, &query)
    }

    pub fn run(&self, record: &mut MarcRecord, ctx: &mut RunContext<'_>) -> usize {
        let mut queries = vec![make_query(&self.source, Some(&self.target))];
        if self.ignore_extra_components {
            queries.push(make_component_query(&self.source, Some(&self.target)));
        }

        let mut modified = 0;
        for query in &queries {
            let positions = record.field_positions(self.source.tag.as_str(), |f| query.matches(f));
            for idx in positions {
                if query.update(&mut record.data_fields[idx]) {
                    modified += 1;
                }
            }
        }

        dedupe(record, self.source.tag, self.source.vocabulary(), ctx);
        modified
    }
}

impl fmt::Display for ReplaceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = if self.ignore_extra_components {
            make_component_query(&self.source, Some(&self.target))
        } else {
            make_query(&self.source, Some(&self.target))
        };
        let mut from = Vec::new();
        let mut to = Vec::new();
        for (code, term) in &query.terms {
            if !code.is_ascii_alphabetic() {
                continue;
            }
            if let Some(value) = self.source.get(*code) {
                from.push(format!("${} {}", code, value));
            }
            if let Some(Replacement::Value(value)) = &term.replace {
                to.push(format!("${} {}", code, value));
            }
        }
        write!(
            f,
            "Replace {} with {} in {} $2 {}",
            from.join(" "),
            to.join(" "),
            self.source.tag,
            self.source.vocabulary().unwrap_or("-")
        )?;
        if self.ignore_extra_components {
            write!(f, " (ignoring extra subfields)")?;
        }
        Ok(())
    }
}
