//! Replace a heading with a target picked by the operator for each record

use std::fmt;

use super::{has_matching_field, ReplaceTask, RunContext};
use crate::error::AppResult;
use crate::marc::MarcRecord;
use crate::models::{make_component_query, Concept};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveReplaceTask {
    pub source: Concept,
    pub targets: Vec<Concept>,
}

impl InteractiveReplaceTask {
    pub fn new(source: Concept, targets: Vec<Concept>) -> Self {
        Self { source, targets }
    }

    pub fn matches(&self, record: &MarcRecord) -> bool {
        has_matching_field(
            record,
            self.source.tag,
            &make_component_query(&self.source, None),
        )
    }

    pub fn run(&self, record: &mut MarcRecord, ctx: &mut RunContext<'_>) -> AppResult<usize> {
        let question = format!(
            "{}: {}\nReplace \"{}\" with:",
            record.id().unwrap_or("(no id)"),
            record.title().unwrap_or_default(),
            self.source.term
        );
        let options: Vec<String> = self.targets.iter().map(|t| t.term.clone()).collect();

        match ctx.prompter.choose(&question, &options)? {
            Some(idx) if idx < self.targets.len() => {
                let task = ReplaceTask::new(self.source.clone(), self.targets[idx].clone(), true);
                Ok(task.run(record, ctx))
            }
            _ => {
                tracing::info!("Skipped {}", record.id().unwrap_or("(no id)"));
                Ok(0)
            }
        }
    }
}

impl fmt::Display for InteractiveReplaceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<&str> = self.targets.iter().map(|t| t.term.as_str()).collect();
        write!(
            f,
            "Replace {} with one of: {}",
            self.source,
            targets.join(", ")
        )
    }
}
