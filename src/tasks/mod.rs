//! Field tasks
//!
//! A task is one edit rule applied to a record: it can tell whether a
//! record is relevant to it (`matches`) and apply itself (`run`), returning
//! the number of fields it changed.

pub mod add;
pub mod dedup;
pub mod delete;
pub mod interactive;
pub mod list;
pub mod move_field;
pub mod replace;

use std::fmt;

use crate::error::AppResult;
use crate::marc::MarcRecord;
use crate::models::{Concept, JobReport, Query, Tag};
use crate::services::prompt::Prompter;

pub use add::AddTask;
pub use delete::DeleteTask;
pub use interactive::InteractiveReplaceTask;
pub use list::ListTask;
pub use move_field::MoveTask;
pub use replace::ReplaceTask;

/// What a task may use while running on a record
pub struct RunContext<'a> {
    pub prompter: &'a dyn Prompter,
    pub report: &'a mut JobReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Replace(ReplaceTask),
    Add(AddTask),
    Delete(DeleteTask),
    Move(MoveTask),
    InteractiveReplace(InteractiveReplaceTask),
    List(ListTask),
}

impl Task {
    /// Whether the record carries a field this task acts on
    pub fn matches(&self, record: &MarcRecord) -> bool {
        match self {
            Task::Replace(t) => t.matches(record),
            Task::Add(t) => t.matches(record),
            Task::Delete(t) => t.matches(record),
            Task::Move(t) => t.matches(record),
            Task::InteractiveReplace(t) => t.matches(record),
            Task::List(t) => t.matches(record),
        }
    }

    /// Apply the task, returning the number of fields changed
    pub fn run(&self, record: &mut MarcRecord, ctx: &mut RunContext<'_>) -> AppResult<usize> {
        match self {
            Task::Replace(t) => Ok(t.run(record, ctx)),
            Task::Add(t) => Ok(t.run(record, ctx)),
            Task::Delete(t) => Ok(t.run(record)),
            Task::Move(t) => Ok(t.run(record, ctx)),
            Task::InteractiveReplace(t) => t.run(record, ctx),
            Task::List(t) => Ok(t.run(record)),
        }
    }

    pub fn source(&self) -> &Concept {
        match self {
            Task::Replace(t) => &t.source,
            Task::Add(t) => &t.concept,
            Task::Delete(t) => &t.source,
            Task::Move(t) => &t.source,
            Task::InteractiveReplace(t) => &t.source,
            Task::List(t) => &t.source,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Replace(t) => t.fmt(f),
            Task::Add(t) => t.fmt(f),
            Task::Delete(t) => t.fmt(f),
            Task::Move(t) => t.fmt(f),
            Task::InteractiveReplace(t) => t.fmt(f),
            Task::List(t) => t.fmt(f),
        }
    }
}

/// Whether any `tag` field of the record satisfies `query`
pub(crate) fn has_matching_field(record: &MarcRecord, tag: Tag, query: &Query) -> bool {
    record
        .data_fields
        .iter()
        .any(|f| f.tag == tag.as_str() && query.matches(f))
}

/// Remove duplicate headings after an edit, recording what was dropped
pub(crate) fn dedupe(
    record: &mut MarcRecord,
    tag: Tag,
    vocabulary: Option<&str>,
    ctx: &mut RunContext<'_>,
) -> usize {
    let removed = dedup::remove_duplicates(record, tag, vocabulary);
    for key in &removed {
        ctx.report
            .info(format!("Term was already present on the record: {}", key));
    }
    ctx.report.duplicates_removed += removed.len();
    removed.len()
}
