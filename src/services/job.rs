//! Job orchestration
//!
//! A job turns the operator's request into field tasks, finds candidate
//! records over SRU, keeps those a task applies to, and then fetches,
//! edits and saves them one at a time through the catalog API.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use colored::Colorize;
use indexmap::IndexSet;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::alma::Bib;
use super::snapshots::SnapshotStore;
use super::sru::{SearchResults, MAX_RECORDS, PAGE_SIZE};
use super::Services;
use crate::error::{AppError, AppResult};
use crate::marc::{DataField, MarcRecord};
use crate::models::{Action, Concept, Interactivity, JobReport};
use crate::tasks::{
    AddTask, DeleteTask, InteractiveReplaceTask, ListTask, MoveTask, ReplaceTask, RunContext, Task,
};

static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new("[-–]").expect("valid dash pattern"));

/// Extra output for the `list` action
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub show_titles: bool,
    pub show_subjects: bool,
}

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub action: Action,
    pub sources: Vec<Concept>,
    pub targets: Vec<Concept>,
    /// Search expression overriding the one derived from the sources
    pub cql: Option<String>,
    /// Only keep records with a field containing this text
    pub grep: Option<String>,
    pub dry_run: bool,
    pub interactivity: Interactivity,
    pub show_diffs: bool,
    pub list: ListOptions,
}

impl JobOptions {
    pub fn new(action: Action, sources: Vec<Concept>, targets: Vec<Concept>) -> Self {
        Self {
            action,
            sources,
            targets,
            cql: None,
            grep: None,
            dry_run: false,
            interactivity: Interactivity::default(),
            show_diffs: false,
            list: ListOptions::default(),
        }
    }
}

pub struct Job {
    services: Services,
    options: JobOptions,
    steps: Vec<Task>,
    cql_query: String,
    grep: Option<String>,
    snapshots: Option<SnapshotStore>,
    pub started: DateTime<Local>,
    pub report: JobReport,
}

impl Job {
    /// Validate the request, authorize the targets and plan the steps
    pub async fn new(services: Services, mut options: JobOptions) -> AppResult<Self> {
        validate(&options)?;

        let mut report = JobReport::new();
        authorize(&services, &options.action, &mut options.targets, &mut report).await;
        for concept in &options.sources {
            tracing::debug!("Source concept: {}", concept);
        }
        for concept in &options.targets {
            tracing::debug!("Target concept: {}", concept);
        }

        let cql_query = match options.cql.as_deref().map(str::trim) {
            Some(cql) if !cql.is_empty() => cql.to_string(),
            _ => prepare_cql_query(&options.sources),
        };
        if cql_query.is_empty() {
            return Err(AppError::Usage("No query given.".to_string()));
        }

        let steps = generate_steps(&options);
        let grep = options.grep.as_deref().map(str::to_lowercase);

        Ok(Self {
            services,
            steps,
            cql_query,
            grep,
            snapshots: None,
            started: Local::now(),
            report,
            options,
        })
    }

    /// Keep before/after copies of every saved record
    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn steps(&self) -> &[Task] {
        &self.steps
    }

    pub fn cql_query(&self) -> &str {
        &self.cql_query
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Run the job, returning the identifiers of the records it selected
    pub async fn start(&mut self) -> AppResult<Vec<String>> {
        tracing::debug!("Planned steps:");
        for (i, step) in self.steps.iter().enumerate() {
            tracing::debug!(" {}. {}", i + 1, step);
        }

        let valid_records = match self.search().await {
            Ok(ids) => ids,
            Err(AppError::TooManyResults(n)) => {
                self.report.error(format!(
                    "More than {} results would have to be checked ({} found), but the Alma SRU \
                     service does not allow retrieving more than {} results.",
                    MAX_RECORDS, n, MAX_RECORDS
                ));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        if valid_records.is_empty() {
            self.report.info("No matching catalog records found");
            return Ok(Vec::new());
        }

        if !self.options.action.is_batch_edit() {
            self.report
                .info(format!("{} catalog records found", valid_records.len()));
        } else {
            self.report.info(format!(
                "{} catalog records to be changed",
                valid_records.len()
            ));
            if self.options.dry_run {
                self.report
                    .warn("DRY RUN: No catalog records will actually be changed!");
            } else if self.options.interactivity == Interactivity::Standard
                && !self.services.prompter.confirm("Continue?", true)?
            {
                self.report.info("Job aborted");
                return Ok(Vec::new());
            }
        }

        self.apply(&valid_records).await?;
        self.report.info(format!(
            "{} record(s) changed, {} change(s) made",
            self.report.records_changed, self.report.changes_made
        ));
        Ok(valid_records.into_iter().collect())
    }

    /// Identifiers of the search results at least one step applies to
    async fn search(&self) -> AppResult<IndexSet<String>> {
        let mut results = SearchResults::new(self.services.search.as_ref(), self.cql_query.as_str());
        let mut valid = IndexSet::new();
        let mut progress: Option<ProgressBar> = None;

        while let Some(record) = results.next().await? {
            let pb = progress.get_or_insert_with(|| {
                filter_progress_bar(results.num_records().unwrap_or(0), self.options.interactivity)
            });
            pb.inc(1);
            let Some(id) = record.id() else {
                tracing::warn!("Skipping search result without 001");
                continue;
            };
            tracing::debug!("Checking record {}", id);

            let grep_matching = self.grep_matches(&record);
            let mut record_matching = false;
            for (n, step) in self.steps.iter().enumerate() {
                if step.matches(&record) {
                    tracing::debug!("Step {} did match", n + 1);
                    record_matching = true;
                } else {
                    tracing::debug!("Step {} did not match", n + 1);
                }
            }
            if record_matching && grep_matching {
                valid.insert(id.to_string());
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        if let Some(total) = results.num_records() {
            tracing::debug!("{} of {} search results kept", valid.len(), total);
        }
        Ok(valid)
    }

    fn grep_matches(&self, record: &MarcRecord) -> bool {
        match &self.grep {
            None => true,
            Some(needle) => record
                .data_fields
                .iter()
                .any(|f| f.to_string().to_lowercase().contains(needle.as_str())),
        }
    }

    async fn apply(&mut self, valid_records: &IndexSet<String>) -> AppResult<()> {
        let total = valid_records.len();
        let mut saved = 0;

        for (idx, mms_id) in valid_records.iter().enumerate() {
            if self.options.action.is_batch_edit() {
                self.report
                    .info(format!("Record {}/{}: {}", idx + 1, total, mms_id));
            }

            let mut bib = self.services.catalog.get_record(mms_id).await?;
            self.print_listing(&bib);

            match self.update_record(&mut bib).await {
                Ok(0) => {}
                Ok(changes) => {
                    saved += 1;
                    self.report.records_changed += 1;
                    self.report.changes_made += changes;
                }
                Err(e) => {
                    self.report.error(format!(
                        "Failed to save record {}: {}. {} record(s) were saved before the failure, \
                         the remaining {} were not processed.",
                        mms_id,
                        e,
                        saved,
                        total - idx - 1
                    ));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run every step on the record and save it if anything changed.
    /// Returns the number of changes made.
    async fn update_record(&mut self, bib: &mut Bib) -> AppResult<usize> {
        let before = bib.clone();
        let mut changes = 0;
        {
            let mut ctx = RunContext {
                prompter: self.services.prompter.as_ref(),
                report: &mut self.report,
            };
            for step in &self.steps {
                changes += step.run(&mut bib.record, &mut ctx)?;
            }
        }
        if changes == 0 {
            return Ok(0);
        }

        let prompter = self.services.prompter.as_ref();
        if self.options.show_diffs {
            for line in field_diff(&before.record, &bib.record) {
                println!("{}", line);
            }
        }
        if self.options.interactivity == Interactivity::Increased
            && !prompter.confirm("Update this record?", true)?
        {
            return Ok(0);
        }
        if bib.linked_to_cz
            && !prompter.confirm(
                &format!(
                    "Record {} is linked to the Community Zone. Update it anyway?",
                    bib.mms_id
                ),
                false,
            )?
        {
            self.report
                .warn(format!("Skipped record {} linked to the Community Zone", bib.mms_id));
            return Ok(0);
        }

        if self.options.dry_run {
            tracing::info!("DRY RUN: not saving {}", bib.mms_id);
            return Ok(changes);
        }

        if let Some(store) = &self.snapshots {
            if let Err(e) = store.save_before(&before) {
                tracing::warn!("Could not write snapshot for {}: {}", bib.mms_id, e);
            }
        }
        let stored = self.services.catalog.put_record(bib).await?;
        if let Some(store) = &self.snapshots {
            if let Err(e) = store.save_after(&stored) {
                tracing::warn!("Could not write snapshot for {}: {}", bib.mms_id, e);
            }
        }
        Ok(changes)
    }

    fn print_listing(&self, bib: &Bib) {
        if self.options.action != Action::List {
            return;
        }
        if self.options.list.show_titles {
            println!(
                "{}\t{}",
                bib.mms_id,
                bib.record.title().unwrap_or_default()
            );
        }
        if self.options.list.show_subjects {
            let vocabulary = self.options.sources.first().and_then(Concept::vocabulary);
            for field in bib.record.data_fields.iter().filter(|f| f.tag.starts_with('6')) {
                println!("{}", subject_line(field, vocabulary));
            }
        }
    }
}

/// Listing line for a subject field, highlighting the job's vocabulary
fn subject_line(field: &DataField, vocabulary: Option<&str>) -> String {
    let line = field.to_string();
    match (vocabulary, field.get_subfield('2')) {
        (Some(v), Some(code)) if v == code => format!(" * {}", line.yellow()),
        _ => format!("   {}", line.cyan()),
    }
}

/// Progress over the search results, shown only when there is more than one
/// page to check and someone is watching
fn filter_progress_bar(total: usize, interactivity: Interactivity) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if interactivity == Interactivity::None || total <= PAGE_SIZE {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message("Filtering SRU results");
    pb
}

fn validate(options: &JobOptions) -> AppResult<()> {
    let needs_targets = matches!(
        options.action,
        Action::Replace | Action::Add | Action::Interactive
    );
    if needs_targets && options.targets.is_empty() {
        return Err(AppError::Usage(format!(
            "The {} action needs at least one target term",
            options.action
        )));
    }
    if options.sources.is_empty() && options.action != Action::Custom {
        return Err(AppError::Usage(format!(
            "The {} action needs a source term",
            options.action
        )));
    }
    if options.action == Action::Custom && options.sources.is_empty() && options.targets.is_empty() {
        return Err(AppError::Usage("Nothing to do".to_string()));
    }
    // without $2 the search would reach headings outside any vocabulary
    if let Some(source) = options.sources.iter().find(|c| c.vocabulary().is_none()) {
        return Err(AppError::Usage(format!(
            "Source term \"{}\" has no vocabulary code",
            source.term
        )));
    }
    Ok(())
}

/// Look up authority identifiers for the targets. A miss on the first
/// target is worth a warning, the others are enriched silently.
async fn authorize(
    services: &Services,
    action: &Action,
    targets: &mut [Concept],
    report: &mut JobReport,
) {
    if *action == Action::Remove {
        return;
    }
    let Some((first, rest)) = targets.split_first_mut() else {
        return;
    };

    if let Err(e) = services.authorities.authorize_concept(first).await {
        tracing::debug!("Authority lookup failed: {}", e);
    }
    if first.authority_id().is_none() {
        report.warn("The (first) target term could not be authorized.");
    }
    for target in rest {
        if let Err(e) = services.authorities.authorize_concept(target).await {
            tracing::debug!("Authority lookup failed: {}", e);
        }
    }
}

/// Conjunction of `alma.subjects` and `alma.authority_vocabulary` clauses
/// for the source concepts, sorted and without repeats
pub fn prepare_cql_query(sources: &[Concept]) -> String {
    let mut parts = BTreeSet::new();
    for concept in sources {
        let term = DASHES.replace_all(&concept.term, " ");
        parts.insert(format!("alma.subjects=\"{}\"", term));
        if let Some(vocabulary) = concept.vocabulary() {
            parts.insert(format!("alma.authority_vocabulary=\"{}\"", vocabulary));
        }
    }
    parts.into_iter().collect::<Vec<_>>().join(" AND ")
}

pub fn generate_steps(options: &JobOptions) -> Vec<Task> {
    let sources = &options.sources;
    let targets = &options.targets;
    let mut steps = Vec::new();

    match options.action {
        Action::Replace => {
            if let (Some(src), Some(dst)) = (sources.first(), targets.first()) {
                steps.extend(generate_replace_tasks(src, dst));
            }
            for target in targets.iter().skip(1) {
                steps.push(Task::Add(AddTask::new(target.clone())));
            }
        }
        Action::Remove => {
            for source in sources {
                steps.push(Task::Delete(DeleteTask::new(source.clone())));
            }
        }
        Action::Add => {
            for source in sources {
                steps.push(Task::List(ListTask::new(source.clone())));
            }
            for target in targets {
                steps.push(Task::Add(AddTask::new(target.clone())));
            }
        }
        Action::Custom => {
            for source in sources {
                steps.push(Task::Delete(DeleteTask::new(source.clone())));
            }
            for target in targets {
                steps.push(Task::Add(AddTask::new(target.clone())));
            }
        }
        Action::Interactive => {
            if let Some(src) = sources.first() {
                steps.push(Task::InteractiveReplace(InteractiveReplaceTask::new(
                    src.clone(),
                    targets.clone(),
                )));
            }
        }
        Action::List => {
            for source in sources {
                steps.push(Task::List(ListTask::new(source.clone())));
            }
        }
    }
    steps
}

/// Tasks renaming `src` to `dst`.
///
/// A single-component topical term can sit in `$a` or as a `$x`
/// subdivision, so renaming one such term to another gives three tasks:
/// exact `$a`, `$a` ignoring extra subfields and `$x` ignoring extra
/// subfields. A change of tag is done by a move, after the rename if the
/// heading changes too.
pub fn generate_replace_tasks(src: &Concept, dst: &Concept) -> Vec<Task> {
    if src.tag != dst.tag {
        if src.term == dst.term {
            return vec![Task::Move(MoveTask::new(src.clone(), dst.tag))];
        }
        let mut renamed = dst.clone();
        renamed.tag = src.tag;
        let mut tasks = same_tag_replace_tasks(src, &renamed);
        let mut moved = dst.clone();
        moved.tag = src.tag;
        if let Some(vocabulary) = src.vocabulary() {
            moved
                .subfields
                .insert(crate::models::concept::VOCABULARY_CODE, vocabulary.to_string());
        }
        tasks.push(Task::Move(MoveTask::new(moved, dst.tag)));
        return tasks;
    }
    same_tag_replace_tasks(src, dst)
}

fn same_tag_replace_tasks(src: &Concept, dst: &Concept) -> Vec<Task> {
    if src.is_ambiguous() && dst.is_ambiguous() {
        let mut tasks = Vec::with_capacity(3);
        for code in ['a', 'x'] {
            let s = src.placed_in(code);
            let d = dst.placed_in(code);
            if code == 'a' {
                tasks.push(Task::Replace(ReplaceTask::new(s.clone(), d.clone(), false)));
            }
            tasks.push(Task::Replace(ReplaceTask::new(s, d, true)));
        }
        return tasks;
    }
    vec![Task::Replace(ReplaceTask::new(src.clone(), dst.clone(), false))]
}

/// Changed fields as `- old` / `+ new` lines
pub fn field_diff(before: &MarcRecord, after: &MarcRecord) -> Vec<String> {
    let old: Vec<String> = before.data_fields.iter().map(|f| f.to_string()).collect();
    let new: Vec<String> = after.data_fields.iter().map(|f| f.to_string()).collect();
    let mut lines: Vec<String> = old
        .iter()
        .filter(|line| !new.contains(line))
        .map(|line| format!("- {}", line))
        .collect();
    lines.extend(
        new.iter()
            .filter(|line| !old.contains(line))
            .map(|line| format!("+ {}", line)),
    );
    lines
}
