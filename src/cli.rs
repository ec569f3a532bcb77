//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::AppResult;
use crate::models::{Action, Concept, Interactivity, Tag};
use crate::services::job::{JobOptions, ListOptions};

#[derive(Parser, Debug)]
#[command(
    name = "almar",
    version,
    about = "Edit or remove subject fields in Alma catalog records.",
    long_about = "Edit or remove subject fields in Alma catalog records.\n\
                  Supported fields: 084, 648, 650, 651, 655"
)]
pub struct Cli {
    /// Configuration file. Default: ./almar.yml, ./lokar.yml or ~/.almar.yml
    #[arg(long, global = true, env = "ALMAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment from the configuration file
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Dry run without doing any edits
    #[arg(short, long = "dry-run", alias = "dry_run", global = true)]
    pub dry_run: bool,

    /// More verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Always use defaults rather than asking
    #[arg(short, long = "non-interactive", global = true)]
    pub non_interactive: bool,

    /// Ask before saving each record
    #[arg(long = "confirm-each", global = true, conflicts_with = "non_interactive")]
    pub confirm_each: bool,

    /// Show diffs before saving
    #[arg(long, global = true)]
    pub diffs: bool,

    /// Search expression to use instead of the one derived from the term
    #[arg(long, global = true)]
    pub cql: Option<String>,

    /// Only edit records having a field containing this text
    #[arg(long, global = true)]
    pub grep: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace a subject term with another, optionally adding a second one
    Rename(RenameArgs),
    /// Delete a subject term
    Delete(TermArgs),
    /// Add a subject term to records having another term
    Add(AddArgs),
    /// Interactive reclassification
    Interactive(InteractiveArgs),
    /// List records having a subject term
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TermArgs {
    /// Term to search for, optionally prefixed by a tag (e.g. "655 Romaner")
    pub term: String,
}

#[derive(Args, Debug, Clone)]
pub struct RenameArgs {
    /// Term to search for
    pub term: String,
    /// New value, or a bare tag to move the field
    pub new_term: String,
    /// Second new value, added alongside the first
    pub new_term2: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Term to search for
    pub term: String,
    /// Term to add
    pub new_term: String,
}

#[derive(Args, Debug, Clone)]
pub struct InteractiveArgs {
    /// Term to search for
    pub term: String,
    /// Replacement terms to choose from
    #[arg(required = true)]
    pub new_terms: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Term to search for
    pub term: String,
    /// Show titles
    #[arg(long = "titles")]
    pub show_titles: bool,
    /// Show all subject fields
    #[arg(long = "subjects")]
    pub show_subjects: bool,
}

impl Cli {
    pub fn interactivity(&self) -> Interactivity {
        if self.non_interactive {
            Interactivity::None
        } else if self.confirm_each {
            Interactivity::Increased
        } else {
            Interactivity::Standard
        }
    }

    /// Job request for the subcommand, with concepts in `vocabulary`
    pub fn job_options(&self, vocabulary: &str) -> AppResult<JobOptions> {
        let voc = Some(vocabulary);
        let source_of = |term: &str| Concept::from_spec(term, voc, Tag::Topical, None);

        let mut options = match &self.command {
            Commands::Rename(args) => {
                let source = source_of(&args.term)?;
                let mut targets = vec![Concept::from_spec(
                    &args.new_term,
                    voc,
                    source.tag,
                    Some(source.term.as_str()),
                )?];
                if let Some(term) = args.new_term2.as_deref().filter(|t| !t.trim().is_empty()) {
                    targets.push(Concept::from_spec(term, voc, source.tag, None)?);
                }
                JobOptions::new(Action::Replace, vec![source], targets)
            }
            Commands::Delete(args) => JobOptions::new(Action::Remove, vec![source_of(&args.term)?], vec![]),
            Commands::Add(args) => {
                let source = source_of(&args.term)?;
                let target = Concept::from_spec(&args.new_term, voc, source.tag, None)?;
                JobOptions::new(Action::Add, vec![source], vec![target])
            }
            Commands::Interactive(args) => {
                let source = source_of(&args.term)?;
                let targets = args
                    .new_terms
                    .iter()
                    .map(|term| Concept::from_spec(term, voc, source.tag, None))
                    .collect::<AppResult<Vec<_>>>()?;
                JobOptions::new(Action::Interactive, vec![source], targets)
            }
            Commands::List(args) => {
                let mut options = JobOptions::new(Action::List, vec![source_of(&args.term)?], vec![]);
                options.list = ListOptions {
                    show_titles: args.show_titles,
                    show_subjects: args.show_subjects,
                };
                options
            }
        };

        options.cql = self.cql.clone();
        options.grep = self.grep.clone();
        options.dry_run = self.dry_run;
        options.interactivity = self.interactivity();
        options.show_diffs = self.diffs;
        Ok(options)
    }
}
