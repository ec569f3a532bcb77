//! Shared domain enums

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// MARC tags of the subject and classification fields we edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// 084 - Other classification number
    Classification,
    /// 648 - Subject added entry, chronological term
    Chronological,
    /// 650 - Subject added entry, topical term
    Topical,
    /// 651 - Subject added entry, geographic name
    Geographic,
    /// 655 - Index term, genre/form
    GenreForm,
}

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::Classification,
        Tag::Chronological,
        Tag::Topical,
        Tag::Geographic,
        Tag::GenreForm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Classification => "084",
            Tag::Chronological => "648",
            Tag::Topical => "650",
            Tag::Geographic => "651",
            Tag::GenreForm => "655",
        }
    }

    /// Second indicator for newly created fields
    pub fn default_ind2(&self) -> char {
        match self {
            Tag::Classification => ' ',
            _ => '7', // Source specified in $2
        }
    }
}

impl FromStr for Tag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                AppError::Usage(format!(
                    "Unsupported tag {}. Supported tags: {}",
                    s,
                    Tag::ALL.map(|t| t.as_str()).join(", ")
                ))
            })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What a job does to the matching records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Rename the source concept to the first target, add the others
    Replace,
    /// Delete the source concepts
    Remove,
    /// Add the targets to records carrying the source concepts
    Add,
    /// Delete the source concepts and add the targets
    Custom,
    /// Let the operator pick a target per record
    Interactive,
    /// Only list matching records
    List,
}

impl Action {
    /// Whether records are edited without a per-record choice
    pub fn is_batch_edit(&self) -> bool {
        !matches!(self, Action::Interactive | Action::List)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Replace => "replace",
            Action::Remove => "remove",
            Action::Add => "add",
            Action::Custom => "custom",
            Action::Interactive => "interactive",
            Action::List => "list",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Interactivity
// ---------------------------------------------------------------------------

/// How often the operator is asked before records are saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interactivity {
    /// Never ask, always use the default answer
    None,
    /// Ask once before the batch
    #[default]
    Standard,
    /// Also ask before saving each record
    Increased,
}
