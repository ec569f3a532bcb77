//! Data models for Almar

pub mod concept;
pub mod enums;
pub mod job_report;
pub mod query;

// Re-export commonly used types
pub use concept::{normalize_term, Concept};
pub use enums::{Action, Interactivity, Tag};
pub use job_report::JobReport;
pub use query::{make_component_query, make_query, Query, QueryTerm, Replacement, SearchSpec};
