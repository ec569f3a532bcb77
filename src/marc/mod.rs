//! MARC record model and MARCXML codec
//!
//! This module provides the in-memory record representation the field
//! tasks operate on, and conversion from and to MARCXML.

pub mod record;
pub mod xml;

pub use record::{DataField, MarcRecord, Subfield};
