//! Duplicate heading removal

use crate::marc::{DataField, MarcRecord};
use crate::models::concept::{normalize_term, HEADING_CODES};
use crate::models::{Query, Tag};

/// Canonical form of a heading field: the tag followed by every heading
/// subfield in code order, e.g. `650 $a Mønstre $x Historie`.
pub fn canonical_key(field: &DataField) -> String {
    let mut key = field.tag.clone();
    for code in HEADING_CODES {
        for value in field.get_all_subfields(code) {
            key.push_str(&format!(" ${} {}", code, normalize_term(value)));
        }
    }
    key
}

/// Remove later fields repeating an earlier heading among the `tag` fields
/// in `vocabulary`. Returns the keys of the removed fields.
pub fn remove_duplicates(record: &mut MarcRecord, tag: Tag, vocabulary: Option<&str>) -> Vec<String> {
    let query = Query::vocabulary(vocabulary);
    let positions = record.field_positions(tag.as_str(), |f| query.matches(f));

    let mut seen: Vec<String> = Vec::new();
    let mut duplicates: Vec<usize> = Vec::new();
    for idx in positions {
        let key = canonical_key(&record.data_fields[idx]);
        if seen.contains(&key) {
            duplicates.push(idx);
        } else {
            seen.push(key);
        }
    }

    let mut removed = Vec::with_capacity(duplicates.len());
    for idx in duplicates.into_iter().rev() {
        removed.push(canonical_key(&record.data_fields.remove(idx)));
    }
    removed.reverse();
    removed
}
