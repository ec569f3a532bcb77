//! Subject heading concepts
//!
//! A concept describes one heading as a source to search for or a target to
//! write, e.g. `650 $a Monstre $2 noubomn`.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::enums::Tag;
use crate::error::{AppError, AppResult};

/// Separator between the components of a heading string
pub const COMPONENT_SEPARATOR: &str = " : ";

/// Subfield codes a heading can populate, in canonical order
pub const HEADING_CODES: [char; 5] = ['a', 'b', 'x', 'y', 'z'];

/// Vocabulary code subfield
pub const VOCABULARY_CODE: char = '2';

/// Authority identifier subfield
pub const AUTHORITY_CODE: char = '0';

static TERM_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(084|648|650|651|655)(?:\s+(.+))?$").expect("valid term specifier pattern")
});

/// Normalize a term so every component starts with a capital letter.
///
/// Each ` : ` component is capitalized, not only the leading character, and
/// the result is NFC so composed and decomposed input compare equal.
pub fn normalize_term(term: &str) -> String {
    let term: String = term.trim().nfc().collect();
    if term.is_empty() {
        return term;
    }
    term.split(COMPONENT_SEPARATOR)
        .map(|component| {
            let mut chars = component.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(COMPONENT_SEPARATOR)
}

/// A subject or classification heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub tag: Tag,
    /// Normalized heading string, components joined by [`COMPONENT_SEPARATOR`]
    pub term: String,
    pub components: Vec<String>,
    /// Populated subfields, codes from `a b x y z 2 0`
    pub subfields: IndexMap<char, String>,
    ambiguous: bool,
}

impl Concept {
    /// Build a concept from a heading string.
    ///
    /// One component populates `$a`, two populate `$a` and `$x`. A
    /// single-component topical term may also be used as a subdivision, so
    /// its placement is ambiguous until [`Concept::placed_in`] fixes it.
    pub fn new(term: &str, vocabulary: Option<&str>, tag: Tag) -> AppResult<Self> {
        let term = normalize_term(term);
        if term.is_empty() {
            return Err(AppError::Usage("No term given".to_string()));
        }
        let components: Vec<String> = term.split(COMPONENT_SEPARATOR).map(String::from).collect();

        let mut subfields = IndexMap::new();
        match components.as_slice() {
            [a] => {
                subfields.insert('a', a.clone());
            }
            [a, x] => {
                subfields.insert('a', a.clone());
                subfields.insert('x', x.clone());
            }
            _ => {
                return Err(AppError::Usage(format!(
                    "Headings with more than two components are not supported: \"{}\"",
                    term
                )))
            }
        }
        if let Some(code) = vocabulary {
            subfields.insert(VOCABULARY_CODE, code.to_string());
        }

        Ok(Self {
            tag,
            ambiguous: tag == Tag::Topical && components.len() == 1,
            term,
            components,
            subfields,
        })
    }

    /// Parse a term specifier: `TERM`, `TAG TERM`, or a bare `TAG` meaning
    /// `default_term` under another tag.
    pub fn from_spec(
        spec: &str,
        vocabulary: Option<&str>,
        default_tag: Tag,
        default_term: Option<&str>,
    ) -> AppResult<Self> {
        let spec = spec.trim();
        if let Some(caps) = TERM_SPEC.captures(spec) {
            let tag: Tag = caps[1].parse()?;
            return match caps.get(2) {
                Some(term) => Self::new(term.as_str(), vocabulary, tag),
                None => {
                    let term = default_term
                        .ok_or_else(|| AppError::Usage("No source term specified".to_string()))?;
                    Self::new(term, vocabulary, tag)
                }
            };
        }
        Self::new(spec, vocabulary, default_tag)
    }

    /// The same heading with the term forced into subfield `code`
    pub fn placed_in(&self, code: char) -> Concept {
        let mut subfields = IndexMap::new();
        subfields.insert(code, self.term.clone());
        for extra in [VOCABULARY_CODE, AUTHORITY_CODE] {
            if let Some(value) = self.subfields.get(&extra) {
                subfields.insert(extra, value.clone());
            }
        }
        Concept {
            tag: self.tag,
            term: self.term.clone(),
            components: self.components.clone(),
            subfields,
            ambiguous: false,
        }
    }

    pub fn get(&self, code: char) -> Option<&str> {
        self.subfields.get(&code).map(String::as_str)
    }

    pub fn vocabulary(&self) -> Option<&str> {
        self.get(VOCABULARY_CODE)
    }

    pub fn authority_id(&self) -> Option<&str> {
        self.get(AUTHORITY_CODE)
    }

    pub fn set_authority_id(&mut self, id: impl Into<String>) {
        self.subfields.insert(AUTHORITY_CODE, id.into());
    }

    /// Whether the term may sit in either `$a` or `$x`
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    /// Heading subfields in canonical order, as `$a Foo $x Bar`
    pub fn heading(&self) -> String {
        HEADING_CODES
            .iter()
            .filter_map(|code| self.get(*code).map(|v| format!("${} {}", code, v)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.heading())?;
        if let Some(vocabulary) = self.vocabulary() {
            write!(f, " $2 {}", vocabulary)?;
        }
        if let Some(id) = self.authority_id() {
            write!(f, " $0 {}", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  monstre "), "Monstre");
        assert_eq!(normalize_term("monstre : historie"), "Monstre : Historie");
        assert_eq!(normalize_term("ønsker"), "Ønsker");
        assert_eq!(normalize_term(""), "");
        // decomposed input
        assert_eq!(normalize_term("a\u{030A}r"), "År");
    }

    #[test]
    fn test_single_component() {
        let concept = Concept::new("monstre", Some("noubomn"), Tag::Topical).unwrap();
        assert_eq!(concept.get('a'), Some("Monstre"));
        assert_eq!(concept.get('x'), None);
        assert_eq!(concept.vocabulary(), Some("noubomn"));
        assert!(concept.is_ambiguous());
        assert_eq!(concept.to_string(), "650 $a Monstre $2 noubomn");
    }

    #[test]
    fn test_two_components() {
        let concept = Concept::new("Monstre : Historie", Some("noubomn"), Tag::Topical).unwrap();
        assert_eq!(concept.components, vec!["Monstre", "Historie"]);
        assert_eq!(concept.get('a'), Some("Monstre"));
        assert_eq!(concept.get('x'), Some("Historie"));
        assert!(!concept.is_ambiguous());
    }

    #[test]
    fn test_too_many_components() {
        let err = Concept::new("A : B : C", Some("noubomn"), Tag::Topical).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_only_topical_terms_are_ambiguous() {
        let concept = Concept::new("Oslo", Some("noubomn"), Tag::Geographic).unwrap();
        assert!(!concept.is_ambiguous());
    }

    #[test]
    fn test_from_spec() {
        let c = Concept::from_spec("Monstre", Some("noubomn"), Tag::Topical, None).unwrap();
        assert_eq!(c.tag, Tag::Topical);

        let c = Concept::from_spec("655 Romaner", Some("noubomn"), Tag::Topical, None).unwrap();
        assert_eq!(c.tag, Tag::GenreForm);
        assert_eq!(c.term, "Romaner");

        let c = Concept::from_spec("648", Some("noubomn"), Tag::Topical, Some("1900-tallet")).unwrap();
        assert_eq!(c.tag, Tag::Chronological);
        assert_eq!(c.term, "1900-tallet");

        assert!(Concept::from_spec("648", Some("noubomn"), Tag::Topical, None).is_err());
    }

    #[test]
    fn test_placed_in_builds_fresh_concept() {
        let mut concept = Concept::new("Monstre", Some("noubomn"), Tag::Topical).unwrap();
        concept.set_authority_id("(NoOU-ONR)c012345");
        let placed = concept.placed_in('x');
        assert_eq!(placed.get('x'), Some("Monstre"));
        assert_eq!(placed.get('a'), None);
        assert_eq!(placed.vocabulary(), Some("noubomn"));
        assert_eq!(placed.authority_id(), Some("(NoOU-ONR)c012345"));
        assert!(!placed.is_ambiguous());
        // the original is untouched
        assert_eq!(concept.get('a'), Some("Monstre"));
    }
}
