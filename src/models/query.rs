//! Field queries
//!
//! A query maps subfield codes to what the field must contain and,
//! optionally, what the subfield should be rewritten to.

use indexmap::IndexMap;

use super::concept::{normalize_term, Concept, AUTHORITY_CODE, HEADING_CODES, VOCABULARY_CODE};
use crate::marc::DataField;

/// Constraint on one subfield code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchSpec {
    /// Subfield present with this value (compared after normalization)
    Literal(String),
    /// Subfield present, any value
    Wildcard,
    /// Subfield must not be present
    Absent,
}

/// New content for one subfield code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Value(String),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryTerm {
    /// `None` leaves the code unconstrained
    pub search: Option<SearchSpec>,
    pub replace: Option<Replacement>,
}

impl QueryTerm {
    pub fn search(spec: SearchSpec) -> Self {
        Self {
            search: Some(spec),
            replace: None,
        }
    }

    fn from_value(value: Option<&str>) -> SearchSpec {
        match value {
            Some(v) => SearchSpec::Literal(v.to_string()),
            None => SearchSpec::Absent,
        }
    }

    fn replacement(value: Option<&str>) -> Replacement {
        match value {
            Some(v) => Replacement::Value(v.to_string()),
            None => Replacement::Remove,
        }
    }
}

/// Per-subfield search and replace specification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub terms: IndexMap<char, QueryTerm>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: char, term: QueryTerm) -> Self {
        self.terms.insert(code, term);
        self
    }

    /// Fields in a given vocabulary
    pub fn vocabulary(code: Option<&str>) -> Self {
        Self::new().with(VOCABULARY_CODE, QueryTerm::search(QueryTerm::from_value(code)))
    }

    /// Whether applying the query rewrites anything
    #[cfg(test)]
    pub fn is_mutating(&self) -> bool {
        self.terms.values().any(|t| t.replace.is_some())
    }

    /// Whether `field` satisfies every search constraint
    pub fn matches(&self, field: &DataField) -> bool {
        self.terms.iter().all(|(code, term)| match &term.search {
            None => true,
            Some(SearchSpec::Wildcard) => field.has_subfield(*code),
            Some(SearchSpec::Absent) => !field.has_subfield(*code),
            Some(SearchSpec::Literal(value)) => field
                .get_subfield(*code)
                .map(|data| normalize_term(data) == normalize_term(value))
                .unwrap_or(false),
        })
    }

    /// Apply the replacements to `field`. Returns true if the field changed.
    pub fn update(&self, field: &mut DataField) -> bool {
        let mut modified = false;
        for (code, term) in &self.terms {
            match &term.replace {
                Some(Replacement::Value(value)) => modified |= field.set_subfield(*code, value),
                Some(Replacement::Remove) => modified |= field.remove_subfield(*code),
                None => {}
            }
        }
        modified
    }
}

/// Query covering `$2 $a $b $x $y $z` of `source`, replacing with `target`.
///
/// Codes the source leaves empty must be absent from the field, so this
/// matches the heading exactly. A target authority identifier is written to
/// `$0` whatever the field carried before.
pub fn make_query(source: &Concept, target: Option<&Concept>) -> Query {
    let mut query = Query::new().with(
        VOCABULARY_CODE,
        QueryTerm::search(QueryTerm::from_value(source.vocabulary())),
    );
    for code in HEADING_CODES {
        query.terms.insert(
            code,
            QueryTerm {
                search: Some(QueryTerm::from_value(source.get(code))),
                replace: target.map(|t| QueryTerm::replacement(t.get(code))),
            },
        );
    }
    if let Some(id) = target.and_then(Concept::authority_id) {
        query.terms.insert(
            AUTHORITY_CODE,
            QueryTerm {
                search: None,
                replace: Some(Replacement::Value(id.to_string())),
            },
        );
    }
    query
}

/// Query over `$2` and only the heading codes `source` populates, ignoring
/// any other subfields on the field (like an extra `$x`).
pub fn make_component_query(source: &Concept, target: Option<&Concept>) -> Query {
    let mut query = Query::new().with(
        VOCABULARY_CODE,
        QueryTerm::search(QueryTerm::from_value(source.vocabulary())),
    );
    for code in HEADING_CODES {
        if let Some(value) = source.get(code) {
            query.terms.insert(
                code,
                QueryTerm {
                    search: Some(SearchSpec::Literal(value.to_string())),
                    replace: target.map(|t| QueryTerm::replacement(t.get(code))),
                },
            );
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::Subfield;
    use crate::models::enums::Tag;

    fn field(subfields: &[(char, &str)]) -> DataField {
        DataField::new(
            "650",
            ' ',
            '7',
            subfields.iter().map(|(c, v)| Subfield::new(*c, *v)).collect(),
        )
    }

    fn cats() -> Concept {
        Concept::new("Cats", Some("vocabX"), Tag::Topical).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let query = Query::new()
            .with('2', QueryTerm::search(SearchSpec::Literal("vocabX".into())))
            .with('a', QueryTerm::search(SearchSpec::Literal("Cats".into())));
        assert!(query.matches(&field(&[('a', "Cats"), ('2', "vocabX")])));
        assert!(!query.matches(&field(&[('a', "Dogs"), ('2', "vocabX")])));
        // codes outside the query are ignored
        assert!(query.matches(&field(&[('a', "Cats"), ('9', "local"), ('2', "vocabX")])));
    }

    #[test]
    fn test_literal_match_is_normalized() {
        let query = Query::new().with('a', QueryTerm::search(SearchSpec::Literal("cats".into())));
        assert!(query.matches(&field(&[('a', " Cats")])));
    }

    #[test]
    fn test_wildcard_and_absent() {
        let wildcard = Query::new().with('0', QueryTerm::search(SearchSpec::Wildcard));
        let absent = Query::new().with('0', QueryTerm::search(SearchSpec::Absent));
        let with_id = field(&[('a', "Cats"), ('0', "c123")]);
        let without_id = field(&[('a', "Cats")]);
        assert!(wildcard.matches(&with_id));
        assert!(!wildcard.matches(&without_id));
        assert!(!absent.matches(&with_id));
        assert!(absent.matches(&without_id));
    }

    #[test]
    fn test_component_tolerance() {
        let f = field(&[('a', "Cats"), ('x', "History"), ('2', "vocabX")]);
        assert!(make_component_query(&cats(), None).matches(&f));
        assert!(!make_query(&cats(), None).matches(&f));
        assert!(make_query(&cats(), None).matches(&field(&[('a', "Cats"), ('2', "vocabX")])));
    }

    #[test]
    fn test_wrong_vocabulary_does_not_match() {
        let f = field(&[('a', "Cats"), ('2', "vocabY")]);
        assert!(!make_query(&cats(), None).matches(&f));
        assert!(!make_component_query(&cats(), None).matches(&f));
    }

    #[test]
    fn test_replace_query() {
        let target = Concept::new("Dogs : History", None, Tag::Topical).unwrap();
        let query = make_query(&cats(), Some(&target));
        assert!(query.is_mutating());
        assert!(!make_query(&cats(), None).is_mutating());

        let mut f = field(&[('a', "Cats"), ('2', "vocabX")]);
        assert!(query.matches(&f));
        assert!(query.update(&mut f));
        assert_eq!(f.to_string(), "650 #7 $a Dogs $x History $2 vocabX");
        assert!(!query.update(&mut f));
    }

    #[test]
    fn test_replace_removes_missing_components() {
        let source = Concept::new("Cats : History", Some("vocabX"), Tag::Topical).unwrap();
        let target = Concept::new("Cats", None, Tag::Topical).unwrap();
        let query = make_query(&source, Some(&target));
        let mut f = field(&[('a', "Cats"), ('x', "History"), ('2', "vocabX")]);
        assert!(query.matches(&f));
        assert!(query.update(&mut f));
        assert_eq!(f.to_string(), "650 #7 $a Cats $2 vocabX");
    }

    #[test]
    fn test_authority_id_is_written() {
        let mut target = Concept::new("Dogs", None, Tag::Topical).unwrap();
        target.set_authority_id("(NoOU-ONR)c000042");
        let query = make_query(&cats(), Some(&target));
        // $0 does not constrain the search
        let mut f = field(&[('a', "Cats"), ('2', "vocabX")]);
        assert!(query.matches(&f));
        query.update(&mut f);
        assert_eq!(f.get_subfield('0'), Some("(NoOU-ONR)c000042"));
    }
}
