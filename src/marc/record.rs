//! MARC record model
//!
//! Structured representation of a bibliographic record as exchanged in MARCXML.

use std::fmt;

use indexmap::IndexMap;

/// A MARC record containing leader and fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarcRecord {
    /// The 24-character record leader
    pub leader: String,
    /// Control fields (00X), in document order
    pub control_fields: IndexMap<String, String>,
    /// Data fields with indicators and subfields, in document order
    pub data_fields: Vec<DataField>,
}

/// A MARC data field (010-999)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub ind1: char,
    /// Second indicator
    pub ind2: char,
    /// Subfields
    pub subfields: Vec<Subfield>,
}

/// A MARC subfield
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield data
    pub data: String,
}

impl Subfield {
    pub fn new(code: char, data: impl Into<String>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }
}

impl MarcRecord {
    /// Record identifier from control field 001
    pub fn id(&self) -> Option<&str> {
        self.get_control_field("001")
    }

    /// Title proper and remainder of title from 245
    pub fn title(&self) -> Option<String> {
        let field = self.get_fields("245").into_iter().next()?;
        let parts: Vec<&str> = ['a', 'b']
            .iter()
            .filter_map(|code| field.get_subfield(*code))
            .map(|s| s.trim().trim_end_matches(['/', ':', ';']).trim())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" : "))
        }
    }

    /// Get a subfield value by tag and subfield code
    pub fn get_subfield(&self, tag: &str, code: char) -> Option<&str> {
        self.data_fields
            .iter()
            .filter(|f| f.tag == tag)
            .find_map(|f| f.get_subfield(code))
    }

    /// Get a control field value
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields.get(tag).map(String::as_str)
    }

    /// Get all data fields with a specific tag
    pub fn get_fields(&self, tag: &str) -> Vec<&DataField> {
        self.data_fields.iter().filter(|f| f.tag == tag).collect()
    }

    /// Positions of the data fields with `tag` accepted by `predicate`
    pub fn field_positions<F>(&self, tag: &str, predicate: F) -> Vec<usize>
    where
        F: Fn(&DataField) -> bool,
    {
        self.data_fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.tag == tag && predicate(f))
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl DataField {
    pub fn new(tag: impl Into<String>, ind1: char, ind2: char, subfields: Vec<Subfield>) -> Self {
        Self {
            tag: tag.into(),
            ind1,
            ind2,
            subfields,
        }
    }

    /// Get the first subfield value by code
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
    }

    /// Get all subfield values for a code
    pub fn get_all_subfields(&self, code: char) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
            .collect()
    }

    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|sf| sf.code == code)
    }

    /// Set the first subfield with `code`, adding one if missing.
    /// Returns true if the field changed.
    ///
    /// New data subfields (letter codes) go before the trailing control
    /// subfields (`$0`, `$2`, ...).
    pub fn set_subfield(&mut self, code: char, data: &str) -> bool {
        match self.subfields.iter_mut().find(|sf| sf.code == code) {
            Some(sf) if sf.data == data => false,
            Some(sf) => {
                sf.data = data.to_string();
                true
            }
            None => {
                let pos = if code.is_ascii_alphabetic() {
                    self.subfields
                        .iter()
                        .position(|sf| sf.code.is_ascii_digit())
                        .unwrap_or(self.subfields.len())
                } else {
                    self.subfields.len()
                };
                self.subfields.insert(pos, Subfield::new(code, data));
                true
            }
        }
    }

    /// Remove every subfield with `code`. Returns true if any was removed.
    pub fn remove_subfield(&mut self, code: char) -> bool {
        let before = self.subfields.len();
        self.subfields.retain(|sf| sf.code != code);
        before != self.subfields.len()
    }
}

impl fmt::Display for DataField {
    /// Line form used for listings, diffs and the free-text filter,
    /// e.g. `650 #7 $a Monstre $2 noubomn`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blank = |c: char| if c == ' ' { '#' } else { c };
        write!(f, "{} {}{}", self.tag, blank(self.ind1), blank(self.ind2))?;
        for sf in &self.subfields {
            write!(f, " ${} {}", sf.code, sf.data)?;
        }
        Ok(())
    }
}
