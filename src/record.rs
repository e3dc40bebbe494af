//! MARC record structures.
//!
//! This module provides the in-memory record model:
//! - [`Record`]: a leader plus fields in directory order
//! - [`Field`]: a tagged control field or data field
//! - [`Subfield`]: a coded value inside a data field
//! - [`Value`]: field content, decoded text or raw bytes depending on the
//!   [`TextPolicy`](crate::encoding::TextPolicy) used when reading
//!
//! Fields are kept in a single `Vec` so the order of the directory survives a
//! read/write cycle, including interleaved tags.
//!
//! # Examples
//!
//! ```
//! use marc_resync::{Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .field(Field::control(*b"001", "12345"))
//!     .field(
//!         Field::builder(*b"245", '1', '0')
//!             .subfield('a', "The great gatsby /")
//!             .subfield('c', "F. Scott Fitzgerald.")
//!             .build(),
//!     )
//!     .build();
//!
//! let title = record.subfield("245", 'a').and_then(|v| v.as_str());
//! assert_eq!(title, Some("The great gatsby /"));
//! ```

use crate::leader::Leader;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Ends the directory and every field.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Introduces each subfield code.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
/// Ends a record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// A three-byte field tag.
///
/// Tags are conventionally digits but any bytes are accepted so that odd
/// records survive a round trip.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; 3]);

impl Tag {
    /// Wrap three raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Tag(bytes)
    }

    /// The raw bytes of the tag.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Control fields are the `00X` tags.
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.0[0] == b'0' && self.0[1] == b'0'
    }

    /// True if the tag spells `other`.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

impl From<[u8; 3]> for Tag {
    fn from(bytes: [u8; 3]) -> Self {
        Tag(bytes)
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <[u8; 3]>::try_from(s.as_bytes())
            .map(Tag)
            .map_err(|_| format!("tag must be exactly 3 bytes, got {s:?}"))
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Content of a control field or subfield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Decoded text.
    Text(String),
    /// Bytes left for the caller to decode.
    Raw(Vec<u8>),
}

impl Value {
    /// The bytes that get written back out.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Text(s) => s.as_bytes(),
            Value::Raw(b) => b,
        }
    }

    /// The value as text, if it is (or happens to be) valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Raw(b) => std::str::from_utf8(b).ok(),
        }
    }

    /// The value as text, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            Value::Raw(b) => String::from_utf8_lossy(b),
        }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True if the value holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Raw(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Raw(bytes.to_vec())
    }
}

/// A subfield within a data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single byte, kept as a char)
    pub code: char,
    /// Subfield value
    pub value: Value,
}

/// Indicators and subfields of a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields in record order (`SmallVec` avoids allocating for typical
    /// fields with four or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

impl DataField {
    /// Append a subfield.
    pub fn add_subfield(&mut self, code: char, value: impl Into<Value>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }
}

/// What a field holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// `00X` fields: a single value, no indicators or subfields.
    Control(Value),
    /// Everything else.
    Data(DataField),
}

/// A tagged field of a MARC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag
    pub tag: Tag,
    /// Field content
    pub kind: FieldKind,
}

impl Field {
    /// Create a control field.
    #[must_use]
    pub fn control(tag: impl Into<Tag>, value: impl Into<Value>) -> Self {
        Field {
            tag: tag.into(),
            kind: FieldKind::Control(value.into()),
        }
    }

    /// Create an empty data field.
    #[must_use]
    pub fn data(tag: impl Into<Tag>, indicator1: char, indicator2: char) -> Self {
        Field {
            tag: tag.into(),
            kind: FieldKind::Data(DataField {
                indicator1,
                indicator2,
                subfields: SmallVec::new(),
            }),
        }
    }

    /// Create a builder for a data field
    ///
    /// # Examples
    ///
    /// ```
    /// use marc_resync::Field;
    ///
    /// let field = Field::builder(*b"245", '1', '0')
    ///     .subfield('a', "The Great Gatsby")
    ///     .subfield('c', "F. Scott Fitzgerald")
    ///     .build();
    /// assert_eq!(field.subfields().count(), 2);
    /// ```
    #[must_use]
    pub fn builder(tag: impl Into<Tag>, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: Field::data(tag, indicator1, indicator2),
        }
    }

    /// True for control fields.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self.kind, FieldKind::Control(_))
    }

    /// The value of a control field.
    #[must_use]
    pub fn control_value(&self) -> Option<&Value> {
        match &self.kind {
            FieldKind::Control(value) => Some(value),
            FieldKind::Data(_) => None,
        }
    }

    /// The indicators and subfields of a data field.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataField> {
        match &self.kind {
            FieldKind::Data(data) => Some(data),
            FieldKind::Control(_) => None,
        }
    }

    /// Both indicators of a data field.
    #[must_use]
    pub fn indicators(&self) -> Option<(char, char)> {
        self.as_data().map(|d| (d.indicator1, d.indicator2))
    }

    /// Add a subfield. Ignored on control fields, which have none.
    pub fn add_subfield(&mut self, code: char, value: impl Into<Value>) {
        if let FieldKind::Data(data) = &mut self.kind {
            data.add_subfield(code, value);
        }
    }

    /// Iterate over all subfields in order. Empty for control fields.
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.as_data().into_iter().flat_map(|d| d.subfields.iter())
    }

    /// Iterate over the values of subfields with a given code, in order.
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &Value> {
        self.subfields()
            .filter(move |sf| sf.code == code)
            .map(|sf| &sf.value)
    }

    /// First value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&Value> {
        self.subfields_by_code(code).next()
    }
}

/// Builder for fluently constructing data fields
#[derive(Debug)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: impl Into<Value>) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}

/// A MARC record: leader plus fields in directory order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 bytes)
    pub leader: Leader,
    /// Fields in the order they appear in the directory
    pub fields: Vec<Field>,
}

impl Record {
    /// Create a new record with the given leader and no fields
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing records
    #[must_use]
    pub fn builder(leader: Leader) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(leader),
        }
    }

    /// Append a field after the existing ones.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Iterate over all fields in record order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterate over fields matching a specific tag, in record order
    ///
    /// # Examples
    ///
    /// ```ignore
    /// for field in record.fields_by_tag("650") {
    ///     if let Some(subject) = field.get_subfield('a') {
    ///         println!("Subject: {}", subject);
    ///     }
    /// }
    /// ```
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.tag.matches(tag))
    }

    /// First field with a given tag
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag.matches(tag))
    }

    /// Value of the first control field with a given tag
    #[must_use]
    pub fn control_field(&self, tag: &str) -> Option<&Value> {
        self.fields
            .iter()
            .filter(|f| f.tag.matches(tag))
            .find_map(Field::control_value)
    }

    /// First value of subfield `code` in the first field tagged `tag` that has one.
    ///
    /// A missing tag or code is `None`, never an error.
    #[must_use]
    pub fn subfield(&self, tag: &str, code: char) -> Option<&Value> {
        self.fields
            .iter()
            .filter(|f| f.tag.matches(tag))
            .find_map(|f| f.get_subfield(code))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for fluently constructing MARC records
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a field to the record being built
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record::builder(Leader::default())
            .field(Field::control(*b"001", "ocm12345"))
            .field(
                Field::builder(*b"650", ' ', '0')
                    .subfield('a', "Novels")
                    .build(),
            )
            .field(
                Field::builder(*b"245", '1', '4')
                    .subfield('a', "The great gatsby /")
                    .subfield('c', "F. Scott Fitzgerald.")
                    .build(),
            )
            .field(
                Field::builder(*b"650", ' ', '0')
                    .subfield('a', "Coming of age")
                    .subfield('x', "Fiction")
                    .subfield('a', "Repeated code")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_fields_keep_interleaved_order() {
        let record = sample_record();
        let tags: Vec<String> = record.fields().map(|f| f.tag.to_string()).collect();
        assert_eq!(tags, ["001", "650", "245", "650"]);
    }

    #[test]
    fn test_fields_by_tag() {
        let record = sample_record();
        let subjects: Vec<_> = record
            .fields_by_tag("650")
            .filter_map(|f| f.get_subfield('a'))
            .map(ToString::to_string)
            .collect();
        assert_eq!(subjects, ["Novels", "Coming of age"]);
    }

    #[test]
    fn test_repeated_codes_keep_order() {
        let record = sample_record();
        let field = record.fields_by_tag("650").nth(1).unwrap();
        let values: Vec<_> = field.subfields_by_code('a').map(ToString::to_string).collect();
        assert_eq!(values, ["Coming of age", "Repeated code"]);
        assert_eq!(field.get_subfield('a').unwrap().as_str(), Some("Coming of age"));
    }

    #[test]
    fn test_missing_lookups_are_none() {
        let record = sample_record();
        assert!(record.get_field("999").is_none());
        assert!(record.subfield("245", 'z').is_none());
        assert!(record.control_field("245").is_none());
        assert_eq!(
            record.control_field("001").and_then(Value::as_str),
            Some("ocm12345")
        );
    }

    #[test]
    fn test_lookups_outlive_tag_string() {
        let record = sample_record();
        let (field, id, title) = {
            let tags = [String::from("650"), String::from("001"), String::from("245")];
            (
                record.get_field(&tags[0]),
                record.control_field(&tags[1]),
                record.subfield(&tags[2], 'a'),
            )
        };
        assert_eq!(field.and_then(|f| f.get_subfield('a')).and_then(Value::as_str), Some("Novels"));
        assert_eq!(id.and_then(Value::as_str), Some("ocm12345"));
        assert_eq!(title.and_then(Value::as_str), Some("The great gatsby /"));
    }

    #[test]
    fn test_control_fields_have_no_subfields() {
        let mut field = Field::control(*b"008", "200101s2000");
        field.add_subfield('a', "ignored");
        assert!(field.is_control());
        assert_eq!(field.subfields().count(), 0);
        assert!(field.indicators().is_none());
    }

    #[test]
    fn test_tag_parsing_and_display() {
        let tag: Tag = "245".parse().unwrap();
        assert_eq!(tag, "245");
        assert!(!tag.is_control());
        assert!(Tag::from(*b"005").is_control());
        assert!("24".parse::<Tag>().is_err());
        assert_eq!(format!("{tag:?}"), "Tag(245)");
    }

    #[test]
    fn test_value_views() {
        let raw = Value::Raw(vec![b'a', 0xFF, b'b']);
        assert_eq!(raw.as_str(), None);
        assert_eq!(raw.to_string_lossy(), "a\u{FFFD}b");
        assert_eq!(raw.len(), 3);

        let text = Value::from("caf\u{e9}");
        assert_eq!(text.as_bytes(), "caf\u{e9}".as_bytes());
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fields"][0]["tag"], "001");
        assert_eq!(json["fields"][0]["kind"]["Control"], "ocm12345");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
