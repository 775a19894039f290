//! Product records as pushed by the store.
//!
//! Records are decoded once from the store's JSON and never mutated
//! afterwards; every change goes back through the store as a partial update.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ModelError, RecordId, RecordKey, Result};

/// Wire keys used by the store for each record field.
pub mod fields {
    pub const ID: &str = "ASIN";
    pub const TITLE: &str = "Title";
    pub const PRICE: &str = "Price";
    pub const REVIEWS: &str = "Reviews";
    pub const VIDEO_COUNT: &str = "VideoCount";
    pub const TIMESTAMP: &str = "timestamp";
    pub const CATEGORY: &str = "Category";
    pub const LINK: &str = "Link";
    pub const SECONDARY_LINK: &str = "SecondaryLink";
    pub const CONTACTED: &str = "Contacted";
    pub const MESSAGE: &str = "Message";
}

/// Explicit "no outbound link" marker stored in the secondary link field.
pub const NO_LINK_SENTINEL: &str = "none";

/// Whether the product's seller has been reached out to.
///
/// The store only ever holds `"Yes"` or `"No"`; a missing value is kept as
/// `Unset` but behaves like `No` everywhere except serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Unset,
    No,
    Yes,
}

impl ContactStatus {
    /// Parse the wire value. Unrecognized text collapses to `Unset`.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("Yes") => Self::Yes,
            Some("No") => Self::No,
            _ => Self::Unset,
        }
    }

    /// Value written back to the store; `Unset` clears the field.
    pub const fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::No => Some("No"),
            Self::Yes => Some("Yes"),
        }
    }

    pub const fn is_contacted(self) -> bool {
        matches!(self, Self::Yes)
    }

    /// Status after one click on the contact toggle.
    ///
    /// `Unset` is treated as `No`, so the first click always lands on `Yes`.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No | Self::Unset => Self::Yes,
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire().unwrap_or("No"))
    }
}

/// One product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "ASIN")]
    pub id: RecordId,
    /// Key the store holds this record under; writes are addressed to it.
    #[serde(skip)]
    pub key: RecordKey,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Reviews")]
    pub reviews: u64,
    #[serde(rename = "VideoCount", skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u64>,
    /// Last modification, epoch seconds.
    #[serde(rename = "timestamp")]
    pub updated_at: i64,
    #[serde(rename = "Category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "SecondaryLink", skip_serializing_if = "Option::is_none")]
    pub secondary_link: Option<String>,
    #[serde(rename = "Contacted", serialize_with = "serialize_contact")]
    pub contacted: ContactStatus,
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn serialize_contact<S: serde::Serializer>(
    status: &ContactStatus,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match status.as_wire() {
        Some(value) => serializer.serialize_str(value),
        None => serializer.serialize_none(),
    }
}

impl Record {
    /// Create a record with only an identifier; remaining fields take defaults.
    pub fn new(id: RecordId) -> Self {
        Self {
            key: RecordKey::from(&id),
            id,
            title: String::new(),
            price: 0.0,
            reviews: 0,
            video_count: None,
            updated_at: 0,
            category: None,
            link: String::new(),
            secondary_link: None,
            contacted: ContactStatus::Unset,
            message: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: RecordKey) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    #[must_use]
    pub fn with_reviews(mut self, reviews: u64) -> Self {
        self.reviews = reviews;
        self
    }

    #[must_use]
    pub fn with_video_count(mut self, count: Option<u64>) -> Self {
        self.video_count = count;
        self
    }

    #[must_use]
    pub fn with_updated_at(mut self, epoch_secs: i64) -> Self {
        self.updated_at = epoch_secs;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_secondary_link(mut self, link: Option<&str>) -> Self {
        self.secondary_link = link.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_contacted(mut self, status: ContactStatus) -> Self {
        self.contacted = status;
        self
    }

    /// True when a secondary link is present and is not the `"none"` sentinel.
    pub fn has_outbound_link(&self) -> bool {
        self.secondary_link
            .as_deref()
            .is_some_and(|link| link != NO_LINK_SENTINEL)
    }

    /// Decode a record from the JSON object the store holds for it.
    ///
    /// Fails only when the identifier is missing or unusable; see
    /// [`Record::decode`] for how other fields fall back.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::decode(value).map(|decoded| decoded.record)
    }

    /// Decode a record, replacing unreadable optional fields with fallbacks.
    ///
    /// An unreadable price becomes NaN so it sorts after every real price.
    /// Any other unreadable field takes its absent value. The key defaults
    /// to the identifier.
    pub fn decode(value: &Value) -> Result<Decoded> {
        let obj = value.as_object().ok_or(ModelError::NotAnObject)?;

        let id = match obj.get(fields::ID) {
            None | Some(Value::Null) => return Err(ModelError::MissingIdentifier),
            Some(Value::String(s)) => RecordId::new(s.as_str())?,
            Some(other) => return Err(ModelError::InvalidIdentifier(other.to_string())),
        };

        let mut invalid_fields = Vec::new();
        let price = match price_field(obj, fields::PRICE) {
            Ok(price) => price.unwrap_or(0.0),
            Err(error) => {
                invalid_fields.push(error);
                f64::NAN
            }
        };
        let issues = &mut invalid_fields;

        let record = Self {
            key: RecordKey::from(&id),
            id,
            title: or_absent(text_field(obj, fields::TITLE), issues).unwrap_or_default(),
            price,
            reviews: or_absent(count_field(obj, fields::REVIEWS), issues).unwrap_or(0),
            video_count: or_absent(count_field(obj, fields::VIDEO_COUNT), issues),
            updated_at: or_absent(timestamp_field(obj, fields::TIMESTAMP), issues).unwrap_or(0),
            category: or_absent(text_field(obj, fields::CATEGORY), issues),
            link: or_absent(text_field(obj, fields::LINK), issues).unwrap_or_default(),
            secondary_link: or_absent(text_field(obj, fields::SECONDARY_LINK), issues),
            contacted: ContactStatus::from_wire(
                or_absent(text_field(obj, fields::CONTACTED), issues).as_deref(),
            ),
            message: or_absent(text_field(obj, fields::MESSAGE), issues),
        };

        Ok(Decoded {
            record,
            invalid_fields,
        })
    }
}

/// A decoded record and the fields that had to fall back.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: Record,
    /// One [`ModelError::InvalidField`] per replaced field.
    pub invalid_fields: Vec<ModelError>,
}

fn or_absent<T>(field: Result<Option<T>>, issues: &mut Vec<ModelError>) -> Option<T> {
    field.unwrap_or_else(|error| {
        issues.push(error);
        None
    })
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn text_field(obj: &Map<String, Value>, field: &'static str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(field, format!("expected text, found {other}"))),
    }
}

/// Strip currency symbols, thousands separators and whitespace.
fn clean_numeric(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect()
}

fn price_field(obj: &Map<String, Value>, field: &'static str) -> Result<Option<f64>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(field, format!("{n} is not representable"))),
        Some(Value::String(s)) => clean_numeric(s)
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(field, format!("{s:?} is not a number"))),
        Some(other) => Err(invalid(field, format!("expected number, found {other}"))),
    }
}

fn count_field(obj: &Map<String, Value>, field: &'static str) -> Result<Option<u64>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(count) = n.as_u64() {
                return Ok(Some(count));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
                _ => Err(invalid(field, format!("{n} is not a count"))),
            }
        }
        Some(Value::String(s)) => clean_numeric(s)
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(field, format!("{s:?} is not a count"))),
        Some(other) => Err(invalid(field, format!("expected count, found {other}"))),
    }
}

fn timestamp_field(obj: &Map<String, Value>, field: &'static str) -> Result<Option<i64>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(secs) = n.as_i64() {
                return Ok(Some(secs));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
                _ => Err(invalid(field, format!("{n} is not an epoch timestamp"))),
            }
        }
        Some(other) => Err(invalid(
            field,
            format!("expected epoch seconds, found {other}"),
        )),
    }
}
