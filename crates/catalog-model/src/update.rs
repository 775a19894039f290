//! Partial record updates sent to the store.

use serde_json::{Map, Value};

use crate::record::{ContactStatus, fields};

/// Field names and new values of a partial update, keyed by wire name.
/// A `null` value removes the field at the store.
pub type PartialFields = Map<String, Value>;

/// One editable field together with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Title(String),
    Price(f64),
    Category(Option<String>),
    SecondaryLink(Option<String>),
    Contacted(ContactStatus),
    Message(Option<String>),
}

impl FieldUpdate {
    /// Wire key of the field this update touches.
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Title(_) => fields::TITLE,
            Self::Price(_) => fields::PRICE,
            Self::Category(_) => fields::CATEGORY,
            Self::SecondaryLink(_) => fields::SECONDARY_LINK,
            Self::Contacted(_) => fields::CONTACTED,
            Self::Message(_) => fields::MESSAGE,
        }
    }

    fn value(&self) -> Value {
        fn optional(text: Option<&String>) -> Value {
            text.map_or(Value::Null, |s| Value::String(s.clone()))
        }

        match self {
            Self::Title(title) => Value::String(title.clone()),
            // Non-finite prices have no JSON form; clear the field instead.
            Self::Price(price) => serde_json::Number::from_f64(*price)
                .map_or(Value::Null, Value::Number),
            Self::Category(category) => optional(category.as_ref()),
            Self::SecondaryLink(link) => optional(link.as_ref()),
            Self::Contacted(status) => status
                .as_wire()
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            Self::Message(message) => optional(message.as_ref()),
        }
    }

    /// Build the partial-fields object the store expects.
    pub fn to_partial_fields(&self) -> PartialFields {
        let mut fields = PartialFields::new();
        fields.insert(self.field_name().to_string(), self.value());
        fields
    }
}
