//! Record and page types exchanged with the upstream records API.
//!
//! Records carry a loosely-typed field bag. Nothing here enforces a schema;
//! the accessors read the attributes the timeline and map care about and
//! treat missing or wrong-typed values as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Attribute bag of a record.
pub type Fields = serde_json::Map<String, Value>;

/// Number of `source_N` link fields a record may carry.
pub const SOURCE_FIELD_COUNT: usize = 5;

/// One upstream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Upstream identifier.
    pub id: String,

    /// Creation time reported by upstream, when present and well-formed.
    #[serde(
        rename = "createdTime",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<DateTime<Utc>>,

    /// Domain attributes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Fields,
}

/// One page of records plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Records in upstream order. Absent or `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<Record>,

    /// Opaque cursor for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

impl Page {
    /// Decode a page from an already-parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] when the body is not an object or
    /// its `records` entries are not records.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::malformed("page body is not a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))
    }

    /// The cursor for the next page. Empty cursors mean end-of-stream.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.offset.as_deref().filter(|offset| !offset.is_empty())
    }

    /// True when no further page exists.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_cursor().is_none()
    }
}

impl Record {
    /// Create a record from an id and a field bag.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            created_time: None,
            fields,
        }
    }

    /// A string field, if present and a non-empty string.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// A numeric field; numeric strings are accepted.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        let value = match self.fields.get(name)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// A list-of-strings field. A lone string reads as a one-element list.
    #[must_use]
    pub fn list(&self, name: &str) -> Vec<&str> {
        match self.fields.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    /// A field rendered for display whatever its scalar type.
    #[must_use]
    pub fn display(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(items) if !items.is_empty() => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }

    /// Latitude in degrees, when present and within range.
    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.number("latitude")
            .filter(|lat| (-90.0..=90.0).contains(lat))
    }

    /// Longitude in degrees, when present and within range.
    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.number("longitude")
            .filter(|lon| (-180.0..=180.0).contains(lon))
    }

    /// `(longitude, latitude)` when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude()?, self.latitude()?))
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    /// Event date as stored upstream.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.text("date")
    }

    /// Tags.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.list("tags")
    }

    /// Precision of the coordinates.
    #[must_use]
    pub fn geolocation_resolution(&self) -> Option<&str> {
        self.text("geolocation_resolution")
    }

    /// Sensitivity marker.
    #[must_use]
    pub fn sensitive(&self) -> Option<String> {
        self.display("sensitive")
    }

    /// Incident categories.
    #[must_use]
    pub fn incident_types(&self) -> Vec<&str> {
        self.list("Incident_Type")
    }

    /// Nearest named place.
    #[must_use]
    pub fn reported_near(&self) -> Option<String> {
        self.display("Reported_Near")
    }

    /// Impact categories.
    #[must_use]
    pub fn impact(&self) -> Vec<&str> {
        self.list("Impact")
    }

    /// Source links from `source_1` through `source_5`, in order.
    #[must_use]
    pub fn sources(&self) -> Vec<&str> {
        (1..=SOURCE_FIELD_COUNT)
            .filter_map(|n| self.text(&format!("source_{n}")))
            .collect()
    }
}
