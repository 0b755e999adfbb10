//! Timeline state and display entries.
//!
//! [`TimelineState`] is the ordered, append-only record list the fetch client
//! builds up page by page. [`TimelineEntry`] is one record laid out for
//! display with the defaults readers of the archive expect.

use std::fmt;

use serde::Serialize;

use crate::record::Record;

/// Ordered record sequence accumulated across pages.
///
/// Records are only ever appended, in the order upstream returned them.
/// The only way to drop records is [`TimelineState::reset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineState {
    records: Vec<Record>,
}

impl TimelineState {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page worth of records.
    pub fn append(&mut self, records: Vec<Record>) {
        self.records.extend(records);
    }

    /// Forget every record.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Records in display order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Display entries for every record.
    #[must_use]
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.records.iter().map(TimelineEntry::from_record).collect()
    }
}

/// A record laid out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// Upstream record id.
    pub id: String,
    /// `Date: ...` line.
    pub date: String,
    /// Heading.
    pub description: String,
    /// `lat, lon (resolution)`, only when both coordinates exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Sensitivity.
    pub sensitive: String,
    /// Incident categories.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incident_types: Vec<String>,
    /// Nearest named place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_near: Option<String>,
    /// Impact categories.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub impact: Vec<String>,
    /// Source links to embed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

fn owned(items: Vec<&str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

impl TimelineEntry {
    /// Lay out one record.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        let date = record
            .date()
            .map_or_else(|| "Date: Not provided".to_string(), |d| format!("Date: {d}"));

        let location = record.coordinates().map(|(lon, lat)| {
            let resolution = record
                .geolocation_resolution()
                .unwrap_or("Unknown resolution");
            format!("{lat}, {lon} ({resolution})")
        });

        Self {
            id: record.id.clone(),
            date,
            description: record
                .description()
                .unwrap_or("No description available.")
                .to_string(),
            location,
            tags: owned(record.tags()),
            sensitive: record
                .sensitive()
                .unwrap_or_else(|| "Not specified".to_string()),
            incident_types: owned(record.incident_types()),
            reported_near: record.reported_near(),
            impact: owned(record.impact()),
            sources: owned(record.sources()),
        }
    }
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.date)?;
        writeln!(f, "  {}", self.description)?;
        if let Some(location) = &self.location {
            writeln!(f, "  Location: {location}")?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "  Tags: {}", self.tags.join(", "))?;
        }
        writeln!(f, "  Sensitive: {}", self.sensitive)?;
        if !self.incident_types.is_empty() {
            writeln!(f, "  Incident Type: {}", self.incident_types.join(", "))?;
        }
        if let Some(near) = &self.reported_near {
            writeln!(f, "  Reported Near: {near}")?;
        }
        if !self.impact.is_empty() {
            writeln!(f, "  Impact: {}", self.impact.join(", "))?;
        }
        for source in &self.sources {
            writeln!(f, "  Source: {source}")?;
        }
        Ok(())
    }
}
