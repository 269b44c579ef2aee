//! Labeled spans produced by a named-entity recognition pass

use serde::{Deserialize, Serialize};

/// Named-entity category as reported by the NER model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityLabel {
    /// Geopolitical entity: countries, cities, states
    Gpe,
    /// Non-GPE location: mountain ranges, bodies of water
    Loc,
    /// Facility: buildings, airports, bridges
    Fac,
    /// Any label we do not geocode
    Other(String),
}

impl EntityLabel {
    /// Labels worth geocoding
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(self, EntityLabel::Gpe | EntityLabel::Loc | EntityLabel::Fac)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            EntityLabel::Gpe => "GPE",
            EntityLabel::Loc => "LOC",
            EntityLabel::Fac => "FAC",
            EntityLabel::Other(label) => label,
        }
    }
}

impl From<String> for EntityLabel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "GPE" => EntityLabel::Gpe,
            "LOC" => EntityLabel::Loc,
            "FAC" => EntityLabel::Fac,
            _ => EntityLabel::Other(label),
        }
    }
}

impl From<&str> for EntityLabel {
    fn from(label: &str) -> Self {
        EntityLabel::from(label.to_string())
    }
}

impl From<EntityLabel> for String {
    fn from(label: EntityLabel) -> Self {
        label.as_str().to_string()
    }
}

/// A contiguous piece of the caption tagged by the NER model.
///
/// Offsets count characters (Unicode scalar values), not bytes, matching
/// what spaCy-style services report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub text: String,
    pub label: EntityLabel,
    #[serde(alias = "start")]
    pub start_char: usize,
    #[serde(alias = "end")]
    pub end_char: usize,
}

impl LabeledSpan {
    pub fn new(
        text: impl Into<String>,
        label: impl Into<EntityLabel>,
        start_char: usize,
        end_char: usize,
    ) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start_char,
            end_char,
        }
    }

    /// Number of whitespace-delimited words in the span text
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
