//! Closed vocabularies shared by storage, domain and transport.
//!
//! Each value has exactly one wire spelling, used both in JSON bodies and in
//! the database columns.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that does not belong to one of the closed vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseVocabError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseVocabError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Cities where pickup points may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "Москва")]
    Moscow,
    #[serde(rename = "Санкт-Петербург")]
    SaintPetersburg,
    #[serde(rename = "Казань")]
    Kazan,
}

impl City {
    pub const ALL: [City; 3] = [City::Moscow, City::SaintPetersburg, City::Kazan];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Moscow => "Москва",
            City::SaintPetersburg => "Санкт-Петербург",
            City::Kazan => "Казань",
        }
    }
}

impl FromStr for City {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        City::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseVocabError::new("city", s))
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories a received product may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "электроника")]
    Electronics,
    #[serde(rename = "одежда")]
    Clothing,
    #[serde(rename = "обувь")]
    Footwear,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [
        ProductType::Electronics,
        ProductType::Clothing,
        ProductType::Footwear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Electronics => "электроника",
            ProductType::Clothing => "одежда",
            ProductType::Footwear => "обувь",
        }
    }
}

impl FromStr for ProductType {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseVocabError::new("product type", s))
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a reception.
///
/// State transitions:
/// ```text
/// (none) ──create──► InProgress ──close──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReceptionStatus {
    /// Products may be added and removed.
    #[default]
    #[serde(rename = "in_progress")]
    InProgress,

    /// The reception is finished (terminal state).
    #[serde(rename = "close")]
    Closed,
}

impl ReceptionStatus {
    /// Returns true if products can be added or removed in this state.
    pub fn accepts_products(&self) -> bool {
        matches!(self, ReceptionStatus::InProgress)
    }

    /// Returns true if the reception can be closed in this state.
    pub fn can_close(&self) -> bool {
        matches!(self, ReceptionStatus::InProgress)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReceptionStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceptionStatus::InProgress => "in_progress",
            ReceptionStatus::Closed => "close",
        }
    }
}

impl FromStr for ReceptionStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ReceptionStatus::InProgress),
            "close" => Ok(ReceptionStatus::Closed),
            other => Err(ParseVocabError::new("reception status", other)),
        }
    }
}

impl std::fmt::Display for ReceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Moderator => "moderator",
        }
    }
}

impl FromStr for Role {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "moderator" => Ok(Role::Moderator),
            other => Err(ParseVocabError::new("role", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_parses_only_known_spellings() {
        assert_eq!("Москва".parse::<City>().unwrap(), City::Moscow);
        assert_eq!(
            "Санкт-Петербург".parse::<City>().unwrap(),
            City::SaintPetersburg
        );
        assert_eq!("Казань".parse::<City>().unwrap(), City::Kazan);

        let err = "Новосибирск".parse::<City>().unwrap_err();
        assert_eq!(err.kind, "city");
        assert!("moscow".parse::<City>().is_err());
    }

    #[test]
    fn city_serde_matches_as_str() {
        for city in City::ALL {
            let json = serde_json::to_string(&city).unwrap();
            assert_eq!(json, format!("\"{}\"", city.as_str()));
        }
    }

    #[test]
    fn product_type_parses_only_known_spellings() {
        assert_eq!(
            "электроника".parse::<ProductType>().unwrap(),
            ProductType::Electronics
        );
        assert_eq!("одежда".parse::<ProductType>().unwrap(), ProductType::Clothing);
        assert_eq!("обувь".parse::<ProductType>().unwrap(), ProductType::Footwear);
        assert!("мебель".parse::<ProductType>().is_err());
        assert!("".parse::<ProductType>().is_err());
    }

    #[test]
    fn reception_status_transitions() {
        assert!(ReceptionStatus::InProgress.can_close());
        assert!(ReceptionStatus::InProgress.accepts_products());
        assert!(!ReceptionStatus::InProgress.is_terminal());

        assert!(!ReceptionStatus::Closed.can_close());
        assert!(!ReceptionStatus::Closed.accepts_products());
        assert!(ReceptionStatus::Closed.is_terminal());
    }

    #[test]
    fn reception_status_wire_format() {
        assert_eq!(ReceptionStatus::InProgress.to_string(), "in_progress");
        assert_eq!(ReceptionStatus::Closed.to_string(), "close");
        assert_eq!(
            serde_json::to_string(&ReceptionStatus::Closed).unwrap(),
            "\"close\""
        );
        assert_eq!(
            "close".parse::<ReceptionStatus>().unwrap(),
            ReceptionStatus::Closed
        );
    }

    #[test]
    fn role_roundtrip() {
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
    }
}
