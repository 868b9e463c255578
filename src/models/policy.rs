use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a local entry is matched to its remote record before update/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    /// Use the record id kept on the entry.
    #[default]
    Id,
    /// Query the store for records with the same name and take the first.
    Name,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id => write!(f, "id"),
            Lookup::Name => write!(f, "name"),
        }
    }
}

impl FromStr for Lookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Lookup::Id),
            "name" => Ok(Lookup::Name),
            _ => Err(format!("Invalid lookup '{}'. Valid options: id, name", s)),
        }
    }
}

/// What happens to quantities below zero on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityPolicy {
    /// Negative quantities are stored as given.
    #[default]
    Signed,
    /// Negative quantities are stored as zero.
    ClampAtZero,
}

impl QuantityPolicy {
    pub fn apply(self, quantity: i64) -> i64 {
        match self {
            QuantityPolicy::Signed => quantity,
            QuantityPolicy::ClampAtZero => quantity.max(0),
        }
    }
}

impl fmt::Display for QuantityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityPolicy::Signed => write!(f, "signed"),
            QuantityPolicy::ClampAtZero => write!(f, "clamp_at_zero"),
        }
    }
}

impl FromStr for QuantityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "signed" => Ok(QuantityPolicy::Signed),
            "clamp_at_zero" | "clamp" => Ok(QuantityPolicy::ClampAtZero),
            _ => Err(format!(
                "Invalid quantity policy '{}'. Valid options: signed, clamp_at_zero",
                s
            )),
        }
    }
}
