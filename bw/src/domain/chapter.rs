//! Questionnaire chapters

use serde::{Deserialize, Serialize};

/// One thematic section of the questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chapter {
    Basics,
    Rooms,
    Wishes,
    Budget,
    Technical,
    Sustainability,
    Risks,
}

impl Chapter {
    /// All chapters in questionnaire order
    pub const ALL: [Chapter; 7] = [
        Chapter::Basics,
        Chapter::Rooms,
        Chapter::Wishes,
        Chapter::Budget,
        Chapter::Technical,
        Chapter::Sustainability,
        Chapter::Risks,
    ];

    /// Wire key used in answers and patches
    pub fn key(&self) -> &'static str {
        match self {
            Self::Basics => "basics",
            Self::Rooms => "rooms",
            Self::Wishes => "wishes",
            Self::Budget => "budget",
            Self::Technical => "technical",
            Self::Sustainability => "sustainability",
            Self::Risks => "risks",
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Basics => "Project basics",
            Self::Rooms => "Rooms",
            Self::Wishes => "Wishes",
            Self::Budget => "Budget",
            Self::Technical => "Technical choices",
            Self::Sustainability => "Sustainability",
            Self::Risks => "Risks",
        }
    }

    /// Position in questionnaire order
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

impl std::fmt::Display for Chapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for Chapter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basics" => Ok(Self::Basics),
            "rooms" => Ok(Self::Rooms),
            "wishes" => Ok(Self::Wishes),
            "budget" => Ok(Self::Budget),
            "technical" => Ok(Self::Technical),
            "sustainability" => Ok(Self::Sustainability),
            "risks" | "risk" => Ok(Self::Risks),
            _ => Err(format!("Unknown chapter: {}", s)),
        }
    }
}
