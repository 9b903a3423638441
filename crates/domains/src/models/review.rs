use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

/// A star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: i64) -> DomainResult<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&stars) {
            Ok(Self(stars as u8))
        } else {
            Err(DomainError::validation("rating must be between 1 and 5"))
        }
    }

    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

/// Moderation state shared by reviews and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    #[default]
    Pending,
    Approved,
    Dismissed,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Pending => "pending",
            ResolutionStatus::Approved => "approved",
            ResolutionStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ResolutionStatus::Pending),
            "approved" => Ok(ResolutionStatus::Approved),
            "dismissed" => Ok(ResolutionStatus::Dismissed),
            _ => Err(DomainError::validation("invalid status value")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub rating: Rating,
    pub text: Option<String>,
    /// Dismissed reviews are hidden and excluded from the recipe rating
    pub status: ResolutionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(recipe_id: Uuid, user_id: Uuid, author_name: String, rating: Rating, text: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            recipe_id,
            user_id,
            author_name,
            rating,
            text: normalize_text(text),
            status: ResolutionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn counts_toward_rating(&self) -> bool {
        self.status != ResolutionStatus::Dismissed
    }
}

/// Trims review text and drops it when blank.
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Aggregate rating of a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    /// Rounded to two decimals
    pub average: f64,
    pub count: u32,
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u32), |(sum, n), r| (sum + u64::from(r.stars()), n + 1));
        if count == 0 {
            return Self::default();
        }
        Self { average: round2(sum as f64 / f64::from(count)), count }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
