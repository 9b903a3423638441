use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::ResolutionStatus;
use crate::errors::{DomainError, DomainResult};

pub const MIN_REASON_LEN: usize = 3;
pub const MAX_REASON_LEN: usize = 1000;

/// A user-initiated flag on a recipe, resolved by an admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub recipe_id: Uuid,
    /// Null once the reporter deleted their account
    pub reporter_id: Option<Uuid>,
    pub reason: String,
    pub status: ResolutionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(recipe_id: Uuid, reporter_id: Uuid, reason: &str) -> DomainResult<Self> {
        let reason = reason.trim();
        let len = reason.chars().count();
        if len < MIN_REASON_LEN {
            return Err(DomainError::validation(format!(
                "reason must be at least {MIN_REASON_LEN} characters"
            )));
        }
        if len > MAX_REASON_LEN {
            return Err(DomainError::validation(format!(
                "reason must be at most {MAX_REASON_LEN} characters"
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            recipe_id,
            reporter_id: Some(reporter_id),
            reason: reason.to_string(),
            status: ResolutionStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}
