use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageRequest;
use crate::errors::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("invalid role: {other}"))),
        }
    }
}

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_suspended: bool,
    /// Bookmarked recipe ids, oldest first
    pub bookmarks: Vec<Uuid>,
    /// Asked back during a self-service password reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_question: Option<String>,
    /// Hash of the normalized answer
    #[serde(skip_serializing)]
    pub security_answer_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a fresh account from already validated input.
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            password_hash,
            role,
            is_suspended: false,
            bookmarks: Vec::new(),
            security_question: None,
            security_answer_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_suspended: self.is_suspended,
        }
    }
}

/// The trimmed-down user shape returned next to tokens and in admin listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_suspended: bool,
}

/// Admin user search.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Case-insensitive substring of name or email
    pub q: Option<String>,
    pub role: Option<Role>,
    pub suspended: Option<bool>,
    pub page: PageRequest,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(q) = self.q.as_deref().map(str::to_lowercase) {
            if !user.name.to_lowercase().contains(&q) && !user.email.to_lowercase().contains(&q) {
                return false;
            }
        }
        if self.role.is_some_and(|r| r != user.role) {
            return false;
        }
        self.suspended.is_none_or(|s| s == user.is_suspended)
    }
}

pub fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    if name.chars().count() > 100 {
        return Err(DomainError::validation("name must be at most 100 characters"));
    }
    Ok(name.to_string())
}

/// Trims and lowercases an email, rejecting anything without a local part
/// and a dotted domain.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("a valid email is required"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims the question, requiring some text and at most 200 characters.
pub fn normalize_security_question(question: &str) -> DomainResult<String> {
    let question = question.trim();
    if question.is_empty() {
        return Err(DomainError::validation("security question is required"));
    }
    if question.chars().count() > 200 {
        return Err(DomainError::validation("security question must be at most 200 characters"));
    }
    Ok(question.to_string())
}

/// Answers compare case-insensitively with inner whitespace collapsed.
pub fn normalize_security_answer(answer: &str) -> DomainResult<String> {
    let answer = answer.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if answer.is_empty() {
        return Err(DomainError::validation("security answer is required"));
    }
    Ok(answer)
}
