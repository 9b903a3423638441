use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

pub const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    NewRecipe,
    Comment,
    Update,
    Admin,
    #[default]
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewRecipe => "newRecipe",
            NotificationKind::Comment => "comment",
            NotificationKind::Update => "update",
            NotificationKind::Admin => "admin",
            NotificationKind::General => "general",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "newRecipe" => Ok(NotificationKind::NewRecipe),
            "comment" => Ok(NotificationKind::Comment),
            "update" => Ok(NotificationKind::Update),
            "admin" => Ok(NotificationKind::Admin),
            "general" => Ok(NotificationKind::General),
            other => Err(DomainError::validation(format!("invalid notification type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: Option<String>,
    pub message: String,
    /// Deep link for the client, e.g. `/recipes/{id}#reviews`
    pub link: Option<String>,
    pub data: serde_json::Value,
    /// Null while unread
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Input for a notification, either from an admin or generated by a service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: Uuid,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self { user_id, kind, title: None, message: message.into(), link: None, data: None }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn build(self) -> DomainResult<Notification> {
        let message = self.message.trim().to_string();
        if message.is_empty() {
            return Err(DomainError::validation("notification message is required"));
        }
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(DomainError::validation(format!(
                "notification message must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }
        Ok(Notification {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            kind: self.kind,
            title: self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            message,
            link: self.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            data: self.data.unwrap_or_else(|| serde_json::json!({})),
            read_at: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_message_is_rejected() {
        let n = NewNotification::new(Uuid::now_v7(), NotificationKind::General, "   ");
        assert!(n.build().is_err());
    }

    #[test]
    fn kind_round_trips_through_its_wire_name() {
        for kind in [
            NotificationKind::NewRecipe,
            NotificationKind::Comment,
            NotificationKind::Update,
            NotificationKind::Admin,
            NotificationKind::General,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()).unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn built_notification_is_unread_with_empty_data() {
        let n = NewNotification::new(Uuid::now_v7(), NotificationKind::Update, " Approved ")
            .with_link("/recipes/1")
            .build()
            .unwrap();
        assert_eq!(n.message, "Approved");
        assert!(!n.is_read());
        assert_eq!(n.data, serde_json::json!({}));
        assert_eq!(serde_json::to_value(&n).unwrap()["type"], "update");
    }
}
