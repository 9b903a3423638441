use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domains::ports::{NotificationRepository, Notifier, UserRepository};
use domains::{DomainError, DomainResult, NewNotification, Notification, User};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { notifications, users }
    }

    /// Admin-authored notification for one user.
    pub async fn create(&self, input: NewNotification) -> DomainResult<Notification> {
        if self.users.find_by_id(input.user_id).await?.is_none() {
            return Err(DomainError::not_found("user", input.user_id));
        }
        let notification = input.build()?;
        self.notifications.insert(&notification).await?;
        Ok(notification)
    }

    pub async fn list(&self, user: &User, unread_only: bool) -> DomainResult<Vec<Notification>> {
        self.notifications.list_for_user(user.id, unread_only).await
    }

    pub async fn unread_count(&self, user: &User) -> DomainResult<u64> {
        self.notifications.unread_count(user.id).await
    }

    /// Keeps the first `read_at` when called twice.
    pub async fn mark_read(&self, user: &User, id: Uuid) -> DomainResult<Notification> {
        let notification = self.owned(user, id).await?;
        if notification.is_read() {
            return Ok(notification);
        }
        self.notifications
            .mark_read(id, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found("notification", id))
    }

    pub async fn mark_all_read(&self, user: &User) -> DomainResult<u64> {
        self.notifications.mark_all_read(user.id, Utc::now()).await
    }

    pub async fn delete(&self, user: &User, id: Uuid) -> DomainResult<()> {
        self.owned(user, id).await?;
        self.notifications.delete(id).await?;
        Ok(())
    }

    pub async fn clear_all(&self, user: &User) -> DomainResult<u64> {
        self.notifications.delete_all(user.id).await
    }

    async fn owned(&self, user: &User, id: Uuid) -> DomainResult<Notification> {
        let notification = self
            .notifications
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("notification", id))?;
        if notification.user_id != user.id {
            return Err(DomainError::Forbidden("not your notification".into()));
        }
        Ok(notification)
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        let result = match notification.build() {
            Ok(n) => self.notifications.insert(&n).await.map(|_| n.id),
            Err(err) => Err(err),
        };
        match result {
            Ok(id) => debug!(%user_id, notification_id = %id, "notification stored"),
            Err(err) => warn!(%user_id, %err, "notification dropped"),
        }
    }
}
