//! # Ports
//!
//! Storage, crypto and media contracts. Adapters implement these traits and
//! the binary wires the chosen implementations into the services.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::{
    Category, Chef, Comment, IssuedToken, NewNotification, Notification, Page, RatingSummary, Recipe,
    RecipeComment, RecipeQuery, RecipeStatus, Report, ResolutionStatus, Review, TokenClaims, User, UserQuery,
};

/// Account persistence.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert(&self, user: &User) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    /// Persists name, email, password hash, role and suspension.
    async fn update(&self, user: &User) -> DomainResult<()>;
    /// Removes the account with its reviews, bookmarks and notifications.
    /// Authored recipes and filed reports are kept with a null reference.
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
    async fn list(&self, query: &UserQuery) -> DomainResult<Page<User>>;
    async fn count(&self) -> DomainResult<u64>;
    /// Every admin account, suspended or not.
    async fn admin_ids(&self) -> DomainResult<Vec<Uuid>>;
    /// Adds or removes the recipe and returns the resulting bookmark list.
    async fn toggle_bookmark(&self, user_id: Uuid, recipe_id: Uuid) -> DomainResult<Vec<Uuid>>;
}

/// Recipe persistence. Loaded recipes carry their embedded comments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn insert(&self, recipe: &Recipe) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Recipe>>;
    /// Recipes for the given ids, in the order of `ids`; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Recipe>>;
    /// Persists content, image and status. Ratings and comments have their own writes.
    async fn update(&self, recipe: &Recipe) -> DomainResult<()>;
    /// Removes the recipe with its reviews, comments, reports and bookmarks.
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
    async fn search(&self, query: &RecipeQuery) -> DomainResult<Page<Recipe>>;
    async fn set_status(&self, id: Uuid, status: RecipeStatus) -> DomainResult<Option<Recipe>>;
    async fn set_rating(&self, id: Uuid, summary: RatingSummary) -> DomainResult<()>;
    async fn count(&self, status: Option<RecipeStatus>) -> DomainResult<u64>;
    /// Returns whether the recipe exists.
    async fn increment_views(&self, id: Uuid) -> DomainResult<bool>;
    /// Cuisines of approved recipes with their counts, largest first.
    async fn categories(&self) -> DomainResult<Vec<Category>>;
    /// Unsuspended authors by approved recipe count, then reviews received.
    async fn top_chefs(&self, limit: u32) -> DomainResult<Vec<Chef>>;
}

/// Comments embedded in recipes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()>;
    async fn find(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<Option<Comment>>;
    async fn update(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()>;
    async fn delete(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<bool>;
    /// Oldest first.
    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Comment>>;
    /// Newest first.
    async fn list_by_email(&self, email: &str) -> DomainResult<Vec<RecipeComment>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Fails with `Conflict` when the user already reviewed the recipe.
    async fn insert(&self, review: &Review) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Review>>;
    async fn find_for_user(&self, recipe_id: Uuid, user_id: Uuid) -> DomainResult<Option<Review>>;
    async fn update(&self, review: &Review) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
    /// Visible (non-dismissed) reviews of a recipe, newest first.
    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Review>>;
    /// Every review, newest first, optionally filtered by status.
    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Review>>;
    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Review>>;
    /// Average and count over non-dismissed reviews.
    async fn rating_summary(&self, recipe_id: Uuid) -> DomainResult<RatingSummary>;
    async fn recipes_reviewed_by(&self, user_id: Uuid) -> DomainResult<Vec<Uuid>>;
    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert(&self, report: &Report) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Report>>;
    /// Newest first.
    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Report>>;
    async fn list_by_reporter(&self, reporter_id: Uuid) -> DomainResult<Vec<Report>>;
    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Report>>;
    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Notification>>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> DomainResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: Uuid) -> DomainResult<u64>;
    /// Sets `read_at` unless already set and returns the stored row.
    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<Option<Notification>>;
    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> DomainResult<u64>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
    async fn delete_all(&self, user_id: Uuid) -> DomainResult<u64>;
}

/// Fire-and-forget delivery used by services that notify as a side effect.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification);
}

/// One-way password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    fn verify(&self, password: &str, hash: &str) -> DomainResult<bool>;
}

/// Access token issuing and verification.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> DomainResult<IssuedToken>;
    /// Fails with `Unauthorized` for bad signatures and expired tokens.
    fn verify(&self, token: &str) -> DomainResult<TokenClaims>;
    /// Short-lived token that only authorizes a password reset.
    fn issue_reset(&self, user: &User) -> DomainResult<IssuedToken>;
    /// Accepts only reset tokens; [`verify`](Self::verify) refuses them in turn.
    fn verify_reset(&self, token: &str) -> DomainResult<TokenClaims>;
}

/// Revoked token ids.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Remembers `jti` at least until `expires_at`.
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> DomainResult<()>;
    async fn is_revoked(&self, jti: &str) -> DomainResult<bool>;
}

/// A blob loaded back from media storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub data: Bytes,
    pub content_type: String,
}

/// An upload that passed inspection, possibly re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMedia {
    pub data: Bytes,
    /// Sniffed from the bytes, not taken from the client
    pub content_type: String,
}

/// Checks uploads before they reach storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait MediaProcessor: Send + Sync {
    /// Fails with `Validation` for non-images or unsupported formats and with
    /// `PayloadTooLarge` above the configured size.
    fn process(&self, data: Bytes, declared_type: Option<String>) -> DomainResult<ProcessedMedia>;
}

/// Uploaded image storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Saves the bytes and returns the key recorded on the recipe.
    /// Identical uploads map to the same key.
    async fn store(&self, data: Bytes, content_type: &str) -> DomainResult<String>;
    async fn load(&self, key: &str) -> DomainResult<Option<StoredMedia>>;
}
