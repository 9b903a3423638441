//! Account moderation and the dashboard counters. Recipe, review and report
//! moderation live on their own services.

use std::sync::Arc;

use chrono::Utc;
use domains::ports::{PasswordHasher, RecipeRepository, ReportRepository, ReviewRepository, UserRepository};
use domains::{
    validate_password, DomainError, DomainResult, Page, RecipeStatus, ResolutionStatus, Role, User, UserQuery,
    UserSummary,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::users::delete_user_account;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub users: u64,
    pub recipes: u64,
    pub reports: u64,
    pub pending_recipes: u64,
    pub pending_reports: u64,
    pub pending_reviews: u64,
}

pub struct AdminService {
    users: Arc<dyn UserRepository>,
    recipes: Arc<dyn RecipeRepository>,
    reviews: Arc<dyn ReviewRepository>,
    reports: Arc<dyn ReportRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        recipes: Arc<dyn RecipeRepository>,
        reviews: Arc<dyn ReviewRepository>,
        reports: Arc<dyn ReportRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { users, recipes, reviews, reports, hasher }
    }

    pub async fn overview(&self) -> DomainResult<Overview> {
        Ok(Overview {
            users: self.users.count().await?,
            recipes: self.recipes.count(None).await?,
            reports: self.reports.count(None).await?,
            pending_recipes: self.recipes.count(Some(RecipeStatus::Pending)).await?,
            pending_reports: self.reports.count(Some(ResolutionStatus::Pending)).await?,
            pending_reviews: self.reviews.count(Some(ResolutionStatus::Pending)).await?,
        })
    }

    pub async fn list_users(&self, query: &UserQuery) -> DomainResult<Page<UserSummary>> {
        Ok(self.users.list(query).await?.map(|u| u.summary()))
    }

    /// Sets the flag when given, toggles otherwise.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn set_suspended(&self, id: Uuid, suspended: Option<bool>) -> DomainResult<UserSummary> {
        let mut user = self.moderatable(id).await?;
        let target = suspended.unwrap_or(!user.is_suspended);
        if user.is_suspended != target {
            user.is_suspended = target;
            user.updated_at = Utc::now();
            self.users.update(&user).await?;
        }
        info!(suspended = target, "suspension updated");
        Ok(user.summary())
    }

    /// Grants or withdraws admin rights. An admin cannot demote themselves,
    /// so at least one admin always remains.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, user_id = %id))]
    pub async fn set_role(&self, admin: &User, id: Uuid, role: Role) -> DomainResult<UserSummary> {
        if admin.id == id {
            return Err(DomainError::validation("cannot change your own role"));
        }
        let mut user = self.find(id).await?;
        if user.role == role {
            return Ok(user.summary());
        }
        if role == Role::Admin && user.is_suspended {
            return Err(DomainError::validation("cannot promote a suspended account"));
        }
        user.role = role;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        info!(%role, "role changed");
        Ok(user.summary())
    }

    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn reset_password(&self, id: Uuid, password: &str) -> DomainResult<UserSummary> {
        validate_password(password)?;
        let mut user = self.find(id).await?;
        user.password_hash = self.hasher.hash(password)?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        info!("password reset by admin");
        Ok(user.summary())
    }

    pub async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        self.moderatable(id).await?;
        delete_user_account(self.users.as_ref(), self.reviews.as_ref(), self.recipes.as_ref(), id).await
    }

    async fn find(&self, id: Uuid) -> DomainResult<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("user", id))
    }

    /// Admin accounts cannot be suspended or deleted.
    async fn moderatable(&self, id: Uuid) -> DomainResult<User> {
        let user = self.find(id).await?;
        if user.is_admin() {
            return Err(DomainError::validation("cannot modify an admin account"));
        }
        Ok(user)
    }
}
