use std::sync::Arc;

use chrono::Utc;
use domains::ports::{PasswordHasher, RecipeRepository, ReviewRepository, UserRepository};
use domains::{
    normalize_email, normalize_name, normalize_security_answer, normalize_security_question, validate_password,
    DomainError, DomainResult, Recipe, User,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::reviews::refresh_rating;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(default, alias = "current_password")]
    pub current_password: String,
    #[serde(default)]
    pub password: String,
}

/// Sets the question used to recover a forgotten password.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityQuestionUpdate {
    #[serde(default, alias = "current_password")]
    pub current_password: String,
    #[serde(default, alias = "security_question")]
    pub security_question: String,
    #[serde(default, alias = "security_answer")]
    pub security_answer: String,
}

/// Deletes an account and refreshes the ratings its reviews contributed to.
pub(crate) async fn delete_user_account(
    users: &dyn UserRepository,
    reviews: &dyn ReviewRepository,
    recipes: &dyn RecipeRepository,
    user_id: Uuid,
) -> DomainResult<()> {
    let reviewed = reviews.recipes_reviewed_by(user_id).await?;
    if !users.delete(user_id).await? {
        return Err(DomainError::not_found("user", user_id));
    }
    for recipe_id in reviewed {
        refresh_rating(reviews, recipes, recipe_id).await;
    }
    info!(%user_id, "account deleted");
    Ok(())
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    recipes: Arc<dyn RecipeRepository>,
    reviews: Arc<dyn ReviewRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        recipes: Arc<dyn RecipeRepository>,
        reviews: Arc<dyn ReviewRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { users, recipes, reviews, hasher }
    }

    pub async fn profile(&self, user: &User) -> DomainResult<User> {
        self.users.find_by_id(user.id).await?.ok_or_else(|| DomainError::not_found("user", user.id))
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn update_profile(&self, user: &User, update: ProfileUpdate) -> DomainResult<User> {
        let mut current = self.profile(user).await?;
        if let Some(name) = update.name {
            current.name = normalize_name(&name)?;
        }
        if let Some(email) = update.email {
            let email = normalize_email(&email)?;
            if email != current.email {
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(DomainError::Conflict("email already in use".into()));
                }
                current.email = email;
            }
        }
        current.updated_at = Utc::now();
        self.users.update(&current).await?;
        info!("profile updated");
        Ok(current)
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn change_password(&self, user: &User, change: PasswordChange) -> DomainResult<()> {
        if change.current_password.is_empty() || change.password.is_empty() {
            return Err(DomainError::validation("current and new password required"));
        }
        let mut current = self.profile(user).await?;
        if !self.hasher.verify(&change.current_password, &current.password_hash)? {
            return Err(DomainError::validation("current password is incorrect"));
        }
        validate_password(&change.password)?;
        current.password_hash = self.hasher.hash(&change.password)?;
        current.updated_at = Utc::now();
        self.users.update(&current).await?;
        info!("password changed");
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn set_security_question(&self, user: &User, update: SecurityQuestionUpdate) -> DomainResult<User> {
        let question = normalize_security_question(&update.security_question)?;
        let answer = normalize_security_answer(&update.security_answer)?;
        let mut current = self.profile(user).await?;
        if !self.hasher.verify(&update.current_password, &current.password_hash)? {
            return Err(DomainError::validation("current password is incorrect"));
        }
        current.security_question = Some(question);
        current.security_answer_hash = Some(self.hasher.hash(&answer)?);
        current.updated_at = Utc::now();
        self.users.update(&current).await?;
        info!("security question set");
        Ok(current)
    }

    pub async fn delete_account(&self, user: &User) -> DomainResult<()> {
        delete_user_account(self.users.as_ref(), self.reviews.as_ref(), self.recipes.as_ref(), user.id).await
    }

    /// Adds or removes the bookmark and returns the resulting list.
    /// Removal never looks at the recipe, so bookmarks of recipes that were
    /// since hidden can still be dropped.
    pub async fn toggle_bookmark(&self, user: &User, recipe_id: Uuid) -> DomainResult<Vec<Uuid>> {
        if user.bookmarks.contains(&recipe_id) {
            return self.users.toggle_bookmark(user.id, recipe_id).await;
        }
        self.recipes
            .find_by_id(recipe_id)
            .await?
            .filter(|r| r.is_visible_to(Some(user)))
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))?;
        self.users.toggle_bookmark(user.id, recipe_id).await
    }

    /// Bookmarked recipes the caller can still see, in bookmark order.
    pub async fn bookmarks(&self, user: &User) -> DomainResult<Vec<Recipe>> {
        let current = self.profile(user).await?;
        let recipes = self.recipes.find_many(&current.bookmarks).await?;
        Ok(recipes.into_iter().filter(|r| r.is_visible_to(Some(&current))).collect())
    }
}
