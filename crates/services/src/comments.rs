use std::sync::Arc;

use domains::ports::{CommentRepository, RecipeRepository};
use domains::{normalize_email, Comment, DomainError, DomainResult, Rating, RecipeComment, User};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct CommentService {
    recipes: Arc<dyn RecipeRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(recipes: Arc<dyn RecipeRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { recipes, comments }
    }

    #[instrument(skip_all, fields(%recipe_id, user_id = %user.id))]
    pub async fn add(&self, user: &User, recipe_id: Uuid, input: CommentInput) -> DomainResult<Comment> {
        self.visible_recipe(recipe_id, Some(user)).await?;
        let text = comment_text(input.text.as_deref())?;
        let rating = input.rating.map(Rating::new).transpose()?.unwrap_or_default();
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.name.clone());
        let email = match input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => normalize_email(email)?,
            None => user.email.clone(),
        };

        let comment = Comment {
            id: Uuid::now_v7(),
            author_id: Some(user.id),
            name,
            email: Some(email),
            text,
            rating,
            created_at: chrono::Utc::now(),
        };
        self.comments.insert(recipe_id, &comment).await?;
        info!(comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    pub async fn list(&self, recipe_id: Uuid, viewer: Option<&User>) -> DomainResult<Vec<Comment>> {
        self.visible_recipe(recipe_id, viewer).await?;
        self.comments.list_for_recipe(recipe_id).await
    }

    /// Updates text and rating. Name and email stay as posted.
    pub async fn update(
        &self,
        user: &User,
        recipe_id: Uuid,
        comment_id: Uuid,
        input: CommentInput,
    ) -> DomainResult<Comment> {
        let mut comment = self.owned(user, recipe_id, comment_id).await?;
        if input.text.is_some() {
            comment.text = comment_text(input.text.as_deref())?;
        }
        if let Some(rating) = input.rating {
            comment.rating = Rating::new(rating)?;
        }
        self.comments.update(recipe_id, &comment).await?;
        Ok(comment)
    }

    #[instrument(skip_all, fields(%recipe_id, %comment_id, user_id = %user.id))]
    pub async fn delete(&self, user: &User, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<()> {
        self.owned(user, recipe_id, comment_id).await?;
        self.comments.delete(recipe_id, comment_id).await?;
        info!("comment deleted");
        Ok(())
    }

    pub async fn by_email(&self, email: &str) -> DomainResult<Vec<RecipeComment>> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        self.comments.list_by_email(&email).await
    }

    async fn owned(&self, user: &User, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<Comment> {
        let comment = self
            .comments
            .find(recipe_id, comment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
        if comment.author_id != Some(user.id) && !user.is_admin() {
            return Err(DomainError::Forbidden("not allowed to modify this comment".into()));
        }
        Ok(comment)
    }

    async fn visible_recipe(&self, recipe_id: Uuid, viewer: Option<&User>) -> DomainResult<()> {
        self.recipes
            .find_by_id(recipe_id)
            .await?
            .filter(|r| r.is_visible_to(viewer))
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))
    }
}

fn comment_text(text: Option<&str>) -> DomainResult<String> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(DomainError::validation("comment text is required"));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(DomainError::validation(format!("comment must be at most {MAX_COMMENT_LEN} characters")));
    }
    Ok(text.to_string())
}
