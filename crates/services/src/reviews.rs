use std::sync::Arc;

use chrono::Utc;
use domains::ports::{Notifier, RecipeRepository, ReviewRepository};
use domains::{
    normalize_text, DomainError, DomainResult, NewNotification, NotificationKind, Rating, Recipe, ResolutionStatus,
    Review, User,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Body of add and update. On update every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default, alias = "comment")]
    pub text: Option<String>,
}

/// Recomputes the cached rating of a recipe from its reviews.
///
/// Failures are logged and swallowed: the review write already happened and
/// the next refresh repairs the aggregate.
pub(crate) async fn refresh_rating(reviews: &dyn ReviewRepository, recipes: &dyn RecipeRepository, recipe_id: Uuid) {
    let result = async {
        let summary = reviews.rating_summary(recipe_id).await?;
        recipes.set_rating(recipe_id, summary).await
    }
    .await;
    if let Err(err) = result {
        warn!(%recipe_id, %err, "rating refresh failed");
    }
}

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    recipes: Arc<dyn RecipeRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        recipes: Arc<dyn RecipeRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { reviews, recipes, notifier }
    }

    #[instrument(skip_all, fields(%recipe_id, user_id = %user.id))]
    pub async fn add_review(&self, user: &User, recipe_id: Uuid, input: ReviewInput) -> DomainResult<Review> {
        let recipe = self.visible_recipe(recipe_id, user).await?;
        let rating = input
            .rating
            .ok_or_else(|| DomainError::validation("rating is required"))
            .and_then(Rating::new)?;

        if self.reviews.find_for_user(recipe_id, user.id).await?.is_some() {
            return Err(DomainError::Conflict("you have already reviewed this recipe".into()));
        }
        let review = Review::new(recipe_id, user.id, user.name.clone(), rating, input.text);
        self.reviews.insert(&review).await?;
        info!(review_id = %review.id, "review added");

        refresh_rating(self.reviews.as_ref(), self.recipes.as_ref(), recipe_id).await;

        if let Some(author_id) = recipe.author.user_id.filter(|a| *a != user.id) {
            let message = format!("{} rated \"{}\" {} stars", user.name, recipe.title, rating.stars());
            self.notifier
                .notify(
                    NewNotification::new(author_id, NotificationKind::Comment, message)
                        .with_title("New review")
                        .with_link(format!("/recipes/{recipe_id}#reviews"))
                        .with_data(serde_json::json!({ "recipeId": recipe_id, "reviewId": review.id })),
                )
                .await;
        }
        Ok(review)
    }

    pub async fn list_reviews(&self, recipe_id: Uuid, viewer: Option<&User>) -> DomainResult<Vec<Review>> {
        let recipe = self
            .recipes
            .find_by_id(recipe_id)
            .await?
            .filter(|r| r.is_visible_to(viewer))
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))?;
        self.reviews.list_for_recipe(recipe.id).await
    }

    #[instrument(skip_all, fields(review_id = %id, user_id = %user.id))]
    pub async fn update_review(&self, user: &User, id: Uuid, input: ReviewInput) -> DomainResult<Review> {
        let mut review = self.find(id).await?;
        if review.user_id != user.id {
            return Err(DomainError::Forbidden("only the author can edit this review".into()));
        }
        if let Some(rating) = input.rating {
            review.rating = Rating::new(rating)?;
        }
        if input.text.is_some() {
            review.text = normalize_text(input.text);
        }
        review.updated_at = Utc::now();
        self.reviews.update(&review).await?;

        refresh_rating(self.reviews.as_ref(), self.recipes.as_ref(), review.recipe_id).await;
        Ok(review)
    }

    #[instrument(skip_all, fields(review_id = %id, user_id = %user.id))]
    pub async fn delete_review(&self, user: &User, id: Uuid) -> DomainResult<()> {
        let review = self.find(id).await?;
        if review.user_id != user.id && !user.is_admin() {
            return Err(DomainError::Forbidden("not allowed to delete this review".into()));
        }
        self.reviews.delete(id).await?;
        info!("review deleted");

        refresh_rating(self.reviews.as_ref(), self.recipes.as_ref(), review.recipe_id).await;
        Ok(())
    }

    /// Every review for moderation, newest first.
    pub async fn list_all(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Review>> {
        self.reviews.list(status).await
    }

    /// Dismissing a review removes it from the recipe rating.
    #[instrument(skip_all, fields(review_id = %id, %status))]
    pub async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Review> {
        let review = self
            .reviews
            .set_status(id, status)
            .await?
            .ok_or_else(|| DomainError::not_found("review", id))?;
        info!("review status changed");

        refresh_rating(self.reviews.as_ref(), self.recipes.as_ref(), review.recipe_id).await;
        Ok(review)
    }

    async fn find(&self, id: Uuid) -> DomainResult<Review> {
        self.reviews.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("review", id))
    }

    async fn visible_recipe(&self, id: Uuid, user: &User) -> DomainResult<Recipe> {
        self.recipes
            .find_by_id(id)
            .await?
            .filter(|r| r.is_visible_to(Some(user)))
            .ok_or_else(|| DomainError::not_found("recipe", id))
    }
}
