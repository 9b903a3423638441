//! # In-memory repositories
//!
//! One [`InMemoryRepository`] implements every repository port over `DashMap`
//! shards. Secondary indexes (email, one review per user per recipe) are
//! reserved through the entry API so concurrent inserts cannot both win.
//!
//! No guard on one map is held while another map is touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::ports::{
    CommentRepository, NotificationRepository, RecipeRepository, ReportRepository, ReviewRepository, UserRepository,
};
use domains::{
    tally_categories, Category, Chef, Comment, DomainError, DomainResult, Notification, Page, RatingSummary, Recipe,
    RecipeComment, RecipeQuery, RecipeStatus, Report, ResolutionStatus, Review, Role, User, UserQuery,
};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryRepository {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    recipes: DashMap<Uuid, Recipe>,
    reviews: DashMap<Uuid, Review>,
    review_keys: DashMap<(Uuid, Uuid), Uuid>,
    reports: DashMap<Uuid, Report>,
    notifications: DashMap<Uuid, Notification>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reserve_email(&self, email: &str, user_id: Uuid) -> DomainResult<()> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(e) if *e.get() != user_id => Err(DomainError::Conflict("user already exists".into())),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(user_id);
                Ok(())
            }
        }
    }

    fn remove_reviews_where(&self, pred: impl Fn(&Review) -> bool) {
        let doomed: Vec<Review> = self.reviews.iter().filter(|r| pred(r.value())).map(|r| r.clone()).collect();
        for review in doomed {
            self.reviews.remove(&review.id);
            self.review_keys.remove(&(review.recipe_id, review.user_id));
        }
    }
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        self.reserve_email(&user.email, user.id)?;
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let id = self.emails.get(email).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        let previous = self
            .users
            .get(&user.id)
            .map(|u| u.email.clone())
            .ok_or_else(|| DomainError::not_found("user", user.id))?;
        if previous != user.email {
            self.reserve_email(&user.email, user.id)?;
            self.emails.remove(&previous);
        }
        if let Some(mut stored) = self.users.get_mut(&user.id) {
            let bookmarks = std::mem::take(&mut stored.bookmarks);
            *stored = User { bookmarks, ..user.clone() };
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let Some((_, user)) = self.users.remove(&id) else {
            return Ok(false);
        };
        self.emails.remove(&user.email);
        self.remove_reviews_where(|r| r.user_id == id);
        self.notifications.retain(|_, n| n.user_id != id);
        for mut report in self.reports.iter_mut() {
            if report.reporter_id == Some(id) {
                report.reporter_id = None;
            }
        }
        for mut recipe in self.recipes.iter_mut() {
            if recipe.author.user_id == Some(id) {
                recipe.author.user_id = None;
            }
            for comment in recipe.comments.iter_mut() {
                if comment.author_id == Some(id) {
                    comment.author_id = None;
                }
            }
        }
        Ok(true)
    }

    async fn list(&self, query: &UserQuery) -> DomainResult<Page<User>> {
        let users: Vec<User> = self.users.iter().filter(|u| query.matches(u)).map(|u| u.clone()).collect();
        Ok(Page::from_sorted(newest_first(users, |u| u.created_at), query.page))
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn admin_ids(&self) -> DomainResult<Vec<Uuid>> {
        Ok(self.users.iter().filter(|u| u.role == Role::Admin).map(|u| u.id).collect())
    }

    async fn toggle_bookmark(&self, user_id: Uuid, recipe_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let mut user = self.users.get_mut(&user_id).ok_or_else(|| DomainError::not_found("user", user_id))?;
        match user.bookmarks.iter().position(|b| *b == recipe_id) {
            Some(idx) => {
                user.bookmarks.remove(idx);
            }
            None => user.bookmarks.push(recipe_id),
        }
        Ok(user.bookmarks.clone())
    }
}

#[async_trait]
impl RecipeRepository for InMemoryRepository {
    async fn insert(&self, recipe: &Recipe) -> DomainResult<()> {
        match self.recipes.entry(recipe.id) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!("recipe {} already exists", recipe.id))),
            Entry::Vacant(e) => {
                e.insert(recipe.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Recipe>> {
        Ok(self.recipes.get(&id).map(|r| r.clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Recipe>> {
        Ok(ids.iter().filter_map(|id| self.recipes.get(id).map(|r| r.clone())).collect())
    }

    async fn update(&self, recipe: &Recipe) -> DomainResult<()> {
        let mut stored = self
            .recipes
            .get_mut(&recipe.id)
            .ok_or_else(|| DomainError::not_found("recipe", recipe.id))?;
        stored.title = recipe.title.clone();
        stored.description = recipe.description.clone();
        stored.ingredients = recipe.ingredients.clone();
        stored.instructions = recipe.instructions.clone();
        stored.metadata = recipe.metadata.clone();
        stored.image = recipe.image.clone();
        stored.status = recipe.status;
        stored.updated_at = recipe.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        if self.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        self.remove_reviews_where(|r| r.recipe_id == id);
        self.reports.retain(|_, r| r.recipe_id != id);
        for mut user in self.users.iter_mut() {
            user.bookmarks.retain(|b| *b != id);
        }
        Ok(true)
    }

    async fn search(&self, query: &RecipeQuery) -> DomainResult<Page<Recipe>> {
        let mut hits: Vec<Recipe> = self.recipes.iter().filter(|r| query.matches(r)).map(|r| r.clone()).collect();
        hits.sort_by(|a, b| query.compare(a, b));
        Ok(Page::from_sorted(hits, query.page))
    }

    async fn set_status(&self, id: Uuid, status: RecipeStatus) -> DomainResult<Option<Recipe>> {
        Ok(self.recipes.get_mut(&id).map(|mut r| {
            r.status = status;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn set_rating(&self, id: Uuid, summary: RatingSummary) -> DomainResult<()> {
        if let Some(mut recipe) = self.recipes.get_mut(&id) {
            recipe.apply_rating(summary);
        }
        Ok(())
    }

    async fn count(&self, status: Option<RecipeStatus>) -> DomainResult<u64> {
        Ok(self.recipes.iter().filter(|r| status.is_none_or(|s| r.status == s)).count() as u64)
    }

    async fn increment_views(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.recipes.get_mut(&id).map(|mut r| r.views += 1).is_some())
    }

    async fn categories(&self) -> DomainResult<Vec<Category>> {
        let cuisines: Vec<String> = self
            .recipes
            .iter()
            .filter(|r| r.status == RecipeStatus::Approved)
            .filter_map(|r| r.metadata.cuisine_type.clone())
            .collect();
        Ok(tally_categories(cuisines.iter().map(String::as_str)))
    }

    async fn top_chefs(&self, limit: u32) -> DomainResult<Vec<Chef>> {
        let mut totals: Vec<(Uuid, u64, u64)> = Vec::new();
        for recipe in self.recipes.iter().filter(|r| r.status == RecipeStatus::Approved) {
            let Some(author_id) = recipe.author.user_id else { continue };
            match totals.iter_mut().find(|(id, ..)| *id == author_id) {
                Some((_, recipes, ratings)) => {
                    *recipes += 1;
                    *ratings += u64::from(recipe.rating_count);
                }
                None => totals.push((author_id, 1, u64::from(recipe.rating_count))),
            }
        }
        let mut chefs: Vec<Chef> = totals
            .into_iter()
            .filter_map(|(user_id, recipe_count, rating_count)| {
                let user = self.users.get(&user_id)?;
                (!user.is_suspended).then(|| Chef { user_id, name: user.name.clone(), recipe_count, rating_count })
            })
            .collect();
        chefs.sort_by(|a, b| {
            b.recipe_count
                .cmp(&a.recipe_count)
                .then(b.rating_count.cmp(&a.rating_count))
                .then_with(|| a.name.cmp(&b.name))
        });
        chefs.truncate(limit as usize);
        Ok(chefs)
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn insert(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()> {
        let mut recipe = self
            .recipes
            .get_mut(&recipe_id)
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))?;
        recipe.comments.push(comment.clone());
        Ok(())
    }

    async fn find(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<Option<Comment>> {
        Ok(self
            .recipes
            .get(&recipe_id)
            .and_then(|r| r.comments.iter().find(|c| c.id == comment_id).cloned()))
    }

    async fn update(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()> {
        let mut recipe = self
            .recipes
            .get_mut(&recipe_id)
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))?;
        let slot = recipe
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or_else(|| DomainError::not_found("comment", comment.id))?;
        *slot = comment.clone();
        Ok(())
    }

    async fn delete(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<bool> {
        let Some(mut recipe) = self.recipes.get_mut(&recipe_id) else {
            return Ok(false);
        };
        let before = recipe.comments.len();
        recipe.comments.retain(|c| c.id != comment_id);
        Ok(recipe.comments.len() != before)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Comment>> {
        let mut comments = self.recipes.get(&recipe_id).map(|r| r.comments.clone()).unwrap_or_default();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn list_by_email(&self, email: &str) -> DomainResult<Vec<RecipeComment>> {
        let found: Vec<RecipeComment> = self
            .recipes
            .iter()
            .flat_map(|r| {
                let recipe_id = r.id;
                r.comments
                    .iter()
                    .filter(|c| c.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
                    .map(|c| RecipeComment { recipe_id, comment: c.clone() })
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(newest_first(found, |c| c.comment.created_at))
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn insert(&self, review: &Review) -> DomainResult<()> {
        match self.review_keys.entry((review.recipe_id, review.user_id)) {
            Entry::Occupied(_) => return Err(DomainError::Conflict("you have already reviewed this recipe".into())),
            Entry::Vacant(e) => {
                e.insert(review.id);
            }
        }
        self.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Review>> {
        Ok(self.reviews.get(&id).map(|r| r.clone()))
    }

    async fn find_for_user(&self, recipe_id: Uuid, user_id: Uuid) -> DomainResult<Option<Review>> {
        let id = self.review_keys.get(&(recipe_id, user_id)).map(|id| *id);
        Ok(id.and_then(|id| self.reviews.get(&id).map(|r| r.clone())))
    }

    async fn update(&self, review: &Review) -> DomainResult<()> {
        let mut stored = self
            .reviews
            .get_mut(&review.id)
            .ok_or_else(|| DomainError::not_found("review", review.id))?;
        stored.rating = review.rating;
        stored.text = review.text.clone();
        stored.updated_at = review.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let Some((_, review)) = self.reviews.remove(&id) else {
            return Ok(false);
        };
        self.review_keys.remove(&(review.recipe_id, review.user_id));
        Ok(true)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Review>> {
        let reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.recipe_id == recipe_id && r.counts_toward_rating())
            .map(|r| r.clone())
            .collect();
        Ok(newest_first(reviews, |r| r.created_at))
    }

    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Review>> {
        let reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.clone())
            .collect();
        Ok(newest_first(reviews, |r| r.created_at))
    }

    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Review>> {
        Ok(self.reviews.get_mut(&id).map(|mut r| {
            r.status = status;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn rating_summary(&self, recipe_id: Uuid) -> DomainResult<RatingSummary> {
        let ratings: Vec<_> = self
            .reviews
            .iter()
            .filter(|r| r.recipe_id == recipe_id && r.counts_toward_rating())
            .map(|r| r.rating)
            .collect();
        Ok(RatingSummary::from_ratings(ratings))
    }

    async fn recipes_reviewed_by(&self, user_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.reviews.iter().filter(|r| r.user_id == user_id).map(|r| r.recipe_id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64> {
        Ok(self.reviews.iter().filter(|r| status.is_none_or(|s| r.status == s)).count() as u64)
    }
}

#[async_trait]
impl ReportRepository for InMemoryRepository {
    async fn insert(&self, report: &Report) -> DomainResult<()> {
        self.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Report>> {
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Report>> {
        let reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.clone())
            .collect();
        Ok(newest_first(reports, |r| r.created_at))
    }

    async fn list_by_reporter(&self, reporter_id: Uuid) -> DomainResult<Vec<Report>> {
        let reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| r.reporter_id == Some(reporter_id))
            .map(|r| r.clone())
            .collect();
        Ok(newest_first(reports, |r| r.created_at))
    }

    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Report>> {
        Ok(self.reports.get_mut(&id).map(|mut r| {
            r.status = status;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64> {
        Ok(self.reports.iter().filter(|r| status.is_none_or(|s| r.status == s)).count() as u64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryRepository {
    async fn insert(&self, notification: &Notification) -> DomainResult<()> {
        self.notifications.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.clone()))
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> DomainResult<Vec<Notification>> {
        let items: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !(unread_only && n.is_read()))
            .map(|n| n.clone())
            .collect();
        Ok(newest_first(items, |n| n.created_at))
    }

    async fn unread_count(&self, user_id: Uuid) -> DomainResult<u64> {
        Ok(self.notifications.iter().filter(|n| n.user_id == user_id && !n.is_read()).count() as u64)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<Option<Notification>> {
        Ok(self.notifications.get_mut(&id).map(|mut n| {
            n.read_at.get_or_insert(at);
            n.clone()
        }))
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> DomainResult<u64> {
        let mut changed = 0;
        for mut n in self.notifications.iter_mut() {
            if n.user_id == user_id && n.read_at.is_none() {
                n.read_at = Some(at);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.notifications.remove(&id).is_some())
    }

    async fn delete_all(&self, user_id: Uuid) -> DomainResult<u64> {
        let before = self.notifications.len();
        self.notifications.retain(|_, n| n.user_id != user_id);
        Ok((before - self.notifications.len()) as u64)
    }
}
