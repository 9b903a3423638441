use std::sync::Arc;

use bytes::Bytes;
use domains::ports::{MediaProcessor, MediaStorage, Notifier, RecipeRepository, StoredMedia, UserRepository};
use domains::{
    Category, Chef, DomainError, DomainResult, NewNotification, NotificationKind, Page, PageRequest, Recipe,
    RecipeDraft, RecipeImage, RecipePatch, RecipeQuery, RecipeSort, RecipeStatus, User,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Max results of the typeahead search.
pub const QUICK_SEARCH_LIMIT: u32 = 10;
/// Best rated recipes on the landing page.
pub const FEATURED_LIMIT: u32 = 6;
/// Most viewed recipes on the landing page.
pub const POPULAR_LIMIT: u32 = 8;
pub const CHEF_LIMIT: u32 = 10;

/// The picture supplied with a create or replace request.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Upload { data: Bytes, content_type: Option<String> },
    Url(String),
}

/// What `GET /recipes/{id}/image` serves.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageContent {
    Stored(StoredMedia),
    Remote(String),
}

pub struct RecipeService {
    recipes: Arc<dyn RecipeRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStorage>,
    processor: Arc<dyn MediaProcessor>,
    notifier: Arc<dyn Notifier>,
    auto_approve: bool,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStorage>,
        processor: Arc<dyn MediaProcessor>,
        notifier: Arc<dyn Notifier>,
        auto_approve: bool,
    ) -> Self {
        Self { recipes, users, media, processor, notifier, auto_approve }
    }

    #[instrument(skip_all, fields(author = %author.id))]
    pub async fn create(&self, author: &User, draft: RecipeDraft, image: Option<ImageInput>) -> DomainResult<Recipe> {
        let draft = draft.normalize()?;
        let image = image.ok_or_else(|| DomainError::validation("image is required"))?;
        let image = self.resolve_image(image).await?;

        let status = if author.is_admin() || self.auto_approve {
            RecipeStatus::Approved
        } else {
            RecipeStatus::Pending
        };
        let recipe = Recipe::new(draft, image, author, status);
        self.recipes.insert(&recipe).await?;
        info!(recipe_id = %recipe.id, %status, "recipe created");

        if status == RecipeStatus::Pending {
            self.notify_admins(&recipe).await;
        }
        Ok(recipe)
    }

    /// The public feed. Status is always forced to approved.
    pub async fn list(&self, mut query: RecipeQuery) -> DomainResult<Page<Recipe>> {
        query.status = Some(RecipeStatus::Approved);
        query.author_id = None;
        self.recipes.search(&query).await
    }

    pub async fn quick_search(&self, q: &str) -> DomainResult<Vec<Recipe>> {
        let q = q.trim();
        if q.chars().count() < 2 {
            return Ok(Vec::new());
        }
        let query = RecipeQuery {
            q: Some(q.to_string()),
            page: PageRequest::new(Some(1), Some(QUICK_SEARCH_LIMIT), QUICK_SEARCH_LIMIT),
            ..RecipeQuery::approved()
        };
        Ok(self.recipes.search(&query).await?.data)
    }

    pub async fn search_by_ingredient(&self, ingredient: &str, page: PageRequest) -> DomainResult<Page<Recipe>> {
        let ingredient = ingredient.trim();
        if ingredient.is_empty() {
            return Err(DomainError::validation("ingredient is required"));
        }
        self.list(RecipeQuery { ingredients: vec![ingredient.to_string()], page, ..Default::default() })
            .await
    }

    /// Hidden recipes read as missing to anyone but owner and admins.
    pub async fn get(&self, id: Uuid, viewer: Option<&User>) -> DomainResult<Recipe> {
        self.recipes
            .find_by_id(id)
            .await?
            .filter(|r| r.is_visible_to(viewer))
            .ok_or_else(|| DomainError::not_found("recipe", id))
    }

    /// Same as [`get`](Self::get) but counts the hit. Authors reading their
    /// own recipe are not counted.
    pub async fn view(&self, id: Uuid, viewer: Option<&User>) -> DomainResult<Recipe> {
        let mut recipe = self.get(id, viewer).await?;
        let own = matches!((viewer, recipe.author.user_id), (Some(v), Some(a)) if v.id == a);
        if !own {
            match self.recipes.increment_views(id).await {
                Ok(true) => recipe.views += 1,
                Ok(false) => {}
                Err(err) => warn!(recipe_id = %id, %err, "could not count view"),
            }
        }
        Ok(recipe)
    }

    pub async fn featured(&self) -> DomainResult<Vec<Recipe>> {
        Ok(self.recipes.search(&RecipeQuery::top(RecipeSort::Rating, FEATURED_LIMIT)).await?.data)
    }

    pub async fn popular(&self) -> DomainResult<Vec<Recipe>> {
        Ok(self.recipes.search(&RecipeQuery::top(RecipeSort::Views, POPULAR_LIMIT)).await?.data)
    }

    /// Cuisines of approved recipes, optionally narrowed by a name fragment.
    pub async fn categories(&self, q: Option<&str>) -> DomainResult<Vec<Category>> {
        let mut categories = self.recipes.categories().await?;
        if let Some(q) = q {
            categories.retain(|c| c.matches(q));
        }
        Ok(categories)
    }

    pub async fn popular_chefs(&self) -> DomainResult<Vec<Chef>> {
        self.recipes.top_chefs(CHEF_LIMIT).await
    }

    /// The caller's own recipes in every status.
    pub async fn mine(&self, user: &User, page: PageRequest) -> DomainResult<Page<Recipe>> {
        let query = RecipeQuery { author_id: Some(user.id), status: None, page, ..Default::default() };
        self.recipes.search(&query).await
    }

    /// Every recipe regardless of status, for moderation.
    pub async fn list_all(&self, status: Option<RecipeStatus>, page: PageRequest) -> DomainResult<Page<Recipe>> {
        self.recipes.search(&RecipeQuery { status, page, ..Default::default() }).await
    }

    #[instrument(skip_all, fields(recipe_id = %id, user_id = %user.id))]
    pub async fn update(&self, user: &User, id: Uuid, patch: RecipePatch) -> DomainResult<Recipe> {
        let mut recipe = self.owned(user, id).await?;
        if patch.is_empty() {
            return Ok(recipe);
        }
        patch.apply(&mut recipe)?;
        self.recipes.update(&recipe).await?;
        info!("recipe updated");
        Ok(recipe)
    }

    pub async fn replace_image(&self, user: &User, id: Uuid, image: ImageInput) -> DomainResult<Recipe> {
        let mut recipe = self.owned(user, id).await?;
        recipe.image = self.resolve_image(image).await?;
        recipe.updated_at = chrono::Utc::now();
        self.recipes.update(&recipe).await?;
        Ok(recipe)
    }

    pub async fn image(&self, id: Uuid, viewer: Option<&User>) -> DomainResult<ImageContent> {
        let recipe = self.get(id, viewer).await?;
        match recipe.image {
            RecipeImage::Remote { url } => Ok(ImageContent::Remote(url)),
            RecipeImage::Stored { key, .. } => self
                .media
                .load(&key)
                .await?
                .map(ImageContent::Stored)
                .ok_or_else(|| DomainError::not_found("image", key)),
        }
    }

    #[instrument(skip_all, fields(recipe_id = %id, user_id = %user.id))]
    pub async fn delete(&self, user: &User, id: Uuid) -> DomainResult<()> {
        self.owned(user, id).await?;
        self.recipes.delete(id).await?;
        info!("recipe deleted");
        Ok(())
    }

    /// Moderation. Notifies the author of the outcome.
    #[instrument(skip_all, fields(recipe_id = %id, %status))]
    pub async fn set_status(&self, admin: &User, id: Uuid, status: RecipeStatus) -> DomainResult<Recipe> {
        let recipe = self
            .recipes
            .set_status(id, status)
            .await?
            .ok_or_else(|| DomainError::not_found("recipe", id))?;
        info!(admin_id = %admin.id, "recipe status changed");

        if let Some(author_id) = recipe.author.user_id.filter(|a| *a != admin.id) {
            let message = format!("Your recipe \"{}\" is now {}", recipe.title, status);
            self.notifier
                .notify(
                    NewNotification::new(author_id, NotificationKind::Update, message)
                        .with_title("Recipe moderation")
                        .with_link(format!("/recipes/{}", recipe.id))
                        .with_data(serde_json::json!({ "recipeId": recipe.id, "status": status })),
                )
                .await;
        }
        Ok(recipe)
    }

    /// Loads a recipe the user may modify: 404 when missing, 403 when not theirs.
    async fn owned(&self, user: &User, id: Uuid) -> DomainResult<Recipe> {
        let recipe = self
            .recipes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("recipe", id))?;
        if !recipe.can_modify(user) {
            return Err(DomainError::Forbidden("not allowed to modify this recipe".into()));
        }
        Ok(recipe)
    }

    async fn resolve_image(&self, image: ImageInput) -> DomainResult<RecipeImage> {
        match image {
            ImageInput::Url(url) => RecipeImage::remote(&url),
            ImageInput::Upload { data, content_type } => {
                if data.is_empty() {
                    return Err(DomainError::validation("image is required"));
                }
                let processed = self.processor.process(data, content_type)?;
                let key = self.media.store(processed.data, &processed.content_type).await?;
                Ok(RecipeImage::Stored { key, content_type: processed.content_type })
            }
        }
    }

    async fn notify_admins(&self, recipe: &Recipe) {
        let admins = match self.users.admin_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%err, "could not load admins to notify");
                return;
            }
        };
        for admin_id in admins {
            let message = format!("\"{}\" by {} is awaiting review", recipe.title, recipe.author.username);
            self.notifier
                .notify(
                    NewNotification::new(admin_id, NotificationKind::NewRecipe, message)
                        .with_link(format!("/admin/recipes/{}", recipe.id))
                        .with_data(serde_json::json!({ "recipeId": recipe.id })),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ports::{
        MockMediaProcessor, MockMediaStorage, MockNotifier, MockRecipeRepository, MockUserRepository, ProcessedMedia,
    };
    use domains::{Ingredient, Role};

    struct Mocks {
        recipes: MockRecipeRepository,
        users: MockUserRepository,
        media: MockMediaStorage,
        processor: MockMediaProcessor,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                recipes: MockRecipeRepository::new(),
                users: MockUserRepository::new(),
                media: MockMediaStorage::new(),
                processor: MockMediaProcessor::new(),
                notifier: MockNotifier::new(),
            }
        }

        fn build(self, auto_approve: bool) -> RecipeService {
            RecipeService::new(
                Arc::new(self.recipes),
                Arc::new(self.users),
                Arc::new(self.media),
                Arc::new(self.processor),
                Arc::new(self.notifier),
                auto_approve,
            )
        }
    }

    fn user(role: Role) -> User {
        User::new("Ana".into(), "ana@example.com".into(), String::new(), role)
    }

    fn draft() -> RecipeDraft {
        RecipeDraft {
            title: "Pancakes".into(),
            ingredients: vec![Ingredient::named("Flour")],
            ..Default::default()
        }
    }

    fn stored_recipe(author: &User, status: RecipeStatus) -> Recipe {
        Recipe::new(
            draft().normalize().unwrap(),
            RecipeImage::Remote { url: "https://example.com/p.jpg".into() },
            author,
            status,
        )
    }

    #[tokio::test]
    async fn create_without_image_is_rejected() {
        let mut mocks = Mocks::new();
        mocks.recipes.expect_insert().never();
        let err = mocks.build(false).create(&user(Role::User), draft(), None).await.unwrap_err();
        assert_eq!(err, DomainError::validation("image is required"));
    }

    #[tokio::test]
    async fn upload_is_processed_then_stored() {
        let mut mocks = Mocks::new();
        mocks.processor.expect_process().times(1).returning(|data, _| {
            Ok(ProcessedMedia { data, content_type: "image/png".into() })
        });
        mocks
            .media
            .expect_store()
            .withf(|_, ct| ct.starts_with("image/png"))
            .returning(|_, _| Ok("abc123".into()));
        mocks.recipes.expect_insert().times(1).returning(|_| Ok(()));
        mocks.users.expect_admin_ids().returning(|| Ok(vec![]));

        let image = ImageInput::Upload { data: Bytes::from_static(b"png"), content_type: None };
        let recipe = mocks.build(false).create(&user(Role::User), draft(), Some(image)).await.unwrap();

        assert_eq!(recipe.status, RecipeStatus::Pending);
        assert_eq!(
            recipe.image,
            RecipeImage::Stored { key: "abc123".into(), content_type: "image/png".into() }
        );
    }

    #[tokio::test]
    async fn pending_recipe_notifies_every_admin() {
        // More admins than fit on one listing page.
        let admins: Vec<Uuid> = (0..150).map(|_| Uuid::new_v4()).collect();
        let mut mocks = Mocks::new();
        mocks.recipes.expect_insert().returning(|_| Ok(()));
        mocks.users.expect_list().never();
        let ids = admins.clone();
        mocks.users.expect_admin_ids().times(1).returning(move || Ok(ids.clone()));
        mocks
            .notifier
            .expect_notify()
            .withf(move |n| admins.contains(&n.user_id) && n.kind == NotificationKind::NewRecipe)
            .times(150)
            .returning(|_| ());

        let image = ImageInput::Url("https://example.com/p.jpg".into());
        mocks.build(false).create(&user(Role::User), draft(), Some(image)).await.unwrap();
    }

    #[tokio::test]
    async fn admin_and_auto_approve_skip_moderation() {
        let mut mocks = Mocks::new();
        mocks.recipes.expect_insert().returning(|_| Ok(()));
        let image = Some(ImageInput::Url("https://example.com/p.jpg".into()));
        let recipe = mocks.build(false).create(&user(Role::Admin), draft(), image.clone()).await.unwrap();
        assert_eq!(recipe.status, RecipeStatus::Approved);

        let mut mocks = Mocks::new();
        mocks.recipes.expect_insert().returning(|_| Ok(()));
        let recipe = mocks.build(true).create(&user(Role::User), draft(), image).await.unwrap();
        assert_eq!(recipe.status, RecipeStatus::Approved);
    }

    #[tokio::test]
    async fn list_forces_approved_status() {
        let mut mocks = Mocks::new();
        mocks
            .recipes
            .expect_search()
            .withf(|q| q.status == Some(RecipeStatus::Approved) && q.author_id.is_none())
            .returning(|q| Ok(Page::from_sorted(vec![], q.page)));
        let query = RecipeQuery { status: Some(RecipeStatus::Pending), ..Default::default() };
        mocks.build(false).list(query).await.unwrap();
    }

    #[tokio::test]
    async fn quick_search_ignores_single_characters() {
        let mut mocks = Mocks::new();
        mocks.recipes.expect_search().never();
        assert!(mocks.build(false).quick_search(" a ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_recipe_reads_as_missing_for_strangers() {
        let owner = user(Role::User);
        let recipe = stored_recipe(&owner, RecipeStatus::Pending);
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_find_by_id().returning(move |_| Ok(Some(recipe.clone())));
        let svc = mocks.build(false);

        let stranger = User::new("Bo".into(), "bo@example.com".into(), String::new(), Role::User);
        assert!(matches!(svc.get(id, Some(&stranger)).await, Err(DomainError::NotFound(..))));
        assert!(svc.get(id, Some(&owner)).await.is_ok());
    }

    #[tokio::test]
    async fn viewing_counts_strangers_but_not_the_author() {
        let owner = user(Role::User);
        let recipe = stored_recipe(&owner, RecipeStatus::Approved);
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_find_by_id().returning(move |_| Ok(Some(recipe.clone())));
        mocks.recipes.expect_increment_views().times(2).returning(|_| Ok(true));
        let svc = mocks.build(false);

        assert_eq!(svc.view(id, None).await.unwrap().views, 1);
        let stranger = User::new("Bo".into(), "bo@example.com".into(), String::new(), Role::User);
        assert_eq!(svc.view(id, Some(&stranger)).await.unwrap().views, 1);
        assert_eq!(svc.view(id, Some(&owner)).await.unwrap().views, 0);
    }

    #[tokio::test]
    async fn failed_view_count_still_serves_the_recipe() {
        let recipe = stored_recipe(&user(Role::User), RecipeStatus::Approved);
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_find_by_id().returning(move |_| Ok(Some(recipe.clone())));
        mocks
            .recipes
            .expect_increment_views()
            .returning(|_| Err(DomainError::Internal("db down".into())));

        let served = mocks.build(false).view(id, None).await.unwrap();
        assert_eq!(served.views, 0);
    }

    #[tokio::test]
    async fn landing_lists_use_their_presets() {
        let mut mocks = Mocks::new();
        mocks
            .recipes
            .expect_search()
            .withf(|q| {
                q.status == Some(RecipeStatus::Approved)
                    && q.sort == RecipeSort::Rating
                    && q.order == domains::SortOrder::Desc
                    && q.page.limit == FEATURED_LIMIT
            })
            .times(1)
            .returning(|q| Ok(Page::from_sorted(vec![], q.page)));
        mocks
            .recipes
            .expect_search()
            .withf(|q| q.sort == RecipeSort::Views && q.page.limit == POPULAR_LIMIT)
            .times(1)
            .returning(|q| Ok(Page::from_sorted(vec![], q.page)));
        let svc = mocks.build(false);
        svc.featured().await.unwrap();
        svc.popular().await.unwrap();
    }

    #[tokio::test]
    async fn category_search_narrows_by_name() {
        let mut mocks = Mocks::new();
        mocks.recipes.expect_categories().returning(|| {
            Ok(vec![
                Category { name: "Italian".into(), recipe_count: 3 },
                Category { name: "Thai".into(), recipe_count: 1 },
            ])
        });
        let svc = mocks.build(false);
        assert_eq!(svc.categories(None).await.unwrap().len(), 2);
        let found = svc.categories(Some("ITAL")).await.unwrap();
        assert_eq!(found, vec![Category { name: "Italian".into(), recipe_count: 3 }]);
    }

    #[tokio::test]
    async fn popular_chefs_asks_for_the_top_ten() {
        let mut mocks = Mocks::new();
        mocks.recipes.expect_top_chefs().withf(|limit| *limit == CHEF_LIMIT).returning(|_| Ok(vec![]));
        assert!(mocks.build(false).popular_chefs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_someone_elses_recipe_is_forbidden() {
        let owner = user(Role::User);
        let recipe = stored_recipe(&owner, RecipeStatus::Approved);
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_find_by_id().returning(move |_| Ok(Some(recipe.clone())));
        mocks.recipes.expect_delete().never();

        let stranger = User::new("Bo".into(), "bo@example.com".into(), String::new(), Role::User);
        let err = mocks.build(false).delete(&stranger, id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_may_delete_any_recipe() {
        let owner = user(Role::User);
        let recipe = stored_recipe(&owner, RecipeStatus::Approved);
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_find_by_id().returning(move |_| Ok(Some(recipe.clone())));
        mocks.recipes.expect_delete().times(1).returning(|_| Ok(true));

        mocks.build(false).delete(&user(Role::Admin), id).await.unwrap();
    }

    #[tokio::test]
    async fn status_change_notifies_author() {
        let owner = user(Role::User);
        let mut recipe = stored_recipe(&owner, RecipeStatus::Pending);
        recipe.status = RecipeStatus::Approved;
        let id = recipe.id;
        let mut mocks = Mocks::new();
        mocks.recipes.expect_set_status().returning(move |_, _| Ok(Some(recipe.clone())));
        let owner_id = owner.id;
        mocks
            .notifier
            .expect_notify()
            .withf(move |n| n.user_id == owner_id && n.kind == NotificationKind::Update)
            .times(1)
            .returning(|_| ());

        let updated = mocks
            .build(false)
            .set_status(&user(Role::Admin), id, RecipeStatus::Approved)
            .await
            .unwrap();
        assert_eq!(updated.status, RecipeStatus::Approved);
    }
}
