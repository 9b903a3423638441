//! # PostgreSQL repositories
//!
//! Relational mapping of the domain models. Recipe content (ingredients,
//! instructions, metadata, image) is stored as JSONB; comments, reviews,
//! reports, bookmarks and notifications get their own tables with foreign
//! keys doing the cascades described on the ports.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::{
    CommentRepository, NotificationRepository, RecipeRepository, ReportRepository, ReviewRepository, UserRepository,
};
use domains::{
    round2, tally_categories, Category, Chef, Comment, DomainError, DomainResult, Ingredient, Instruction,
    Notification, NotificationKind, Page, Rating, RatingSummary, Recipe, RecipeAuthor, RecipeComment, RecipeImage,
    RecipeMetadata, RecipeQuery, RecipeSort, RecipeStatus, Report, ResolutionStatus, Review, Role, SortOrder, User,
    UserQuery,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.password_hash, u.role, u.is_suspended, \
     u.security_question, u.security_answer_hash, u.created_at, u.updated_at, ARRAY(SELECT b.recipe_id FROM bookmarks b WHERE b.user_id = u.id ORDER BY b.created_at) \
     AS bookmarks";

const RECIPE_COLUMNS: &str = "id, title, description, ingredients, instructions, metadata, image, author_id, \
     author_name, status, rating_avg, rating_count, views, created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, recipe_id, author_id, name, email, text, rating, created_at";

const REVIEW_COLUMNS: &str =
    "id, recipe_id, user_id, author_name, rating, text, status, created_at, updated_at";

const REPORT_COLUMNS: &str = "id, recipe_id, reporter_id, reason, status, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, link, data, read_at, created_at";

/// Maps driver errors; unique violations become `Conflict` with `conflict` as message.
fn db_err(conflict: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::Conflict(conflict.into()),
        _ => DomainError::internal(err),
    }
}

fn internal(err: sqlx::Error) -> DomainError {
    DomainError::internal(err)
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_suspended: bool,
    security_question: Option<String>,
    security_answer_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    bookmarks: Vec<Uuid>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> DomainResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>()?,
            is_suspended: row.is_suspended,
            bookmarks: row.bookmarks,
            security_question: row.security_question,
            security_answer_hash: row.security_answer_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RecipeRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    ingredients: Json<Vec<Ingredient>>,
    instructions: Json<Vec<Instruction>>,
    metadata: Json<RecipeMetadata>,
    image: Json<RecipeImage>,
    author_id: Option<Uuid>,
    author_name: String,
    status: String,
    rating_avg: f64,
    rating_count: i32,
    views: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = DomainError;

    fn try_from(row: RecipeRow) -> DomainResult<Self> {
        Ok(Recipe {
            id: row.id,
            title: row.title,
            description: row.description,
            ingredients: row.ingredients.0,
            instructions: row.instructions.0,
            metadata: row.metadata.0,
            image: row.image.0,
            author: RecipeAuthor { user_id: row.author_id, username: row.author_name },
            status: row.status.parse::<RecipeStatus>()?,
            rating_avg: row.rating_avg,
            rating_count: to_u32(row.rating_count),
            views: u64::try_from(row.views).unwrap_or_default(),
            comments: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    recipe_id: Uuid,
    author_id: Option<Uuid>,
    name: String,
    email: Option<String>,
    text: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for RecipeComment {
    type Error = DomainError;

    fn try_from(row: CommentRow) -> DomainResult<Self> {
        Ok(RecipeComment {
            recipe_id: row.recipe_id,
            comment: Comment {
                id: row.id,
                author_id: row.author_id,
                name: row.name,
                email: row.email,
                text: row.text,
                rating: Rating::new(i64::from(row.rating))?,
                created_at: row.created_at,
            },
        })
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    recipe_id: Uuid,
    user_id: Uuid,
    author_name: String,
    rating: i16,
    text: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> DomainResult<Self> {
        Ok(Review {
            id: row.id,
            recipe_id: row.recipe_id,
            user_id: row.user_id,
            author_name: row.author_name,
            rating: Rating::new(i64::from(row.rating))?,
            text: row.text,
            status: row.status.parse::<ResolutionStatus>()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ReportRow {
    id: Uuid,
    recipe_id: Uuid,
    reporter_id: Option<Uuid>,
    reason: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = DomainError;

    fn try_from(row: ReportRow) -> DomainResult<Self> {
        Ok(Report {
            id: row.id,
            recipe_id: row.recipe_id,
            reporter_id: row.reporter_id,
            reason: row.reason,
            status: row.status.parse::<ResolutionStatus>()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: Option<String>,
    message: String,
    link: Option<String>,
    data: serde_json::Value,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> DomainResult<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: NotificationKind::parse(&row.kind)?,
            title: row.title,
            message: row.message,
            link: row.link,
            data: row.data,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> DomainResult<Vec<T>>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(internal)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(DomainError::internal)?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads recipes by id and attaches their comments, oldest first.
    async fn load_recipes(&self, ids: &[Uuid]) -> DomainResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<RecipeRow> =
            sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ANY($1)"))
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)?;
        let mut recipes: Vec<Recipe> = convert_all(rows)?;
        self.attach_comments(&mut recipes).await?;

        let position: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        recipes.sort_by_key(|r| position.get(&r.id).copied().unwrap_or(usize::MAX));
        Ok(recipes)
    }

    async fn attach_comments(&self, recipes: &mut [Recipe]) -> DomainResult<()> {
        if recipes.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE recipe_id = ANY($1) ORDER BY created_at"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        let mut by_recipe: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in rows {
            let c = RecipeComment::try_from(row)?;
            by_recipe.entry(c.recipe_id).or_default().push(c.comment);
        }
        for recipe in recipes.iter_mut() {
            recipe.comments = by_recipe.remove(&recipe.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn find_user_where(&self, clause: &str, bind: impl ToString) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE {clause}");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(bind.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(User::try_from).transpose()
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    qb.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = like_pattern(q);
        qb.push(" AND (u.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR u.email ILIKE ").push_bind(pattern).push(")");
    }
    if let Some(role) = query.role {
        qb.push(" AND u.role = ").push_bind(role.as_str());
    }
    if let Some(suspended) = query.suspended {
        qb.push(" AND u.is_suspended = ").push_bind(suspended);
    }
}

fn push_any_tag(qb: &mut QueryBuilder<'_, Postgres>, field: &str, wanted: &[String]) {
    if wanted.is_empty() {
        return;
    }
    let lowered: Vec<String> = wanted.iter().map(|t| t.to_lowercase()).collect();
    qb.push(format!(
        " AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(metadata->'{field}') t WHERE lower(t) = ANY("
    ))
    .push_bind(lowered)
    .push("))");
}

fn push_recipe_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &RecipeQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(author_id) = query.author_id {
        qb.push(" AND author_id = ").push_bind(author_id);
    }
    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        let pattern = like_pattern(q);
        qb.push(" AND (title ILIKE ").push_bind(pattern.clone());
        qb.push(" OR description ILIKE ").push_bind(pattern.clone());
        qb.push(" OR EXISTS (SELECT 1 FROM jsonb_array_elements_text(metadata->'tags') t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
    if !query.ingredients.is_empty() {
        let patterns: Vec<String> = query.ingredients.iter().map(|t| like_pattern(t)).collect();
        qb.push(" AND EXISTS (SELECT 1 FROM jsonb_array_elements(ingredients) i WHERE i->>'name' ILIKE ANY(")
            .push_bind(patterns)
            .push("))");
    }
    push_any_tag(qb, "tags", &query.tags);
    push_any_tag(qb, "dietaryTags", &query.dietary_tags);
    push_any_tag(qb, "mealType", &query.meal_type);
    if let Some(cuisine) = &query.cuisine_type {
        qb.push(" AND lower(metadata->>'cuisineType') = ").push_bind(cuisine.to_lowercase());
    }
    if let Some(difficulty) = query.difficulty {
        qb.push(" AND metadata->>'difficulty' = ").push_bind(difficulty.as_str());
    }
    if let Some(max) = query.max_prep_time {
        qb.push(" AND (metadata->>'prepTime')::bigint <= ").push_bind(i64::from(max));
    }
    if let Some(max) = query.max_cook_time {
        qb.push(" AND (metadata->>'cookTime')::bigint <= ").push_bind(i64::from(max));
    }
    if let Some(min) = query.min_rating {
        qb.push(" AND rating_avg >= ").push_bind(min);
    }
    if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
        qb.push(" AND author_name ILIKE ").push_bind(like_pattern(author));
    }
}

fn recipe_order(query: &RecipeQuery) -> String {
    let columns: &[&str] = match query.sort {
        RecipeSort::CreatedAt => &["created_at"],
        RecipeSort::Title => &["lower(title)"],
        RecipeSort::Rating => &["rating_avg", "views"],
        RecipeSort::Views => &["views", "rating_avg"],
        RecipeSort::PrepTime => &["(metadata->>'prepTime')::bigint"],
    };
    let direction = match query.order {
        SortOrder::Asc => "ASC NULLS FIRST",
        SortOrder::Desc => "DESC NULLS LAST",
    };
    let keys: Vec<String> = columns.iter().map(|c| format!("{c} {direction}")).collect();
    format!(" ORDER BY {}, id DESC", keys.join(", "))
}

#[derive(FromRow)]
struct ChefRow {
    user_id: Uuid,
    name: String,
    recipe_count: i64,
    rating_count: i64,
}

impl From<ChefRow> for Chef {
    fn from(row: ChefRow) -> Self {
        Chef {
            user_id: row.user_id,
            name: row.name,
            recipe_count: u64::try_from(row.recipe_count).unwrap_or_default(),
            rating_count: u64::try_from(row.rating_count).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, is_suspended, security_question, \
             security_answer_hash, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_suspended)
        .bind(&user.security_question)
        .bind(&user.security_answer_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("user already exists"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        let row: Option<UserRow> =
            sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await.map_err(internal)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        self.find_user_where("u.email = $1", email).await
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, role = $5, is_suspended = $6, \
             security_question = $7, security_answer_hash = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_suspended)
        .bind(&user.security_question)
        .bind(&user.security_answer_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("email already in use"))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", user.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &UserQuery) -> DomainResult<Page<User>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users u");
        push_user_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await.map_err(internal)?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u"));
        push_user_filters(&mut select, query);
        select
            .push(" ORDER BY u.created_at DESC LIMIT ")
            .push_bind(i64::from(query.page.limit))
            .push(" OFFSET ")
            .push_bind(query.page.offset() as i64);
        let rows: Vec<UserRow> = select.build_query_as().fetch_all(&self.pool).await.map_err(internal)?;

        Ok(Page::new(convert_all(rows)?, total as u64, query.page))
    }

    async fn count(&self) -> DomainResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(total as u64)
    }

    async fn admin_ids(&self) -> DomainResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
    }

    async fn toggle_bookmark(&self, user_id: Uuid, recipe_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?
            .rows_affected();
        if removed == 0 {
            sqlx::query("INSERT INTO bookmarks (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user_id)
                .bind(recipe_id)
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
        }
        let bookmarks: Vec<Uuid> =
            sqlx::query_scalar("SELECT recipe_id FROM bookmarks WHERE user_id = $1 ORDER BY created_at")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(internal)?;
        tx.commit().await.map_err(internal)?;
        Ok(bookmarks)
    }
}

#[async_trait]
impl RecipeRepository for PgRepository {
    async fn insert(&self, recipe: &Recipe) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO recipes (id, title, description, ingredients, instructions, metadata, image, author_id, \
             author_name, status, rating_avg, rating_count, views, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(Json(&recipe.ingredients))
        .bind(Json(&recipe.instructions))
        .bind(Json(&recipe.metadata))
        .bind(Json(&recipe.image))
        .bind(recipe.author.user_id)
        .bind(&recipe.author.username)
        .bind(recipe.status.as_str())
        .bind(recipe.rating_avg)
        .bind(recipe.rating_count as i32)
        .bind(recipe.views as i64)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("recipe already exists"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Recipe>> {
        Ok(self.load_recipes(&[id]).await?.pop())
    }

    async fn find_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Recipe>> {
        self.load_recipes(ids).await
    }

    async fn update(&self, recipe: &Recipe) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE recipes SET title = $2, description = $3, ingredients = $4, instructions = $5, \
             metadata = $6, image = $7, status = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(Json(&recipe.ingredients))
        .bind(Json(&recipe.instructions))
        .bind(Json(&recipe.metadata))
        .bind(Json(&recipe.image))
        .bind(recipe.status.as_str())
        .bind(recipe.updated_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("recipe", recipe.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &RecipeQuery) -> DomainResult<Page<Recipe>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM recipes");
        push_recipe_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await.map_err(internal)?;

        let mut select = QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes"));
        push_recipe_filters(&mut select, query);
        select
            .push(recipe_order(query))
            .push(" LIMIT ")
            .push_bind(i64::from(query.page.limit))
            .push(" OFFSET ")
            .push_bind(query.page.offset() as i64);
        let rows: Vec<RecipeRow> = select.build_query_as().fetch_all(&self.pool).await.map_err(internal)?;

        let mut recipes: Vec<Recipe> = convert_all(rows)?;
        self.attach_comments(&mut recipes).await?;
        Ok(Page::new(recipes, total as u64, query.page))
    }

    async fn set_status(&self, id: Uuid, status: RecipeStatus) -> DomainResult<Option<Recipe>> {
        let result = sqlx::query("UPDATE recipes SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        RecipeRepository::find_by_id(self, id).await
    }

    async fn set_rating(&self, id: Uuid, summary: RatingSummary) -> DomainResult<()> {
        sqlx::query("UPDATE recipes SET rating_avg = $2, rating_count = $3 WHERE id = $1")
            .bind(id)
            .bind(summary.average)
            .bind(summary.count as i32)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn count(&self, status: Option<RecipeStatus>) -> DomainResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE $1::text IS NULL OR status = $1")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(total as u64)
    }

    async fn increment_views(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE recipes SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn categories(&self) -> DomainResult<Vec<Category>> {
        let cuisines: Vec<String> = sqlx::query_scalar(
            "SELECT metadata->>'cuisineType' FROM recipes \
             WHERE status = 'approved' AND metadata->>'cuisineType' IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(tally_categories(cuisines.iter().map(String::as_str)))
    }

    async fn top_chefs(&self, limit: u32) -> DomainResult<Vec<Chef>> {
        let rows: Vec<ChefRow> = sqlx::query_as(
            "SELECT u.id AS user_id, u.name, COUNT(r.id) AS recipe_count, \
             COALESCE(SUM(r.rating_count), 0)::bigint AS rating_count \
             FROM recipes r JOIN users u ON u.id = r.author_id \
             WHERE r.status = 'approved' AND NOT u.is_suspended \
             GROUP BY u.id, u.name \
             ORDER BY recipe_count DESC, rating_count DESC, u.name \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(Chef::from).collect())
    }
}

#[async_trait]
impl CommentRepository for PgRepository {
    async fn insert(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, recipe_id, author_id, name, email, text, rating, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(comment.id)
        .bind(recipe_id)
        .bind(comment.author_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.text)
        .bind(i16::from(comment.rating.stars()))
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn find(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<Option<Comment>> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE recipe_id = $1 AND id = $2"))
                .bind(recipe_id)
                .bind(comment_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?;
        Ok(row.map(RecipeComment::try_from).transpose()?.map(|c| c.comment))
    }

    async fn update(&self, recipe_id: Uuid, comment: &Comment) -> DomainResult<()> {
        let result = sqlx::query("UPDATE comments SET text = $3, rating = $4 WHERE recipe_id = $1 AND id = $2")
            .bind(recipe_id)
            .bind(comment.id)
            .bind(&comment.text)
            .bind(i16::from(comment.rating.stars()))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("comment", comment.id));
        }
        Ok(())
    }

    async fn delete(&self, recipe_id: Uuid, comment_id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE recipe_id = $1 AND id = $2")
            .bind(recipe_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Comment>> {
        let rows: Vec<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE recipe_id = $1 ORDER BY created_at"))
                .bind(recipe_id)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)?;
        let comments: Vec<RecipeComment> = convert_all(rows)?;
        Ok(comments.into_iter().map(|c| c.comment).collect())
    }

    async fn list_by_email(&self, email: &str) -> DomainResult<Vec<RecipeComment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE lower(email) = lower($1) ORDER BY created_at DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }
}

#[async_trait]
impl ReviewRepository for PgRepository {
    async fn insert(&self, review: &Review) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, recipe_id, user_id, author_name, rating, text, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(review.id)
        .bind(review.recipe_id)
        .bind(review.user_id)
        .bind(&review.author_name)
        .bind(i16::from(review.rating.stars()))
        .bind(&review.text)
        .bind(review.status.as_str())
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("you have already reviewed this recipe"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(Review::try_from).transpose()
    }

    async fn find_for_user(&self, recipe_id: Uuid, user_id: Uuid) -> DomainResult<Option<Review>> {
        let row: Option<ReviewRow> =
            sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE recipe_id = $1 AND user_id = $2"))
                .bind(recipe_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?;
        row.map(Review::try_from).transpose()
    }

    async fn update(&self, review: &Review) -> DomainResult<()> {
        let result = sqlx::query("UPDATE reviews SET rating = $2, text = $3, updated_at = $4 WHERE id = $1")
            .bind(review.id)
            .bind(i16::from(review.rating.stars()))
            .bind(&review.text)
            .bind(review.updated_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("review", review.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> DomainResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE recipe_id = $1 AND status <> 'dismissed' \
             ORDER BY created_at DESC"
        ))
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }

    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE $1::text IS NULL OR status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }

    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "UPDATE reviews SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(Review::try_from).transpose()
    }

    async fn rating_summary(&self, recipe_id: Uuid) -> DomainResult<RatingSummary> {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE recipe_id = $1 AND status <> 'dismissed'",
        )
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;
        Ok(RatingSummary { average: round2(average.unwrap_or_default()), count: count as u32 })
    }

    async fn recipes_reviewed_by(&self, user_id: Uuid) -> DomainResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT DISTINCT recipe_id FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
    }

    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE $1::text IS NULL OR status = $1")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(total as u64)
    }
}

#[async_trait]
impl ReportRepository for PgRepository {
    async fn insert(&self, report: &Report) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, recipe_id, reporter_id, reason, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(report.id)
        .bind(report.recipe_id)
        .bind(report.reporter_id)
        .bind(&report.reason)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Report>> {
        let row: Option<ReportRow> = sqlx::query_as(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(Report::try_from).transpose()
    }

    async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Report>> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE $1::text IS NULL OR status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }

    async fn list_by_reporter(&self, reporter_id: Uuid) -> DomainResult<Vec<Report>> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE reporter_id = $1 ORDER BY created_at DESC"
        ))
        .bind(reporter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }

    async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Option<Report>> {
        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "UPDATE reports SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(Report::try_from).transpose()
    }

    async fn count(&self, status: Option<ResolutionStatus>) -> DomainResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE $1::text IS NULL OR status = $1")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(total as u64)
    }
}

#[async_trait]
impl NotificationRepository for PgRepository {
    async fn insert(&self, notification: &Notification) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, message, link, data, read_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(&notification.data)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Notification>> {
        let row: Option<NotificationRow> =
            sqlx::query_as(&format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?;
        row.map(Notification::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> DomainResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        convert_all(rows)
    }

    async fn unread_count(&self, user_id: Uuid) -> DomainResult<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)?;
        Ok(total as u64)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, $2) WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        row.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn recipe_filters_bind_every_criterion() {
        let query = RecipeQuery {
            q: Some("pie".into()),
            tags: vec!["Vegan".into()],
            max_prep_time: Some(30),
            ..RecipeQuery::approved()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes");
        push_recipe_filters(&mut qb, &query);
        let sql = qb.sql();
        assert!(sql.contains("status = $1"));
        assert!(sql.contains("title ILIKE $2"));
        assert!(sql.contains("metadata->'tags'"));
        assert!(sql.contains("(metadata->>'prepTime')::bigint <= $6"));
    }

    #[test]
    fn popularity_sorts_use_both_counters() {
        let featured = RecipeQuery::top(RecipeSort::Rating, 6);
        assert_eq!(recipe_order(&featured), " ORDER BY rating_avg DESC NULLS LAST, views DESC NULLS LAST, id DESC");
        let popular = RecipeQuery::top(RecipeSort::Views, 8);
        assert_eq!(recipe_order(&popular), " ORDER BY views DESC NULLS LAST, rating_avg DESC NULLS LAST, id DESC");
    }

    #[test]
    fn sorting_breaks_ties_by_id() {
        let query = RecipeQuery { sort: RecipeSort::Title, order: SortOrder::Asc, ..Default::default() };
        assert_eq!(recipe_order(&query), " ORDER BY lower(title) ASC NULLS FIRST, id DESC");
    }
}
