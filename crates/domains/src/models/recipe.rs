use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PageRequest, Rating, RatingSummary, User};
use crate::errors::{DomainError, DomainResult};

pub const MAX_TITLE_LEN: usize = 200;

/// Moderation state of a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RecipeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeStatus::Pending => "pending",
            RecipeStatus::Approved => "approved",
            RecipeStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RecipeStatus::Pending),
            "approved" => Ok(RecipeStatus::Approved),
            "rejected" => Ok(RecipeStatus::Rejected),
            _ => Err(DomainError::validation("invalid status value")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(DomainError::validation(format!("invalid difficulty: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Ingredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), quantity: None, unit: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    /// Re-assigned 1..n on every write
    #[serde(default)]
    pub step_number: u32,
    pub description: String,
    #[serde(default, alias = "duration")]
    pub duration_minutes: Option<u32>,
}

impl Instruction {
    pub fn step(description: impl Into<String>) -> Self {
        Self { step_number: 0, description: description.into(), duration_minutes: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeMetadata {
    /// Minutes
    pub prep_time: Option<u32>,
    /// Minutes
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Difficulty,
    pub cuisine_type: Option<String>,
    pub dietary_tags: Vec<String>,
    pub meal_type: Vec<String>,
    pub tags: Vec<String>,
}

/// Where a recipe's picture lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecipeImage {
    /// Uploaded blob held by the media storage, addressed by content hash
    #[serde(rename_all = "camelCase")]
    Stored { key: String, content_type: String },
    /// Externally hosted picture
    Remote { url: String },
}

impl RecipeImage {
    pub fn remote(url: &str) -> DomainResult<Self> {
        let url = url.trim();
        let has_host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_host || url.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("image url must be an http(s) url"));
        }
        Ok(RecipeImage::Remote { url: url.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeAuthor {
    /// Null once the author deleted their account
    pub user_id: Option<Uuid>,
    pub username: String,
}

/// A free-form comment embedded in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub text: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

/// A comment together with the recipe it belongs to, for cross-recipe listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeComment {
    pub recipe_id: Uuid,
    #[serde(flatten)]
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
    pub metadata: RecipeMetadata,
    pub image: RecipeImage,
    pub author: RecipeAuthor,
    pub status: RecipeStatus,
    pub rating_avg: f64,
    pub rating_count: u32,
    /// Detail page hits by anyone but the author
    pub views: u64,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(draft: RecipeDraft, image: RecipeImage, author: &User, status: RecipeStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            metadata: draft.metadata,
            image,
            author: RecipeAuthor { user_id: Some(author.id), username: author.name.clone() },
            status,
            rating_avg: 0.0,
            rating_count: 0,
            views: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author.user_id == Some(user_id)
    }

    /// Owners and admins may edit or delete.
    pub fn can_modify(&self, user: &User) -> bool {
        user.is_admin() || self.is_authored_by(user.id)
    }

    /// Approved recipes are public; everything else only to owner and admins.
    pub fn is_visible_to(&self, viewer: Option<&User>) -> bool {
        self.status == RecipeStatus::Approved || viewer.is_some_and(|u| self.can_modify(u))
    }

    pub fn apply_rating(&mut self, summary: RatingSummary) {
        self.rating_avg = summary.average;
        self.rating_count = summary.count;
    }

    fn to_draft(&self) -> RecipeDraft {
        RecipeDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Client input for a new recipe, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub metadata: RecipeMetadata,
}

impl RecipeDraft {
    /// Trims every text field, drops empty optionals, dedupes tags and
    /// renumbers steps. Fails on a missing title or blank list entries.
    pub fn normalize(self) -> DomainResult<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }

        let ingredients = self
            .ingredients
            .into_iter()
            .map(|i| {
                let name = i.name.trim().to_string();
                if name.is_empty() {
                    return Err(DomainError::validation("ingredient name is required"));
                }
                Ok(Ingredient { name, quantity: non_empty(i.quantity), unit: non_empty(i.unit) })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let instructions = self
            .instructions
            .into_iter()
            .enumerate()
            .map(|(idx, step)| {
                let description = step.description.trim().to_string();
                if description.is_empty() {
                    return Err(DomainError::validation("instruction description is required"));
                }
                Ok(Instruction { step_number: idx as u32 + 1, description, duration_minutes: step.duration_minutes })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let meta = self.metadata;
        if meta.servings == Some(0) {
            return Err(DomainError::validation("servings must be at least 1"));
        }

        Ok(Self {
            title,
            description: non_empty(self.description),
            ingredients,
            instructions,
            metadata: RecipeMetadata {
                cuisine_type: non_empty(meta.cuisine_type),
                dietary_tags: clean_tags(meta.dietary_tags),
                meal_type: clean_tags(meta.meal_type),
                tags: clean_tags(meta.tags),
                ..meta
            },
        })
    }
}

/// Partial update of a recipe. Absent fields are left untouched; an empty
/// `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<Vec<Instruction>>,
    pub metadata: Option<RecipeMetadata>,
    pub image_url: Option<String>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        self == &RecipePatch::default()
    }

    pub fn apply(self, recipe: &mut Recipe) -> DomainResult<()> {
        let mut draft = recipe.to_draft();
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
        if let Some(ingredients) = self.ingredients {
            draft.ingredients = ingredients;
        }
        if let Some(instructions) = self.instructions {
            draft.instructions = instructions;
        }
        if let Some(metadata) = self.metadata {
            draft.metadata = metadata;
        }
        let image = self.image_url.as_deref().map(RecipeImage::remote).transpose()?;

        let draft = draft.normalize()?;
        recipe.title = draft.title;
        recipe.description = draft.description;
        recipe.ingredients = draft.ingredients;
        recipe.instructions = draft.instructions;
        recipe.metadata = draft.metadata;
        if let Some(image) = image {
            recipe.image = image;
        }
        recipe.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeSort {
    #[default]
    CreatedAt,
    Title,
    Rating,
    Views,
    PrepTime,
}

impl FromStr for RecipeSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "createdAt" | "created_at" => Ok(RecipeSort::CreatedAt),
            "title" => Ok(RecipeSort::Title),
            "rating" | "ratingAvg" => Ok(RecipeSort::Rating),
            "views" | "popular" => Ok(RecipeSort::Views),
            "prepTime" | "prep_time" => Ok(RecipeSort::PrepTime),
            other => Err(DomainError::validation(format!("cannot sort by {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(DomainError::validation(format!("invalid sort order: {other}"))),
        }
    }
}

/// Recipe search. Text criteria are case-insensitive substring matches;
/// list criteria match when any requested term matches.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub q: Option<String>,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    pub dietary_tags: Vec<String>,
    pub meal_type: Vec<String>,
    pub cuisine_type: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub max_prep_time: Option<u32>,
    pub max_cook_time: Option<u32>,
    pub min_rating: Option<f64>,
    /// Substring of the author's username
    pub author: Option<String>,
    pub author_id: Option<Uuid>,
    /// `None` lists every status
    pub status: Option<RecipeStatus>,
    pub sort: RecipeSort,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl RecipeQuery {
    /// The public feed: approved recipes only.
    pub fn approved() -> Self {
        Self { status: Some(RecipeStatus::Approved), ..Default::default() }
    }

    /// The first `limit` approved recipes, best first by `sort`.
    pub fn top(sort: RecipeSort, limit: u32) -> Self {
        Self {
            sort,
            order: SortOrder::Desc,
            page: PageRequest::new(Some(1), Some(limit), limit),
            ..Self::approved()
        }
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        if self.status.is_some_and(|s| s != recipe.status) {
            return false;
        }
        if self.author_id.is_some_and(|id| !recipe.is_authored_by(id)) {
            return false;
        }
        if let Some(q) = self.q.as_deref().map(str::to_lowercase) {
            let hit = recipe.title.to_lowercase().contains(&q)
                || recipe.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&q))
                || recipe.metadata.tags.iter().any(|t| t.to_lowercase().contains(&q));
            if !hit {
                return false;
            }
        }
        if !self.ingredients.is_empty() {
            let names: Vec<String> = recipe.ingredients.iter().map(|i| i.name.to_lowercase()).collect();
            let hit = self
                .ingredients
                .iter()
                .map(|term| term.to_lowercase())
                .any(|term| names.iter().any(|n| n.contains(&term)));
            if !hit {
                return false;
            }
        }
        if !any_tag(&self.tags, &recipe.metadata.tags)
            || !any_tag(&self.dietary_tags, &recipe.metadata.dietary_tags)
            || !any_tag(&self.meal_type, &recipe.metadata.meal_type)
        {
            return false;
        }
        if let Some(cuisine) = &self.cuisine_type {
            let same = recipe
                .metadata
                .cuisine_type
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(cuisine));
            if !same {
                return false;
            }
        }
        if self.difficulty.is_some_and(|d| d != recipe.metadata.difficulty) {
            return false;
        }
        if !within(self.max_prep_time, recipe.metadata.prep_time)
            || !within(self.max_cook_time, recipe.metadata.cook_time)
        {
            return false;
        }
        if self.min_rating.is_some_and(|min| recipe.rating_avg < min) {
            return false;
        }
        if let Some(author) = self.author.as_deref().map(str::to_lowercase) {
            if !recipe.author.username.to_lowercase().contains(&author) {
                return false;
            }
        }
        true
    }

    /// Ordering for in-process sorting. Rating and views break ties on each
    /// other, then everything falls back to newest first.
    pub fn compare(&self, a: &Recipe, b: &Recipe) -> Ordering {
        let primary = match self.sort {
            RecipeSort::CreatedAt => a.created_at.cmp(&b.created_at),
            RecipeSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            RecipeSort::Rating => a.rating_avg.total_cmp(&b.rating_avg).then(a.views.cmp(&b.views)),
            RecipeSort::Views => a.views.cmp(&b.views).then(a.rating_avg.total_cmp(&b.rating_avg)),
            RecipeSort::PrepTime => a.metadata.prep_time.cmp(&b.metadata.prep_time),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

fn any_tag(wanted: &[String], have: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| have.iter().any(|h| h.eq_ignore_ascii_case(w)))
}

fn within(max: Option<u32>, value: Option<u32>) -> bool {
    match (max, value) {
        (Some(max), Some(v)) => v <= max,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Splits a delimited form value into trimmed, non-empty entries.
pub fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn author() -> User {
        User::new("Chef Ana".into(), "ana@example.com".into(), String::new(), Role::User)
    }

    fn draft(title: &str) -> RecipeDraft {
        RecipeDraft {
            title: title.into(),
            ingredients: vec![Ingredient::named("Tomato"), Ingredient::named("Basil")],
            instructions: vec![Instruction::step("Chop"), Instruction::step("Serve")],
            metadata: RecipeMetadata {
                prep_time: Some(10),
                tags: vec!["Vegan".into(), " vegan ".into(), "Quick".into(), "".into()],
                cuisine_type: Some("Italian".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn recipe(title: &str) -> Recipe {
        Recipe::new(
            draft(title).normalize().unwrap(),
            RecipeImage::remote("https://img.example.com/a.jpg").unwrap(),
            &author(),
            RecipeStatus::Approved,
        )
    }

    #[test]
    fn normalize_requires_a_title() {
        let err = draft("   ").normalize().unwrap_err();
        assert_eq!(err, DomainError::validation("title is required"));
    }

    #[test]
    fn normalize_renumbers_steps_and_dedupes_tags() {
        let d = draft(" Bruschetta ").normalize().unwrap();
        assert_eq!(d.title, "Bruschetta");
        assert_eq!(d.instructions.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(d.metadata.tags, vec!["Vegan".to_string(), "Quick".to_string()]);
    }

    #[test]
    fn blank_ingredient_is_rejected() {
        let mut d = draft("Soup");
        d.ingredients.push(Ingredient::named("  "));
        assert!(d.normalize().is_err());
    }

    #[test]
    fn remote_image_requires_http_scheme() {
        assert!(RecipeImage::remote("ftp://example.com/a.png").is_err());
        assert!(RecipeImage::remote("https://").is_err());
        assert!(RecipeImage::remote("https://example.com/a.png").is_ok());
    }

    #[test]
    fn status_parses_only_enumerated_values() {
        assert_eq!("Approved".parse::<RecipeStatus>().unwrap(), RecipeStatus::Approved);
        assert!("revoked".parse::<RecipeStatus>().is_err());
    }

    #[test]
    fn pending_recipe_is_hidden_from_strangers() {
        let owner = author();
        let mut r = Recipe::new(
            draft("Soup").normalize().unwrap(),
            RecipeImage::remote("https://example.com/s.png").unwrap(),
            &owner,
            RecipeStatus::Pending,
        );
        let stranger = User::new("Bo".into(), "bo@example.com".into(), String::new(), Role::User);
        let admin = User::new("Root".into(), "root@example.com".into(), String::new(), Role::Admin);

        assert!(!r.is_visible_to(None));
        assert!(!r.is_visible_to(Some(&stranger)));
        assert!(r.is_visible_to(Some(&owner)));
        assert!(r.is_visible_to(Some(&admin)));

        r.status = RecipeStatus::Approved;
        assert!(r.is_visible_to(None));
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let mut r = recipe("Soup");
        let patch = RecipePatch { title: Some("Better Soup".into()), ..Default::default() };
        patch.apply(&mut r).unwrap();
        assert_eq!(r.title, "Better Soup");
        assert_eq!(r.ingredients.len(), 2);
    }

    #[test]
    fn patch_with_blank_title_fails_without_mutating() {
        let mut r = recipe("Soup");
        let patch = RecipePatch { title: Some(" ".into()), ..Default::default() };
        assert!(patch.apply(&mut r).is_err());
        assert_eq!(r.title, "Soup");
    }

    #[test]
    fn query_matches_text_ingredients_and_times() {
        let r = recipe("Tomato Bruschetta");

        let q = RecipeQuery { q: Some("bruSCH".into()), ..RecipeQuery::approved() };
        assert!(q.matches(&r));

        let q = RecipeQuery { ingredients: vec!["basil".into(), "beef".into()], ..Default::default() };
        assert!(q.matches(&r));

        let q = RecipeQuery { ingredients: vec!["beef".into()], ..Default::default() };
        assert!(!q.matches(&r));

        let q = RecipeQuery { max_prep_time: Some(5), ..Default::default() };
        assert!(!q.matches(&r));

        let q = RecipeQuery { max_cook_time: Some(60), ..Default::default() };
        assert!(!q.matches(&r), "unknown cook time cannot satisfy a maximum");

        let q = RecipeQuery { cuisine_type: Some("italian".into()), tags: vec!["QUICK".into()], ..Default::default() };
        assert!(q.matches(&r));
    }

    #[test]
    fn compare_sorts_by_title_ascending() {
        let a = recipe("apple pie");
        let b = recipe("Banana bread");
        let q = RecipeQuery { sort: RecipeSort::Title, order: SortOrder::Asc, ..Default::default() };
        assert_eq!(q.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn rating_ties_fall_back_to_views() {
        let mut a = recipe("Soup");
        let mut b = recipe("Stew");
        a.rating_avg = 4.5;
        b.rating_avg = 4.5;
        a.views = 10;
        b.views = 3;
        let featured = RecipeQuery::top(RecipeSort::Rating, 6);
        assert_eq!(featured.compare(&a, &b), Ordering::Less);
        assert_eq!(featured.page.limit, 6);
        assert_eq!(featured.status, Some(RecipeStatus::Approved));

        b.views = 50;
        let popular = RecipeQuery::top(RecipeSort::Views, 8);
        assert_eq!(popular.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn instruction_minutes_round_trip_under_their_wire_name() {
        let step: Instruction = serde_json::from_str(r#"{"description":"Boil","durationMinutes":12}"#).unwrap();
        assert_eq!(step.duration_minutes, Some(12));
        assert_eq!(serde_json::to_value(&step).unwrap()["durationMinutes"], 12);

        let legacy: Instruction = serde_json::from_str(r#"{"description":"Boil","duration":5}"#).unwrap();
        assert_eq!(legacy.duration_minutes, Some(5));
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("a, b,,  c ", ','), vec!["a", "b", "c"]);
        assert!(split_list("", '\n').is_empty());
    }

    #[test]
    fn image_serializes_with_kind_tag() {
        let img = RecipeImage::Stored { key: "abc".into(), content_type: "image/png".into() };
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json["kind"], "stored");
        assert_eq!(json["contentType"], "image/png");
    }
}
