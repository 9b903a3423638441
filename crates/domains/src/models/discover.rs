use serde::Serialize;
use uuid::Uuid;

/// A cuisine with the number of approved recipes filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub recipe_count: u64,
}

impl Category {
    /// Case-insensitive substring match; a blank term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

/// Groups cuisine names case-insensitively, keeping the first spelling seen,
/// and orders by count then name.
pub fn tally_categories<'a>(cuisines: impl IntoIterator<Item = &'a str>) -> Vec<Category> {
    let mut out: Vec<Category> = Vec::new();
    for name in cuisines.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
        match out.iter_mut().find(|c| c.name.eq_ignore_ascii_case(name)) {
            Some(category) => category.recipe_count += 1,
            None => out.push(Category { name: name.to_string(), recipe_count: 1 }),
        }
    }
    out.sort_by(|a, b| {
        b.recipe_count
            .cmp(&a.recipe_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    out
}

/// An active account ranked by what it has published.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chef {
    pub user_id: Uuid,
    pub name: String,
    /// Approved recipes only
    pub recipe_count: u64,
    /// Reviews received across those recipes
    pub rating_count: u64,
}
