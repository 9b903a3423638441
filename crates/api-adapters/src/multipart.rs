//! Recipe form parsing.
//!
//! Clients send either one JSON part named `recipe` or plain form fields.
//! The picture is a file part `image` or a text part `image_url`.

use axum::extract::Multipart;
use domains::{split_list, DomainError, Ingredient, Instruction, RecipeDraft};
use services::ImageInput;

use crate::error::ApiResult;

#[derive(Debug, Default)]
pub struct RecipeForm {
    pub draft: RecipeDraft,
    pub image: Option<ImageInput>,
}

pub async fn read_recipe_form(mut multipart: Multipart) -> ApiResult<RecipeForm> {
    let mut form = RecipeForm::default();
    let mut json_draft: Option<RecipeDraft> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                if !data.is_empty() {
                    form.image = Some(ImageInput::Upload { data, content_type });
                }
            }
            "recipe" => {
                let data = field.bytes().await?;
                let draft = serde_json::from_slice(&data)
                    .map_err(|err| DomainError::validation(format!("invalid recipe json: {err}")))?;
                json_draft = Some(draft);
            }
            _ => {
                let value = field.text().await?;
                apply_text_field(&mut form, &name, &value)?;
            }
        }
    }

    if let Some(draft) = json_draft {
        form.draft = draft;
    }
    Ok(form)
}

fn parse_number(field: &str, value: &str) -> Result<Option<u32>, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| DomainError::validation(format!("{field} must be a whole number")))
}

fn apply_text_field(form: &mut RecipeForm, name: &str, value: &str) -> Result<(), DomainError> {
    let draft = &mut form.draft;
    let meta = &mut draft.metadata;
    match name {
        "image_url" | "imageUrl" => {
            let url = value.trim();
            if !url.is_empty() && form.image.is_none() {
                form.image = Some(ImageInput::Url(url.to_string()));
            }
        }
        "title" => draft.title = value.to_string(),
        "description" => draft.description = Some(value.to_string()),
        "ingredients" => draft.ingredients = split_list(value, ',').into_iter().map(Ingredient::named).collect(),
        "steps" | "instructions" => {
            draft.instructions = split_list(value, '\n').into_iter().map(Instruction::step).collect()
        }
        "tags" => meta.tags = split_list(value, ','),
        "dietary_tags" | "dietaryTags" => meta.dietary_tags = split_list(value, ','),
        "meal_type" | "mealType" => meta.meal_type = split_list(value, ','),
        "cuisine_type" | "cuisineType" => meta.cuisine_type = Some(value.to_string()),
        "difficulty" if !value.trim().is_empty() => meta.difficulty = value.parse()?,
        "prep_time" | "prepTime" => meta.prep_time = parse_number("prep_time", value)?,
        "cook_time" | "cookTime" => meta.cook_time = parse_number("cook_time", value)?,
        "servings" => meta.servings = parse_number("servings", value)?,
        _ => {}
    }
    Ok(())
}
