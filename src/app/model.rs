use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recipe::IngredientLine;

/// Body of `POST /api/recipes/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecipeRequest {
    pub meal_id: String,
    pub meal_name: String,
    pub meal_thumb: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    pub instructions: String,
    pub ingredients: Vec<IngredientLine>,
}

/// A recipe stored for one user, keyed by `(owner_id, meal_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub meal_id: String,
    pub meal_name: String,
    pub meal_thumb: String,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: String,
    pub ingredients: Vec<IngredientLine>,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    pub fn from_request(
        request: SaveRecipeRequest,
        owner_id: impl Into<String>,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            meal_id: request.meal_id,
            meal_name: request.meal_name,
            meal_thumb: request.meal_thumb,
            category: request.category,
            area: request.area,
            instructions: request.instructions,
            ingredients: request.ingredients,
            owner_id: owner_id.into(),
            saved_at,
        }
    }
}

/// Checks a value used as one document path segment (user id or meal id).
pub fn validate_document_id(kind: &str, id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err(format!("{kind} is required"));
    }
    if id.len() > 256 {
        return Err(format!("{kind} is too long"));
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) || id.chars().any(char::is_control) {
        return Err(format!("{kind} contains invalid characters"));
    }
    Ok(())
}

/// Newest first; ties broken by meal id so listings are stable.
pub fn sort_newest_first(recipes: &mut [SavedRecipe]) {
    recipes.sort_by(|a, b| {
        b.saved_at
            .cmp(&a.saved_at)
            .then_with(|| a.meal_id.cmp(&b.meal_id))
    });
}
