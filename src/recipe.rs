use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of numbered `strIngredient{n}` / `strMeasure{n}` slots in a catalog record.
pub const INGREDIENT_SLOTS: usize = 20;

/// A catalog record exactly as TheMealDB returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCatalogRecord(pub Map<String, Value>);

impl RawCatalogRecord {
    /// String value of `key`. Missing keys, `null` and non-string values all read as `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for RawCatalogRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient: String,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecipe {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strCategory")]
    pub category: Option<String>,
    #[serde(rename = "strArea")]
    pub area: Option<String>,
    #[serde(rename = "strInstructions")]
    pub instructions: String,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: String,
    #[serde(rename = "strYoutube")]
    pub video: Option<String>,
    pub ingredients: Vec<IngredientLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream record is missing required field `{field}`")]
pub struct MalformedRecord {
    pub field: &'static str,
}

pub fn normalize(raw: &RawCatalogRecord) -> Result<NormalizedRecipe, MalformedRecord> {
    let required = |field: &'static str| {
        raw.get_str(field)
            .map(str::to_owned)
            .ok_or(MalformedRecord { field })
    };
    let optional = |field: &str| raw.get_str(field).map(str::to_owned);

    Ok(NormalizedRecipe {
        id: required("idMeal")?,
        name: required("strMeal")?,
        category: optional("strCategory"),
        area: optional("strArea"),
        instructions: required("strInstructions")?,
        thumbnail: required("strMealThumb")?,
        video: optional("strYoutube"),
        ingredients: ingredient_lines(raw),
    })
}

/// Collapses the numbered ingredient/measure slots into an ordered list.
///
/// A slot is kept only when its ingredient is non-blank after trimming; a missing
/// measure becomes an empty string.
pub fn ingredient_lines(raw: &RawCatalogRecord) -> Vec<IngredientLine> {
    let mut lines = Vec::new();
    for n in 1..=INGREDIENT_SLOTS {
        let Some(ingredient) = raw
            .get_str(&format!("strIngredient{n}"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let measure = raw
            .get_str(&format!("strMeasure{n}"))
            .map(str::trim)
            .unwrap_or_default();

        lines.push(IngredientLine {
            ingredient: ingredient.to_owned(),
            measure: measure.to_owned(),
        });
    }
    lines
}
