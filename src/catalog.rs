use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::{CatalogArgs, LookupArgs};
use crate::http;
use crate::recipe::{RawCatalogRecord, normalize};

pub const DEFAULT_CATALOG_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";

/// Entry of the `filter.php` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSummary {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meals<T> {
    meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct IngredientEntry {
    #[serde(rename = "strIngredient")]
    name: Option<String>,
}

/// Read-only client for TheMealDB-style catalog endpoints.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = http::client_with_timeout(timeout).context("build catalog http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_args(args: &CatalogArgs) -> anyhow::Result<Self> {
        Self::new(
            &args.catalog_base_url,
            Duration::from_secs(args.catalog_timeout_secs.max(1)),
        )
    }

    /// All ingredient names known to the catalog, blank names dropped, sorted.
    pub async fn list_ingredients(&self) -> anyhow::Result<Vec<String>> {
        let page: Meals<IngredientEntry> = self.get_json("list.php", &[("i", "list")]).await?;
        let mut names: Vec<String> = page
            .meals
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.name)
            .filter(|name| !name.trim().is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    pub async fn filter_by_ingredient(&self, ingredient: &str) -> anyhow::Result<Vec<MealSummary>> {
        let page: Meals<MealSummary> = self.get_json("filter.php", &[("i", ingredient)]).await?;
        Ok(page.meals.unwrap_or_default())
    }

    /// First record matching `meal_id`, if any.
    pub async fn lookup(&self, meal_id: &str) -> anyhow::Result<Option<RawCatalogRecord>> {
        let page: Meals<RawCatalogRecord> = self.get_json("lookup.php", &[("i", meal_id)]).await?;
        Ok(page.meals.and_then(|meals| meals.into_iter().next()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("catalog error ({status}) for {endpoint}");
        }
        response
            .json()
            .await
            .with_context(|| format!("parse {endpoint} response"))
    }
}

pub async fn run_lookup(args: LookupArgs) -> anyhow::Result<()> {
    let client = CatalogClient::from_args(&args.catalog)?;
    let raw = client
        .lookup(args.id.trim())
        .await
        .context("catalog lookup")?
        .ok_or_else(|| anyhow::anyhow!("recipe not found: {}", args.id))?;
    let recipe = normalize(&raw)?;
    tracing::debug!(meal_id = %recipe.id, ingredients = recipe.ingredients.len(), "normalized");

    println!("{}", serde_json::to_string_pretty(&recipe)?);
    Ok(())
}
