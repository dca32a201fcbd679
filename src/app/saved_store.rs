use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::app::model::{SavedRecipe, sort_newest_first};

/// Per-user collection of saved recipes.
///
/// `put` overwrites any record with the same `(owner_id, meal_id)`; `delete` succeeds
/// whether or not the record exists.
#[async_trait]
pub trait SavedRecipeStore: Send + Sync {
    async fn put(&self, recipe: &SavedRecipe) -> anyhow::Result<()>;
    /// Newest first by `saved_at`.
    async fn list(&self, owner_id: &str) -> anyhow::Result<Vec<SavedRecipe>>;
    async fn delete(&self, owner_id: &str, meal_id: &str) -> anyhow::Result<()>;
}

/// Stores each record as `<base>/users/<owner>/saved_recipes/<meal>.json`.
#[derive(Debug, Clone)]
pub struct LocalFsSavedRecipeStore {
    base_dir: PathBuf,
}

impl LocalFsSavedRecipeStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn collection_dir(&self, owner_id: &str) -> PathBuf {
        self.base_dir
            .join("users")
            .join(owner_id)
            .join("saved_recipes")
    }

    fn recipe_json_path(&self, owner_id: &str, meal_id: &str) -> PathBuf {
        self.collection_dir(owner_id).join(format!("{meal_id}.json"))
    }
}

#[async_trait]
impl SavedRecipeStore for LocalFsSavedRecipeStore {
    async fn put(&self, recipe: &SavedRecipe) -> anyhow::Result<()> {
        let path = self.recipe_json_path(&recipe.owner_id, &recipe.meal_id);
        write_json_atomic(&path, recipe)
            .await
            .with_context(|| format!("write saved recipe: {}", path.display()))
    }

    async fn list(&self, owner_id: &str) -> anyhow::Result<Vec<SavedRecipe>> {
        let dir_path = self.collection_dir(owner_id);
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read dir: {}", dir_path.display()));
            }
        };

        let mut recipes = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(recipe) = read_json::<SavedRecipe>(&path)
                .await
                .with_context(|| format!("read: {}", path.display()))?
            else {
                continue;
            };
            recipes.push(recipe);
        }

        sort_newest_first(&mut recipes);
        Ok(recipes)
    }

    async fn delete(&self, owner_id: &str, meal_id: &str) -> anyhow::Result<()> {
        let path = self.recipe_json_path(owner_id, meal_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove: {}", path.display())),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    // Temp files end in `.tmp.<uuid>` so `list` never picks them up.
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
