//! Cloud Firestore REST backend for saved recipes.
//!
//! Documents live at `users/{uid}/saved_recipes/{meal_id}`. Values are encoded in
//! Firestore's typed JSON form (`stringValue`, `mapValue`, ...); `saved_at` is written
//! as a `timestampValue` so the server can order by it.

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::app::model::SavedRecipe;
use crate::app::saved_store::SavedRecipeStore;
use crate::http;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const COLLECTION_ID: &str = "saved_recipes";

#[derive(Debug, Clone)]
enum Credentials {
    /// Access token from the GCE/Cloud Run metadata server.
    Metadata,
    /// The emulator accepts the fixed `owner` token.
    Emulator,
}

#[derive(Debug, Clone)]
pub struct FirestoreSavedRecipeStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    credentials: Credentials,
}

impl FirestoreSavedRecipeStore {
    pub fn new(project_id: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client_with_timeout(timeout).context("build firestore http client")?,
            base_url: FIRESTORE_BASE_URL.to_owned(),
            project_id: project_id.into(),
            credentials: Credentials::Metadata,
        })
    }

    /// Talks to a local emulator at `host` (`host:port`).
    pub fn with_emulator(
        project_id: impl Into<String>,
        host: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client_with_timeout(timeout).context("build firestore http client")?,
            base_url: format!("http://{}/v1", host.trim_end_matches('/')),
            project_id: project_id.into(),
            credentials: Credentials::Emulator,
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn user_document_url(&self, owner_id: &str) -> anyhow::Result<url::Url> {
        let mut url = url::Url::parse(&self.documents_root()).context("parse firestore url")?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("firestore url cannot be a base"))?
            .extend(["users", owner_id]);
        Ok(url)
    }

    fn recipe_document_url(&self, owner_id: &str, meal_id: &str) -> anyhow::Result<url::Url> {
        let mut url = self.user_document_url(owner_id)?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("firestore url cannot be a base"))?
            .extend([COLLECTION_ID, meal_id]);
        Ok(url)
    }

    async fn bearer(&self) -> anyhow::Result<String> {
        match self.credentials {
            Credentials::Emulator => Ok("owner".to_owned()),
            Credentials::Metadata => self.metadata_access_token().await,
        }
    }

    async fn metadata_access_token(&self) -> anyhow::Result<String> {
        #[derive(Debug, serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let resp = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("request metadata access token")?;
        if !resp.status().is_success() {
            anyhow::bail!("metadata token request failed ({})", resp.status());
        }
        let token: TokenResponse = resp.json().await.context("parse metadata token json")?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SavedRecipeStore for FirestoreSavedRecipeStore {
    async fn put(&self, recipe: &SavedRecipe) -> anyhow::Result<()> {
        let url = self.recipe_document_url(&recipe.owner_id, &recipe.meal_id)?;
        let body = serde_json::json!({ "fields": recipe_to_fields(recipe)? });

        // PATCH without an update mask replaces the whole document, creating it if needed.
        let resp = self
            .client
            .patch(url.clone())
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("PATCH {url}"))?;
        ensure_success(resp, "write saved recipe").await?;
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> anyhow::Result<Vec<SavedRecipe>> {
        let mut url = self.user_document_url(owner_id)?;
        let path = format!("{}:runQuery", url.path());
        url.set_path(&path);

        let body = serde_json::json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION_ID }],
                "orderBy": [{
                    "field": { "fieldPath": "saved_at" },
                    "direction": "DESCENDING",
                }],
            }
        });
        let resp = self
            .client
            .post(url.clone())
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let resp = ensure_success(resp, "query saved recipes").await?;
        let rows: Vec<Value> = resp.json().await.context("parse runQuery response")?;

        let mut recipes = Vec::new();
        for row in rows {
            // Rows without a document carry only a read time.
            let Some(fields) = row.pointer("/document/fields").and_then(Value::as_object) else {
                continue;
            };
            recipes.push(recipe_from_fields(fields)?);
        }
        Ok(recipes)
    }

    async fn delete(&self, owner_id: &str, meal_id: &str) -> anyhow::Result<()> {
        let url = self.recipe_document_url(owner_id, meal_id)?;
        let resp = self
            .client
            .delete(url.clone())
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .with_context(|| format!("DELETE {url}"))?;
        ensure_success(resp, "delete saved recipe").await?;
        Ok(())
    }
}

async fn ensure_success(resp: reqwest::Response, what: &str) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let raw = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&raw)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_owned))
        .unwrap_or(raw);
    anyhow::bail!("{what}: firestore error ({status}): {message}")
}

fn recipe_to_fields(recipe: &SavedRecipe) -> anyhow::Result<Map<String, Value>> {
    let Value::Object(plain) = serde_json::to_value(recipe).context("serialize saved recipe")?
    else {
        anyhow::bail!("saved recipe did not serialize to an object");
    };

    let mut fields: Map<String, Value> = plain
        .into_iter()
        .map(|(key, value)| (key, encode_value(&value)))
        .collect();
    fields.insert(
        "saved_at".to_owned(),
        serde_json::json!({
            "timestampValue": recipe.saved_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        }),
    );
    Ok(fields)
}

fn recipe_from_fields(fields: &Map<String, Value>) -> anyhow::Result<SavedRecipe> {
    let plain: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| -> anyhow::Result<(String, Value)> {
            Ok((key.clone(), decode_value(value)?))
        })
        .collect::<anyhow::Result<_>>()?;
    serde_json::from_value(Value::Object(plain)).context("decode saved recipe document")
}

/// Plain JSON -> Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => serde_json::json!({ "integerValue": i.to_string() }),
            None => serde_json::json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            serde_json::json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect();
            serde_json::json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Firestore typed value -> plain JSON. Timestamps come back as RFC 3339 strings.
pub fn decode_value(value: &Value) -> anyhow::Result<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        anyhow::bail!("firestore value is not a single-key object: {value}");
    };

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" => inner.clone(),
        "integerValue" => {
            let i = match inner {
                Value::String(s) => s
                    .parse::<i64>()
                    .with_context(|| format!("parse integerValue: {s}"))?,
                other => other
                    .as_i64()
                    .ok_or_else(|| anyhow::anyhow!("invalid integerValue: {other}"))?,
            };
            Value::from(i)
        }
        // Empty arrays and maps omit their inner key entirely.
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values
                    .iter()
                    .map(decode_value)
                    .collect::<anyhow::Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            Value::Array(values)
        }
        "mapValue" => {
            let mut map = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (key, value) in fields {
                    map.insert(key.clone(), decode_value(value)?);
                }
            }
            Value::Object(map)
        }
        other => anyhow::bail!("unsupported firestore value type: {other}"),
    };
    Ok(decoded)
}
