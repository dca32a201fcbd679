use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Json;
use axum::routing::{delete, get, post};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::app::error::{ApiError, INVALID_TOKEN_MESSAGE, MISSING_HEADER_MESSAGE};
use crate::app::model::{SaveRecipeRequest, SavedRecipe, validate_document_id};
use crate::auth::{Identity, bearer_token};
use crate::config::FirebaseWebConfig;
use crate::recipe::normalize;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/config/firebase", get(firebase_config))
        .route("/api/auth/verify", post(verify_token))
        .route("/api/recipes/ingredients", get(list_ingredients))
        .route("/api/recipes/search", get(search_by_ingredient))
        .route("/api/recipes/detail/:meal_id", get(recipe_detail))
        .route("/api/recipes/save", post(save_recipe))
        .route("/api/recipes/saved", get(list_saved_recipes))
        .route("/api/recipes/saved/:meal_id", delete(delete_saved_recipe))
        .with_state(state)
}

/// Caller identity of a request carrying a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Err(ApiError::Unauthorized(MISSING_HEADER_MESSAGE));
        };
        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized(INVALID_TOKEN_MESSAGE))?;

        let identity = state.verifier.verify(token).await?;
        Ok(Self(identity))
    }
}

/// `Json` body extractor whose rejections use the API error body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Path` extractor whose rejections use the API error body.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Dish Recommender API is running",
    }))
}

async fn firebase_config(State(state): State<AppState>) -> Json<FirebaseWebConfig> {
    Json(state.firebase_config.as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct VerifyTokenRequest {
    token: String,
}

async fn verify_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyTokenRequest>,
) -> Result<Json<Value>, ApiError> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized(INVALID_TOKEN_MESSAGE));
    }

    let identity = state.verifier.verify(token).await?;
    tracing::debug!(uid = %identity.uid, "token verified");
    Ok(Json(json!({
        "success": true,
        "user": {
            "uid": identity.uid,
            "email": identity.email,
            "email_verified": identity.email_verified,
        },
    })))
}

async fn list_ingredients(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let ingredients = state
        .catalog
        .list_ingredients()
        .await
        .map_err(ApiError::upstream("Error fetching ingredients"))?;

    Ok(Json(json!({
        "success": !ingredients.is_empty(),
        "ingredients": ingredients,
    })))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    ingredient: String,
}

async fn search_by_ingredient(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let ingredient = q.ingredient.trim();
    if ingredient.is_empty() {
        return Err(ApiError::BadRequest("ingredient is required".to_string()));
    }

    let meals = state
        .catalog
        .filter_by_ingredient(ingredient)
        .await
        .map_err(ApiError::upstream("Error searching recipes"))?;
    tracing::debug!(ingredient, count = meals.len(), "searched catalog");

    if meals.is_empty() {
        return Ok(Json(json!({
            "success": false,
            "meals": [],
            "message": "No recipes found for this ingredient",
        })));
    }
    Ok(Json(json!({ "success": true, "meals": meals })))
}

async fn recipe_detail(
    State(state): State<AppState>,
    ApiPath(meal_id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let meal_id = meal_id.trim();
    validate_document_id("meal_id", meal_id).map_err(ApiError::BadRequest)?;

    let Some(raw) = state
        .catalog
        .lookup(meal_id)
        .await
        .map_err(ApiError::upstream("Error fetching recipe details"))?
    else {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    };

    let recipe = normalize(&raw).inspect_err(|err| {
        tracing::warn!(meal_id, field = err.field, "catalog returned a malformed record");
    })?;
    Ok(Json(json!({ "success": true, "recipe": recipe })))
}

async fn save_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(mut req): ApiJson<SaveRecipeRequest>,
) -> Result<Json<Value>, ApiError> {
    // Same key rule as the detail and delete paths.
    req.meal_id = req.meal_id.trim().to_owned();
    validate_document_id("meal_id", &req.meal_id).map_err(ApiError::BadRequest)?;
    validate_document_id("uid", &user.uid).map_err(ApiError::BadRequest)?;

    let recipe = SavedRecipe::from_request(req, user.uid, chrono::Utc::now());
    state
        .store
        .put(&recipe)
        .await
        .map_err(ApiError::upstream("Error saving recipe"))?;
    tracing::info!(uid = %recipe.owner_id, meal_id = %recipe.meal_id, "recipe saved");

    Ok(Json(json!({
        "success": true,
        "message": "Recipe saved successfully",
    })))
}

async fn list_saved_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    validate_document_id("uid", &user.uid).map_err(ApiError::BadRequest)?;

    let recipes = state
        .store
        .list(&user.uid)
        .await
        .map_err(ApiError::upstream("Error fetching saved recipes"))?;
    Ok(Json(json!({ "success": true, "recipes": recipes })))
}

async fn delete_saved_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(meal_id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let meal_id = meal_id.trim();
    validate_document_id("meal_id", meal_id).map_err(ApiError::BadRequest)?;
    validate_document_id("uid", &user.uid).map_err(ApiError::BadRequest)?;

    state
        .store
        .delete(&user.uid, meal_id)
        .await
        .map_err(ApiError::upstream("Error deleting recipe"))?;
    tracing::info!(uid = %user.uid, meal_id = %meal_id, "saved recipe deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Recipe deleted successfully",
    })))
}
