use crate::config::AppConfig;
use crate::middleware::auth::{require_admin, require_user};
use crate::recipe::model::{
    CreateRecipeRequest, DeleteRecipeRequest, LikeRequest, Recipe, RecipeResponse, ReviewRequest,
    UpdateRecipeRequest,
};
use crate::recipe::service::RecipeService;
use crate::user::service::UserService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{parse_body_id, parse_path_id, service_name};
use actix_web::{HttpResponse, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde_json::json;

fn into_responses(recipes: Vec<Recipe>) -> Vec<RecipeResponse> {
    recipes.into_iter().map(RecipeResponse::from).collect()
}

/// GET /api/recipes
pub async fn get_recipes(
    recipe_service: web::Data<RecipeService>,
) -> Result<HttpResponse, CustomError> {
    let recipes = into_responses(recipe_service.list_approved().await?);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Recipes fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "count": recipes.len(),
        "recipes": recipes
    })))
}

/// GET /api/recipes/pending
pub async fn get_pending_recipes(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    recipe_service: web::Data<RecipeService>,
) -> Result<HttpResponse, CustomError> {
    require_admin(auth.as_ref(), &config, &user_service).await?;

    let recipes = into_responses(recipe_service.list_pending().await?);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Pending recipes fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "count": recipes.len(),
        "recipes": recipes
    })))
}

/// GET /api/recipes/{id}
pub async fn get_recipe(
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    let recipe = recipe_service.get(&recipe_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Recipe fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "recipe": RecipeResponse::from(recipe)
    })))
}

/// POST /api/recipes
pub async fn create_recipe(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    recipe_service: web::Data<RecipeService>,
    body: web::Json<CreateRecipeRequest>,
) -> Result<HttpResponse, CustomError> {
    let submitter = require_user(auth.as_ref(), &config, &user_service).await?;

    let recipe = recipe_service
        .create(body.into_inner(), &submitter)
        .await?;

    let message = if recipe.is_pending() {
        "Recipe submitted for review"
    } else {
        "Recipe published successfully"
    };

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": message,
        "httpStatusCode": 201,
        "service": service_name(),
        "recipe": RecipeResponse::from(recipe)
    })))
}

/// PUT /api/recipes/{id}
///
/// Authors may edit their own recipes; only admins may change the status.
pub async fn update_recipe(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
    body: web::Json<UpdateRecipeRequest>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    let caller = require_user(auth.as_ref(), &config, &user_service).await?;
    let update = body.into_inner();

    if !caller.is_admin {
        if update.changes_status() {
            return Err(CustomError::ForbiddenError(
                "Only admins can moderate recipes".to_string(),
            ));
        }

        let recipe = recipe_service.get(&recipe_id).await?;
        if recipe.author.is_none() || recipe.author != caller.id {
            return Err(CustomError::ForbiddenError(
                "You can only edit your own recipes".to_string(),
            ));
        }
    }

    let recipe = recipe_service.update(&recipe_id, update).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Recipe updated successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "recipe": RecipeResponse::from(recipe)
    })))
}

/// DELETE /api/recipes/{id}
///
/// Deleting a pending recipe rejects it; the optional `reason` is passed on
/// to the author.
pub async fn delete_recipe(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
    body: Option<web::Json<DeleteRecipeRequest>>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    let caller = require_user(auth.as_ref(), &config, &user_service).await?;

    if !caller.is_admin {
        let recipe = recipe_service.get(&recipe_id).await?;
        if recipe.author.is_none() || recipe.author != caller.id {
            return Err(CustomError::ForbiddenError(
                "You can only delete your own recipes".to_string(),
            ));
        }
    }

    let reason = body
        .map(|b| b.into_inner())
        .unwrap_or_default()
        .reason
        .filter(|reason| !reason.trim().is_empty());

    let notified = recipe_service
        .delete(&recipe_id, reason.as_deref(), caller.is_admin)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Recipe deleted successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "authorNotified": notified
    })))
}

/// POST /api/recipes/{id}/like
pub async fn toggle_like(
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
    body: web::Json<LikeRequest>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    let user_id = parse_body_id(body.user_id.as_deref(), "userId")?;

    let (recipe, liked) = recipe_service.toggle_like(&recipe_id, user_id).await?;
    let message = if liked { "Recipe liked" } else { "Recipe unliked" };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "httpStatusCode": 200,
        "service": service_name(),
        "liked": liked,
        "likes": recipe.likes.to_hex(),
        "likesCount": recipe.likes.len()
    })))
}

/// POST /api/recipes/{id}/reviews
pub async fn add_review(
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    let review = body.into_inner();
    let user_id = parse_body_id(review.user_id.as_deref(), "userId")?;

    let recipe = recipe_service
        .submit_review(&recipe_id, user_id, review)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Review saved",
        "httpStatusCode": 201,
        "service": service_name(),
        "rating": recipe.rating,
        "numReviews": recipe.num_reviews,
        "recipe": RecipeResponse::from(recipe)
    })))
}

/// DELETE /api/recipes/{id}/reviews
pub async fn reset_reviews(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    recipe_service: web::Data<RecipeService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let recipe_id = parse_path_id(&path.into_inner(), "Recipe")?;
    require_admin(auth.as_ref(), &config, &user_service).await?;

    let recipe = recipe_service.reset_ratings(&recipe_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Ratings reset successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "recipe": RecipeResponse::from(recipe)
    })))
}
