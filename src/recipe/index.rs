use super::controller::{
    add_review, create_recipe, delete_recipe, get_pending_recipes, get_recipe, get_recipes,
    reset_reviews, toggle_like, update_recipe,
};
use actix_web::web;

pub fn recipe_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/recipes")
            .route("", web::get().to(get_recipes))
            .route("", web::post().to(create_recipe))
            .route("/pending", web::get().to(get_pending_recipes))
            .route("/{id}", web::get().to(get_recipe))
            .route("/{id}", web::put().to(update_recipe))
            .route("/{id}", web::delete().to(delete_recipe))
            .route("/{id}/like", web::post().to(toggle_like))
            .route("/{id}/reviews", web::post().to(add_review))
            .route("/{id}/reviews", web::delete().to(reset_reviews)),
    );
}
