use crate::chat::index::chat_routes;
use crate::recipe::index::recipe_routes;
use crate::uploader::index::upload_routes;
use crate::user::index::user_routes;
use crate::utils::helpers::service_name;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

#[get("/")]
async fn home() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Welcome to the Chilli API",
        "httpStatusCode": StatusCode::OK.as_u16(),
        "service": service_name(),
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(user_routes);
    cfg.configure(recipe_routes);
    cfg.configure(chat_routes);
    cfg.configure(upload_routes);
    cfg.service(home);
}
