use super::controller::{chat, delete_chat, get_history};
use actix_web::web;

pub fn chat_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/ai")
            .route("/chat", web::post().to(chat))
            .route("/history/{user_id}", web::get().to(get_history))
            .route("/history/{chat_id}", web::delete().to(delete_chat)),
    );
}
