use super::controller::{
    delete_user, follow_user, get_user, get_users, login_user, mark_notifications_read,
    register_user, send_otp, toggle_block, toggle_verify, unfollow_user, update_profile,
    verify_otp,
};
use actix_web::web;

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(get_users))
            .route("/register", web::post().to(register_user))
            .route("/login", web::post().to(login_user))
            .route("/login/otp/send", web::post().to(send_otp))
            .route("/login/otp/verify", web::post().to(verify_otp))
            .route("/profile/{id}", web::put().to(update_profile))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::delete().to(delete_user))
            .route("/{id}/follow", web::post().to(follow_user))
            .route("/{id}/unfollow", web::post().to(unfollow_user))
            .route("/{id}/verify", web::put().to(toggle_verify))
            .route("/{id}/block", web::put().to(toggle_block))
            .route("/{id}/notifications/read", web::put().to(mark_notifications_read)),
    );
}
