use crate::config::AppConfig;
use crate::middleware::auth::require_admin;
use crate::user::model::{CreateUserRequest, FollowRequest, UpdateProfileRequest, User, UserResponse};
use crate::user::service::UserService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{login_entry_from_request, parse_body_id, parse_path_id, service_name};
use crate::utils::model::{LoginRequests, OtpSendRequest, OtpVerifyRequest};
use actix_web::{HttpRequest, HttpResponse, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde_json::json;

fn authenticated(
    user_service: &UserService,
    user: User,
    status: u16,
    message: &str,
) -> Result<HttpResponse, CustomError> {
    let token = user_service.issue_token(&user)?;
    let body = json!({
        "success": true,
        "message": message,
        "httpStatusCode": status,
        "service": service_name(),
        "user": UserResponse::from(user),
        "token": token
    });

    Ok(if status == 201 {
        HttpResponse::Created().json(body)
    } else {
        HttpResponse::Ok().json(body)
    })
}

/// POST /api/users/register
pub async fn register_user(
    user_service: web::Data<UserService>,
    user_info: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, CustomError> {
    let user_info = user_info.into_inner();
    let user = user_service
        .register(user_info.name, user_info.email, user_info.password)
        .await?;

    authenticated(&user_service, user, 201, "User registered successfully")
}

/// POST /api/users/login
pub async fn login_user(
    req: HttpRequest,
    user_service: web::Data<UserService>,
    login_info: web::Json<LoginRequests>,
) -> Result<HttpResponse, CustomError> {
    let user = user_service
        .login(
            &login_info.email,
            &login_info.password,
            login_entry_from_request(&req),
        )
        .await?;

    authenticated(&user_service, user, 200, "Login successful")
}

/// POST /api/users/login/otp/send
pub async fn send_otp(
    user_service: web::Data<UserService>,
    body: web::Json<OtpSendRequest>,
) -> Result<HttpResponse, CustomError> {
    user_service.send_login_otp(&body.email).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP sent to your email",
        "httpStatusCode": 200,
        "service": service_name(),
    })))
}

/// POST /api/users/login/otp/verify
pub async fn verify_otp(
    req: HttpRequest,
    user_service: web::Data<UserService>,
    body: web::Json<OtpVerifyRequest>,
) -> Result<HttpResponse, CustomError> {
    let user = user_service
        .verify_login_otp(&body.email, &body.otp, login_entry_from_request(&req))
        .await?;

    authenticated(&user_service, user, 200, "Login successful")
}

/// GET /api/users
pub async fn get_users(user_service: web::Data<UserService>) -> Result<HttpResponse, CustomError> {
    let users: Vec<UserResponse> = user_service
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Users fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "count": users.len(),
        "users": users
    })))
}

/// GET /api/users/{id}
pub async fn get_user(
    user_service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    let user = user_service.get_user(&user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "user": UserResponse::from(user)
    })))
}

/// PUT /api/users/profile/{id}
pub async fn update_profile(
    user_service: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    let user = user_service
        .update_profile(&user_id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "user": UserResponse::from(user)
    })))
}

/// POST /api/users/{id}/follow
pub async fn follow_user(
    user_service: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Json<FollowRequest>,
) -> Result<HttpResponse, CustomError> {
    let target_id = parse_path_id(&path.into_inner(), "User")?;
    let actor_id = parse_body_id(body.current_user_id.as_deref(), "currentUserId")?;

    let outcome = user_service.follow(&target_id, &actor_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User followed",
        "httpStatusCode": 200,
        "service": service_name(),
        "result": outcome
    })))
}

/// POST /api/users/{id}/unfollow
pub async fn unfollow_user(
    user_service: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Json<FollowRequest>,
) -> Result<HttpResponse, CustomError> {
    let target_id = parse_path_id(&path.into_inner(), "User")?;
    let actor_id = parse_body_id(body.current_user_id.as_deref(), "currentUserId")?;

    let outcome = user_service.unfollow(&target_id, &actor_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User unfollowed",
        "httpStatusCode": 200,
        "service": service_name(),
        "result": outcome
    })))
}

/// PUT /api/users/{id}/verify
pub async fn toggle_verify(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    require_admin(auth.as_ref(), &config, &user_service).await?;

    let user = user_service.toggle_verify(&user_id).await?;
    let message = if user.is_verified {
        "User verified"
    } else {
        "User verification removed"
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "httpStatusCode": 200,
        "service": service_name(),
        "user": UserResponse::from(user)
    })))
}

/// PUT /api/users/{id}/block
pub async fn toggle_block(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    let admin = require_admin(auth.as_ref(), &config, &user_service).await?;

    if admin.id == Some(user_id) {
        return Err(CustomError::BadRequestError(
            "You cannot block yourself".to_string(),
        ));
    }

    let user = user_service.toggle_block(&user_id).await?;
    let message = if user.is_blocked {
        "User blocked"
    } else {
        "User unblocked"
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "httpStatusCode": 200,
        "service": service_name(),
        "user": UserResponse::from(user)
    })))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    auth: Option<BearerAuth>,
    config: web::Data<AppConfig>,
    user_service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    require_admin(auth.as_ref(), &config, &user_service).await?;

    user_service.delete_user(&user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully",
        "httpStatusCode": 200,
        "service": service_name(),
    })))
}

/// PUT /api/users/{id}/notifications/read
pub async fn mark_notifications_read(
    user_service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;
    let user = user_service.mark_notifications_read(&user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Notifications marked as read",
        "httpStatusCode": 200,
        "service": service_name(),
        "notifications": user.notifications
    })))
}
