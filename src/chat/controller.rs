use crate::chat::model::{AiChatResponse, ChatRequest};
use crate::chat::service::ChatService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{parse_optional_body_id, parse_path_id, service_name};
use actix_web::{HttpResponse, web};
use serde_json::json;

/// POST /api/ai/chat
pub async fn chat(
    chat_service: web::Data<ChatService>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, CustomError> {
    let request = body.into_inner();
    let message = request.message.trim();

    if message.is_empty() {
        return Err(CustomError::BadRequestError("Message is required".to_string()));
    }

    let user_id = parse_optional_body_id(request.user_id.as_deref(), "userId")?;
    let chat_id = parse_optional_body_id(request.chat_id.as_deref(), "chatId")?;

    let (reply, stored_chat) = chat_service.chat(message, user_id, chat_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Reply generated",
        "httpStatusCode": 200,
        "service": service_name(),
        "reply": reply,
        "chatId": stored_chat.map(|id| id.to_hex())
    })))
}

/// GET /api/ai/history/{user_id}
pub async fn get_history(
    chat_service: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_path_id(&path.into_inner(), "User")?;

    let chats: Vec<AiChatResponse> = chat_service
        .history(&user_id)
        .await?
        .into_iter()
        .map(AiChatResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Chat history fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "count": chats.len(),
        "chats": chats
    })))
}

/// DELETE /api/ai/history/{chat_id}
pub async fn delete_chat(
    chat_service: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let chat_id = parse_path_id(&path.into_inner(), "Chat")?;
    chat_service.delete_chat(&chat_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Chat deleted successfully",
        "httpStatusCode": 200,
        "service": service_name(),
    })))
}
