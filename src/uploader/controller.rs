use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures_util::StreamExt;
use serde_json::json;

use crate::utils::error::CustomError;
use crate::utils::helpers::service_name;
use crate::utils::uploads::{FileUpload, FileValidator, MEDIA_FOLDER, UploadService, push_chunk};

/// First non-empty `file` field of the form. The file type is checked from
/// its name before the body is read, and reading stops once the size limit
/// for that type is passed.
async fn extract_file(mut payload: Multipart) -> Result<Option<FileUpload>, CustomError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            CustomError::BadRequestError(format!("Error reading multipart field: {}", e))
        })?;

        let Some(content_disposition) = field.content_disposition() else {
            continue;
        };

        if content_disposition.get_name() != Some("file") {
            continue;
        }

        let file_name = content_disposition
            .get_filename()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let content_type = field.content_type().map(|ct| ct.to_string());
        let validator = FileValidator::for_name(&file_name)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                CustomError::BadRequestError(format!("Error reading file chunk: {}", e))
            })?;
            push_chunk(&mut data, &chunk, validator.max_file_size)?;
        }

        if !data.is_empty() {
            return Ok(Some(FileUpload::new(file_name, data, content_type)));
        }
    }

    Ok(None)
}

/// POST /api/upload
pub async fn upload_media(payload: Multipart) -> Result<HttpResponse, CustomError> {
    let file = extract_file(payload)
        .await?
        .ok_or_else(|| CustomError::BadRequestError("No file provided".to_string()))?;

    let upload_service = UploadService::new()
        .map_err(|e| CustomError::InternalServerError(format!("Upload service error: {}", e)))?;

    let uploaded = upload_service
        .upload_media(file, Some(MEDIA_FOLDER))
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "url": uploaded.secure_url,
        "publicId": uploaded.public_id,
        "resourceType": uploaded.resource_type,
        "bytes": uploaded.bytes
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use serde_json::Value;

    const BOUNDARY: &str = "chilli-boundary";

    fn form(file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post(file_name: &str, data: &[u8]) -> (StatusCode, Value) {
        let app =
            test::init_service(App::new().route("/upload", web::post().to(upload_media))).await;
        let req = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(form(file_name, data))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn unsupported_types_are_refused_before_reading() {
        let (status, body) = post("menu.pdf", b"%PDF-1.7").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("Invalid file type 'pdf'")
        );
    }

    #[actix_web::test]
    async fn oversized_images_are_a_bad_request() {
        let data = vec![0u8; 10 * 1024 * 1024 + 1];
        let (status, body) = post("feast.jpg", &data).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Bad Request: File too large. Maximum size: 10 MB"
        );
    }
}
