use std::sync::LazyLock;

use actix_web::HttpRequest;
use actix_web::http::header::USER_AGENT;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use rand::Rng;
use regex::Regex;

use crate::user::model::LoginEntry;
use crate::utils::error::CustomError;

/// OTP expiration time in minutes
pub const OTP_EXPIRATION_MINUTES: i64 = 10;

/// Maximum OTP emails per address inside one rate limit window
pub const OTP_RATE_LIMIT_MAX: u64 = 5;

pub const OTP_RATE_LIMIT_WINDOW_SECONDS: u64 = 15 * 60;

static OBJECT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("object id pattern compiles"));

/// Generate a 6-digit OTP code
pub fn generate_otp_code() -> String {
    let mut rng = rand::rng();
    let code: u32 = rng.random_range(100000..=999999);
    code.to_string()
}

pub fn service_name() -> String {
    std::env::var("SERVICE_NAME").unwrap_or_else(|_| "chilli-backend".to_string())
}

pub fn is_object_id(raw: &str) -> bool {
    OBJECT_ID_PATTERN.is_match(raw)
}

/// Parse an id taken from the URL path. Anything that is not a 24 character
/// hex string is reported as a missing resource before the store is queried.
pub fn parse_path_id(raw: &str, resource: &str) -> Result<ObjectId, CustomError> {
    if !is_object_id(raw) {
        return Err(CustomError::NotFoundError(format!("{} not found", resource)));
    }

    ObjectId::parse_str(raw)
        .map_err(|_| CustomError::NotFoundError(format!("{} not found", resource)))
}

/// Parse a required id taken from a request body.
pub fn parse_body_id(raw: Option<&str>, field: &str) -> Result<ObjectId, CustomError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CustomError::BadRequestError(format!("{} is required", field)))?;

    ObjectId::parse_str(raw)
        .map_err(|_| CustomError::BadRequestError(format!("{} is not a valid id", field)))
}

/// Like [`parse_body_id`], but a missing or blank field is `None`.
pub fn parse_optional_body_id(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<ObjectId>, CustomError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_body_id(Some(value), field).map(Some),
        None => Ok(None),
    }
}

/// Build a login history entry from the client address and User-Agent header.
pub fn login_entry_from_request(req: &HttpRequest) -> LoginEntry {
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    let device = req
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    LoginEntry {
        ip,
        device,
        time: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn otp_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn path_ids_must_be_24_hex_characters() {
        assert!(parse_path_id("64b7f0c2a1b2c3d4e5f60718", "Recipe").is_ok());

        for raw in ["", "123", "64b7f0c2a1b2c3d4e5f6071z", "64b7f0c2a1b2c3d4e5f607189"] {
            match parse_path_id(raw, "Recipe") {
                Err(CustomError::NotFoundError(msg)) => assert_eq!(msg, "Recipe not found"),
                other => panic!("unexpected result for {:?}: {:?}", raw, other),
            }
        }
    }

    #[test]
    fn body_ids_are_required() {
        assert!(matches!(
            parse_body_id(None, "currentUserId"),
            Err(CustomError::BadRequestError(_))
        ));
        assert!(matches!(
            parse_body_id(Some("  "), "currentUserId"),
            Err(CustomError::BadRequestError(_))
        ));
        assert!(matches!(
            parse_body_id(Some("nope"), "userId"),
            Err(CustomError::BadRequestError(_))
        ));
        assert!(parse_body_id(Some("64b7f0c2a1b2c3d4e5f60718"), "userId").is_ok());
    }

    #[test]
    fn optional_body_ids_may_be_absent() {
        assert!(matches!(parse_optional_body_id(None, "chatId"), Ok(None)));
        assert!(matches!(parse_optional_body_id(Some(""), "chatId"), Ok(None)));
        assert!(matches!(
            parse_optional_body_id(Some("64b7f0c2a1b2c3d4e5f60718"), "chatId"),
            Ok(Some(_))
        ));
        assert!(parse_optional_body_id(Some("abc"), "chatId").is_err());
    }

    #[test]
    fn login_entry_reads_user_agent() {
        let req = TestRequest::default()
            .insert_header((USER_AGENT, "Mozilla/5.0"))
            .peer_addr("10.0.0.7:5000".parse().unwrap())
            .to_http_request();

        let entry = login_entry_from_request(&req);
        assert_eq!(entry.device, "Mozilla/5.0");
        assert!(entry.ip.starts_with("10.0.0.7"));
    }
}
