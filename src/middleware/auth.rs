use crate::config::AppConfig;
use crate::user::model::User;
use crate::user::service::UserService;
use crate::utils::error::CustomError;
use actix_web::{Error, HttpMessage, dev::ServiceRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub exp: usize,
}

/// Sign a token identifying `user_id`.
pub fn create_token(user_id: &str, secret: &str, expiry_days: i64) -> Result<String, CustomError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(expiry_days))
        .ok_or_else(|| CustomError::InternalServerError("Invalid token expiry".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        id: user_id.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| CustomError::InternalServerError("Token generation failed".to_string()))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, CustomError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| CustomError::UnauthenticatedError("Invalid or expired token".to_string()))
}

/// Bearer validator for scopes that are wrapped as a whole.
pub async fn verify_token(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let config = match req.app_data::<web::Data<AppConfig>>() {
        Some(config) => config.clone(),
        None => {
            return Err((
                CustomError::InternalServerError("Configuration missing".to_string()).into(),
                req,
            ));
        }
    };

    match decode_token(credentials.token(), &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(e) => Err((e.into(), req)),
    }
}

/// Decode the bearer token of a handler that takes `Option<BearerAuth>`.
pub fn claims_from_bearer(
    credentials: Option<&BearerAuth>,
    config: &AppConfig,
) -> Result<Claims, CustomError> {
    let credentials = credentials.ok_or_else(|| {
        CustomError::UnauthenticatedError("Authorization token is required".to_string())
    })?;

    decode_token(credentials.token(), &config.jwt_secret)
}

/// Resolve the caller to a stored, unblocked user.
pub async fn require_user(
    credentials: Option<&BearerAuth>,
    config: &AppConfig,
    user_service: &UserService,
) -> Result<User, CustomError> {
    let claims = claims_from_bearer(credentials, config)?;
    let user_id = ObjectId::parse_str(&claims.id)
        .map_err(|_| CustomError::UnauthenticatedError("Invalid user id in token".to_string()))?;

    let user = user_service
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| CustomError::UnauthenticatedError("User no longer exists".to_string()))?;

    if user.is_blocked {
        return Err(CustomError::ForbiddenError(
            "Your account has been blocked".to_string(),
        ));
    }

    Ok(user)
}

/// Like [`require_user`], additionally requiring the admin flag on the stored record.
pub async fn require_admin(
    credentials: Option<&BearerAuth>,
    config: &AppConfig,
    user_service: &UserService,
) -> Result<User, CustomError> {
    let user = require_user(credentials, config, user_service).await?;

    if !user.is_admin {
        return Err(CustomError::ForbiddenError(
            "Admin privileges required".to_string(),
        ));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_the_user_id() {
        let token = create_token("64b7f0c2a1b2c3d4e5f60718", "test-secret", 30).unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();

        assert_eq!(claims.id, "64b7f0c2a1b2c3d4e5f60718");
        assert!(claims.exp > chrono::Utc::now().timestamp() as usize);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = create_token("64b7f0c2a1b2c3d4e5f60718", "test-secret", 30).unwrap();

        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(CustomError::UnauthenticatedError(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token("64b7f0c2a1b2c3d4e5f60718", "test-secret", -2).unwrap();

        assert!(decode_token(&token, "test-secret").is_err());
    }

    #[test]
    fn missing_bearer_is_unauthenticated() {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 5000,
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_database: "chilli_test".into(),
            jwt_secret: "test-secret".into(),
            jwt_expiry_days: 30,
            redis_url: None,
        };

        assert!(matches!(
            claims_from_bearer(None, &config),
            Err(CustomError::UnauthenticatedError(_))
        ));
    }
}
