//! Shared fixtures for tests that talk to MongoDB.

use crate::config::AppConfig;
use mongodb::Client;
use mongodb::bson::oid::ObjectId;

/// Settings pointing at a throwaway database. `MONGODB_TEST_URI` overrides
/// the local default.
pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        mongodb_uri: std::env::var("MONGODB_TEST_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
        mongodb_database: format!("chilli_test_{}", ObjectId::new().to_hex()),
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_days: 1,
        redis_url: None,
    }
}

/// A client whose server can never be selected; every operation fails fast.
pub async fn unreachable_client() -> Client {
    Client::with_uri_str(
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
    )
    .await
    .unwrap()
}

/// A client for the test server plus its fresh database name.
pub async fn live_client() -> (Client, AppConfig) {
    let config = test_config();
    let client = Client::with_uri_str(&config.mongodb_uri).await.unwrap();
    (client, config)
}

pub async fn drop_database(client: &Client, config: &AppConfig) {
    client
        .database(&config.mongodb_database)
        .drop()
        .await
        .unwrap();
}

/// Text generator that always answers with the same reply.
pub struct CannedReply(pub &'static str);

#[async_trait::async_trait]
impl crate::utils::gemini::TextGenerator for CannedReply {
    async fn generate(&self, _prompt: &str) -> Result<String, String> {
        Ok(self.0.to_string())
    }
}
