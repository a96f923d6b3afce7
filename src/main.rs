use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use env_logger::Env;
use log::{error, info, warn};

mod chat;
mod config;
mod database;
mod middleware;
mod recipe;
mod router;
#[cfg(test)]
mod test_support;
mod uploader;
mod user;
mod utils;

use chat::service::ChatService;
use config::AppConfig;
use middleware::error_handler::{handle_error, json_config};
use middleware::not_found::not_found;
use recipe::service::RecipeService;
use router::index::routes;
use user::service::UserService;
use utils::gemini::{GeminiClient, TextGenerator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::other(e)
    })?;

    let mongo_client = database::connect_to_mongo(&config.mongodb_uri)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let redis = match &config.redis_url {
        Some(url) => match database::connect_to_redis(url).await {
            Ok(service) => Some(service),
            Err(e) => {
                warn!("Redis unavailable, OTP rate limiting disabled: {}", e);
                None
            }
        },
        None => {
            info!("REDIS_URL not set, OTP rate limiting disabled");
            None
        }
    };

    let gemini = match GeminiClient::new() {
        Ok(client) => Some(Box::new(client) as Box<dyn TextGenerator>),
        Err(e) => {
            warn!("AI chat disabled: {}", e);
            None
        }
    };

    let transactions = database::supports_transactions(&mongo_client).await;
    if !transactions {
        warn!("MongoDB is not a replica set; follow edges are saved without a transaction");
    }

    let user_service = web::Data::new(
        UserService::new(&mongo_client, &config, redis).with_transactions(transactions),
    );
    let recipe_service = web::Data::new(RecipeService::new(
        &mongo_client,
        &config.mongodb_database,
    ));
    let chat_service = web::Data::new(ChatService::new(
        &mongo_client,
        &config.mongodb_database,
        gemini,
    ));

    let bind_address = (config.host.clone(), config.port);
    let config = web::Data::new(config);

    info!(
        "Starting server on http://{}:{}",
        bind_address.0, bind_address.1
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(user_service.clone())
            .app_data(recipe_service.clone())
            .app_data(chat_service.clone())
            .app_data(json_config())
            .configure(routes)
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::NOT_FOUND, not_found)
                    .default_handler(handle_error),
            )
    })
    .bind(bind_address)?
    .run()
    .await?;

    info!("Server has stopped");

    Ok(())
}
