use log::{info, warn};
use mongodb::bson::{Document, doc};
use mongodb::{Client, options::ClientOptions};
use std::error::Error;

pub struct Database {
    pub client: Client,
}

impl Database {
    pub async fn init(mongodb_uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(mongodb_uri).await?;
        client_options.app_name = Some("chilli-backend".to_string());

        let client = Client::with_options(client_options)?;

        // Ping the server so a bad URI fails at startup rather than on the first request
        client
            .database("admin")
            .run_command(doc! {"ping": 1})
            .await?;

        info!("Connected successfully to MongoDB");

        Ok(Self { client })
    }
}

pub async fn connect_to_mongo(mongodb_uri: &str) -> Result<Client, Box<dyn Error>> {
    let database = Database::init(mongodb_uri).await.map_err(|e| {
        log::error!("Failed to initialize database: {:?}", e);
        e
    })?;
    Ok(database.client)
}

/// Whether the deployment can run multi-document transactions. Replica set
/// members and mongos routers can; a standalone server cannot.
pub async fn supports_transactions(client: &Client) -> bool {
    match client
        .database("admin")
        .run_command(doc! {"hello": 1})
        .await
    {
        Ok(reply) => is_transactional_topology(&reply),
        Err(e) => {
            warn!("Could not read MongoDB topology: {}", e);
            false
        }
    }
}

fn is_transactional_topology(hello: &Document) -> bool {
    hello.contains_key("setName") || matches!(hello.get_str("msg"), Ok("isdbgrid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_sets_and_routers_support_transactions() {
        assert!(is_transactional_topology(
            &doc! { "isWritablePrimary": true, "setName": "rs0" }
        ));
        assert!(is_transactional_topology(
            &doc! { "isWritablePrimary": true, "msg": "isdbgrid" }
        ));
    }

    #[test]
    fn standalone_does_not() {
        assert!(!is_transactional_topology(
            &doc! { "isWritablePrimary": true, "maxWireVersion": 21 }
        ));
    }
}
