use crate::chat::model::{AiChat, message_timestamp, sous_chef_prompt};
use crate::utils::error::CustomError;
use crate::utils::gemini::TextGenerator;
use chrono::Local;
use futures_util::TryStreamExt;
use log::error;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, Collection};

pub struct ChatService {
    collection: Collection<AiChat>,
    generator: Option<Box<dyn TextGenerator>>,
}

impl ChatService {
    pub fn new(
        client: &Client,
        database: &str,
        generator: Option<Box<dyn TextGenerator>>,
    ) -> Self {
        let collection = client.database(database).collection::<AiChat>("aichats");
        ChatService {
            collection,
            generator,
        }
    }

    async fn ask(&self, message: &str) -> Result<String, CustomError> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            CustomError::InternalServerError(
                "AI service is not configured: GEMINI_API_KEY is required".to_string(),
            )
        })?;

        generator
            .generate(&sous_chef_prompt(message))
            .await
            .map_err(|e| {
                error!("AI provider call failed: {}", e);
                CustomError::InternalServerError(e)
            })
    }

    /// Ask the sous-chef. The exchange is stored only for identified users:
    /// appended to `chat_id` when it exists, otherwise in a new chat.
    /// Returns the reply and the id of the chat it was stored in, which is
    /// `None` when nothing was stored. A storage failure never loses the reply.
    pub async fn chat(
        &self,
        message: &str,
        user_id: Option<ObjectId>,
        chat_id: Option<ObjectId>,
    ) -> Result<(String, Option<ObjectId>), CustomError> {
        let reply = self.ask(message).await?;

        let Some(user_id) = user_id else {
            return Ok((reply, None));
        };

        match self.record_exchange(user_id, chat_id, message, &reply).await {
            Ok(stored_id) => Ok((reply, stored_id)),
            Err(e) => {
                error!("Failed to save chat for user {}: {}", user_id, e);
                Ok((reply, None))
            }
        }
    }

    async fn record_exchange(
        &self,
        user_id: ObjectId,
        chat_id: Option<ObjectId>,
        message: &str,
        reply: &str,
    ) -> Result<Option<ObjectId>, CustomError> {
        let timestamp = message_timestamp(Local::now());

        let existing = match chat_id {
            Some(chat_id) => self.collection.find_one(doc! { "_id": chat_id }).await?,
            None => None,
        };

        match existing {
            Some(mut chat) => {
                chat.push_exchange(message, reply, timestamp);
                self.collection
                    .replace_one(doc! { "_id": chat.id }, &chat)
                    .await?;
                Ok(chat.id)
            }
            None => {
                // Unknown or missing chat id starts a new thread
                let mut chat = AiChat::start(user_id, message);
                chat.push_exchange(message, reply, timestamp);
                let result = self.collection.insert_one(&chat).await?;
                Ok(result.inserted_id.as_object_id())
            }
        }
    }

    /// Chats of a user, newest first
    pub async fn history(&self, user_id: &ObjectId) -> Result<Vec<AiChat>, CustomError> {
        let cursor = self
            .collection
            .find(doc! { "userId": user_id })
            .sort(doc! { "createdAt": -1 })
            .await?;

        let chats: Vec<AiChat> = cursor.try_collect().await?;
        Ok(chats)
    }

    pub async fn delete_chat(&self, chat_id: &ObjectId) -> Result<(), CustomError> {
        let result = self.collection.delete_one(doc! { "_id": chat_id }).await?;

        if result.deleted_count == 0 {
            return Err(CustomError::NotFoundError("Chat not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::MessageType;
    use crate::test_support::{
        CannedReply as Canned, drop_database, live_client, unreachable_client,
    };
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn generate(&self, _prompt: &str) -> Result<String, String> {
            Err("provider unavailable".to_string())
        }
    }

    #[actix_web::test]
    async fn reply_survives_a_storage_failure() {
        let client = unreachable_client().await;
        let service = ChatService::new(&client, "chilli", Some(Box::new(Canned("Add salt."))));

        let (reply, stored) = service
            .chat("How do I season rice?", Some(ObjectId::new()), None)
            .await
            .unwrap();

        assert_eq!(reply, "Add salt.");
        assert!(stored.is_none());
    }

    #[actix_web::test]
    async fn anonymous_chat_is_not_stored() {
        let client = unreachable_client().await;
        let service = ChatService::new(&client, "chilli", Some(Box::new(Canned("Boil it."))));

        let (reply, stored) = service.chat("Eggs?", None, None).await.unwrap();

        assert_eq!(reply, "Boil it.");
        assert!(stored.is_none());
    }

    #[actix_web::test]
    async fn provider_failure_is_a_server_error() {
        let client = unreachable_client().await;
        let service = ChatService::new(&client, "chilli", Some(Box::new(Offline)));

        let err = service
            .chat("Eggs?", Some(ObjectId::new()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CustomError::InternalServerError(_)));
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn follow_up_appends_and_unknown_chat_starts_a_new_one() {
        let (client, config) = live_client().await;
        let service = ChatService::new(
            &client,
            &config.mongodb_database,
            Some(Box::new(Canned("Use ripe tomatoes."))),
        );
        let user_id = ObjectId::new();

        let (_, first) = service
            .chat("What goes into a good jollof rice?", Some(user_id), None)
            .await
            .unwrap();
        let first = first.unwrap();

        let (_, second) = service
            .chat("And the pepper base?", Some(user_id), Some(first))
            .await
            .unwrap();
        assert_eq!(second, Some(first));

        let (_, third) = service
            .chat("Dessert ideas", Some(user_id), Some(ObjectId::new()))
            .await
            .unwrap();
        assert!(third.is_some());
        assert_ne!(third, Some(first));

        let chats = service.history(&user_id).await.unwrap();
        assert_eq!(chats.len(), 2);

        let appended = chats.iter().find(|chat| chat.id == Some(first)).unwrap();
        assert_eq!(appended.title, "What goes into a good jollof r...");
        assert_eq!(appended.messages.len(), 4);
        assert_eq!(appended.messages[2].message_type, MessageType::User);
        assert_eq!(appended.messages[2].text, "And the pepper base?");
        assert_eq!(appended.messages[3].message_type, MessageType::Ai);

        service.delete_chat(&first).await.unwrap();
        assert!(matches!(
            service.delete_chat(&first).await,
            Err(CustomError::NotFoundError(_))
        ));

        drop_database(&client, &config).await;
    }
}
