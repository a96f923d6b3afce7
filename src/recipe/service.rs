use crate::recipe::model::{
    CreateRecipeRequest, Recipe, RecipeStatus, ReviewRequest, UpdateRecipeRequest,
};
use crate::user::model::{Notification, User};
use crate::utils::error::CustomError;
use chrono::Utc;
use futures_util::TryStreamExt;
use log::{info, warn};
use mongodb::bson::{Document, doc, oid::ObjectId};
use mongodb::{Client, Collection};

pub struct RecipeService {
    collection: Collection<Recipe>,
    users: Collection<User>,
}

impl RecipeService {
    pub fn new(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        RecipeService {
            collection: db.collection::<Recipe>("recipes"),
            users: db.collection::<User>("users"),
        }
    }

    async fn list(&self, filter: Document) -> Result<Vec<Recipe>, CustomError> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await?;

        let recipes: Vec<Recipe> = cursor.try_collect().await?;
        Ok(recipes)
    }

    /// Approved recipes, plus legacy ones stored before moderation existed
    pub async fn list_approved(&self) -> Result<Vec<Recipe>, CustomError> {
        self.list(doc! { "status": { "$ne": "pending" } }).await
    }

    pub async fn list_pending(&self) -> Result<Vec<Recipe>, CustomError> {
        self.list(doc! { "status": "pending" }).await
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Recipe>, CustomError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Recipe, CustomError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("Recipe not found".to_string()))
    }

    async fn save(&self, recipe: &Recipe) -> Result<(), CustomError> {
        let id = recipe
            .id
            .ok_or_else(|| CustomError::InternalServerError("Recipe ID missing".to_string()))?;

        self.collection
            .replace_one(doc! { "_id": id }, recipe)
            .await?;
        Ok(())
    }

    /// Append a notification to a user. Returns `false` when the user no
    /// longer exists.
    async fn notify_user(
        &self,
        user_id: &ObjectId,
        notification: Notification,
    ) -> Result<bool, CustomError> {
        let Some(mut user) = self.users.find_one(doc! { "_id": user_id }).await? else {
            warn!("Skipping notification for missing user {}", user_id);
            return Ok(false);
        };

        user.notify(notification);
        user.updated_at = Utc::now();
        self.users
            .replace_one(doc! { "_id": user_id }, &user)
            .await?;
        Ok(true)
    }

    /// Admins publish official recipes directly; everyone else submits
    /// authored recipes for moderation.
    pub async fn create(
        &self,
        request: CreateRecipeRequest,
        submitter: &User,
    ) -> Result<Recipe, CustomError> {
        let (author, status) = if submitter.is_admin {
            (None, RecipeStatus::Approved)
        } else {
            (submitter.id, RecipeStatus::Pending)
        };

        // Create and save the recipe
        let mut recipe = Recipe::from_request(request, author, status)?;
        let result = self.collection.insert_one(&recipe).await?;
        recipe.id = result.inserted_id.as_object_id();

        info!(
            "Recipe {:?} created with status {:?}",
            recipe.id.map(|id| id.to_hex()),
            status
        );
        Ok(recipe)
    }

    /// Partial update. Moving an authored recipe to approved notifies the
    /// author before the recipe itself is saved.
    pub async fn update(
        &self,
        id: &ObjectId,
        update: UpdateRecipeRequest,
    ) -> Result<Recipe, CustomError> {
        let mut recipe = self.get(id).await?;

        // Notify the author before the recipe is saved as approved
        if let Some((author, notification)) = recipe.apply_update(update)? {
            self.notify_user(&author, notification).await?;
        }

        self.save(&recipe).await?;
        Ok(recipe)
    }

    /// Delete a recipe. When a moderator deletes a pending authored recipe it
    /// is a rejection and the author is told why first. Returns whether a
    /// notification was sent.
    pub async fn delete(
        &self,
        id: &ObjectId,
        reason: Option<&str>,
        moderated: bool,
    ) -> Result<bool, CustomError> {
        let recipe = self.get(id).await?;

        // Tell the author why before the record is gone
        let notice = if moderated {
            recipe.rejection_notice(reason)
        } else {
            None
        };
        let notified = match notice {
            Some((author, notification)) => self.notify_user(&author, notification).await?,
            None => false,
        };

        self.collection.delete_one(doc! { "_id": id }).await?;
        info!("Recipe {} deleted (author notified: {})", id, notified);

        Ok(notified)
    }

    pub async fn toggle_like(
        &self,
        id: &ObjectId,
        user_id: ObjectId,
    ) -> Result<(Recipe, bool), CustomError> {
        let mut recipe = self.get(id).await?;
        let liked = recipe.toggle_like(user_id);

        self.save(&recipe).await?;
        Ok((recipe, liked))
    }

    pub async fn submit_review(
        &self,
        id: &ObjectId,
        user_id: ObjectId,
        review: ReviewRequest,
    ) -> Result<Recipe, CustomError> {
        let mut recipe = self.get(id).await?;
        recipe.submit_review(user_id, review.user_name, review.rating, review.comment);
        recipe.updated_at = Utc::now();

        self.save(&recipe).await?;
        Ok(recipe)
    }

    pub async fn reset_ratings(&self, id: &ObjectId) -> Result<Recipe, CustomError> {
        let mut recipe = self.get(id).await?;
        recipe.reset_ratings();
        recipe.updated_at = Utc::now();

        self.save(&recipe).await?;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::test_support::{drop_database, live_client};
    use crate::user::model::NotificationKind;
    use serde_json::json;

    struct Kitchen {
        client: Client,
        config: AppConfig,
        recipes: RecipeService,
        users: Collection<User>,
    }

    impl Kitchen {
        async fn open() -> Self {
            let (client, config) = live_client().await;
            let recipes = RecipeService::new(&client, &config.mongodb_database);
            let users = client
                .database(&config.mongodb_database)
                .collection::<User>("users");
            Kitchen {
                client,
                config,
                recipes,
                users,
            }
        }

        async fn cook(&self, name: &str, is_admin: bool) -> User {
            let mut user = User::new(
                name.to_string(),
                &format!("{}@chilli.test", name.to_lowercase()),
                "hash".to_string(),
            );
            user.is_admin = is_admin;
            let result = self.users.insert_one(&user).await.unwrap();
            user.id = result.inserted_id.as_object_id();
            user
        }

        async fn submit(&self, title: &str, submitter: &User) -> Recipe {
            let request: CreateRecipeRequest =
                serde_json::from_value(json!({ "title": title })).unwrap();
            self.recipes.create(request, submitter).await.unwrap()
        }

        async fn reload(&self, user: &User) -> User {
            self.users
                .find_one(doc! { "_id": user.id.unwrap() })
                .await
                .unwrap()
                .unwrap()
        }

        async fn close(self) {
            drop_database(&self.client, &self.config).await;
        }
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn rejecting_deletes_the_recipe_and_tells_the_author_why() {
        let kitchen = Kitchen::open().await;
        let author = kitchen.cook("Chidi", false).await;
        let recipe = kitchen.submit("Ghost pepper stew", &author).await;
        let recipe_id = recipe.id.unwrap();
        assert!(recipe.is_pending());

        let notified = kitchen
            .recipes
            .delete(&recipe_id, Some("too spicy"), true)
            .await
            .unwrap();

        assert!(notified);
        assert!(kitchen.recipes.find_by_id(&recipe_id).await.unwrap().is_none());

        let author = kitchen.reload(&author).await;
        let notice = author.notifications.last().unwrap();
        assert_eq!(notice.kind, NotificationKind::RecipeRejected);
        assert_eq!(notice.reason.as_deref(), Some("too spicy"));

        kitchen.close().await;
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn author_deleting_their_own_recipe_gets_no_notice() {
        let kitchen = Kitchen::open().await;
        let author = kitchen.cook("Ngozi", false).await;
        let recipe = kitchen.submit("Moi moi", &author).await;

        let notified = kitchen
            .recipes
            .delete(&recipe.id.unwrap(), None, false)
            .await
            .unwrap();

        assert!(!notified);
        assert!(kitchen.reload(&author).await.notifications.is_empty());

        kitchen.close().await;
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn approving_notifies_the_author_once() {
        let kitchen = Kitchen::open().await;
        let author = kitchen.cook("Ifeoma", false).await;
        let recipe = kitchen.submit("Ofada rice", &author).await;
        let recipe_id = recipe.id.unwrap();

        let approve = || UpdateRecipeRequest {
            status: Some(RecipeStatus::Approved),
            ..Default::default()
        };

        let approved = kitchen.recipes.update(&recipe_id, approve()).await.unwrap();
        assert_eq!(approved.status, Some(RecipeStatus::Approved));

        // Approving again is not a transition
        kitchen.recipes.update(&recipe_id, approve()).await.unwrap();

        let author = kitchen.reload(&author).await;
        assert_eq!(author.notifications.len(), 1);
        assert_eq!(author.notifications[0].kind, NotificationKind::RecipeApproved);
        assert_eq!(
            author.notifications[0].link,
            format!("/recipe/{}", recipe_id.to_hex())
        );

        let listed = kitchen.recipes.list_approved().await.unwrap();
        assert!(listed.iter().any(|r| r.id == Some(recipe_id)));
        assert!(kitchen.recipes.list_pending().await.unwrap().is_empty());

        kitchen.close().await;
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn admin_recipes_skip_moderation() {
        let kitchen = Kitchen::open().await;
        let admin = kitchen.cook("Admin", true).await;

        let recipe = kitchen.submit("House suya", &admin).await;

        assert_eq!(recipe.status, Some(RecipeStatus::Approved));
        assert!(recipe.author.is_none());

        kitchen.close().await;
    }
}
