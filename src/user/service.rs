use crate::config::AppConfig;
use crate::database::RedisService;
use crate::middleware::auth::create_token;
use crate::recipe::model::Recipe;
use crate::user::model::{LoginEntry, UpdateProfileRequest, User, normalize_email};
use crate::user::social::{self, FollowOutcome, UnfollowOutcome};
use crate::utils::email::EmailService;
use crate::utils::error::CustomError;
use crate::utils::hashing;
use crate::utils::helpers::{
    OTP_EXPIRATION_MINUTES, OTP_RATE_LIMIT_MAX, OTP_RATE_LIMIT_WINDOW_SECONDS, generate_otp_code,
};
use chrono::{Duration, Utc};
use futures_util::TryStreamExt;
use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, ClientSession, Collection};

pub struct UserService {
    client: Client,
    collection: Collection<User>,
    recipes: Collection<Recipe>,
    jwt_secret: String,
    jwt_expiry_days: i64,
    redis: Option<RedisService>,
    transactions: bool,
}

impl UserService {
    pub fn new(client: &Client, config: &AppConfig, redis: Option<RedisService>) -> Self {
        let db = client.database(&config.mongodb_database);

        UserService {
            client: client.clone(),
            collection: db.collection::<User>("users"),
            recipes: db.collection::<Recipe>("recipes"),
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_days: config.jwt_expiry_days,
            redis,
            transactions: false,
        }
    }

    /// Write follow edges inside a transaction. Only valid on a replica set
    /// or behind mongos.
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactions = enabled;
        self
    }

    pub fn issue_token(&self, user: &User) -> Result<String, CustomError> {
        let user_id = user
            .id
            .ok_or_else(|| CustomError::InternalServerError("User ID missing".to_string()))?;

        create_token(&user_id.to_hex(), &self.jwt_secret, self.jwt_expiry_days)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, CustomError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn get_user(&self, id: &ObjectId) -> Result<User, CustomError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("User not found".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, CustomError> {
        Ok(self
            .collection
            .find_one(doc! { "email": normalize_email(email) })
            .await?)
    }

    async fn save(&self, user: &User) -> Result<(), CustomError> {
        let id = user
            .id
            .ok_or_else(|| CustomError::InternalServerError("User ID missing".to_string()))?;

        self.collection.replace_one(doc! { "_id": id }, user).await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CustomError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;

        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<User, CustomError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(CustomError::BadRequestError(
                "Name, email and password are required".to_string(),
            ));
        }

        // Check if email already exists
        if self.find_by_email(&email).await?.is_some() {
            return Err(CustomError::BadRequestError(
                "User already exists".to_string(),
            ));
        }

        // Hash the password
        let hashed_password = hashing::hash_password(&password)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;

        // Create and save the user
        let mut user = User::new(name, &email, hashed_password);
        let result = self.collection.insert_one(&user).await?;

        user.id = Some(result.inserted_id.as_object_id().ok_or_else(|| {
            CustomError::InternalServerError("Failed to get inserted ID".to_string())
        })?);

        info!("Registered user {}", user.email);
        Ok(user)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        entry: LoginEntry,
    ) -> Result<User, CustomError> {
        let mut user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("USER_NOT_FOUND".to_string()))?;

        // Verify password
        let valid = hashing::verify_password(password, &user.password)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;
        if !valid {
            return Err(CustomError::BadRequestError(
                "Invalid email or password".to_string(),
            ));
        }

        if user.is_blocked {
            return Err(CustomError::ForbiddenError(
                "Your account has been blocked".to_string(),
            ));
        }

        // Update login history
        user.record_login(entry);
        self.save(&user).await?;

        Ok(user)
    }

    async fn check_otp_rate_limit(&self, email: &str) -> Result<(), CustomError> {
        let Some(redis) = &self.redis else {
            return Ok(());
        };

        match redis
            .is_rate_limited(
                &format!("otp:{}", email),
                OTP_RATE_LIMIT_MAX,
                OTP_RATE_LIMIT_WINDOW_SECONDS,
            )
            .await
        {
            Ok(true) => Err(CustomError::TooManyRequestsError(
                "Too many OTP requests, try again later".to_string(),
            )),
            Ok(false) => Ok(()),
            Err(e) => {
                // Redis trouble must not lock users out of OTP login
                warn!("OTP rate limit check failed: {}", e);
                Ok(())
            }
        }
    }

    /// Generate, store (hashed) and email a login code.
    pub async fn send_login_otp(&self, email: &str) -> Result<(), CustomError> {
        let mut user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("USER_NOT_FOUND".to_string()))?;

        if user.is_blocked {
            return Err(CustomError::ForbiddenError(
                "Your account has been blocked".to_string(),
            ));
        }

        self.check_otp_rate_limit(&user.email).await?;

        // Store only the hash of the code
        let code = generate_otp_code();
        user.otp = Some(
            hashing::hash_password(&code)
                .map_err(|e| CustomError::InternalServerError(e.to_string()))?,
        );
        user.otp_expires = Some(Utc::now() + Duration::minutes(OTP_EXPIRATION_MINUTES));
        self.save(&user).await?;

        // Send the plain code by email
        let email_service = EmailService::new()
            .map_err(|e| CustomError::InternalServerError(format!("Email service error: {}", e)))?;

        email_service
            .send_login_otp_email(&user.email, &user.name, &code)
            .await
            .map_err(|e| {
                CustomError::InternalServerError(format!("Failed to send email: {}", e))
            })?;

        Ok(())
    }

    pub async fn verify_login_otp(
        &self,
        email: &str,
        otp: &str,
        entry: LoginEntry,
    ) -> Result<User, CustomError> {
        let mut user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("USER_NOT_FOUND".to_string()))?;

        if user.is_blocked {
            return Err(CustomError::ForbiddenError(
                "Your account has been blocked".to_string(),
            ));
        }

        let (Some(hashed), Some(expires)) = (user.otp.as_deref(), user.otp_expires) else {
            return Err(CustomError::BadRequestError(
                "No OTP requested for this account".to_string(),
            ));
        };

        // Check expiry before comparing codes
        if expires < Utc::now() {
            return Err(CustomError::BadRequestError("OTP has expired".to_string()));
        }

        let valid = hashing::verify_password(otp.trim(), hashed)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;
        if !valid {
            return Err(CustomError::BadRequestError("Invalid OTP code".to_string()));
        }

        user.clear_otp();
        user.record_login(entry);
        self.save(&user).await?;

        Ok(user)
    }

    pub async fn update_profile(
        &self,
        id: &ObjectId,
        update: UpdateProfileRequest,
    ) -> Result<User, CustomError> {
        let mut user = self.get_user(id).await?;
        user.apply_profile(update);
        self.save(&user).await?;
        Ok(user)
    }

    /// Load both ends of an edge, mutate them and write both back. Inside one
    /// transaction when the deployment supports it, otherwise target first
    /// and then actor.
    async fn mutate_edge<T>(
        &self,
        target_id: &ObjectId,
        actor_id: &ObjectId,
        mutate: impl FnOnce(&mut User, &mut User) -> Result<T, CustomError>,
    ) -> Result<T, CustomError> {
        if !self.transactions {
            return self.mutate_edge_unsessioned(target_id, actor_id, mutate).await;
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self
            .mutate_edge_in(&mut session, target_id, actor_id, mutate)
            .await
        {
            Ok(outcome) => {
                session.commit_transaction().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort follow transaction: {}", abort_err);
                }
                Err(e)
            }
        }
    }

    async fn mutate_edge_unsessioned<T>(
        &self,
        target_id: &ObjectId,
        actor_id: &ObjectId,
        mutate: impl FnOnce(&mut User, &mut User) -> Result<T, CustomError>,
    ) -> Result<T, CustomError> {
        let mut target = self.get_user(target_id).await?;
        let mut actor = self
            .find_by_id(actor_id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("Current user not found".to_string()))?;

        let outcome = mutate(&mut target, &mut actor)?;

        let now = Utc::now();
        target.updated_at = now;
        actor.updated_at = now;

        self.save(&target).await?;
        if let Err(e) = self.save(&actor).await {
            warn!(
                "Saved user {} but not user {}; follow edge is one-sided: {}",
                target_id, actor_id, e
            );
            return Err(e);
        }

        Ok(outcome)
    }

    async fn mutate_edge_in<T>(
        &self,
        session: &mut ClientSession,
        target_id: &ObjectId,
        actor_id: &ObjectId,
        mutate: impl FnOnce(&mut User, &mut User) -> Result<T, CustomError>,
    ) -> Result<T, CustomError> {
        let mut target = self
            .collection
            .find_one(doc! { "_id": target_id })
            .session(&mut *session)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("User not found".to_string()))?;

        let mut actor = self
            .collection
            .find_one(doc! { "_id": actor_id })
            .session(&mut *session)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("Current user not found".to_string()))?;

        let outcome = mutate(&mut target, &mut actor)?;

        let now = Utc::now();
        target.updated_at = now;
        actor.updated_at = now;

        self.collection
            .replace_one(doc! { "_id": target_id }, &target)
            .session(&mut *session)
            .await?;
        self.collection
            .replace_one(doc! { "_id": actor_id }, &actor)
            .session(&mut *session)
            .await?;

        Ok(outcome)
    }

    pub async fn follow(
        &self,
        target_id: &ObjectId,
        actor_id: &ObjectId,
    ) -> Result<FollowOutcome, CustomError> {
        if target_id == actor_id {
            return Err(CustomError::BadRequestError(
                "You cannot follow yourself".to_string(),
            ));
        }

        self.mutate_edge(target_id, actor_id, social::follow).await
    }

    pub async fn unfollow(
        &self,
        target_id: &ObjectId,
        actor_id: &ObjectId,
    ) -> Result<UnfollowOutcome, CustomError> {
        if target_id == actor_id {
            return Err(CustomError::BadRequestError(
                "You cannot unfollow yourself".to_string(),
            ));
        }

        self.mutate_edge(target_id, actor_id, social::unfollow).await
    }

    pub async fn toggle_verify(&self, id: &ObjectId) -> Result<User, CustomError> {
        let mut user = self.get_user(id).await?;
        user.toggle_verified();
        user.updated_at = Utc::now();
        self.save(&user).await?;
        Ok(user)
    }

    pub async fn toggle_block(&self, id: &ObjectId) -> Result<User, CustomError> {
        let mut user = self.get_user(id).await?;
        let blocked = user.toggle_blocked();
        user.updated_at = Utc::now();
        self.save(&user).await?;

        info!("User {} blocked: {}", id, blocked);
        Ok(user)
    }

    pub async fn mark_notifications_read(&self, id: &ObjectId) -> Result<User, CustomError> {
        let mut user = self.get_user(id).await?;
        if user.mark_notifications_read() > 0 {
            self.save(&user).await?;
        }
        Ok(user)
    }

    /// Hard delete. The id is also pulled from other users' follow lists and
    /// from recipe likes; recipes the user authored keep their author id.
    pub async fn delete_user(&self, id: &ObjectId) -> Result<(), CustomError> {
        // Delete the user
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(CustomError::NotFoundError("User not found".to_string()));
        }

        // Remove the id from follow lists and likes
        self.collection
            .update_many(
                doc! { "$or": [ { "followers": id }, { "following": id } ] },
                doc! { "$pull": { "followers": id, "following": id } },
            )
            .await?;

        self.recipes
            .update_many(doc! { "likes": id }, doc! { "$pull": { "likes": id } })
            .await?;

        info!("Deleted user {} and removed their follow and like references", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::supports_transactions;
    use crate::recipe::model::CreateRecipeRequest;
    use crate::recipe::service::RecipeService;
    use crate::test_support::{drop_database, live_client};
    use crate::user::model::NotificationKind;
    use serde_json::json;

    async fn registered(service: &UserService, name: &str) -> User {
        service
            .register(
                name.to_string(),
                format!("{}@chilli.test", name.to_lowercase()),
                "green-chilli-42".to_string(),
            )
            .await
            .unwrap()
    }

    async fn follow_round_trip(service: &UserService) {
        let cook = registered(service, "Amara").await;
        let fan = registered(service, "Tunde").await;
        let (cook_id, fan_id) = (cook.id.unwrap(), fan.id.unwrap());

        let outcome = service.follow(&cook_id, &fan_id).await.unwrap();
        assert!(outcome.follower_added && outcome.following_added);

        // A repeated follow changes nothing and sends no second notice
        let again = service.follow(&cook_id, &fan_id).await.unwrap();
        assert!(!again.follower_added);

        let cook = service.get_user(&cook_id).await.unwrap();
        let fan = service.get_user(&fan_id).await.unwrap();
        assert!(cook.followers.contains(&fan_id));
        assert!(fan.following.contains(&cook_id));
        assert_eq!(cook.notifications.len(), 1);
        assert_eq!(cook.notifications[0].kind, NotificationKind::Follow);

        service.unfollow(&cook_id, &fan_id).await.unwrap();
        let cook = service.get_user(&cook_id).await.unwrap();
        let fan = service.get_user(&fan_id).await.unwrap();
        assert!(cook.followers.is_empty());
        assert!(fan.following.is_empty());
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn follow_works_without_transactions() {
        let (client, config) = live_client().await;
        let service = UserService::new(&client, &config, None).with_transactions(false);

        follow_round_trip(&service).await;

        drop_database(&client, &config).await;
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn follow_uses_transactions_when_the_server_allows() {
        let (client, config) = live_client().await;
        let transactions = supports_transactions(&client).await;
        let service = UserService::new(&client, &config, None).with_transactions(transactions);

        follow_round_trip(&service).await;

        drop_database(&client, &config).await;
    }

    #[actix_web::test]
    #[ignore = "needs a MongoDB server"]
    async fn deleting_a_user_removes_their_edges_and_likes() {
        let (client, config) = live_client().await;
        let users = UserService::new(&client, &config, None);
        let recipes = RecipeService::new(&client, &config.mongodb_database);

        let leaving = registered(&users, "Kemi").await;
        let staying = registered(&users, "Bola").await;
        let (leaving_id, staying_id) = (leaving.id.unwrap(), staying.id.unwrap());

        users.follow(&staying_id, &leaving_id).await.unwrap();
        users.follow(&leaving_id, &staying_id).await.unwrap();

        let request: CreateRecipeRequest =
            serde_json::from_value(json!({ "title": "Pepper soup" })).unwrap();
        let recipe = recipes.create(request, &staying).await.unwrap();
        let recipe_id = recipe.id.unwrap();
        recipes.toggle_like(&recipe_id, leaving_id).await.unwrap();

        users.delete_user(&leaving_id).await.unwrap();

        assert!(users.find_by_id(&leaving_id).await.unwrap().is_none());
        let staying = users.get_user(&staying_id).await.unwrap();
        assert!(!staying.followers.contains(&leaving_id));
        assert!(!staying.following.contains(&leaving_id));

        let recipe = recipes.get(&recipe_id).await.unwrap();
        assert!(recipe.likes.is_empty());
        assert_eq!(recipe.author, Some(staying_id));

        assert!(matches!(
            users.delete_user(&leaving_id).await,
            Err(CustomError::NotFoundError(_))
        ));

        drop_database(&client, &config).await;
    }
}
