use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::id_set::IdSet;

/// Number of login history entries kept per user.
pub const LOGIN_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_dish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,

    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_blocked: bool,

    #[serde(default)]
    pub followers: IdSet,
    #[serde(default)]
    pub following: IdSet,
    #[serde(default)]
    pub notifications: Vec<Notification>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::utils::timestamp::option"
    )]
    pub otp_expires: Option<DateTime<Utc>>,

    #[serde(default)]
    pub login_history: Vec<LoginEntry>,

    #[serde(default, with = "crate::utils::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "crate::utils::timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    RecipeApproved,
    RecipeRejected,
    Verification,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, with = "crate::utils::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginEntry {
    pub ip: String,
    pub device: String,
    #[serde(default, with = "crate::utils::timestamp")]
    pub time: DateTime<Utc>,
}

impl Notification {
    fn new(kind: NotificationKind, message: String, link: String) -> Self {
        Self {
            kind,
            message,
            link,
            reason: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn follow(follower_name: &str, follower_id: &ObjectId) -> Self {
        Self::new(
            NotificationKind::Follow,
            format!("{} started following you", follower_name),
            format!("/profile/{}", follower_id.to_hex()),
        )
    }

    pub fn recipe_approved(title: &str, recipe_id: &ObjectId) -> Self {
        Self::new(
            NotificationKind::RecipeApproved,
            format!("Your recipe \"{}\" has been approved", title),
            format!("/recipe/{}", recipe_id.to_hex()),
        )
    }

    pub fn recipe_rejected(title: &str, reason: Option<&str>) -> Self {
        let message = match reason {
            Some(reason) => format!("Your recipe \"{}\" was rejected: {}", title, reason),
            None => format!("Your recipe \"{}\" was rejected", title),
        };

        let mut notification = Self::new(
            NotificationKind::RecipeRejected,
            message,
            "/upload".to_string(),
        );
        notification.reason = reason.map(str::to_string);
        notification
    }

    pub fn verification(verified: bool) -> Self {
        let message = if verified {
            "Congratulations! You are now a verified pro cook"
        } else {
            "Your pro cook verification has been removed"
        };

        Self::new(
            NotificationKind::Verification,
            message.to_string(),
            "/profile".to_string(),
        )
    }
}

/// Lowercase and trim an email address before storing or looking it up.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn new(name: String, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name,
            email: normalize_email(email),
            password: password_hash,
            bio: None,
            age: None,
            dob: None,
            favorite_dish: None,
            favorite_cuisine: None,
            spice_level: None,
            dietary_preference: None,
            allergies: None,
            extras: None,
            profile_photo: None,
            is_admin: false,
            is_verified: false,
            is_blocked: false,
            followers: IdSet::new(),
            following: IdSet::new(),
            notifications: Vec::new(),
            otp: None,
            otp_expires: None,
            login_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Append a login, evicting the oldest entries beyond the capacity.
    pub fn record_login(&mut self, entry: LoginEntry) {
        self.login_history.push(entry);
        if self.login_history.len() > LOGIN_HISTORY_CAPACITY {
            let excess = self.login_history.len() - LOGIN_HISTORY_CAPACITY;
            self.login_history.drain(..excess);
        }
    }

    /// Returns how many notifications were unread.
    pub fn mark_notifications_read(&mut self) -> usize {
        let mut flipped = 0;
        for notification in self.notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            flipped += 1;
        }
        flipped
    }

    pub fn toggle_verified(&mut self) -> bool {
        self.is_verified = !self.is_verified;
        self.notify(Notification::verification(self.is_verified));
        self.is_verified
    }

    pub fn toggle_blocked(&mut self) -> bool {
        self.is_blocked = !self.is_blocked;
        self.is_blocked
    }

    pub fn clear_otp(&mut self) {
        self.otp = None;
        self.otp_expires = None;
    }

    pub fn apply_profile(&mut self, update: UpdateProfileRequest) {
        if let Some(name) = update.name.filter(|name| !name.trim().is_empty()) {
            self.name = name;
        }
        if update.bio.is_some() {
            self.bio = update.bio;
        }
        if update.age.is_some() {
            self.age = update.age;
        }
        if update.dob.is_some() {
            self.dob = update.dob;
        }
        if update.favorite_dish.is_some() {
            self.favorite_dish = update.favorite_dish;
        }
        if update.favorite_cuisine.is_some() {
            self.favorite_cuisine = update.favorite_cuisine;
        }
        if update.spice_level.is_some() {
            self.spice_level = update.spice_level;
        }
        if update.dietary_preference.is_some() {
            self.dietary_preference = update.dietary_preference;
        }
        if update.allergies.is_some() {
            self.allergies = update.allergies;
        }
        if update.extras.is_some() {
            self.extras = update.extras;
        }
        if update.profile_photo.is_some() {
            self.profile_photo = update.profile_photo;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub dob: Option<String>,
    pub favorite_dish: Option<String>,
    pub favorite_cuisine: Option<String>,
    pub spice_level: Option<String>,
    pub dietary_preference: Option<String>,
    pub allergies: Option<String>,
    pub extras: Option<String>,
    pub profile_photo: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub current_user_id: Option<String>,
}

/// User as returned by the API: ids rendered as hex, credentials and OTP
/// fields left out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub dob: Option<String>,
    pub favorite_dish: Option<String>,
    pub favorite_cuisine: Option<String>,
    pub spice_level: Option<String>,
    pub dietary_preference: Option<String>,
    pub allergies: Option<String>,
    pub extras: Option<String>,
    pub profile_photo: Option<String>,
    pub is_admin: bool,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub notifications: Vec<Notification>,
    pub login_history: Vec<LoginEntry>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            followers: user.followers.to_hex(),
            following: user.following.to_hex(),
            name: user.name,
            email: user.email,
            bio: user.bio,
            age: user.age,
            dob: user.dob,
            favorite_dish: user.favorite_dish,
            favorite_cuisine: user.favorite_cuisine,
            spice_level: user.spice_level,
            dietary_preference: user.dietary_preference,
            allergies: user.allergies,
            extras: user.extras,
            profile_photo: user.profile_photo,
            is_admin: user.is_admin,
            is_verified: user.is_verified,
            is_blocked: user.is_blocked,
            notifications: user.notifications,
            login_history: user.login_history,
            created_at: user.created_at,
        }
    }
}
