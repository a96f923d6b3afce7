use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::user::model::Notification;
use crate::utils::error::CustomError;
use crate::utils::id_set::IdSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    Pending,
    Approved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub name: String,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub user_id: ObjectId,
    #[serde(default, with = "crate::utils::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_type: Option<String>,

    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,

    /// Absent on legacy documents, which count as approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecipeStatus>,

    #[serde(default)]
    pub likes: IdSet,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_reviews: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ObjectId>,

    #[serde(default, with = "crate::utils::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "crate::utils::timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn check_nutrition(field: &str, value: f64) -> Result<f64, CustomError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CustomError::ValidationError(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(value)
}

/// Overwrite with a non-empty value; empty strings leave the field alone.
fn patch_text(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = value;
    }
}

fn patch_optional_text(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = Some(value);
    }
}

impl Recipe {
    pub fn from_request(
        request: CreateRecipeRequest,
        author: Option<ObjectId>,
        status: RecipeStatus,
    ) -> Result<Self, CustomError> {
        if request.title.trim().is_empty() {
            return Err(CustomError::ValidationError("Title is required".to_string()));
        }

        let now = Utc::now();
        Ok(Self {
            id: None,
            title: request.title,
            category: request.category.unwrap_or_default(),
            time: request.time,
            difficulty: request.difficulty,
            servings: request.servings,
            image: request.image,
            video: request.video,
            description: request.description.unwrap_or_default(),
            ingredients: request.ingredients.unwrap_or_default(),
            steps: request.steps.unwrap_or_default(),
            region: request.region,
            diet_type: request.diet_type,
            calories: check_nutrition("calories", request.calories.unwrap_or(0.0))?,
            protein: check_nutrition("protein", request.protein.unwrap_or(0.0))?,
            carbs: check_nutrition("carbs", request.carbs.unwrap_or(0.0))?,
            fat: check_nutrition("fat", request.fat.unwrap_or(0.0))?,
            status: Some(status),
            likes: IdSet::new(),
            reviews: Vec::new(),
            rating: 0.0,
            num_reviews: 0,
            author,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(RecipeStatus::Pending)
    }

    /// Like when absent, unlike when present. Returns whether the user now likes it.
    pub fn toggle_like(&mut self, user_id: ObjectId) -> bool {
        self.likes.toggle(user_id)
    }

    /// One review per user: a second submission rewrites the first in place.
    pub fn submit_review(
        &mut self,
        user_id: ObjectId,
        user_name: Option<String>,
        rating: f64,
        comment: String,
    ) {
        match self.reviews.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => {
                existing.rating = rating;
                existing.comment = comment;
            }
            None => self.reviews.push(Review {
                name: user_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                rating,
                comment,
                user_id,
                created_at: Utc::now(),
            }),
        }
        self.recompute_rating();
    }

    pub fn recompute_rating(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            self.reviews.iter().map(|r| r.rating).sum::<f64>() / self.reviews.len() as f64
        };
    }

    pub fn reset_ratings(&mut self) {
        self.reviews.clear();
        self.num_reviews = 0;
        self.rating = 0.0;
    }

    /// Apply a partial update. Returns the approval notice owed to the author
    /// when this update moves an authored recipe to approved.
    pub fn apply_update(
        &mut self,
        update: UpdateRecipeRequest,
    ) -> Result<Option<(ObjectId, Notification)>, CustomError> {
        let approval = match (update.status, self.author, self.id) {
            (Some(RecipeStatus::Approved), Some(author), Some(id))
                if self.status != Some(RecipeStatus::Approved) =>
            {
                Some((author, Notification::recipe_approved(&self.title, &id)))
            }
            _ => None,
        };

        patch_text(&mut self.title, update.title);
        patch_text(&mut self.category, update.category);
        patch_text(&mut self.description, update.description);
        patch_optional_text(&mut self.time, update.time);
        patch_optional_text(&mut self.image, update.image);
        patch_optional_text(&mut self.video, update.video);
        patch_optional_text(&mut self.region, update.region);
        patch_optional_text(&mut self.diet_type, update.diet_type);

        if update.difficulty.is_some() {
            self.difficulty = update.difficulty;
        }
        if update.servings.is_some() {
            self.servings = update.servings;
        }
        if let Some(ingredients) = update.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(steps) = update.steps {
            self.steps = steps;
        }

        // Nutrition overwrites whenever present, so an explicit zero sticks
        if let Some(calories) = update.calories {
            self.calories = check_nutrition("calories", calories)?;
        }
        if let Some(protein) = update.protein {
            self.protein = check_nutrition("protein", protein)?;
        }
        if let Some(carbs) = update.carbs {
            self.carbs = check_nutrition("carbs", carbs)?;
        }
        if let Some(fat) = update.fat {
            self.fat = check_nutrition("fat", fat)?;
        }

        if update.status.is_some() {
            self.status = update.status;
        }
        self.updated_at = Utc::now();

        Ok(approval)
    }

    /// The notice owed to the author when this recipe is rejected. Only
    /// pending, authored recipes produce one.
    pub fn rejection_notice(&self, reason: Option<&str>) -> Option<(ObjectId, Notification)> {
        match self.author {
            Some(author) if self.is_pending() => {
                Some((author, Notification::recipe_rejected(&self.title, reason)))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub title: String,
    pub category: Option<String>,
    pub time: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub servings: Option<i32>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub region: Option<String>,
    pub diet_type: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub time: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub servings: Option<i32>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub region: Option<String>,
    pub diet_type: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub status: Option<RecipeStatus>,
}

impl UpdateRecipeRequest {
    pub fn changes_status(&self) -> bool {
        self.status.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRecipeRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub name: String,
    pub rating: f64,
    pub comment: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Recipe as returned by the API, ids rendered as hex strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub category: String,
    pub time: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub servings: Option<i32>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub description: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub region: Option<String>,
    pub diet_type: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub status: RecipeStatus,
    pub likes: Vec<String>,
    pub reviews: Vec<ReviewResponse>,
    pub rating: f64,
    pub num_reviews: u32,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Recipe> for RecipeResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id.map(|id| id.to_hex()).unwrap_or_default(),
            status: recipe.status.unwrap_or(RecipeStatus::Approved),
            likes: recipe.likes.to_hex(),
            reviews: recipe
                .reviews
                .into_iter()
                .map(|review| ReviewResponse {
                    name: review.name,
                    rating: review.rating,
                    comment: review.comment,
                    user_id: review.user_id.to_hex(),
                    created_at: review.created_at,
                })
                .collect(),
            author: recipe.author.map(|id| id.to_hex()),
            title: recipe.title,
            category: recipe.category,
            time: recipe.time,
            difficulty: recipe.difficulty,
            servings: recipe.servings,
            image: recipe.image,
            video: recipe.video,
            description: recipe.description,
            ingredients: recipe.ingredients,
            steps: recipe.steps,
            region: recipe.region,
            diet_type: recipe.diet_type,
            calories: recipe.calories,
            protein: recipe.protein,
            carbs: recipe.carbs,
            fat: recipe.fat,
            rating: recipe.rating,
            num_reviews: recipe.num_reviews,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::model::NotificationKind;
    use mongodb::bson::{self, doc};

    fn request(title: &str) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.to_string(),
            category: Some("Breakfast".into()),
            time: Some("15 min".into()),
            difficulty: Some(Difficulty::Easy),
            servings: Some(2),
            image: None,
            video: None,
            description: Some("Fried rice with egg".into()),
            ingredients: Some(vec!["Rice".into(), "Egg".into(), "Tomato".into()]),
            steps: Some(vec!["Cook rice".into(), "Fry egg".into()]),
            region: None,
            diet_type: None,
            calories: Some(420.0),
            protein: Some(12.0),
            carbs: Some(60.0),
            fat: Some(9.0),
        }
    }

    fn stored(status: RecipeStatus, author: Option<ObjectId>) -> Recipe {
        let mut recipe = Recipe::from_request(request("Egg Fried Rice"), author, status).unwrap();
        recipe.id = Some(ObjectId::new());
        recipe
    }

    #[test]
    fn like_toggle_is_a_strict_xor() {
        let mut recipe = stored(RecipeStatus::Approved, None);
        let user = ObjectId::new();

        assert!(recipe.toggle_like(user));
        assert_eq!(recipe.likes.len(), 1);
        assert!(!recipe.toggle_like(user));
        assert!(recipe.likes.is_empty());
    }

    #[test]
    fn rating_is_the_mean_of_reviews() {
        let mut recipe = stored(RecipeStatus::Approved, None);

        recipe.submit_review(ObjectId::new(), Some("Ada".into()), 5.0, "Great".into());
        recipe.submit_review(ObjectId::new(), Some("Bo".into()), 3.0, "Fine".into());

        assert_eq!(recipe.num_reviews, 2);
        assert_eq!(recipe.rating, 4.0);
    }

    #[test]
    fn second_review_from_same_user_overwrites_in_place() {
        let mut recipe = stored(RecipeStatus::Approved, None);
        assert_eq!(recipe.ingredients, vec!["Rice", "Egg", "Tomato"]);
        let user = ObjectId::new();

        recipe.submit_review(user, Some("Ada".into()), 5.0, "Great".into());
        let first_created = recipe.reviews[0].created_at;
        recipe.submit_review(user, Some("Ada".into()), 3.0, "Meh on reheating".into());

        assert_eq!(recipe.reviews.len(), 1);
        assert_eq!(recipe.num_reviews, 1);
        assert_eq!(recipe.rating, 3.0);
        assert_eq!(recipe.reviews[0].comment, "Meh on reheating");
        assert_eq!(recipe.reviews[0].created_at, first_created);
    }

    #[test]
    fn anonymous_name_when_none_given() {
        let mut recipe = stored(RecipeStatus::Approved, None);
        recipe.submit_review(ObjectId::new(), None, 4.0, String::new());

        assert_eq!(recipe.reviews[0].name, "Anonymous");
    }

    #[test]
    fn reset_clears_everything() {
        let mut recipe = stored(RecipeStatus::Approved, None);
        recipe.submit_review(ObjectId::new(), None, 4.0, String::new());
        recipe.submit_review(ObjectId::new(), None, 2.0, String::new());

        recipe.reset_ratings();

        assert!(recipe.reviews.is_empty());
        assert_eq!(recipe.num_reviews, 0);
        assert_eq!(recipe.rating, 0.0);
    }

    #[test]
    fn approving_an_authored_pending_recipe_owes_one_notice() {
        let author = ObjectId::new();
        let mut recipe = stored(RecipeStatus::Pending, Some(author));
        let recipe_id = recipe.id.unwrap();

        let notice = recipe
            .apply_update(UpdateRecipeRequest {
                status: Some(RecipeStatus::Approved),
                ..Default::default()
            })
            .unwrap();

        let (to, notification) = notice.expect("author is notified");
        assert_eq!(to, author);
        assert_eq!(notification.kind, NotificationKind::RecipeApproved);
        assert!(notification.link.contains(&recipe_id.to_hex()));
        assert_eq!(recipe.status, Some(RecipeStatus::Approved));

        let again = recipe
            .apply_update(UpdateRecipeRequest {
                status: Some(RecipeStatus::Approved),
                ..Default::default()
            })
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn approving_an_authorless_recipe_notifies_nobody() {
        let mut recipe = stored(RecipeStatus::Pending, None);

        let notice = recipe
            .apply_update(UpdateRecipeRequest {
                status: Some(RecipeStatus::Approved),
                ..Default::default()
            })
            .unwrap();

        assert!(notice.is_none());
        assert_eq!(recipe.status, Some(RecipeStatus::Approved));
    }

    #[test]
    fn partial_update_keeps_absent_fields_and_accepts_zero() {
        let mut recipe = stored(RecipeStatus::Approved, None);

        recipe
            .apply_update(UpdateRecipeRequest {
                title: Some(String::new()),
                fat: Some(0.0),
                steps: Some(vec!["Just eat it".into()]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(recipe.title, "Egg Fried Rice");
        assert_eq!(recipe.fat, 0.0);
        assert_eq!(recipe.calories, 420.0);
        assert_eq!(recipe.steps, vec!["Just eat it"]);
        assert_eq!(recipe.ingredients.len(), 3);
    }

    #[test]
    fn negative_nutrition_is_rejected() {
        let mut recipe = stored(RecipeStatus::Approved, None);

        let result = recipe.apply_update(UpdateRecipeRequest {
            protein: Some(-1.0),
            ..Default::default()
        });

        assert!(matches!(result, Err(CustomError::ValidationError(_))));
    }

    #[test]
    fn rejection_notice_only_for_pending_authored_recipes() {
        let author = ObjectId::new();

        let pending = stored(RecipeStatus::Pending, Some(author));
        let (to, notification) = pending.rejection_notice(Some("too spicy")).unwrap();
        assert_eq!(to, author);
        assert_eq!(notification.kind, NotificationKind::RecipeRejected);
        assert_eq!(notification.reason.as_deref(), Some("too spicy"));

        assert!(
            stored(RecipeStatus::Approved, Some(author))
                .rejection_notice(Some("too spicy"))
                .is_none()
        );
        assert!(
            stored(RecipeStatus::Pending, None)
                .rejection_notice(None)
                .is_none()
        );
    }

    #[test]
    fn legacy_documents_without_status_count_as_approved() {
        let legacy = doc! {
            "_id": ObjectId::new(),
            "title": "Jollof",
            "likes": [],
            "rating": 4,
            "numReviews": 0,
            "createdAt": bson::DateTime::from_millis(1_704_067_200_000),
            "updatedAt": bson::DateTime::from_millis(1_704_067_200_000),
        };

        let recipe: Recipe = bson::from_document(legacy).unwrap();
        assert_eq!(recipe.created_at.timestamp(), 1_704_067_200);
        assert!(recipe.status.is_none());
        assert_eq!(recipe.rating, 4.0);
        assert_eq!(
            RecipeResponse::from(recipe).status,
            RecipeStatus::Approved
        );
    }

    #[test]
    fn documents_without_timestamps_still_load() {
        let bare = doc! {
            "_id": ObjectId::new(),
            "title": "Suya",
            "reviews": [{
                "name": "Ada",
                "rating": 5,
                "userId": ObjectId::new(),
            }],
        };

        let recipe: Recipe = bson::from_document(bare).unwrap();
        assert_eq!(recipe.created_at, DateTime::<Utc>::default());
        assert_eq!(recipe.reviews[0].rating, 5.0);
    }

    #[test]
    fn approving_an_authored_legacy_recipe_notifies_the_author() {
        let author = ObjectId::new();
        let mut recipe = stored(RecipeStatus::Approved, Some(author));
        recipe.status = None;

        let notice = recipe
            .apply_update(UpdateRecipeRequest {
                status: Some(RecipeStatus::Approved),
                ..Default::default()
            })
            .unwrap();

        let (to, notification) = notice.expect("author is notified");
        assert_eq!(to, author);
        assert_eq!(notification.kind, NotificationKind::RecipeApproved);
        assert_eq!(recipe.status, Some(RecipeStatus::Approved));
    }
}
