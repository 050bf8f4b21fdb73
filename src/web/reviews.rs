//! Review endpoints, nested under a title.

use crate::db::is_unique_violation;
use crate::middleware::ClientCtx;
use crate::orm::{comments, reviews, titles, users};
use crate::permission::Policy;
use crate::web::error::ApiError;
use crate::web::utc;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_reviews)
        .service(create_review)
        .service(view_review)
        .service(update_review)
        .service(destroy_review);
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub score: i32,
    pub pub_date: DateTime<Utc>,
}

impl ReviewResponse {
    fn new(review: reviews::Model, author: Option<users::Model>) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: author.map(|u| u.username).unwrap_or_default(),
            score: review.score,
            pub_date: utc(review.pub_date),
        }
    }
}

fn default_score() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewReviewForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
    #[serde(default = "default_score")]
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReviewPatch {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i32>,
}

pub(super) async fn get_title(
    db: &DatabaseConnection,
    title_id: i32,
) -> Result<titles::Model, ApiError> {
    titles::Entity::find_by_id(title_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Title"))
}

/// Loads a review, requiring it to belong to the title in the path.
pub(super) async fn get_review(
    db: &DatabaseConnection,
    title_id: i32,
    review_id: i32,
) -> Result<reviews::Model, ApiError> {
    get_title(db, title_id).await?;
    reviews::Entity::find()
        .filter(reviews::Column::Id.eq(review_id))
        .filter(reviews::Column::TitleId.eq(title_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Review"))
}

async fn render(db: &DatabaseConnection, review: reviews::Model) -> Result<ReviewResponse, ApiError> {
    let author = users::Entity::find_by_id(review.author_id).one(db).await?;
    Ok(ReviewResponse::new(review, author))
}

#[get("/titles/{title_id}/reviews")]
async fn view_reviews(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let db = db.get_ref();
    let title = get_title(db, path.into_inner()).await?;

    let body: Vec<ReviewResponse> = reviews::Entity::find()
        .filter(reviews::Column::TitleId.eq(title.id))
        .order_by_asc(reviews::Column::PubDate)
        .order_by_asc(reviews::Column::Id)
        .find_also_related(users::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(review, author)| ReviewResponse::new(review, author))
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// One review per user per title.
#[post("/titles/{title_id}/reviews")]
async fn create_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<NewReviewForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;
    let user = client.require_login()?;

    let db = db.get_ref();
    let title = get_title(db, path.into_inner()).await?;
    form.validate()?;

    let existing = reviews::Entity::find()
        .filter(reviews::Column::TitleId.eq(title.id))
        .filter(reviews::Column::AuthorId.eq(user.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("You have already reviewed this title."));
    }

    let review = reviews::ActiveModel {
        title_id: Set(title.id),
        author_id: Set(user.id),
        text: Set(form.text.clone()),
        score: Set(form.score),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        // Lost a race with a concurrent review by the same author.
        if is_unique_violation(&e) {
            ApiError::conflict("You have already reviewed this title.")
        } else {
            ApiError::from(e)
        }
    })?;

    log::info!(
        "user_id: {} reviewed title_id: {} with score {}",
        user.id,
        title.id,
        review.score
    );
    Ok(HttpResponse::Created().json(ReviewResponse::new(review, Some(user.clone()))))
}

#[get("/titles/{title_id}/reviews/{review_id}")]
async fn view_review(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ApiError> {
    let (title_id, review_id) = path.into_inner();
    let db = db.get_ref();
    let review = get_review(db, title_id, review_id).await?;
    Ok(HttpResponse::Ok().json(render(db, review).await?))
}

#[patch("/titles/{title_id}/reviews/{review_id}")]
async fn update_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Json<ReviewPatch>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;

    let (title_id, review_id) = path.into_inner();
    let db = db.get_ref();
    let review = get_review(db, title_id, review_id).await?;
    client.require_author_or_staff(review.author_id)?;
    form.validate()?;

    let form = form.into_inner();
    let mut active: reviews::ActiveModel = review.into();
    if let Some(text) = form.text {
        active.text = Set(text);
    }
    if let Some(score) = form.score {
        active.score = Set(score);
    }
    let review = active.update(db).await?;

    Ok(HttpResponse::Ok().json(render(db, review).await?))
}

#[delete("/titles/{title_id}/reviews/{review_id}")]
async fn destroy_review(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;

    let (title_id, review_id) = path.into_inner();
    let db = db.get_ref();
    let review = get_review(db, title_id, review_id).await?;
    client.require_author_or_staff(review.author_id)?;

    let txn = db.begin().await?;
    comments::Entity::delete_many()
        .filter(comments::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    reviews::Entity::delete_many()
        .filter(reviews::Column::Id.eq(review.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    log::info!(
        "user_id: {:?} deleted review_id: {}",
        client.get_id(),
        review.id
    );
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_defaults_to_one() {
        let form: NewReviewForm = serde_json::from_str(r#"{"text": "Fine."}"#).unwrap();
        assert_eq!(form.score, 1);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_score_range() {
        for score in [0, 11] {
            let form = NewReviewForm {
                text: "Fine.".to_owned(),
                score,
            };
            assert!(form.validate().is_err(), "score {} accepted", score);
        }
    }

    #[test]
    fn test_patch_validates_present_fields_only() {
        assert!(ReviewPatch::default().validate().is_ok());
        let patch = ReviewPatch {
            text: None,
            score: Some(12),
        };
        assert!(patch.validate().is_err());
    }
}
