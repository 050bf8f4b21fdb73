//! Comment endpoints, nested under a review.

use super::reviews::get_review;
use crate::middleware::ClientCtx;
use crate::orm::{comments, users};
use crate::permission::Policy;
use crate::web::error::ApiError;
use crate::web::utc;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_comments)
        .service(create_comment)
        .service(view_comment)
        .service(update_comment)
        .service(destroy_comment);
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl CommentResponse {
    fn new(comment: comments::Model, author: Option<users::Model>) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: author.map(|u| u.username).unwrap_or_default(),
            pub_date: utc(comment.pub_date),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentPatch {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
}

/// Loads a comment, requiring the whole title → review → comment chain in the
/// path to hold together.
async fn get_comment(
    db: &DatabaseConnection,
    title_id: i32,
    review_id: i32,
    comment_id: i32,
) -> Result<comments::Model, ApiError> {
    let review = get_review(db, title_id, review_id).await?;
    comments::Entity::find()
        .filter(comments::Column::Id.eq(comment_id))
        .filter(comments::Column::ReviewId.eq(review.id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))
}

async fn render(
    db: &DatabaseConnection,
    comment: comments::Model,
) -> Result<CommentResponse, ApiError> {
    let author = users::Entity::find_by_id(comment.author_id).one(db).await?;
    Ok(CommentResponse::new(comment, author))
}

#[get("/titles/{title_id}/reviews/{review_id}/comments")]
async fn view_comments(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ApiError> {
    let (title_id, review_id) = path.into_inner();
    let db = db.get_ref();
    let review = get_review(db, title_id, review_id).await?;

    let body: Vec<CommentResponse> = comments::Entity::find()
        .filter(comments::Column::ReviewId.eq(review.id))
        .order_by_asc(comments::Column::PubDate)
        .order_by_asc(comments::Column::Id)
        .find_also_related(users::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(comment, author)| CommentResponse::new(comment, author))
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

#[post("/titles/{title_id}/reviews/{review_id}/comments")]
async fn create_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;
    let user = client.require_login()?;

    let (title_id, review_id) = path.into_inner();
    let db = db.get_ref();
    let review = get_review(db, title_id, review_id).await?;
    form.validate()?;

    let comment = comments::ActiveModel {
        review_id: Set(review.id),
        author_id: Set(user.id),
        text: Set(form.text.clone()),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(HttpResponse::Created().json(CommentResponse::new(comment, Some(user.clone()))))
}

#[get("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
async fn view_comment(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32, i32)>,
) -> Result<HttpResponse, ApiError> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let db = db.get_ref();
    let comment = get_comment(db, title_id, review_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(render(db, comment).await?))
}

#[patch("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
async fn update_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32, i32)>,
    form: web::Json<CommentPatch>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;

    let (title_id, review_id, comment_id) = path.into_inner();
    let db = db.get_ref();
    let comment = get_comment(db, title_id, review_id, comment_id).await?;
    client.require_author_or_staff(comment.author_id)?;
    form.validate()?;

    let comment = match form.into_inner().text {
        Some(text) => {
            let mut active: comments::ActiveModel = comment.into();
            active.text = Set(text);
            active.update(db).await?
        }
        None => comment,
    };

    Ok(HttpResponse::Ok().json(render(db, comment).await?))
}

#[delete("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
async fn destroy_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32, i32)>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAuthenticated)?;

    let (title_id, review_id, comment_id) = path.into_inner();
    let db = db.get_ref();
    let comment = get_comment(db, title_id, review_id, comment_id).await?;
    client.require_author_or_staff(comment.author_id)?;

    comments::Entity::delete_by_id(comment.id).exec(db).await?;

    Ok(HttpResponse::NoContent().finish())
}
