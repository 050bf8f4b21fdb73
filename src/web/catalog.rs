//! Category and genre endpoints.

use crate::catalog::{delete_category, delete_genre, find_category, find_genre};
use crate::db::is_unique_violation;
use crate::middleware::ClientCtx;
use crate::orm::{categories, genres};
use crate::permission::Policy;
use crate::web::error::ApiError;
use actix_web::{delete, get, post, web, HttpResponse};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_categories)
        .service(create_category)
        .service(destroy_category)
        .service(view_genres)
        .service(create_genre)
        .service(destroy_genre);
}

/// `{name, slug}` pair shared by categories and genres, including where they
/// are embedded in a title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for LookupResponse {
    fn from(m: categories::Model) -> Self {
        Self {
            name: m.name,
            slug: m.slug,
        }
    }
}

impl From<genres::Model> for LookupResponse {
    fn from(m: genres::Model) -> Self {
        Self {
            name: m.name,
            slug: m.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LookupForm {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 256,
        message = "Ensure this field has between 1 and 256 characters."
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 50,
            message = "Ensure this field has between 1 and 50 characters."
        ),
        regex(
            path = "SLUG_RE",
            message = "Enter a valid slug consisting of letters, numbers, underscores or hyphens."
        )
    )]
    pub slug: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    /// Case-insensitive substring match. A blank search matches everything.
    pub fn matches(&self, value: &str) -> bool {
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                value.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => true,
        }
    }
}

fn duplicate_slug(e: sea_orm::DbErr) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::field("slug", "This slug is already in use.")
    } else {
        ApiError::from(e)
    }
}

#[get("/categories")]
async fn view_categories(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows: Vec<LookupResponse> = categories::Entity::find()
        .order_by_asc(categories::Column::Name)
        .all(db.get_ref())
        .await?
        .into_iter()
        .filter(|c| query.matches(&c.name))
        .map(LookupResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(rows))
}

#[post("/categories")]
async fn create_category(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<LookupForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;
    form.validate()?;

    let db = db.get_ref();
    if find_category(db, &form.slug).await?.is_some() {
        return Err(ApiError::field("slug", "This slug is already in use."));
    }

    let category = categories::ActiveModel {
        name: Set(form.name.clone()),
        slug: Set(form.slug.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(duplicate_slug)?;

    log::info!("Created category `{}`", category.slug);
    Ok(HttpResponse::Created().json(LookupResponse::from(category)))
}

/// Deleting a category leaves its titles in place, uncategorized.
#[delete("/categories/{slug}")]
async fn destroy_category(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;

    let db = db.get_ref();
    let category = find_category(db, &path)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    let txn = db.begin().await?;
    delete_category(&txn, category.id).await?;
    txn.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/genres")]
async fn view_genres(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows: Vec<LookupResponse> = genres::Entity::find()
        .order_by_asc(genres::Column::Name)
        .all(db.get_ref())
        .await?
        .into_iter()
        .filter(|g| query.matches(&g.name))
        .map(LookupResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(rows))
}

#[post("/genres")]
async fn create_genre(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<LookupForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;
    form.validate()?;

    let db = db.get_ref();
    if find_genre(db, &form.slug).await?.is_some() {
        return Err(ApiError::field("slug", "This slug is already in use."));
    }

    let genre = genres::ActiveModel {
        name: Set(form.name.clone()),
        slug: Set(form.slug.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(duplicate_slug)?;

    log::info!("Created genre `{}`", genre.slug);
    Ok(HttpResponse::Created().json(LookupResponse::from(genre)))
}

/// Deleting a genre unlinks it from every title.
#[delete("/genres/{slug}")]
async fn destroy_genre(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;

    let db = db.get_ref();
    let genre = find_genre(db, &path)
        .await?
        .ok_or_else(|| ApiError::not_found("Genre"))?;

    let txn = db.begin().await?;
    delete_genre(&txn, genre.id).await?;
    txn.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}
