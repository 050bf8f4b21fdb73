//! Title endpoints.

use crate::catalog::{
    delete_title, find_titles, load_title_detail, load_title_details, resolve_category,
    resolve_genres, set_title_genres, TitleDetail, TitleFilter, TitleQuery,
};
use crate::middleware::ClientCtx;
use crate::orm::titles;
use crate::permission::Policy;
use crate::web::catalog::LookupResponse;
use crate::web::error::ApiError;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::{Datelike, Utc};
use sea_orm::{entity::*, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_titles)
        .service(create_title)
        .service(view_title)
        .service(replace_title)
        .service(update_title)
        .service(destroy_title);
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<LookupResponse>,
    pub category: Option<LookupResponse>,
}

impl From<TitleDetail> for TitleResponse {
    fn from(detail: TitleDetail) -> Self {
        Self {
            id: detail.title.id,
            name: detail.title.name,
            year: detail.title.year,
            rating: detail.rating,
            description: detail.title.description,
            genre: detail.genres.into_iter().map(LookupResponse::from).collect(),
            category: detail.category.map(LookupResponse::from),
        }
    }
}

/// Full write payload, used by POST and PUT.
#[derive(Debug, Deserialize)]
pub struct TitleForm {
    #[serde(default)]
    pub name: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial write payload. An absent field is left alone; `"category": null`
/// clears the category.
#[derive(Debug, Default, Deserialize)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
}

/// Tells an explicit `null` apart from a missing key.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// A release year may not lie in the future.
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    if year < 0 || year > Utc::now().year() {
        let mut err = ValidationError::new("year");
        err.message = Some("Year must not be greater than the current year.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len == 0 || len > 256 {
        let mut err = ValidationError::new("length");
        err.message = Some("Ensure this field has between 1 and 256 characters.".into());
        return Err(err);
    }
    Ok(())
}

const REQUIRED: &str = "This field is required.";

fn required_year(year: Option<i32>) -> Result<(), ValidationError> {
    match year {
        Some(year) => validate_year(year),
        None => {
            let mut err = ValidationError::new("required");
            err.message = Some(REQUIRED.into());
            Err(err)
        }
    }
}

fn collect(checks: Vec<(&'static str, Result<(), ValidationError>)>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for (field, check) in checks {
        if let Err(err) = check {
            errors.add(field, err);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Validate for TitleForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        collect(vec![
            ("name", validate_name(&self.name)),
            ("year", required_year(self.year)),
        ])
    }
}

impl Validate for TitlePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Vec::new();
        if let Some(name) = &self.name {
            checks.push(("name", validate_name(name)));
        }
        if let Some(year) = self.year {
            checks.push(("year", validate_year(year)));
        }
        collect(checks)
    }
}

async fn render(db: &DatabaseConnection, title_id: i32) -> Result<TitleResponse, ApiError> {
    load_title_detail(db, title_id)
        .await?
        .map(TitleResponse::from)
        .ok_or_else(|| ApiError::not_found("Title"))
}

async fn get_title(db: &DatabaseConnection, title_id: i32) -> Result<titles::Model, ApiError> {
    titles::Entity::find_by_id(title_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Title"))
}

#[get("/titles")]
async fn view_titles(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<TitleQuery>,
) -> Result<HttpResponse, ApiError> {
    let db = db.get_ref();
    let filter = TitleFilter::resolve(&query)?;
    let rows = find_titles(db, &filter).await?;
    let body: Vec<TitleResponse> = load_title_details(db, rows)
        .await?
        .into_iter()
        .map(TitleResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

#[post("/titles")]
async fn create_title(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<TitleForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;
    form.validate()?;

    let db = db.get_ref();
    let form = form.into_inner();
    let year = form.year.ok_or_else(|| ApiError::field("year", REQUIRED))?;

    // Every slug resolves before anything is written.
    let category = match &form.category {
        Some(slug) => Some(resolve_category(db, slug).await?),
        None => None,
    };
    let genres = resolve_genres(db, &form.genre).await?;

    let txn = db.begin().await?;
    let title = titles::ActiveModel {
        name: Set(form.name),
        description: Set(form.description),
        year: Set(year),
        category_id: Set(category.map(|c| c.id)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    set_title_genres(&txn, title.id, &genres).await?;
    txn.commit().await?;

    log::info!("Created title_id: {}", title.id);
    Ok(HttpResponse::Created().json(render(db, title.id).await?))
}

#[get("/titles/{title_id}")]
async fn view_title(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(render(db.get_ref(), path.into_inner()).await?))
}

/// PUT replaces every writable field, including the genre set.
#[put("/titles/{title_id}")]
async fn replace_title(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<TitleForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;

    let db = db.get_ref();
    let title = get_title(db, path.into_inner()).await?;
    form.validate()?;
    let form = form.into_inner();
    let year = form.year.ok_or_else(|| ApiError::field("year", REQUIRED))?;

    let category = match &form.category {
        Some(slug) => Some(resolve_category(db, slug).await?),
        None => None,
    };
    let genres = resolve_genres(db, &form.genre).await?;

    let txn = db.begin().await?;
    let mut active: titles::ActiveModel = title.into();
    active.name = Set(form.name);
    active.description = Set(form.description);
    active.year = Set(year);
    active.category_id = Set(category.map(|c| c.id));
    let title = active.update(&txn).await?;
    set_title_genres(&txn, title.id, &genres).await?;
    txn.commit().await?;

    Ok(HttpResponse::Ok().json(render(db, title.id).await?))
}

#[patch("/titles/{title_id}")]
async fn update_title(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<TitlePatch>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;

    let db = db.get_ref();
    let title = get_title(db, path.into_inner()).await?;
    form.validate()?;
    let form = form.into_inner();

    let category = match &form.category {
        Some(Some(slug)) => Some(Some(resolve_category(db, slug).await?)),
        Some(None) => Some(None),
        None => None,
    };
    let genres = match &form.genre {
        Some(slugs) => Some(resolve_genres(db, slugs).await?),
        None => None,
    };

    let txn = db.begin().await?;
    let mut active: titles::ActiveModel = title.into();
    if let Some(name) = form.name {
        active.name = Set(name);
    }
    if let Some(year) = form.year {
        active.year = Set(year);
    }
    if let Some(description) = form.description {
        active.description = Set(description);
    }
    if let Some(category) = category {
        active.category_id = Set(category.map(|c| c.id));
    }
    let title = active.update(&txn).await?;
    if let Some(genres) = genres {
        set_title_genres(&txn, title.id, &genres).await?;
    }
    txn.commit().await?;

    Ok(HttpResponse::Ok().json(render(db, title.id).await?))
}

#[delete("/titles/{title_id}")]
async fn destroy_title(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::ReadPublicWriteAdmin)?;

    let db = db.get_ref();
    let title = get_title(db, path.into_inner()).await?;

    let txn = db.begin().await?;
    delete_title(&txn, title.id).await?;
    txn.commit().await?;

    log::info!("Deleted title_id: {}", title.id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        let this_year = Utc::now().year();
        assert!(validate_year(this_year).is_ok());
        assert!(validate_year(1895).is_ok());
        assert!(validate_year(this_year + 1).is_err());
        assert!(validate_year(-1).is_err());
    }

    #[test]
    fn test_patch_distinguishes_null_from_missing() {
        let patch: TitlePatch = serde_json::from_str(r#"{"category": null}"#).unwrap();
        assert_eq!(patch.category, Some(None));
        assert_eq!(patch.description, None);

        let patch: TitlePatch = serde_json::from_str(r#"{"name": "Solaris"}"#).unwrap();
        assert_eq!(patch.category, None);
        assert!(patch.genre.is_none());
    }

    #[test]
    fn test_form_validation_reports_fields() {
        let form = TitleForm {
            name: String::new(),
            year: Some(Utc::now().year() + 5),
            description: String::new(),
            genre: vec![],
            category: None,
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("year"));
    }

    #[test]
    fn test_missing_year_is_a_field_error() {
        let form: TitleForm = serde_json::from_str(r#"{"name": "Solaris"}"#).unwrap();
        assert_eq!(form.year, None);
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("year"));
    }
}
