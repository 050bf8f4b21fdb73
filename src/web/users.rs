//! User administration and the self-service profile.

use crate::db::is_unique_violation;
use crate::middleware::ClientCtx;
use crate::orm::users::{self, Role};
use crate::permission::Policy;
use crate::user::{delete_user, find_by_email, find_by_username, normalize_email};
use crate::web::catalog::SearchQuery;
use crate::web::error::ApiError;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    // `me` routes come first so they are not captured as a username.
    conf.service(view_me)
        .service(update_me)
        .service(destroy_me)
        .service(view_users)
        .service(create_user)
        .service(view_user)
        .service(update_user)
        .service(destroy_user);
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserForm {
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 150,
            message = "Ensure this field has between 1 and 150 characters."
        ),
        regex(
            path = "crate::user::USERNAME_RE",
            message = "Enter a valid username. Letters, digits and @/./+/-/_ only."
        ),
        custom(function = "crate::user::validate_username_not_reserved")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(
        length(max = 254, message = "Ensure this field has no more than 254 characters."),
        email(message = "Enter a valid email address.")
    )]
    pub email: String,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Partial profile update. `role` is honored only on the admin routes.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(
        length(
            min = 1,
            max = 150,
            message = "Ensure this field has between 1 and 150 characters."
        ),
        regex(
            path = "crate::user::USERNAME_RE",
            message = "Enter a valid username. Letters, digits and @/./+/-/_ only."
        ),
        custom(function = "crate::user::validate_username_not_reserved")
    )]
    pub username: Option<String>,
    #[validate(
        length(max = 254, message = "Ensure this field has no more than 254 characters."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

fn duplicate_user(e: DbErr) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::conflict("A user with this username or email already exists.")
    } else {
        ApiError::from(e)
    }
}

async fn get_user(db: &DatabaseConnection, username: &str) -> Result<users::Model, ApiError> {
    find_by_username(db, username)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

/// Applies a profile patch. `allow_role` is false on self-service edits, which
/// keeps the stored role whatever the payload says.
async fn apply_patch(
    db: &DatabaseConnection,
    user: users::Model,
    patch: UserPatch,
    allow_role: bool,
) -> Result<users::Model, ApiError> {
    patch.validate()?;

    if let Some(username) = &patch.username {
        if *username != user.username && find_by_username(db, username).await?.is_some() {
            return Err(ApiError::field(
                "username",
                "A user with that username already exists.",
            ));
        }
    }
    let email = patch.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if *email != user.email && find_by_email(db, email).await?.is_some() {
            return Err(ApiError::field(
                "email",
                "A user with this email already exists.",
            ));
        }
    }

    let mut active: users::ActiveModel = user.into();
    if let Some(username) = patch.username {
        active.username = Set(username);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(first_name) = patch.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = patch.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(bio) = patch.bio {
        active.bio = Set(Some(bio));
    }
    match patch.role {
        Some(role) if allow_role => active.role = Set(role),
        Some(_) => log::debug!("Ignoring role in self-service profile update"),
        None => {}
    }

    active.update(db).await.map_err(duplicate_user)
}

async fn remove(db: &DatabaseConnection, user_id: i32) -> Result<(), ApiError> {
    let txn = db.begin().await?;
    delete_user(&txn, user_id).await?;
    txn.commit().await?;
    Ok(())
}

#[get("/users/me")]
async fn view_me(client: ClientCtx) -> Result<HttpResponse, ApiError> {
    client.require(Policy::SelfServiceOnly)?;
    let me = client.require_login()?;
    Ok(HttpResponse::Ok().json(UserResponse::from(me.clone())))
}

#[patch("/users/me")]
async fn update_me(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<UserPatch>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::SelfServiceOnly)?;
    let me = client.require_login()?.clone();

    let user = apply_patch(db.get_ref(), me, form.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[delete("/users/me")]
async fn destroy_me(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::SelfServiceOnly)?;
    let me = client.require_login()?;

    remove(db.get_ref(), me.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/users")]
async fn view_users(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::AdminOnly)?;

    let body: Vec<UserResponse> = users::Entity::find()
        .order_by_asc(users::Column::Username)
        .all(db.get_ref())
        .await?
        .into_iter()
        .filter(|u| query.matches(&u.username))
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

#[post("/users")]
async fn create_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<NewUserForm>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::AdminOnly)?;
    form.validate()?;

    let db = db.get_ref();
    let form = form.into_inner();
    let email = normalize_email(&form.email);

    if find_by_username(db, &form.username).await?.is_some() {
        return Err(ApiError::field(
            "username",
            "A user with that username already exists.",
        ));
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(ApiError::field(
            "email",
            "A user with this email already exists.",
        ));
    }

    let user = users::ActiveModel {
        username: Set(form.username),
        email: Set(email),
        first_name: Set(form.first_name),
        last_name: Set(form.last_name),
        bio: Set(form.bio),
        role: Set(form.role),
        is_superuser: Set(false),
        confirmation_code: Set(None),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(duplicate_user)?;

    log::info!(
        "user_id: {:?} created user `{}` as {:?}",
        client.get_id(),
        user.username,
        user.role
    );
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

#[get("/users/{username}")]
async fn view_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::AdminOnly)?;
    let user = get_user(db.get_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[patch("/users/{username}")]
async fn update_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    form: web::Json<UserPatch>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::AdminOnly)?;

    let db = db.get_ref();
    let user = get_user(db, &path).await?;
    let user = apply_patch(db, user, form.into_inner(), true).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[delete("/users/{username}")]
async fn destroy_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    client.require(Policy::AdminOnly)?;

    let db = db.get_ref();
    let user = get_user(db, &path).await?;
    remove(db, user.id).await?;

    log::info!("user_id: {:?} deleted user `{}`", client.get_id(), user.username);
    Ok(HttpResponse::NoContent().finish())
}
