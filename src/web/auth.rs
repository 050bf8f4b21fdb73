//! Signup and token exchange.
//!
//! Signing up never yields a credential. It mails a confirmation code, and the
//! code is traded exactly once for a bearer token.

use crate::db::is_unique_violation;
use crate::email::{templates, SharedMailer};
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::token::TokenKeys;
use crate::user::{find_by_email, find_by_username, generate_confirmation_code, normalize_email};
use crate::web::error::ApiError;
use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(signup).service(obtain_token);
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
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
}

#[derive(Debug, Serialize)]
struct SignupResponse {
    username: String,
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

/// Registers a user, or re-sends the code to a returning one, and mails the
/// confirmation code.
#[post("/auth/signup")]
async fn signup(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<SharedMailer>,
    form: web::Json<SignupForm>,
) -> Result<HttpResponse, ApiError> {
    form.validate()?;

    let db = db.get_ref();
    let email = normalize_email(&form.email);
    let code_length = crate::app_config::auth().confirmation_code_length;

    let (user, code) = match find_by_username(db, &form.username).await? {
        Some(user) => {
            if user.email != email {
                return Err(ApiError::field(
                    "email",
                    "This username is registered with a different email.",
                ));
            }
            match user.confirmation_code.clone() {
                Some(code) => (user, code),
                None => {
                    let code = generate_confirmation_code(code_length);
                    let mut active: users::ActiveModel = user.into();
                    active.confirmation_code = Set(Some(code.clone()));
                    (active.update(db).await?, code)
                }
            }
        }
        None => {
            if find_by_email(db, &email).await?.is_some() {
                return Err(ApiError::field(
                    "email",
                    "A user with this email already exists.",
                ));
            }

            let code = generate_confirmation_code(code_length);
            let user = users::ActiveModel {
                username: Set(form.username.clone()),
                email: Set(email.clone()),
                role: Set(users::Role::User),
                is_superuser: Set(false),
                confirmation_code: Set(Some(code.clone())),
                date_joined: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict("A user with this username or email already exists.")
                } else {
                    ApiError::from(e)
                }
            })?;

            log::info!("Registered user_id: {} ({})", user.id, user.username);
            (user, code)
        }
    };

    let mail = templates::confirmation_code_email(&user.email, &user.username, &code);
    if let Err(e) = mailer.send(&mail).await {
        // The code stays stored; signing up again re-sends it.
        log::error!("Failed to mail confirmation code to {}: {}", user.email, e);
    }

    Ok(HttpResponse::Ok().json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

/// Trades a username and its confirmation code for a bearer token.
#[post("/auth/token")]
async fn obtain_token(
    _client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<TokenKeys>,
    form: web::Json<TokenForm>,
) -> Result<HttpResponse, ApiError> {
    form.validate()?;

    let db = db.get_ref();
    let user = find_by_username(db, &form.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    // Consume the code in the same statement that checks it, so a code can
    // only ever be exchanged once.
    let consumed = users::Entity::update_many()
        .col_expr(
            users::Column::ConfirmationCode,
            Expr::value(Option::<String>::None),
        )
        .filter(users::Column::Id.eq(user.id))
        .filter(users::Column::ConfirmationCode.eq(form.confirmation_code.as_str()))
        .exec(db)
        .await?;

    if consumed.rows_affected != 1 {
        log::warn!("Invalid confirmation code for user_id: {}", user.id);
        return Err(ApiError::field(
            "confirmation_code",
            "Invalid confirmation code.",
        ));
    }

    let token = keys.issue_token(user.id).map_err(|e| {
        log::error!("Failed to issue token for user_id {}: {}", user.id, e);
        ApiError::Internal
    })?;

    log::info!("Issued token for user_id: {}", user.id);
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
