use crate::orm::users;
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::borrow::Cow;
use validator::ValidationError;

/// Word characters plus `.`, `@`, `+` and `-`, anchored at both ends.
pub static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// Path segment reserved for the self-service endpoint.
pub const RESERVED_USERNAME: &str = "me";

pub const USERNAME_MAX_LENGTH: u64 = 150;

/// Rejects the reserved name in any letter case.
pub fn validate_username_not_reserved(username: &str) -> Result<(), ValidationError> {
    if username.to_lowercase() == RESERVED_USERNAME {
        let mut err = ValidationError::new("reserved_username");
        err.message = Some(Cow::from("The username `me` is reserved."));
        return Err(err);
    }
    Ok(())
}

/// Lowercases the domain part of an address, leaving the local part intact.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_owned(),
    }
}

/// Generates a random alphanumeric confirmation code.
pub fn generate_confirmation_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub async fn find_by_username<C>(db: &C, username: &str) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await
}

pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await
}

/// Deletes a user together with everything that hangs off their account:
/// their comments, their reviews, and every comment left on those reviews.
pub async fn delete_user<C>(db: &C, user_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    use crate::orm::{comments, reviews};

    let review_ids: Vec<i32> = reviews::Entity::find()
        .filter(reviews::Column::AuthorId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    if !review_ids.is_empty() {
        comments::Entity::delete_many()
            .filter(comments::Column::ReviewId.is_in(review_ids.clone()))
            .exec(db)
            .await?;
    }
    comments::Entity::delete_many()
        .filter(comments::Column::AuthorId.eq(user_id))
        .exec(db)
        .await?;
    reviews::Entity::delete_many()
        .filter(reviews::Column::AuthorId.eq(user_id))
        .exec(db)
        .await?;
    users::Entity::delete_many()
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    log::info!("Deleted user_id: {}", user_id);
    Ok(())
}
