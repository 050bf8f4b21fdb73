//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use yamdb::orm::users::Role;
use yamdb::orm::{categories, comments, genres, reviews, title_genres, titles, users};

/// Create a user with the given role and a pending confirmation code.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(format!("{}@example.com", username.to_lowercase())),
        role: Set(role),
        is_superuser: Set(false),
        confirmation_code: Set(Some(format!("code-{}", username))),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a superuser whose role is still `user`.
pub async fn create_test_superuser(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, DbErr> {
    let user = create_test_user(db, username, Role::User).await?;
    let mut active: users::ActiveModel = user.into();
    active.is_superuser = Set(true);
    active.update(db).await
}

pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> Result<categories::Model, DbErr> {
    categories::ActiveModel {
        name: Set(name.to_owned()),
        slug: Set(slug.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_genre(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> Result<genres::Model, DbErr> {
    genres::ActiveModel {
        name: Set(name.to_owned()),
        slug: Set(slug.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a title, optionally categorized, linked to the given genres.
pub async fn create_test_title(
    db: &DatabaseConnection,
    name: &str,
    year: i32,
    category: Option<&categories::Model>,
    genres: &[&genres::Model],
) -> Result<titles::Model, DbErr> {
    let title = titles::ActiveModel {
        name: Set(name.to_owned()),
        description: Set(String::new()),
        year: Set(year),
        category_id: Set(category.map(|c| c.id)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for genre in genres {
        title_genres::ActiveModel {
            genre_id: Set(genre.id),
            title_id: Set(title.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(title)
}

pub async fn create_test_review(
    db: &DatabaseConnection,
    title: &titles::Model,
    author: &users::Model,
    score: i32,
) -> Result<reviews::Model, DbErr> {
    reviews::ActiveModel {
        title_id: Set(title.id),
        author_id: Set(author.id),
        text: Set(format!("{} rates it {}", author.username, score)),
        score: Set(score),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_comment(
    db: &DatabaseConnection,
    review: &reviews::Model,
    author: &users::Model,
    text: &str,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        review_id: Set(review.id),
        author_id: Set(author.id),
        text: Set(text.to_owned()),
        pub_date: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}
