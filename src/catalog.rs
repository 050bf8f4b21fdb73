//! Catalog queries and writes: titles, categories, genres and the join rows
//! between titles and genres.

use crate::orm::{categories, comments, genres, reviews, title_genres, titles};
use sea_orm::{entity::*, query::*, sea_query::Expr, ConnectionTrait, DbErr};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("category `{0}` does not exist")]
    UnknownCategory(String),
    #[error("genre `{0}` does not exist")]
    UnknownGenre(String),
    #[error("year `{0}` is not a number")]
    InvalidYear(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Query string accepted by the title list.
#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    pub genre: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub name: Option<String>,
}

/// The filter actually applied to a title list.
///
/// Genre wins over category, and category wins over the generic fields; a
/// higher ranked filter alone determines the result set.
#[derive(Debug, PartialEq, Eq)]
pub enum TitleFilter {
    Genre(String),
    Category(String),
    Fields {
        year: Option<i32>,
        name: Option<String>,
    },
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl TitleFilter {
    /// Picks the filter to apply. `year` is only parsed when neither genre nor
    /// category is given, so a junk year next to them is ignored.
    pub fn resolve(query: &TitleQuery) -> Result<Self, CatalogError> {
        if let Some(genre) = present(&query.genre) {
            return Ok(TitleFilter::Genre(genre));
        }
        if let Some(category) = present(&query.category) {
            return Ok(TitleFilter::Category(category));
        }
        let year = match present(&query.year) {
            Some(year) => Some(
                year.parse::<i32>()
                    .map_err(|_| CatalogError::InvalidYear(year))?,
            ),
            None => None,
        };
        Ok(TitleFilter::Fields {
            year,
            name: present(&query.name),
        })
    }
}

/// A title with its relations resolved and its rating computed.
#[derive(Debug, Clone)]
pub struct TitleDetail {
    pub title: titles::Model,
    pub category: Option<categories::Model>,
    pub genres: Vec<genres::Model>,
    pub rating: Option<f64>,
}

pub async fn find_titles<C>(db: &C, filter: &TitleFilter) -> Result<Vec<titles::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let select = titles::Entity::find().order_by_asc(titles::Column::Id);

    match filter {
        TitleFilter::Genre(slug) => {
            let genre = match find_genre(db, slug).await? {
                Some(genre) => genre,
                None => return Ok(Vec::new()),
            };
            let title_ids: Vec<i32> = title_genres::Entity::find()
                .filter(title_genres::Column::GenreId.eq(genre.id))
                .all(db)
                .await?
                .into_iter()
                .map(|tg| tg.title_id)
                .collect();
            if title_ids.is_empty() {
                return Ok(Vec::new());
            }
            select
                .filter(titles::Column::Id.is_in(title_ids))
                .all(db)
                .await
        }
        TitleFilter::Category(slug) => {
            let category = match find_category(db, slug).await? {
                Some(category) => category,
                None => return Ok(Vec::new()),
            };
            select
                .filter(titles::Column::CategoryId.eq(category.id))
                .all(db)
                .await
        }
        TitleFilter::Fields { year, name } => {
            let mut select = select;
            if let Some(year) = year {
                select = select.filter(titles::Column::Year.eq(*year));
            }
            let rows = select.all(db).await?;

            // icontains, applied here so it behaves the same on every backend.
            Ok(match name {
                Some(needle) => {
                    let needle = needle.to_lowercase();
                    rows.into_iter()
                        .filter(|t| t.name.to_lowercase().contains(&needle))
                        .collect()
                }
                None => rows,
            })
        }
    }
}

/// Resolves category, genres and rating for each title, in input order.
pub async fn load_title_details<C>(
    db: &C,
    rows: Vec<titles::Model>,
) -> Result<Vec<TitleDetail>, DbErr>
where
    C: ConnectionTrait,
{
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let title_ids: Vec<i32> = rows.iter().map(|t| t.id).collect();

    let category_ids: Vec<i32> = rows
        .iter()
        .filter_map(|t| t.category_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let categories: HashMap<i32, categories::Model> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let links = title_genres::Entity::find()
        .filter(title_genres::Column::TitleId.is_in(title_ids.clone()))
        .order_by_asc(title_genres::Column::Id)
        .all(db)
        .await?;
    let genre_ids: Vec<i32> = links
        .iter()
        .map(|l| l.genre_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let genres: HashMap<i32, genres::Model> = if genre_ids.is_empty() {
        HashMap::new()
    } else {
        genres::Entity::find()
            .filter(genres::Column::Id.is_in(genre_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect()
    };
    let mut genres_by_title: HashMap<i32, Vec<genres::Model>> = HashMap::new();
    for link in links {
        if let Some(genre) = genres.get(&link.genre_id) {
            genres_by_title
                .entry(link.title_id)
                .or_default()
                .push(genre.clone());
        }
    }

    let ratings = crate::rating::get_ratings(db, &title_ids).await?;

    Ok(rows
        .into_iter()
        .map(|title| TitleDetail {
            category: title.category_id.and_then(|id| categories.get(&id).cloned()),
            genres: genres_by_title.remove(&title.id).unwrap_or_default(),
            rating: ratings.get(&title.id).copied(),
            title,
        })
        .collect())
}

pub async fn load_title_detail<C>(db: &C, title_id: i32) -> Result<Option<TitleDetail>, DbErr>
where
    C: ConnectionTrait,
{
    let title = match titles::Entity::find_by_id(title_id).one(db).await? {
        Some(title) => title,
        None => return Ok(None),
    };
    Ok(load_title_details(db, vec![title]).await?.pop())
}

pub async fn find_category<C>(db: &C, slug: &str) -> Result<Option<categories::Model>, DbErr>
where
    C: ConnectionTrait,
{
    categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug))
        .one(db)
        .await
}

pub async fn find_genre<C>(db: &C, slug: &str) -> Result<Option<genres::Model>, DbErr>
where
    C: ConnectionTrait,
{
    genres::Entity::find()
        .filter(genres::Column::Slug.eq(slug))
        .one(db)
        .await
}

/// Resolves a category slug, failing on an unknown one.
pub async fn resolve_category<C>(db: &C, slug: &str) -> Result<categories::Model, CatalogError>
where
    C: ConnectionTrait,
{
    find_category(db, slug)
        .await?
        .ok_or_else(|| CatalogError::UnknownCategory(slug.to_owned()))
}

/// Resolves every genre slug, failing on the first unknown one.
/// Duplicate slugs collapse to a single genre.
pub async fn resolve_genres<C>(db: &C, slugs: &[String]) -> Result<Vec<genres::Model>, CatalogError>
where
    C: ConnectionTrait,
{
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(slugs.len());

    for slug in slugs {
        if !seen.insert(slug.as_str()) {
            continue;
        }
        let genre = find_genre(db, slug)
            .await?
            .ok_or_else(|| CatalogError::UnknownGenre(slug.to_owned()))?;
        resolved.push(genre);
    }

    Ok(resolved)
}

/// Replaces the genre set of a title.
pub async fn set_title_genres<C>(
    db: &C,
    title_id: i32,
    genres: &[genres::Model],
) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    title_genres::Entity::delete_many()
        .filter(title_genres::Column::TitleId.eq(title_id))
        .exec(db)
        .await?;

    if genres.is_empty() {
        return Ok(());
    }

    let rows = genres.iter().map(|g| title_genres::ActiveModel {
        genre_id: Set(g.id),
        title_id: Set(title_id),
        ..Default::default()
    });
    title_genres::Entity::insert_many(rows).exec(db).await?;

    Ok(())
}

/// Deletes a title with its genre links, reviews and the comments on them.
pub async fn delete_title<C>(db: &C, title_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let review_ids: Vec<i32> = reviews::Entity::find()
        .filter(reviews::Column::TitleId.eq(title_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    if !review_ids.is_empty() {
        comments::Entity::delete_many()
            .filter(comments::Column::ReviewId.is_in(review_ids))
            .exec(db)
            .await?;
    }
    reviews::Entity::delete_many()
        .filter(reviews::Column::TitleId.eq(title_id))
        .exec(db)
        .await?;
    title_genres::Entity::delete_many()
        .filter(title_genres::Column::TitleId.eq(title_id))
        .exec(db)
        .await?;
    titles::Entity::delete_many()
        .filter(titles::Column::Id.eq(title_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Deletes a category; titles that referenced it keep existing without one.
pub async fn delete_category<C>(db: &C, category_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    titles::Entity::update_many()
        .col_expr(titles::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(titles::Column::CategoryId.eq(category_id))
        .exec(db)
        .await?;
    categories::Entity::delete_many()
        .filter(categories::Column::Id.eq(category_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Deletes a genre and unlinks it from every title.
pub async fn delete_genre<C>(db: &C, genre_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    title_genres::Entity::delete_many()
        .filter(title_genres::Column::GenreId.eq(genre_id))
        .exec(db)
        .await?;
    genres::Entity::delete_many()
        .filter(genres::Column::Id.eq(genre_id))
        .exec(db)
        .await?;

    Ok(())
}
