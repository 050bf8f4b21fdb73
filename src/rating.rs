//! Title ratings, derived from review scores on every read.

use crate::orm::reviews;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr, FromQueryResult};
use std::collections::HashMap;

#[derive(Debug, FromQueryResult)]
struct ScoreRow {
    title_id: i32,
    score: i32,
}

/// Arithmetic mean of the scores, or `None` for an empty set.
pub fn mean(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Some(sum as f64 / scores.len() as f64)
}

/// Rating of a single title.
pub async fn get_rating<C>(db: &C, title_id: i32) -> Result<Option<f64>, DbErr>
where
    C: ConnectionTrait,
{
    let ratings = get_ratings(db, &[title_id]).await?;
    Ok(ratings.get(&title_id).copied())
}

/// Ratings for many titles with one query. Titles without reviews are absent
/// from the map.
pub async fn get_ratings<C>(db: &C, title_ids: &[i32]) -> Result<HashMap<i32, f64>, DbErr>
where
    C: ConnectionTrait,
{
    if title_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = reviews::Entity::find()
        .select_only()
        .column(reviews::Column::TitleId)
        .column(reviews::Column::Score)
        .filter(reviews::Column::TitleId.is_in(title_ids.to_vec()))
        .into_model::<ScoreRow>()
        .all(db)
        .await?;

    let mut scores: HashMap<i32, Vec<i32>> = HashMap::new();
    for row in rows {
        scores.entry(row.title_id).or_default().push(row.score);
    }

    Ok(scores
        .into_iter()
        .filter_map(|(title_id, s)| mean(&s).map(|avg| (title_id, avg)))
        .collect())
}
