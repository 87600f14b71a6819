//! Query-parameter predicates for movie and session listings.
//!
//! Every parameter becomes one [`Predicate`]; a listing applies the AND of all
//! of them. Predicates on related rows are expressed as `id IN (subquery)` so
//! a record matching through several joined rows still appears once.

use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Expr, Func, LikeExpr, Query, SimpleExpr},
};
use serde::Deserialize;

use crate::{
    entities::{movie, movie_actors, movie_genres, movie_session},
    error::{AppError, AppResult},
    validation::FieldErrors,
};

pub trait Predicate {
    fn condition(&self) -> SimpleExpr;
}

/// AND of all predicates; no predicates means no restriction.
pub fn all_of<P: Predicate>(predicates: &[P]) -> Condition {
    predicates.iter().fold(Condition::all(), |cond, p| cond.add(p.condition()))
}

/// Splits `"1, 2,x,3"` on commas and keeps the tokens that are plain
/// non-negative integers. Anything else is dropped silently.
pub fn parse_ids(param: &str) -> Vec<i32> {
    param
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse().ok())
        .collect()
}

fn non_empty(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|value| !value.is_empty())
}

/// An empty id set matches nothing rather than everything.
fn id_in<C: ColumnTrait>(column: C, ids: &[i32]) -> SimpleExpr {
    if ids.is_empty() {
        return Expr::val(1).eq(0);
    }
    column.is_in(ids.iter().copied())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieQuery {
    pub actors: Option<String>,
    pub genres: Option<String>,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MoviePredicate {
    /// Cast includes any of these actors.
    Actors(Vec<i32>),
    /// Tagged with any of these genres.
    Genres(Vec<i32>),
    /// Case-insensitive substring of the title.
    Title(String),
}

impl MovieQuery {
    pub fn predicates(&self) -> Vec<MoviePredicate> {
        let mut predicates = Vec::new();
        if let Some(actors) = non_empty(&self.actors) {
            predicates.push(MoviePredicate::Actors(parse_ids(actors)));
        }
        if let Some(genres) = non_empty(&self.genres) {
            predicates.push(MoviePredicate::Genres(parse_ids(genres)));
        }
        if let Some(title) = non_empty(&self.title) {
            predicates.push(MoviePredicate::Title(title.to_string()));
        }
        predicates
    }
}

impl Predicate for MoviePredicate {
    fn condition(&self) -> SimpleExpr {
        match self {
            MoviePredicate::Actors(ids) => movie::Column::Id.in_subquery(
                Query::select()
                    .column(movie_actors::Column::MovieId)
                    .from(movie_actors::Entity)
                    .and_where(id_in(movie_actors::Column::ActorId, ids))
                    .to_owned(),
            ),
            MoviePredicate::Genres(ids) => movie::Column::Id.in_subquery(
                Query::select()
                    .column(movie_genres::Column::MovieId)
                    .from(movie_genres::Entity)
                    .and_where(id_in(movie_genres::Column::GenreId, ids))
                    .to_owned(),
            ),
            MoviePredicate::Title(needle) => {
                let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
                Expr::expr(Func::lower(Expr::col((movie::Entity, movie::Column::Title))))
                    .like(LikeExpr::new(pattern).escape('\\'))
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub movie: Option<String>,
    pub date: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionPredicate {
    /// Screens any of these movies.
    Movies(Vec<i32>),
    /// Starts on this calendar date, any time of day.
    ShowDate(jiff::civil::Date),
}

impl SessionQuery {
    pub fn predicates(&self) -> AppResult<Vec<SessionPredicate>> {
        let mut predicates = Vec::new();
        if let Some(movie) = non_empty(&self.movie) {
            predicates.push(SessionPredicate::Movies(parse_ids(movie)));
        }
        if let Some(date) = non_empty(&self.date) {
            let date = date.trim().parse::<jiff::civil::Date>().map_err(|_| {
                AppError::Validation(FieldErrors::single("date", "Enter a valid date."))
            })?;
            predicates.push(SessionPredicate::ShowDate(date));
        }
        Ok(predicates)
    }
}

impl Predicate for SessionPredicate {
    fn condition(&self) -> SimpleExpr {
        match self {
            SessionPredicate::Movies(ids) => id_in(movie_session::Column::MovieId, ids),
            // Show times are stored as `YYYY-MM-DDTHH:MM:SS`.
            SessionPredicate::ShowDate(date) => {
                movie_session::Column::ShowTime.starts_with(format!("{date}T"))
            },
        }
    }
}
