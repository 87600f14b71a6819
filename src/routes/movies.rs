use std::{collections::BTreeSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, LoaderTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::{find_or_404, unique_ids};
use crate::{
    AppState,
    entities::{actor, genre, movie, movie_actors, movie_genres},
    error::{AppError, AppResult},
    filters::{MovieQuery, all_of},
    models::{MovieBody, MoviePatch, MoviePayload, MovieWithRelations},
    shape::{Action, Resource},
    validation::FieldErrors,
};

const RESOURCE: Resource = Resource::Movie;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MovieQuery>,
) -> AppResult<Json<Vec<MovieBody>>> {
    let shape = RESOURCE.shape(Action::List);
    let predicates = query.predicates();

    let movies = movie::Entity::find()
        .filter(all_of(&predicates))
        .order_by_asc(movie::Column::Id)
        .all(&state.db)
        .await?;
    debug!(predicates = predicates.len(), matched = movies.len(), "listed movies");

    let movies = with_relations(&state.db, movies).await?;
    Ok(Json(movies.iter().map(|m| m.render(shape)).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieBody>> {
    let movie = load(&state.db, id).await?;
    Ok(Json(movie.render(RESOURCE.shape(Action::Retrieve))))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MovieBody>)> {
    let Json(payload) = payload?;
    validate(&state.db, &payload).await?;

    let txn = state.db.begin().await?;
    let movie = movie::ActiveModel {
        id: Default::default(),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description.clone()),
        duration: Set(payload.duration),
    }
    .insert(&txn)
    .await?;
    link_relations(&txn, movie.id, &payload).await?;
    txn.commit().await?;

    debug!(id = movie.id, title = %movie.title, "created movie");
    let movie = load(&state.db, movie.id).await?;
    Ok((StatusCode::CREATED, Json(movie.render(RESOURCE.shape(Action::Create)))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<Json<MovieBody>> {
    let current = find_or_404::<movie::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    let body = save(&state, current, payload).await?;
    Ok(Json(body.render(RESOURCE.shape(Action::Update))))
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<MoviePatch>, JsonRejection>,
) -> AppResult<Json<MovieBody>> {
    let current = load(&state.db, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    let body = save(&state, current.movie, payload).await?;
    Ok(Json(body.render(RESOURCE.shape(Action::PartialUpdate))))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let movie = find_or_404::<movie::Entity, _>(&state.db, id).await?;
    movie::Entity::delete_by_id(movie.id).exec(&state.db).await?;
    debug!(id, "deleted movie");
    Ok(StatusCode::NO_CONTENT)
}

/// Joins genres and actors onto `movies` with one query per relation.
///
/// Link rows pointing at records that no longer exist are skipped.
pub(super) async fn with_relations<C: ConnectionTrait>(
    db: &C,
    movies: Vec<movie::Model>,
) -> AppResult<Vec<MovieWithRelations>> {
    if movies.is_empty() {
        return Ok(Vec::new());
    }
    let genres = movies.load_many_to_many(genre::Entity, movie_genres::Entity, db).await?;
    let actors = movies.load_many_to_many(actor::Entity, movie_actors::Entity, db).await?;

    Ok(movies
        .into_iter()
        .zip(genres)
        .zip(actors)
        .map(|((movie, mut genres), mut actors)| {
            genres.sort_by_key(|g| g.id);
            actors.sort_by_key(|a| a.id);
            MovieWithRelations { movie, genres, actors }
        })
        .collect())
}

async fn load<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<MovieWithRelations> {
    let movie = find_or_404::<movie::Entity, _>(db, id).await?;
    with_relations(db, vec![movie]).await?.pop().ok_or(AppError::NotFound)
}

async fn save(
    state: &AppState,
    current: movie::Model,
    payload: MoviePayload,
) -> AppResult<MovieWithRelations> {
    validate(&state.db, &payload).await?;

    let txn = state.db.begin().await?;
    let mut movie = current.into_active_model();
    movie.title = Set(payload.title.trim().to_string());
    movie.description = Set(payload.description.clone());
    movie.duration = Set(payload.duration);
    let movie = movie.update(&txn).await?;

    movie_genres::Entity::delete_many()
        .filter(movie_genres::Column::MovieId.eq(movie.id))
        .exec(&txn)
        .await?;
    movie_actors::Entity::delete_many()
        .filter(movie_actors::Column::MovieId.eq(movie.id))
        .exec(&txn)
        .await?;
    link_relations(&txn, movie.id, &payload).await?;
    txn.commit().await?;

    debug!(id = movie.id, "updated movie");
    load(&state.db, movie.id).await
}

async fn link_relations<C: ConnectionTrait>(
    db: &C,
    movie_id: i32,
    payload: &MoviePayload,
) -> AppResult<()> {
    let genres = unique_ids(&payload.genres);
    if !genres.is_empty() {
        movie_genres::Entity::insert_many(genres.into_iter().map(|genre_id| {
            movie_genres::ActiveModel { movie_id: Set(movie_id), genre_id: Set(genre_id) }
        }))
        .exec_without_returning(db)
        .await?;
    }

    let actors = unique_ids(&payload.actors);
    if !actors.is_empty() {
        movie_actors::Entity::insert_many(actors.into_iter().map(|actor_id| {
            movie_actors::ActiveModel { movie_id: Set(movie_id), actor_id: Set(actor_id) }
        }))
        .exec_without_returning(db)
        .await?;
    }

    Ok(())
}

async fn validate<C: ConnectionTrait>(db: &C, payload: &MoviePayload) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors.name("title", &payload.title);
    errors.positive("duration", payload.duration);

    let genres = unique_ids(&payload.genres);
    let found: BTreeSet<i32> = genre::Entity::find()
        .filter(genre::Column::Id.is_in(genres.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if let Some(missing) = genres.iter().find(|id| !found.contains(id)) {
        errors.missing_pk("genres", *missing);
    }

    let actors = unique_ids(&payload.actors);
    let found: BTreeSet<i32> = actor::Entity::find()
        .filter(actor::Column::Id.is_in(actors.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    if let Some(missing) = actors.iter().find(|id| !found.contains(id)) {
        errors.missing_pk("actors", *missing);
    }

    errors.finish()
}
