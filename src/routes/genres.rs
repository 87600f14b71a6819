use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::find_or_404;
use crate::{
    AppState,
    entities::genre,
    error::AppResult,
    models::{GenreBody, GenrePatch, GenrePayload},
    validation::FieldErrors,
};

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<GenreBody>>> {
    let genres = genre::Entity::find().order_by_asc(genre::Column::Id).all(&state.db).await?;
    Ok(Json(genres.iter().map(GenreBody::from).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<GenreBody>> {
    let genre = find_or_404::<genre::Entity, _>(&state.db, id).await?;
    Ok(Json(GenreBody::from(&genre)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenrePayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<GenreBody>)> {
    let Json(payload) = payload?;
    validate(&state.db, &payload, None).await?;

    let genre = genre::ActiveModel {
        id: Default::default(),
        name: Set(payload.name.trim().to_string()),
    }
    .insert(&state.db)
    .await?;

    debug!(id = genre.id, name = %genre.name, "created genre");
    Ok((StatusCode::CREATED, Json(GenreBody::from(&genre))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<GenrePayload>, JsonRejection>,
) -> AppResult<Json<GenreBody>> {
    let current = find_or_404::<genre::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    save(&state, current, payload).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<GenrePatch>, JsonRejection>,
) -> AppResult<Json<GenreBody>> {
    let current = find_or_404::<genre::Entity, _>(&state.db, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    save(&state, current, payload).await
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let genre = find_or_404::<genre::Entity, _>(&state.db, id).await?;
    genre::Entity::delete_by_id(genre.id).exec(&state.db).await?;
    debug!(id, "deleted genre");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(
    state: &AppState,
    current: genre::Model,
    payload: GenrePayload,
) -> AppResult<Json<GenreBody>> {
    validate(&state.db, &payload, Some(current.id)).await?;

    let mut genre = current.into_active_model();
    genre.name = Set(payload.name.trim().to_string());
    let genre = genre.update(&state.db).await?;

    debug!(id = genre.id, "updated genre");
    Ok(Json(GenreBody::from(&genre)))
}

async fn validate<C: ConnectionTrait>(
    db: &C,
    payload: &GenrePayload,
    current: Option<i32>,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors.name("name", &payload.name);

    if errors.is_empty() {
        let mut taken = genre::Entity::find().filter(genre::Column::Name.eq(payload.name.trim()));
        if let Some(id) = current {
            taken = taken.filter(genre::Column::Id.ne(id));
        }
        if taken.one(db).await?.is_some() {
            errors.add("name", "genre with this name already exists.");
        }
    }

    errors.finish()
}
