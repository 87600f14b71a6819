use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use tracing::debug;

use super::find_or_404;
use crate::{
    AppState,
    entities::actor,
    error::AppResult,
    models::{ActorBody, ActorPatch, ActorPayload},
    validation::FieldErrors,
};

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ActorBody>>> {
    let actors = actor::Entity::find().order_by_asc(actor::Column::Id).all(&state.db).await?;
    Ok(Json(actors.iter().map(ActorBody::from).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ActorBody>> {
    let actor = find_or_404::<actor::Entity, _>(&state.db, id).await?;
    Ok(Json(ActorBody::from(&actor)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActorPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ActorBody>)> {
    let Json(payload) = payload?;
    validate(&payload)?;

    let actor = actor::ActiveModel {
        id: Default::default(),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
    }
    .insert(&state.db)
    .await?;

    debug!(id = actor.id, "created actor");
    Ok((StatusCode::CREATED, Json(ActorBody::from(&actor))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<ActorPayload>, JsonRejection>,
) -> AppResult<Json<ActorBody>> {
    let current = find_or_404::<actor::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    save(&state, current, payload).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<ActorPatch>, JsonRejection>,
) -> AppResult<Json<ActorBody>> {
    let current = find_or_404::<actor::Entity, _>(&state.db, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    save(&state, current, payload).await
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let actor = find_or_404::<actor::Entity, _>(&state.db, id).await?;
    actor::Entity::delete_by_id(actor.id).exec(&state.db).await?;
    debug!(id, "deleted actor");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(
    state: &AppState,
    current: actor::Model,
    payload: ActorPayload,
) -> AppResult<Json<ActorBody>> {
    validate(&payload)?;

    let mut actor = current.into_active_model();
    actor.first_name = Set(payload.first_name.trim().to_string());
    actor.last_name = Set(payload.last_name.trim().to_string());
    let actor = actor.update(&state.db).await?;

    debug!(id = actor.id, "updated actor");
    Ok(Json(ActorBody::from(&actor)))
}

fn validate(payload: &ActorPayload) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors.name("first_name", &payload.first_name);
    errors.name("last_name", &payload.last_name);
    errors.finish()
}
