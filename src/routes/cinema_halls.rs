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
    entities::cinema_hall,
    error::AppResult,
    models::{CinemaHallBody, CinemaHallPatch, CinemaHallPayload},
    validation::FieldErrors,
};

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<CinemaHallBody>>> {
    let halls =
        cinema_hall::Entity::find().order_by_asc(cinema_hall::Column::Id).all(&state.db).await?;
    Ok(Json(halls.iter().map(CinemaHallBody::from).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<CinemaHallBody>> {
    let hall = find_or_404::<cinema_hall::Entity, _>(&state.db, id).await?;
    Ok(Json(CinemaHallBody::from(&hall)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CinemaHallPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CinemaHallBody>)> {
    let Json(payload) = payload?;
    validate(&payload)?;

    let hall = cinema_hall::ActiveModel {
        id: Default::default(),
        name: Set(payload.name.trim().to_string()),
        rows: Set(payload.rows),
        seats_in_row: Set(payload.seats_in_row),
    }
    .insert(&state.db)
    .await?;

    debug!(id = hall.id, capacity = hall.capacity(), "created cinema hall");
    Ok((StatusCode::CREATED, Json(CinemaHallBody::from(&hall))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<CinemaHallPayload>, JsonRejection>,
) -> AppResult<Json<CinemaHallBody>> {
    let current = find_or_404::<cinema_hall::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    save(&state, current, payload).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<CinemaHallPatch>, JsonRejection>,
) -> AppResult<Json<CinemaHallBody>> {
    let current = find_or_404::<cinema_hall::Entity, _>(&state.db, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    save(&state, current, payload).await
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let hall = find_or_404::<cinema_hall::Entity, _>(&state.db, id).await?;
    cinema_hall::Entity::delete_by_id(hall.id).exec(&state.db).await?;
    debug!(id, "deleted cinema hall");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(
    state: &AppState,
    current: cinema_hall::Model,
    payload: CinemaHallPayload,
) -> AppResult<Json<CinemaHallBody>> {
    validate(&payload)?;

    let mut hall = current.into_active_model();
    hall.name = Set(payload.name.trim().to_string());
    hall.rows = Set(payload.rows);
    hall.seats_in_row = Set(payload.seats_in_row);
    let hall = hall.update(&state.db).await?;

    debug!(id = hall.id, "updated cinema hall");
    Ok(Json(CinemaHallBody::from(&hall)))
}

fn validate(payload: &CinemaHallPayload) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors.name("name", &payload.name);
    errors.positive("rows", payload.rows);
    errors.positive("seats_in_row", payload.seats_in_row);
    errors.finish()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn capacity_follows_layout() {
        let app = TestApp::new().await;
        let id = app.create_hall("Blue", 10, 12).await;
        let uri = format!("/api/cinema/cinema-halls/{id}");

        let (_, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(body["capacity"], 120);

        let (status, body) = app.send(Method::PATCH, &uri, None, Some(json!({ "rows": 5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], 60);
        assert_eq!(body["name"], "Blue");
    }

    #[tokio::test]
    async fn empty_layout_is_rejected() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/cinema/cinema-halls",
                None,
                Some(json!({ "name": "Red", "rows": 0, "seats_in_row": -2 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["rows"].is_array());
        assert!(body["seats_in_row"].is_array());
    }

    #[tokio::test]
    async fn huge_layout_reports_exact_capacity() {
        let app = TestApp::new().await;
        let id = app.create_hall("Arena", 100_000, 100_000).await;

        let (status, body) = app.send(Method::GET, "/api/cinema/cinema-halls", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["capacity"], 10_000_000_000_i64);

        let (_, body) = app
            .send(
                Method::PUT,
                &format!("/api/cinema/cinema-halls/{id}"),
                None,
                Some(json!({ "name": "Arena", "rows": i32::MAX, "seats_in_row": i32::MAX })),
            )
            .await;
        assert_eq!(body["capacity"], i64::from(i32::MAX) * i64::from(i32::MAX));
    }

    #[tokio::test]
    async fn list_returns_whole_collection() {
        let app = TestApp::new().await;
        for n in 0..12 {
            app.create_hall(&format!("Hall {n}"), 1, 1).await;
        }
        let (_, body) = app.send(Method::GET, "/api/cinema/cinema-halls", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 12);
    }
}
