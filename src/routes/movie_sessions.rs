use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, LoaderTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::{find_or_404, lookup, movies};
use crate::{
    AppState,
    entities::{cinema_hall, movie, movie_session, ticket},
    error::{AppError, AppResult},
    filters::{SessionQuery, all_of},
    models::{
        MovieSessionBody, MovieSessionPatch, MovieSessionPayload, MovieWithRelations,
        SessionWithRelations, ShowTime,
    },
    shape::{Action, Resource, Shape},
    validation::FieldErrors,
};

const RESOURCE: Resource = Resource::MovieSession;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<Vec<MovieSessionBody>>> {
    let shape = RESOURCE.shape(Action::List);
    let predicates = query.predicates()?;

    let sessions = movie_session::Entity::find()
        .filter(all_of(&predicates))
        .order_by_asc(movie_session::Column::ShowTime)
        .order_by_asc(movie_session::Column::Id)
        .all(&state.db)
        .await?;
    debug!(predicates = predicates.len(), matched = sessions.len(), "listed movie sessions");

    let sessions = with_relations(&state.db, sessions, shape).await?;
    Ok(Json(sessions.iter().map(|s| s.render(shape)).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieSessionBody>> {
    let shape = RESOURCE.shape(Action::Retrieve);
    let session = find_or_404::<movie_session::Entity, _>(&state.db, id).await?;
    let session = with_relations(&state.db, vec![session], shape)
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(Json(session.render(shape)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MovieSessionPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MovieSessionBody>)> {
    let Json(payload) = payload?;
    let show_time = validate(&state.db, &payload).await?;

    let session = movie_session::ActiveModel {
        id: Default::default(),
        show_time: Set(show_time.into_inner()),
        movie_id: Set(payload.movie),
        cinema_hall_id: Set(payload.cinema_hall),
    }
    .insert(&state.db)
    .await?;

    debug!(id = session.id, show_time = %session.show_time, "created movie session");
    Ok((StatusCode::CREATED, Json(render_written(session, Action::Create))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<MovieSessionPayload>, JsonRejection>,
) -> AppResult<Json<MovieSessionBody>> {
    let current = find_or_404::<movie_session::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    let session = save(&state, current, payload).await?;
    Ok(Json(render_written(session, Action::Update)))
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<MovieSessionPatch>, JsonRejection>,
) -> AppResult<Json<MovieSessionBody>> {
    let current = find_or_404::<movie_session::Entity, _>(&state.db, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    let session = save(&state, current, payload).await?;
    Ok(Json(render_written(session, Action::PartialUpdate)))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let session = find_or_404::<movie_session::Entity, _>(&state.db, id).await?;
    movie_session::Entity::delete_by_id(session.id).exec(&state.db).await?;
    debug!(id, "deleted movie session");
    Ok(StatusCode::NO_CONTENT)
}

/// Create and update answer with the writable shape, which needs no joins.
fn render_written(session: movie_session::Model, action: Action) -> MovieSessionBody {
    SessionWithRelations { session, movie: None, hall: None, tickets: Vec::new() }
        .render(RESOURCE.shape(action))
}

/// Batch-loads what `shape` renders: movie, hall and tickets for summaries,
/// plus the movie's genres and actors for detail.
async fn with_relations<C: ConnectionTrait>(
    db: &C,
    sessions: Vec<movie_session::Model>,
    shape: Shape,
) -> AppResult<Vec<SessionWithRelations>> {
    if sessions.is_empty() || shape == Shape::Full {
        return Ok(sessions
            .into_iter()
            .map(|session| SessionWithRelations {
                session,
                movie: None,
                hall: None,
                tickets: Vec::new(),
            })
            .collect());
    }

    let halls = sessions.load_one(cinema_hall::Entity, db).await?;
    let tickets = sessions
        .load_many(ticket::Entity::find().order_by_asc(ticket::Column::Id), db)
        .await?;
    let movie_rows = sessions.load_one(movie::Entity, db).await?;

    let mut distinct: Vec<movie::Model> = Vec::new();
    for movie in movie_rows.iter().flatten() {
        if !distinct.iter().any(|m| m.id == movie.id) {
            distinct.push(movie.clone());
        }
    }
    let joined = if shape == Shape::Detail {
        movies::with_relations(db, distinct).await?
    } else {
        distinct
            .into_iter()
            .map(|movie| MovieWithRelations { movie, genres: Vec::new(), actors: Vec::new() })
            .collect()
    };
    let joined: HashMap<i32, MovieWithRelations> =
        joined.into_iter().map(|m| (m.movie.id, m)).collect();

    Ok(sessions
        .into_iter()
        .zip(movie_rows)
        .zip(halls)
        .zip(tickets)
        .map(|(((session, movie), hall), tickets)| SessionWithRelations {
            session,
            movie: movie.and_then(|m| joined.get(&m.id).cloned()),
            hall,
            tickets,
        })
        .collect())
}

async fn save(
    state: &AppState,
    current: movie_session::Model,
    payload: MovieSessionPayload,
) -> AppResult<movie_session::Model> {
    let show_time = validate(&state.db, &payload).await?;

    let mut session = current.into_active_model();
    session.show_time = Set(show_time.into_inner());
    session.movie_id = Set(payload.movie);
    session.cinema_hall_id = Set(payload.cinema_hall);
    let session = session.update(&state.db).await?;

    debug!(id = session.id, "updated movie session");
    Ok(session)
}

const SHOW_TIME_FORMAT: &str = "Datetime has wrong format. Use one of these formats instead: \
                                YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// Returns the normalized show time once every field checks out.
async fn validate<C: ConnectionTrait>(
    db: &C,
    payload: &MovieSessionPayload,
) -> AppResult<ShowTime> {
    let mut errors = FieldErrors::new();
    let show_time = ShowTime::parse(&payload.show_time);
    if show_time.is_none() {
        errors.add("show_time", SHOW_TIME_FORMAT);
    }
    lookup::<movie::Entity, _>(db, &mut errors, "movie", payload.movie).await?;
    lookup::<cinema_hall::Entity, _>(db, &mut errors, "cinema_hall", payload.cinema_hall).await?;

    match show_time {
        Some(show_time) if errors.is_empty() => Ok(show_time),
        _ => Err(AppError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::testing::TestApp;

    fn ids(body: &Value) -> Vec<i64> {
        body.as_array().unwrap().iter().map(|s| s["id"].as_i64().unwrap()).collect()
    }

    struct Schedule {
        app: TestApp,
        matrix: i64,
        speed: i64,
        evening: i64,
        after_midnight: i64,
        speed_evening: i64,
    }

    async fn schedule() -> Schedule {
        let app = TestApp::new().await;
        let hall = app.create_hall("Blue", 5, 8).await;
        let genre = app.create_genre("Sci-Fi").await;
        let matrix = app.create_movie("Matrix", &[genre], &[]).await;
        let speed = app.create_movie("Speed", &[], &[]).await;
        let evening = app.create_session("2024-01-05T20:00", matrix, hall).await;
        let after_midnight = app.create_session("2024-01-06T00:30", matrix, hall).await;
        let speed_evening = app.create_session("2024-01-05T22:15", speed, hall).await;
        Schedule { app, matrix, speed, evening, after_midnight, speed_evening }
    }

    async fn list(app: &TestApp, query: &str) -> (StatusCode, Value) {
        app.send(Method::GET, &format!("/api/cinema/movie-sessions{query}"), None, None).await
    }

    #[tokio::test]
    async fn date_filter_ignores_time_of_day() {
        let s = schedule().await;
        let (status, body) = list(&s.app, "?date=2024-01-05").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), [s.evening, s.speed_evening]);

        let (_, body) = list(&s.app, "?date=2024-01-06").await;
        assert_eq!(ids(&body), [s.after_midnight]);
    }

    #[tokio::test]
    async fn movie_filter_accepts_id_sets() {
        let s = schedule().await;
        let (_, body) = list(&s.app, &format!("?movie={}", s.speed)).await;
        assert_eq!(ids(&body), [s.speed_evening]);

        let (_, body) = list(&s.app, &format!("?movie={},{}", s.matrix, s.speed)).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = list(&s.app, "?movie=x").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn movie_and_date_filters_combine() {
        let s = schedule().await;
        let (_, body) = list(&s.app, &format!("?movie={}&date=2024-01-05", s.matrix)).await;
        assert_eq!(ids(&body), [s.evening]);
    }

    #[tokio::test]
    async fn invalid_date_is_a_validation_error() {
        let s = schedule().await;
        let (status, body) = list(&s.app, "?date=05.01.2024").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["date"][0], "Enter a valid date.");
    }

    #[tokio::test]
    async fn summary_reports_available_seats() {
        let s = schedule().await;
        s.app.create_order(1, s.evening, &[(1, 1), (1, 2)]).await;

        let (_, body) = list(&s.app, "").await;
        let evening = body.as_array().unwrap().iter().find(|x| x["id"] == s.evening).unwrap();
        assert_eq!(evening["movie_title"], "Matrix");
        assert_eq!(evening["cinema_hall_name"], "Blue");
        assert_eq!(evening["cinema_hall_capacity"], 40);
        assert_eq!(evening["tickets_available"], 38);
    }

    #[tokio::test]
    async fn detail_nests_movie_hall_and_taken_places() {
        let s = schedule().await;
        s.app.create_order(1, s.evening, &[(2, 3)]).await;

        let (status, body) = s
            .app
            .send(Method::GET, &format!("/api/cinema/movie-sessions/{}", s.evening), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["show_time"], "2024-01-05T20:00:00");
        assert_eq!(body["movie"]["title"], "Matrix");
        assert_eq!(body["movie"]["genres"], json!(["Sci-Fi"]));
        assert_eq!(body["cinema_hall"]["capacity"], 40);
        assert_eq!(body["taken_places"], json!([{ "row": 2, "seat": 3 }]));
    }

    #[tokio::test]
    async fn writes_answer_with_ids() {
        let s = schedule().await;
        let (status, body) = s
            .app
            .send(
                Method::PATCH,
                &format!("/api/cinema/movie-sessions/{}", s.evening),
                None,
                Some(json!({ "show_time": "2024-01-07T18:45:00" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["show_time"], "2024-01-07T18:45:00");
        assert_eq!(body["movie"], s.matrix);
    }

    #[tokio::test]
    async fn unknown_movie_or_hall_fails_validation() {
        let s = schedule().await;
        let (status, body) = s
            .app
            .send(
                Method::POST,
                "/api/cinema/movie-sessions",
                None,
                Some(json!({ "show_time": "2024-01-05T20:00", "movie": 42, "cinema_hall": 42 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["movie"][0], "Invalid pk \"42\" - object does not exist.");
        assert!(body["cinema_hall"].is_array());
    }

    #[tokio::test]
    async fn unparseable_show_time_is_a_field_error() {
        let s = schedule().await;
        let (status, body) = s
            .app
            .send(
                Method::POST,
                "/api/cinema/movie-sessions",
                None,
                Some(json!({ "show_time": "tomorrow", "movie": s.matrix, "cinema_hall": 42 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["show_time"][0].as_str().unwrap().starts_with("Datetime has wrong format."));
        assert!(body["cinema_hall"].is_array());
        assert!(body.get("detail").is_none());

        let (status, body) = s
            .app
            .send(
                Method::PATCH,
                &format!("/api/cinema/movie-sessions/{}", s.evening),
                None,
                Some(json!({ "show_time": "20:00 on Friday" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["show_time"].is_array());
    }

    #[tokio::test]
    async fn zulu_show_time_is_stored_as_utc_wall_clock() {
        let s = schedule().await;
        let (status, body) = s
            .app
            .send(
                Method::PATCH,
                &format!("/api/cinema/movie-sessions/{}", s.evening),
                None,
                Some(json!({ "show_time": "2024-01-05T20:00:00Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["show_time"], "2024-01-05T20:00:00");

        let (_, body) = list(&s.app, "?date=2024-01-05").await;
        assert!(ids(&body).contains(&s.evening));
    }

    #[tokio::test]
    async fn large_hall_capacity_does_not_overflow() {
        let s = schedule().await;
        let hall = s.app.create_hall("Arena", 100_000, 100_000).await;
        let session = s.app.create_session("2024-02-01T19:00", s.matrix, hall).await;
        s.app.create_order(1, session, &[(99_999, 100_000)]).await;

        let (status, body) = list(&s.app, "?date=2024-02-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["cinema_hall_capacity"], 10_000_000_000_i64);
        assert_eq!(body[0]["tickets_available"], 9_999_999_999_i64);

        let (status, body) = s
            .app
            .send(Method::GET, &format!("/api/cinema/movie-sessions/{session}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cinema_hall"]["capacity"], 10_000_000_000_i64);
    }

    #[tokio::test]
    async fn shrunk_hall_reports_no_available_seats() {
        let app = TestApp::new().await;
        let hall = app.create_hall("Small", 2, 2).await;
        let movie = app.create_movie("Matrix", &[], &[]).await;
        let session = app.create_session("2024-01-05T20:00", movie, hall).await;
        app.create_order(1, session, &[(1, 1), (1, 2), (2, 1)]).await;

        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/cinema/cinema-halls/{hall}"),
                None,
                Some(json!({ "rows": 1, "seats_in_row": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = list(&app, "").await;
        assert_eq!(body[0]["cinema_hall_capacity"], 1);
        assert_eq!(body[0]["tickets_available"], 0);
    }
}
