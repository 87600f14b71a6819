//! In-memory application used by the route tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{AppState, auth::USER_ID_HEADER, config::Config, db, routes};

pub const PAGE_SIZE: u64 = 2;

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Config {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            order_page_size: PAGE_SIZE,
        };
        let db = db::connect_and_migrate(&config.database_url, config.db_max_connections)
            .await
            .expect("in-memory database");
        let state = Arc::new(AppState { config: Arc::new(config), db: db.clone() });
        Self { router: routes::router().with_state(state), db }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<i32>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn create(&self, uri: &str, user: Option<i32>, body: Value) -> i64 {
        let (status, created) = self.send(Method::POST, uri, user, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created["id"].as_i64().unwrap()
    }

    pub async fn create_genre(&self, name: &str) -> i64 {
        self.create("/api/cinema/genres", None, json!({ "name": name })).await
    }

    pub async fn create_actor(&self, first_name: &str, last_name: &str) -> i64 {
        self.create(
            "/api/cinema/actors",
            None,
            json!({ "first_name": first_name, "last_name": last_name }),
        )
        .await
    }

    pub async fn create_hall(&self, name: &str, rows: i32, seats_in_row: i32) -> i64 {
        self.create(
            "/api/cinema/cinema-halls",
            None,
            json!({ "name": name, "rows": rows, "seats_in_row": seats_in_row }),
        )
        .await
    }

    pub async fn create_movie(&self, title: &str, genres: &[i64], actors: &[i64]) -> i64 {
        self.create(
            "/api/cinema/movies",
            None,
            json!({
                "title": title,
                "description": format!("About {title}"),
                "duration": 120,
                "genres": genres,
                "actors": actors,
            }),
        )
        .await
    }

    pub async fn create_session(&self, show_time: &str, movie: i64, hall: i64) -> i64 {
        self.create(
            "/api/cinema/movie-sessions",
            None,
            json!({ "show_time": show_time, "movie": movie, "cinema_hall": hall }),
        )
        .await
    }

    /// Places one order holding a ticket per `(row, seat)` for `session`.
    pub async fn create_order(&self, user: i32, session: i64, places: &[(i32, i32)]) -> i64 {
        let tickets: Vec<Value> = places
            .iter()
            .map(|(row, seat)| json!({ "row": row, "seat": seat, "movie_session": session }))
            .collect();
        self.create("/api/cinema/orders", Some(user), json!({ "tickets": tickets })).await
    }

    /// A hall, a movie and one session in it; returns the session id.
    pub async fn seed_session(&self) -> i64 {
        let hall = self.create_hall("Blue", 5, 8).await;
        let movie = self.create_movie("Matrix", &[], &[]).await;
        self.create_session("2024-01-05T20:00", movie, hall).await
    }
}
