use std::sync::Arc;

use axum::{Router, routing::get};
use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};

use crate::{
    AppState,
    error::{AppError, AppResult},
    shape::Resource,
    validation::FieldErrors,
};

mod actors;
mod cinema_halls;
mod genres;
mod movie_sessions;
mod movies;
mod orders;
mod tickets;

pub fn router() -> Router<Arc<AppState>> {
    let api = Router::new()
        .route(&collection(Resource::Genre), get(genres::list).post(genres::create))
        .route(
            &member(Resource::Genre),
            get(genres::retrieve)
                .put(genres::update)
                .patch(genres::partial_update)
                .delete(genres::destroy),
        )
        .route(&collection(Resource::Actor), get(actors::list).post(actors::create))
        .route(
            &member(Resource::Actor),
            get(actors::retrieve)
                .put(actors::update)
                .patch(actors::partial_update)
                .delete(actors::destroy),
        )
        .route(
            &collection(Resource::CinemaHall),
            get(cinema_halls::list).post(cinema_halls::create),
        )
        .route(
            &member(Resource::CinemaHall),
            get(cinema_halls::retrieve)
                .put(cinema_halls::update)
                .patch(cinema_halls::partial_update)
                .delete(cinema_halls::destroy),
        )
        .route(&collection(Resource::Movie), get(movies::list).post(movies::create))
        .route(
            &member(Resource::Movie),
            get(movies::retrieve)
                .put(movies::update)
                .patch(movies::partial_update)
                .delete(movies::destroy),
        )
        .route(
            &collection(Resource::MovieSession),
            get(movie_sessions::list).post(movie_sessions::create),
        )
        .route(
            &member(Resource::MovieSession),
            get(movie_sessions::retrieve)
                .put(movie_sessions::update)
                .patch(movie_sessions::partial_update)
                .delete(movie_sessions::destroy),
        )
        .route(&collection(Resource::Ticket), get(tickets::list).post(tickets::create))
        .route(
            &member(Resource::Ticket),
            get(tickets::retrieve)
                .put(tickets::update)
                .patch(tickets::partial_update)
                .delete(tickets::destroy),
        )
        .route(&collection(Resource::Order), get(orders::list).post(orders::create))
        .route(
            &member(Resource::Order),
            get(orders::retrieve)
                .put(orders::update)
                .patch(orders::partial_update)
                .delete(orders::destroy),
        );

    Router::new().nest("/api/cinema", api)
}

fn collection(resource: Resource) -> String {
    format!("/{}", resource.path())
}

fn member(resource: Resource) -> String {
    format!("/{}/{{id}}", resource.path())
}

async fn find_or_404<E, C>(db: &C, id: i32) -> AppResult<E::Model>
where
    C: ConnectionTrait,
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id).one(db).await?.ok_or(AppError::NotFound)
}

/// Resolves a referenced record, recording a field error when it does not exist.
async fn lookup<E, C>(
    db: &C,
    errors: &mut FieldErrors,
    field: &str,
    id: i32,
) -> AppResult<Option<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    let found = E::find_by_id(id).one(db).await?;
    if found.is_none() {
        errors.missing_pk(field, id);
    }
    Ok(found)
}

/// Sorted, duplicate-free copy of a client supplied id list.
fn unique_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
