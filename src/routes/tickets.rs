use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Select, Set,
};
use tracing::debug;

use super::lookup;
use crate::{
    AppState,
    auth::CurrentUser,
    entities::{cinema_hall, movie_session, order, ticket},
    error::{AppError, AppResult},
    models::{TicketBody, TicketPatch, TicketPayload},
    shape::Resource,
    validation::FieldErrors,
};

const RESOURCE: Resource = Resource::Ticket;

/// Tickets `user` may see. Anything outside this set answers as not found.
fn visible(user: CurrentUser) -> Select<ticket::Entity> {
    let tickets = ticket::Entity::find();
    if RESOURCE.owner_scoped() {
        tickets.filter(ticket::Column::UserId.eq(user.0))
    } else {
        tickets
    }
}

async fn find_visible<C: ConnectionTrait>(
    db: &C,
    user: CurrentUser,
    id: i32,
) -> AppResult<ticket::Model> {
    visible(user)
        .filter(ticket::Column::Id.eq(id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Json<Vec<TicketBody>>> {
    let tickets = visible(user).order_by_asc(ticket::Column::Id).all(&state.db).await?;
    Ok(Json(tickets.iter().map(TicketBody::from).collect()))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TicketBody>> {
    let ticket = find_visible(&state.db, user, id).await?;
    Ok(Json(TicketBody::from(&ticket)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<TicketPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TicketBody>)> {
    let Json(payload) = payload?;
    validate(&state.db, &payload).await?;

    let ticket = ticket::ActiveModel {
        id: Default::default(),
        row: Set(payload.row),
        seat: Set(payload.seat),
        movie_session_id: Set(payload.movie_session),
        order_id: Set(payload.order),
        user_id: Set(user.0),
    }
    .insert(&state.db)
    .await?;

    debug!(id = ticket.id, user = user.0, "created ticket");
    Ok((StatusCode::CREATED, Json(TicketBody::from(&ticket))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
    payload: Result<Json<TicketPayload>, JsonRejection>,
) -> AppResult<Json<TicketBody>> {
    let current = find_visible(&state.db, user, id).await?;
    let Json(payload) = payload?;
    save(&state, current, payload).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
    patch: Result<Json<TicketPatch>, JsonRejection>,
) -> AppResult<Json<TicketBody>> {
    let current = find_visible(&state.db, user, id).await?;
    let Json(patch) = patch?;
    let payload = patch.merge(&current);
    save(&state, current, payload).await
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let ticket = find_visible(&state.db, user, id).await?;
    ticket::Entity::delete_by_id(ticket.id).exec(&state.db).await?;
    debug!(id, user = user.0, "deleted ticket");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(
    state: &AppState,
    current: ticket::Model,
    payload: TicketPayload,
) -> AppResult<Json<TicketBody>> {
    validate(&state.db, &payload).await?;

    let mut ticket = current.into_active_model();
    ticket.row = Set(payload.row);
    ticket.seat = Set(payload.seat);
    ticket.movie_session_id = Set(payload.movie_session);
    ticket.order_id = Set(payload.order);
    let ticket = ticket.update(&state.db).await?;

    debug!(id = ticket.id, "updated ticket");
    Ok(Json(TicketBody::from(&ticket)))
}

async fn validate<C: ConnectionTrait>(db: &C, payload: &TicketPayload) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    validate_place(db, &mut errors, "", payload.row, payload.seat, payload.movie_session).await?;
    lookup::<order::Entity, _>(db, &mut errors, "order", payload.order).await?;
    errors.finish()
}

/// Checks that the session exists and `(row, seat)` lies inside its hall.
///
/// Field keys are prefixed with `prefix` when it is not empty, e.g. `tickets[0].row`.
/// Whether the place is already taken is not checked.
pub(super) async fn validate_place<C: ConnectionTrait>(
    db: &C,
    errors: &mut FieldErrors,
    prefix: &str,
    row: i32,
    seat: i32,
    movie_session: i32,
) -> AppResult<()> {
    let field = |name: &str| {
        if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
    };

    let Some(session) =
        lookup::<movie_session::Entity, _>(db, errors, &field("movie_session"), movie_session)
            .await?
    else {
        return Ok(());
    };
    let Some(hall) = cinema_hall::Entity::find_by_id(session.cinema_hall_id).one(db).await? else {
        errors.missing_pk(&field("movie_session"), movie_session);
        return Ok(());
    };

    if !(1..=hall.rows).contains(&row) {
        errors.add(
            field("row"),
            format!("row number must be in available range: (1, rows): (1, {})", hall.rows),
        );
    }
    if !(1..=hall.seats_in_row).contains(&seat) {
        errors.add(
            field("seat"),
            format!(
                "seat number must be in available range: (1, seats_in_row): (1, {})",
                hall.seats_in_row
            ),
        );
    }
    Ok(())
}
