use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::{find_or_404, tickets::validate_place};
use crate::{
    AppState,
    auth::CurrentUser,
    entities::{order, ticket},
    error::AppResult,
    models::{OrderBody, OrderPatch, OrderPayload, OrderTicketPayload, OrderWithTickets},
    pagination::{Page, PageNumberPagination, PageQuery},
    shape::{Action, Resource},
    validation::FieldErrors,
};

const RESOURCE: Resource = Resource::Order;

// Orders are not owner-scoped: every caller reads the whole collection.

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<OrderBody>>> {
    let shape = RESOURCE.shape(Action::List);
    let pagination = PageNumberPagination::new(state.config.order_page_size);
    let page_number = PageNumberPagination::page_number(&query)?;

    let page = pagination
        .fetch(&state.db, order::Entity::find().order_by_asc(order::Column::Id), page_number)
        .await?;
    let tickets = page
        .results
        .load_many(ticket::Entity::find().order_by_asc(ticket::Column::Id), &state.db)
        .await?;

    let mut tickets = tickets.into_iter();
    Ok(Json(page.map(|order| {
        OrderWithTickets { order, tickets: tickets.next().unwrap_or_default() }.render(shape)
    })))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<OrderBody>> {
    let order = load(&state.db, id).await?;
    Ok(Json(order.render(RESOURCE.shape(Action::Retrieve))))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<OrderPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<OrderBody>)> {
    let Json(payload) = payload?;
    validate(&state.db, &payload.tickets).await?;

    let txn = state.db.begin().await?;
    let order = order::ActiveModel {
        id: Default::default(),
        created_at: Set(jiff::Timestamp::now().to_string()),
        user_id: Set(user.0),
    }
    .insert(&txn)
    .await?;
    insert_tickets(&txn, &order, &payload.tickets).await?;
    txn.commit().await?;

    debug!(id = order.id, user = user.0, tickets = payload.tickets.len(), "created order");
    let order = load(&state.db, order.id).await?;
    Ok((StatusCode::CREATED, Json(order.render(RESOURCE.shape(Action::Create)))))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<OrderPayload>, JsonRejection>,
) -> AppResult<Json<OrderBody>> {
    let current = find_or_404::<order::Entity, _>(&state.db, id).await?;
    let Json(payload) = payload?;
    replace_tickets(&state, &current, &payload.tickets).await?;
    let order = load(&state.db, id).await?;
    Ok(Json(order.render(RESOURCE.shape(Action::Update))))
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    patch: Result<Json<OrderPatch>, JsonRejection>,
) -> AppResult<Json<OrderBody>> {
    let current = find_or_404::<order::Entity, _>(&state.db, id).await?;
    let Json(patch) = patch?;
    if let Some(tickets) = &patch.tickets {
        replace_tickets(&state, &current, tickets).await?;
    }
    let order = load(&state.db, id).await?;
    Ok(Json(order.render(RESOURCE.shape(Action::PartialUpdate))))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let order = find_or_404::<order::Entity, _>(&state.db, id).await?;

    let txn = state.db.begin().await?;
    ticket::Entity::delete_many().filter(ticket::Column::OrderId.eq(order.id)).exec(&txn).await?;
    order::Entity::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    debug!(id, "deleted order");
    Ok(StatusCode::NO_CONTENT)
}

async fn load<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<OrderWithTickets> {
    let order = find_or_404::<order::Entity, _>(db, id).await?;
    let tickets = ticket::Entity::find()
        .filter(ticket::Column::OrderId.eq(order.id))
        .order_by_asc(ticket::Column::Id)
        .all(db)
        .await?;
    Ok(OrderWithTickets { order, tickets })
}

/// Swaps the ticket set of `order` in one transaction. New tickets belong to the order's owner.
async fn replace_tickets(
    state: &AppState,
    order: &order::Model,
    tickets: &[OrderTicketPayload],
) -> AppResult<()> {
    validate(&state.db, tickets).await?;

    let txn = state.db.begin().await?;
    ticket::Entity::delete_many().filter(ticket::Column::OrderId.eq(order.id)).exec(&txn).await?;
    insert_tickets(&txn, order, tickets).await?;
    txn.commit().await?;

    debug!(id = order.id, tickets = tickets.len(), "replaced order tickets");
    Ok(())
}

async fn insert_tickets<C: ConnectionTrait>(
    db: &C,
    order: &order::Model,
    tickets: &[OrderTicketPayload],
) -> AppResult<()> {
    if tickets.is_empty() {
        return Ok(());
    }
    ticket::Entity::insert_many(tickets.iter().map(|t| ticket::ActiveModel {
        id: Default::default(),
        row: Set(t.row),
        seat: Set(t.seat),
        movie_session_id: Set(t.movie_session),
        order_id: Set(order.id),
        user_id: Set(order.user_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

async fn validate<C: ConnectionTrait>(db: &C, tickets: &[OrderTicketPayload]) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if tickets.is_empty() {
        errors.add("tickets", "This list may not be empty.");
    }
    for (i, t) in tickets.iter().enumerate() {
        validate_place(db, &mut errors, &format!("tickets[{i}]"), t.row, t.seat, t.movie_session)
            .await?;
    }
    errors.finish()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::json;

    use crate::{
        entities::{order, ticket},
        testing::{PAGE_SIZE, TestApp},
    };

    #[tokio::test]
    async fn creating_requires_identity() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let (status, _) = app
            .send(
                Method::POST,
                "/api/cinema/orders",
                None,
                Some(json!({ "tickets": [{ "row": 1, "seat": 1, "movie_session": session }] })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn owner_is_stamped_on_order_and_tickets() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let (status, created) = app
            .send(
                Method::POST,
                "/api/cinema/orders",
                Some(7),
                Some(json!({
                    "user": 99,
                    "tickets": [
                        { "row": 1, "seat": 1, "movie_session": session },
                        { "row": 1, "seat": 2, "movie_session": session },
                    ],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tickets"].as_array().unwrap().len(), 2);
        assert!(created["created_at"].as_str().unwrap().ends_with('Z'));

        let id = created["id"].as_i64().unwrap() as i32;
        let stored = order::Entity::find_by_id(id).one(&app.db).await.unwrap().unwrap();
        assert_eq!(stored.user_id, 7);
        let tickets = ticket::Entity::find()
            .filter(ticket::Column::OrderId.eq(id))
            .all(&app.db)
            .await
            .unwrap();
        assert!(tickets.iter().all(|t| t.user_id == 7));
    }

    #[tokio::test]
    async fn invalid_ticket_writes_nothing() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/cinema/orders",
                Some(1),
                Some(json!({
                    "tickets": [
                        { "row": 1, "seat": 1, "movie_session": session },
                        { "row": 50, "seat": 1, "movie_session": session },
                    ],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["tickets[1].row"].is_array());
        assert_eq!(order::Entity::find().all(&app.db).await.unwrap().len(), 0);
        assert_eq!(ticket::Entity::find().all(&app.db).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_ticket_list_is_rejected() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(Method::POST, "/api/cinema/orders", Some(1), Some(json!({ "tickets": [] })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["tickets"][0], "This list may not be empty.");
    }

    #[tokio::test]
    async fn listing_is_paginated_in_creation_order() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let mut ids = Vec::new();
        for seat in 1..=5 {
            ids.push(app.create_order(1 + seat % 2, session, &[(1, seat)]).await);
        }

        let (status, first) = app.send(Method::GET, "/api/cinema/orders", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["count"], 5);
        assert_eq!(first["previous"], json!(null));
        assert_eq!(first["next"], 2);
        let results = first["results"].as_array().unwrap();
        assert_eq!(results.len() as u64, PAGE_SIZE);
        assert_eq!(results[0]["id"], ids[0]);
        assert_eq!(results[0]["tickets_count"], 1);
        assert!(results[0].get("tickets").is_none());

        let (_, second) = app.send(Method::GET, "/api/cinema/orders?page=2", None, None).await;
        let second_ids: Vec<i64> = second["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_i64().unwrap())
            .collect();
        assert_eq!(second_ids, ids[2..4]);
        assert_eq!(second["previous"], 1);

        let (_, last) = app.send(Method::GET, "/api/cinema/orders?page=3", None, None).await;
        assert_eq!(last["results"].as_array().unwrap().len(), 1);
        assert_eq!(last["next"], json!(null));

        let (status, body) = app.send(Method::GET, "/api/cinema/orders?page=4", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Invalid page.");
    }

    #[tokio::test]
    async fn empty_collection_has_a_first_page() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/api/cinema/orders", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "count": 0, "next": null, "previous": null, "results": [] }));
    }

    #[tokio::test]
    async fn orders_are_readable_by_any_caller() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let id = app.create_order(1, session, &[(3, 3)]).await;

        let (status, body) =
            app.send(Method::GET, &format!("/api/cinema/orders/{id}"), Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickets"][0]["row"], 3);
        assert_eq!(body["tickets"][0]["movie_session"], session);
    }

    #[tokio::test]
    async fn update_replaces_ticket_set_for_the_owner() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let id = app.create_order(4, session, &[(1, 1), (1, 2)]).await;
        let uri = format!("/api/cinema/orders/{id}");

        let (status, body) = app
            .send(
                Method::PUT,
                &uri,
                Some(9),
                Some(json!({ "tickets": [{ "row": 5, "seat": 8, "movie_session": session }] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickets"].as_array().unwrap().len(), 1);

        let tickets = ticket::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].user_id, 4);

        let (status, body) = app.send(Method::PATCH, &uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickets"][0]["seat"], 8);
    }

    #[tokio::test]
    async fn delete_removes_order_and_its_tickets() {
        let app = TestApp::new().await;
        let session = app.seed_session().await;
        let id = app.create_order(1, session, &[(1, 1)]).await;

        let (status, _) =
            app.send(Method::DELETE, &format!("/api/cinema/orders/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(ticket::Entity::find().all(&app.db).await.unwrap().is_empty());
    }
}
