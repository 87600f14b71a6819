use sea_orm_migration::{prelude::*, schema::*};

use crate::m20240101_000001_create_catalog::{CinemaHall, Movie};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MovieSession::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieSession::Id))
                    .col(string(MovieSession::ShowTime))
                    .col(integer(MovieSession::MovieId))
                    .col(integer(MovieSession::CinemaHallId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_session_movie")
                            .from(MovieSession::Table, MovieSession::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_session_cinema_hall")
                            .from(MovieSession::Table, MovieSession::CinemaHallId)
                            .to(CinemaHall::Table, CinemaHall::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_session_show_time")
                    .table(MovieSession::Table)
                    .col(MovieSession::ShowTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(string(Orders::CreatedAt))
                    .col(integer(Orders::UserId))
                    .to_owned(),
            )
            .await?;

        // No unique (movie_session_id, row, seat) index: seat conflicts are not checked here.
        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(pk_auto(Ticket::Id))
                    .col(integer(Ticket::Row))
                    .col(integer(Ticket::Seat))
                    .col(integer(Ticket::MovieSessionId))
                    .col(integer(Ticket::OrderId))
                    .col(integer(Ticket::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_movie_session")
                            .from(Ticket::Table, Ticket::MovieSessionId)
                            .to(MovieSession::Table, MovieSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_order")
                            .from(Ticket::Table, Ticket::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_user")
                    .table(Ticket::Table)
                    .col(Ticket::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Ticket::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieSession::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum MovieSession {
    Table,
    Id,
    ShowTime,
    MovieId,
    CinemaHallId,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    CreatedAt,
    UserId,
}

#[derive(DeriveIden)]
enum Ticket {
    Table,
    Id,
    Row,
    Seat,
    MovieSessionId,
    OrderId,
    UserId,
}
