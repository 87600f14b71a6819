use serde::{Deserialize, Serialize};

use crate::{
    entities::{actor, cinema_hall, genre, movie, movie_session, order, ticket},
    shape::Shape,
};

// Request payloads. `*Payload` is the full field set used by POST and PUT,
// `*Patch` is the PATCH subset, merged over the stored record before validation.

#[derive(Debug, Deserialize)]
pub struct GenrePayload {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenrePatch {
    pub name: Option<String>,
}

impl GenrePatch {
    pub fn merge(self, current: &genre::Model) -> GenrePayload {
        GenrePayload { name: self.name.unwrap_or_else(|| current.name.clone()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActorPayload {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ActorPatch {
    pub fn merge(self, current: &actor::Model) -> ActorPayload {
        ActorPayload {
            first_name: self.first_name.unwrap_or_else(|| current.first_name.clone()),
            last_name: self.last_name.unwrap_or_else(|| current.last_name.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CinemaHallPayload {
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CinemaHallPatch {
    pub name: Option<String>,
    pub rows: Option<i32>,
    pub seats_in_row: Option<i32>,
}

impl CinemaHallPatch {
    pub fn merge(self, current: &cinema_hall::Model) -> CinemaHallPayload {
        CinemaHallPayload {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            rows: self.rows.unwrap_or(current.rows),
            seats_in_row: self.seats_in_row.unwrap_or(current.seats_in_row),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoviePayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration: i32,
    #[serde(default)]
    pub genres: Vec<i32>,
    #[serde(default)]
    pub actors: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub genres: Option<Vec<i32>>,
    pub actors: Option<Vec<i32>>,
}

impl MoviePatch {
    pub fn merge(self, current: &MovieWithRelations) -> MoviePayload {
        let movie = &current.movie;
        MoviePayload {
            title: self.title.unwrap_or_else(|| movie.title.clone()),
            description: self.description.unwrap_or_else(|| movie.description.clone()),
            duration: self.duration.unwrap_or(movie.duration),
            genres: self.genres.unwrap_or_else(|| current.genres.iter().map(|g| g.id).collect()),
            actors: self.actors.unwrap_or_else(|| current.actors.iter().map(|a| a.id).collect()),
        }
    }
}

/// Show time normalized to `YYYY-MM-DDTHH:MM:SS` so the stored text sorts and
/// prefix-matches by calendar date.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShowTime(String);

impl From<jiff::civil::DateTime> for ShowTime {
    fn from(dt: jiff::civil::DateTime) -> Self {
        Self(dt.strftime("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

impl ShowTime {
    /// Accepts civil ISO 8601 date-times. Input carrying `Z` or an offset is
    /// converted to UTC wall-clock time.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(instant) = raw.parse::<jiff::Timestamp>() {
            return Some(instant.to_zoned(jiff::tz::TimeZone::UTC).datetime().into());
        }
        raw.parse::<jiff::civil::DateTime>().ok().map(Self::from)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Debug, Deserialize)]
pub struct MovieSessionPayload {
    pub show_time: String,
    pub movie: i32,
    pub cinema_hall: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieSessionPatch {
    pub show_time: Option<String>,
    pub movie: Option<i32>,
    pub cinema_hall: Option<i32>,
}

impl MovieSessionPatch {
    pub fn merge(self, current: &movie_session::Model) -> MovieSessionPayload {
        MovieSessionPayload {
            show_time: self.show_time.unwrap_or_else(|| current.show_time.clone()),
            movie: self.movie.unwrap_or(current.movie_id),
            cinema_hall: self.cinema_hall.unwrap_or(current.cinema_hall_id),
        }
    }
}

/// The owner is never read from the body; unknown fields such as `user` are ignored.
#[derive(Debug, Deserialize)]
pub struct TicketPayload {
    pub row: i32,
    pub seat: i32,
    pub movie_session: i32,
    pub order: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketPatch {
    pub row: Option<i32>,
    pub seat: Option<i32>,
    pub movie_session: Option<i32>,
    pub order: Option<i32>,
}

impl TicketPatch {
    pub fn merge(self, current: &ticket::Model) -> TicketPayload {
        TicketPayload {
            row: self.row.unwrap_or(current.row),
            seat: self.seat.unwrap_or(current.seat),
            movie_session: self.movie_session.unwrap_or(current.movie_session_id),
            order: self.order.unwrap_or(current.order_id),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrderTicketPayload {
    pub row: i32,
    pub seat: i32,
    pub movie_session: i32,
}

#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    pub tickets: Vec<OrderTicketPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderPatch {
    pub tickets: Option<Vec<OrderTicketPayload>>,
}

// Representations.

#[derive(Clone, Debug, Serialize)]
pub struct GenreBody {
    pub id: i32,
    pub name: String,
}

impl From<&genre::Model> for GenreBody {
    fn from(genre: &genre::Model) -> Self {
        Self { id: genre.id, name: genre.name.clone() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActorBody {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&actor::Model> for ActorBody {
    fn from(actor: &actor::Model) -> Self {
        Self {
            id: actor.id,
            first_name: actor.first_name.clone(),
            last_name: actor.last_name.clone(),
            full_name: actor.full_name(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CinemaHallBody {
    pub id: i32,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<&cinema_hall::Model> for CinemaHallBody {
    fn from(hall: &cinema_hall::Model) -> Self {
        Self {
            id: hall.id,
            name: hall.name.clone(),
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity: hall.capacity(),
        }
    }
}

/// A movie with its genres and actors already joined.
#[derive(Clone, Debug)]
pub struct MovieWithRelations {
    pub movie: movie::Model,
    pub genres: Vec<genre::Model>,
    pub actors: Vec<actor::Model>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieFull {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<i32>,
    pub actors: Vec<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieList {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<GenreBody>,
    pub actors: Vec<ActorBody>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum MovieBody {
    List(MovieList),
    Detail(MovieDetail),
    Full(MovieFull),
}

impl MovieWithRelations {
    pub fn summary(&self) -> MovieList {
        MovieList {
            id: self.movie.id,
            title: self.movie.title.clone(),
            description: self.movie.description.clone(),
            duration: self.movie.duration,
            genres: self.genres.iter().map(|g| g.name.clone()).collect(),
            actors: self.actors.iter().map(actor::Model::full_name).collect(),
        }
    }

    pub fn render(&self, shape: Shape) -> MovieBody {
        let movie = &self.movie;
        match shape {
            Shape::List => MovieBody::List(self.summary()),
            Shape::Detail => MovieBody::Detail(MovieDetail {
                id: movie.id,
                title: movie.title.clone(),
                description: movie.description.clone(),
                duration: movie.duration,
                genres: self.genres.iter().map(GenreBody::from).collect(),
                actors: self.actors.iter().map(ActorBody::from).collect(),
            }),
            Shape::Full => MovieBody::Full(MovieFull {
                id: movie.id,
                title: movie.title.clone(),
                description: movie.description.clone(),
                duration: movie.duration,
                genres: self.genres.iter().map(|g| g.id).collect(),
                actors: self.actors.iter().map(|a| a.id).collect(),
            }),
        }
    }
}

/// A session with whatever related rows were found. Any of them may be absent.
#[derive(Clone, Debug)]
pub struct SessionWithRelations {
    pub session: movie_session::Model,
    pub movie: Option<MovieWithRelations>,
    pub hall: Option<cinema_hall::Model>,
    pub tickets: Vec<ticket::Model>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieSessionFull {
    pub id: i32,
    pub show_time: String,
    pub movie: i32,
    pub cinema_hall: i32,
}

impl From<&movie_session::Model> for MovieSessionFull {
    fn from(session: &movie_session::Model) -> Self {
        Self {
            id: session.id,
            show_time: session.show_time.clone(),
            movie: session.movie_id,
            cinema_hall: session.cinema_hall_id,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieSessionList {
    pub id: i32,
    pub show_time: String,
    pub movie_title: Option<String>,
    pub cinema_hall_name: Option<String>,
    pub cinema_hall_capacity: Option<i64>,
    /// Never negative, even after the hall shrank below its bookings.
    pub tickets_available: Option<i64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieSessionDetail {
    pub id: i32,
    pub show_time: String,
    pub movie: Option<MovieList>,
    pub cinema_hall: Option<CinemaHallBody>,
    pub taken_places: Vec<TakenPlace>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum MovieSessionBody {
    List(MovieSessionList),
    Detail(MovieSessionDetail),
    Full(MovieSessionFull),
}

impl SessionWithRelations {
    pub fn render(&self, shape: Shape) -> MovieSessionBody {
        let session = &self.session;
        match shape {
            Shape::List => {
                let capacity = self.hall.as_ref().map(cinema_hall::Model::capacity);
                let booked = i64::try_from(self.tickets.len()).unwrap_or(i64::MAX);
                MovieSessionBody::List(MovieSessionList {
                    id: session.id,
                    show_time: session.show_time.clone(),
                    movie_title: self.movie.as_ref().map(|m| m.movie.title.clone()),
                    cinema_hall_name: self.hall.as_ref().map(|h| h.name.clone()),
                    cinema_hall_capacity: capacity,
                    tickets_available: capacity.map(|c| (c - booked).max(0)),
                })
            },
            Shape::Detail => MovieSessionBody::Detail(MovieSessionDetail {
                id: session.id,
                show_time: session.show_time.clone(),
                movie: self.movie.as_ref().map(MovieWithRelations::summary),
                cinema_hall: self.hall.as_ref().map(CinemaHallBody::from),
                taken_places: self
                    .tickets
                    .iter()
                    .map(|t| TakenPlace { row: t.row, seat: t.seat })
                    .collect(),
            }),
            Shape::Full => MovieSessionBody::Full(MovieSessionFull::from(session)),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TicketBody {
    pub id: i32,
    pub row: i32,
    pub seat: i32,
    pub movie_session: i32,
    pub order: i32,
}

impl From<&ticket::Model> for TicketBody {
    fn from(ticket: &ticket::Model) -> Self {
        Self {
            id: ticket.id,
            row: ticket.row,
            seat: ticket.seat,
            movie_session: ticket.movie_session_id,
            order: ticket.order_id,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderTicketBody {
    pub id: i32,
    pub row: i32,
    pub seat: i32,
    pub movie_session: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderFull {
    pub id: i32,
    pub created_at: String,
    pub tickets: Vec<OrderTicketBody>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderList {
    pub id: i32,
    pub created_at: String,
    pub tickets_count: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum OrderBody {
    List(OrderList),
    Full(OrderFull),
}

#[derive(Clone, Debug)]
pub struct OrderWithTickets {
    pub order: order::Model,
    pub tickets: Vec<ticket::Model>,
}

impl OrderWithTickets {
    /// Orders have no detail variant; anything but `List` renders the full record.
    pub fn render(&self, shape: Shape) -> OrderBody {
        match shape {
            Shape::List => OrderBody::List(OrderList {
                id: self.order.id,
                created_at: self.order.created_at.clone(),
                tickets_count: self.tickets.len(),
            }),
            Shape::Detail | Shape::Full => OrderBody::Full(OrderFull {
                id: self.order.id,
                created_at: self.order.created_at.clone(),
                tickets: self
                    .tickets
                    .iter()
                    .map(|t| OrderTicketBody {
                        id: t.id,
                        row: t.row,
                        seat: t.seat,
                        movie_session: t.movie_session_id,
                    })
                    .collect(),
            }),
        }
    }
}
