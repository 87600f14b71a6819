//! Which representation each resource answers with, per action.
//!
//! Resolved once per request from the `(Resource, Action)` pair instead of being
//! rediscovered inside every handler.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resource {
    Genre,
    Actor,
    CinemaHall,
    Movie,
    MovieSession,
    Ticket,
    Order,
}

/// Actions that answer with a body. Deletes reply 204 and have no shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    /// Reduced summary used by collection listings.
    List,
    /// Nested related records for a single-record read.
    Detail,
    /// Writable field set; related records by id.
    Full,
}

impl Resource {
    pub const fn shape(self, action: Action) -> Shape {
        match (self, action) {
            (Resource::Movie | Resource::MovieSession | Resource::Order, Action::List) => {
                Shape::List
            },
            (Resource::Movie | Resource::MovieSession, Action::Retrieve) => Shape::Detail,
            _ => Shape::Full,
        }
    }

    /// Records are visible only to the user that owns them.
    pub const fn owner_scoped(self) -> bool {
        matches!(self, Resource::Ticket)
    }

    pub const fn path(self) -> &'static str {
        match self {
            Resource::Genre => "genres",
            Resource::Actor => "actors",
            Resource::CinemaHall => "cinema-halls",
            Resource::Movie => "movies",
            Resource::MovieSession => "movie-sessions",
            Resource::Ticket => "tickets",
            Resource::Order => "orders",
        }
    }
}
