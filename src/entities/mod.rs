pub mod actor;
pub mod cinema_hall;
pub mod genre;
pub mod movie;
pub mod movie_actors;
pub mod movie_genres;
pub mod movie_session;
pub mod order;
pub mod ticket;
