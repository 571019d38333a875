pub mod handlers;
pub mod history;
pub mod middleware;
pub mod movies;
pub mod routes;
pub mod ws;

pub use routes::create_router;
