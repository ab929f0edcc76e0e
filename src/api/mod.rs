pub mod handlers;
pub mod response;
mod routes;
pub mod session;

pub use routes::create_router;
