pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;

pub use error::AppError;
pub use routes::create_router;
