pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::router;
pub use state::AppState;
