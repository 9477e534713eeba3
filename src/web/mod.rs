//! Share backend: the `/api/share` key/value API plus static asset hosting
//! for the browser client.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::WebError;
pub use server::{build_router, run_server, serve, ServerConfig};
pub use state::WebAppState;
