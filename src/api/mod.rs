pub mod handlers;
pub mod server;

pub use handlers::{AppState, ApiError};
pub use server::{build_router, run_server};
