//! smsguard Server
//!
//! HTTP surface over the smsguard inference engine: single-message
//! prediction, batch file uploads with downloadable result CSVs, the model
//! listing, and an optional static UI.

pub mod cli;
pub mod config;
pub mod results;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use config::ServerConfig;
pub use results::{ResultRow, ResultStore};
pub use routes::{create_router, AppError};
pub use state::AppState;
