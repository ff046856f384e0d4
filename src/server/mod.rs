mod album_routes;
pub mod config;
mod download_routes;
mod http_layers;
mod ingestion_routes;
mod job_routes;
pub mod metrics;
mod responses;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use responses::ApiResponse;
pub use server::{make_app, run_server};
pub use state::ServerState;
