// api module: backend client for the runs endpoints

pub mod auth;
mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::RunsBackend;
pub use client::HttpBackend;
pub use error::ApiError;
pub use types::{CreateRunCall, Envelope, ListRunsQuery, RunsPage};
