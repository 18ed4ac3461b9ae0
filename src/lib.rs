pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod server;
pub mod service;
pub mod table;

pub use error::{Error, Result};
