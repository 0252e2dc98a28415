pub mod analysis;
pub mod batch;
pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod llm_client;
pub mod models;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod store;
