pub mod api;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod reporting;
