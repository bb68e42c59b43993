pub mod config;
pub mod dashboard;
pub mod data;
pub mod filter;
pub mod render;
pub mod server;
pub mod table;
pub mod types;
