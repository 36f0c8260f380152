pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod sink;
pub mod stream;
