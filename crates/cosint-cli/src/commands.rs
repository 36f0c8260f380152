pub mod auth;
pub mod bills;
pub mod chat;
pub mod conversations;
pub mod dashboard;
pub mod notes;
