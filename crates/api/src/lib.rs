pub mod auth;
pub mod crash_log;
pub mod error;
pub mod health;
pub mod mappers;
pub mod projects;
pub mod routes;
pub mod state;
pub mod token;
pub mod users;
pub mod utils;
pub mod validation;
