pub mod access;
pub mod auth;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use routes::app;
pub use state::AppState;
