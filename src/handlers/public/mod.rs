// Endpoints that need no token: service info, health and token acquisition
pub mod auth;
pub mod service;
