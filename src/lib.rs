pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
