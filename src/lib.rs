pub mod app;
pub mod auth;
pub mod call_models;
pub mod call_storage;
pub mod calls;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod documents;
pub mod error;
pub mod files;
pub mod models;
pub mod processing;
pub mod storage;
pub mod user_models;
pub mod user_storage;
