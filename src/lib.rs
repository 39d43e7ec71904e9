pub mod api;
pub mod config;
pub mod db;
pub mod dsl;
pub mod import;
pub mod models;
pub mod search;
pub mod state;
pub mod storage;
