pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod media;
pub mod storage;
