pub mod connection;
pub mod memory;
pub mod models;
pub mod query;
pub mod repository;
