pub mod login;
pub mod middleware;
pub mod models;
pub mod token;
