pub mod blogs;
pub mod categories;
pub mod errors;
pub mod faq;
pub mod health;
pub mod media;
pub mod resource;
pub mod response;
pub mod services;
pub mod stats;
