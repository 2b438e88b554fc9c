pub mod hooks;
pub mod slug;
