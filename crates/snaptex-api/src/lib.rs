mod chat;
mod client;

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use client::{ModelClient, clean_response};
