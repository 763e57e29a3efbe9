//! HTTP and WebSocket handlers.

pub mod admin;
pub mod questions;
pub mod ws;

// Question and reply routes
pub use questions::{
    clear_questions, create_question, create_reply, delete_question, delete_reply, list_questions,
};

// Admin session, maintenance, and membership routes
pub use admin::{
    clear_maintenance, get_maintenance, list_members, login, logout, member_count, set_maintenance,
};

// Real-time channel
pub use ws::ws_handler;
