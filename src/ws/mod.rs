//! WebSocket event feed

pub mod handler;
pub mod protocol;
