//! Arena Match Server - authoritative match orchestration for multiplayer
//! arena combat
//!
//! The library holds the match lifecycle (phases, rounds, scoring and the
//! registries a match is made of) and the HTTP/WebSocket surface that hosts
//! it; the binary in `main.rs` only wires configuration and serves it.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
