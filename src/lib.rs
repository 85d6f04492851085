//! Terminal chat client for a ticketing assistant.
//!
//! Talks to a backend exposing `POST /chat` and `GET /tickets`, shows the
//! conversation and keeps a ticket list beside it.

pub mod api;
pub mod app;
pub mod config;
pub mod handler;
pub mod markup;
pub mod status;
pub mod tickets;
pub mod transcript;
pub mod tui;
pub mod ui;

pub use api::{ApiClient, ApiError, ChatReply, ChatRequest, TicketList};
pub use app::App;
pub use config::Config;
