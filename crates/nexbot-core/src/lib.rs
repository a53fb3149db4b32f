//! Core of the nexbot chat bot: commands, polls, settings and the interaction error
//! boundary.
//!
//! Nothing here knows about Telegram or HTTP. Adapters implement
//! [`messaging::port::MessagingPort`] and feed updates into [`commands`] and [`events`].

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod feedback;
pub mod formatting;
pub mod guards;
pub mod interaction;
pub mod logging;
pub mod messaging;
pub mod polls;
pub mod search;
pub mod services;
pub mod store;

pub use errors::{Error, Result};
