//! Slack module for newsrelay.
//!
//! Block Kit message layout, the Web API client and its error type.

pub mod blocks;
pub mod client;
pub mod error;

pub use blocks::{Block, OutgoingMessage, TextObject};
pub use client::{
    parse_response, DeleteOutcome, HistoryMessage, MessageRef, MessagingClient, SlackClient,
};
pub use error::SlackError;
