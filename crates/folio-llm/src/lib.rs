//! folio-llm: provider client for the portfolio chat gateway.
//!
//! The only crate that talks to the network. `CompletionClient::complete` never
//! returns an error past its boundary; every failure class degrades to one
//! static, displayable message.

mod client;

pub use client::{
    CompletionClient, LlmMode, CONNECTIVITY_TEXT, MALFORMED_TEXT, RATE_LIMITED_TEXT, TIMEOUT_TEXT,
};
