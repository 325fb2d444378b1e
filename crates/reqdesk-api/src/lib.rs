//! reqdesk-api: data model and backend client
//!
//! This crate defines the messages, tool calls and entity payloads exchanged
//! with the workbench backend, the [`Backend`] trait the chat layer consumes,
//! and an HTTP implementation of it.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use client::HttpBackend;
pub use error::{Error, Result};
pub use types::*;
