//! reqdesk-tui: Terminal widgets for the requirements chat workbench
//!
//! Rendering only; state lives in reqdesk-chat and the binary drives the loop.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
