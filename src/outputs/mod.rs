//! Output rendering.
//!
//! # Submodules
//!
//! - [`markdown`]: renders headlines, per-article analyses, the chat
//!   transcript and informational listings as Markdown text for the terminal

pub mod markdown;
