//! Output generation for the chat transport.
//!
//! # Submodules
//!
//! - [`digest`]: Builds the news and vulnerability messages in Telegram HTML
//!
//! Delivery itself lives in [`crate::notify`]; this module only produces
//! text.

pub mod digest;
