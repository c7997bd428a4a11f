//! Substring search over note content and logs.
//!
//! # Responsibility
//! - Match queries case-insensitively against note text, log titles and
//!   log bodies.
//! - Keep result shaping (note ids vs tagged log hits) inside core.

pub mod text;
