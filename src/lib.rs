//! `emldoc` — convert `.eml` messages into printable documents.
//!
//! A message is decoded into a [`model::email::ParsedEmail`], assembled into
//! a single HTML document with a metadata header and inlined images
//! ([`assembly`]), then handed to a [`render::Renderer`].

pub mod assembly;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
