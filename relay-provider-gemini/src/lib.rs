#![doc = include_str!("../README.md")]

pub mod client;
pub mod mapping;
pub mod streaming;

pub use client::GeminiProvider;
pub use mapping::{parse_response, to_api_request, ALLOWED_SCHEMA_KEYS};
